//! Instance creation: resolve every parameter through a trial, then build the target.

use std::fmt;

use tb_types::{ConstructionError, KwArgs, ParameterValue, SchemaError, TbResult};

use crate::space::{ParameterSpace, ParameterSpec};
use crate::trial::Trial;

/// Types buildable from resolved keyword arguments.
pub trait Instantiate: Sized {
    fn from_kwargs(kwargs: KwArgs) -> Result<Self, ConstructionError>;
}

impl Instantiate for KwArgs {
    fn from_kwargs(kwargs: KwArgs) -> Result<Self, ConstructionError> {
        Ok(kwargs)
    }
}

impl Instantiate for serde_json::Value {
    fn from_kwargs(kwargs: KwArgs) -> Result<Self, ConstructionError> {
        Ok(kwargs.to_json())
    }
}

/// Common trait for everything that turns a trial into an object.
pub trait InstanceFactory {
    type Output;

    /// Sample one parameter's value through the trial.
    fn resolve_parameter(
        &self,
        trial: &mut dyn Trial,
        name: &str,
        spec: &ParameterSpec,
    ) -> TbResult<(String, ParameterValue)>;

    /// Resolve every parameter, then construct the output.
    fn create(&self, trial: &mut dyn Trial) -> TbResult<Self::Output>;
}

/// Builds a fresh `T` per trial from a fixed parameter space.
pub struct InstanceCreator<T> {
    space: ParameterSpace,
    constructor: fn(KwArgs) -> Result<T, ConstructionError>,
}

impl<T: Instantiate> InstanceCreator<T> {
    /// Validates the space up front so `create` never meets a malformed spec.
    pub fn new(space: ParameterSpace) -> Result<Self, SchemaError> {
        Self::with_constructor(space, T::from_kwargs)
    }

    pub fn from_json(schema: &serde_json::Value) -> Result<Self, SchemaError> {
        Self::new(ParameterSpace::from_json(schema)?)
    }
}

impl<T> InstanceCreator<T> {
    /// Use an explicit constructor instead of [`Instantiate`].
    pub fn with_constructor(
        space: ParameterSpace,
        constructor: fn(KwArgs) -> Result<T, ConstructionError>,
    ) -> Result<Self, SchemaError> {
        space.validate()?;
        Ok(Self { space, constructor })
    }

    pub fn space(&self) -> &ParameterSpace {
        &self.space
    }

    /// Resolve every parameter without constructing anything.
    pub fn resolve_all(&self, trial: &mut dyn Trial) -> TbResult<KwArgs> {
        let mut kwargs = KwArgs::new();
        for param in self.space.iter() {
            let (name, value) = self.resolve_parameter(trial, &param.name, &param.spec)?;
            kwargs.insert(name, value);
        }
        Ok(kwargs)
    }
}

impl<T> InstanceFactory for InstanceCreator<T> {
    type Output = T;

    fn resolve_parameter(
        &self,
        trial: &mut dyn Trial,
        name: &str,
        spec: &ParameterSpec,
    ) -> TbResult<(String, ParameterValue)> {
        let value = match spec {
            ParameterSpec::Categorical { values } => trial.sample_categorical(name, values)?,
            ParameterSpec::Int {
                min,
                max,
                step,
                log,
            } => ParameterValue::Int(trial.sample_int(name, *min, *max, *step, *log)?),
            ParameterSpec::Float {
                min,
                max,
                step,
                log,
            } => ParameterValue::Float(trial.sample_float(name, *min, *max, *step, *log)?),
        };
        tracing::debug!(parameter = name, kind = spec.kind(), value = %value, "resolved parameter");
        Ok((name.to_string(), value))
    }

    fn create(&self, trial: &mut dyn Trial) -> TbResult<T> {
        let kwargs = self.resolve_all(trial)?;
        let count = kwargs.len();
        let instance = (self.constructor)(kwargs)?;
        tracing::debug!(parameters = count, "constructed instance");
        Ok(instance)
    }
}

impl<T> Clone for InstanceCreator<T> {
    fn clone(&self) -> Self {
        Self {
            space: self.space.clone(),
            constructor: self.constructor,
        }
    }
}

impl<T> fmt::Debug for InstanceCreator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceCreator")
            .field("space", &self.space)
            .field("target", &std::any::type_name::<T>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trial::{FixedTrial, RandomTrial};
    use serde::Deserialize;
    use serde_json::json;
    use std::collections::VecDeque;
    use tb_types::{TbError, TrialError};

    /// Hands out queued values and records every call.
    #[derive(Default)]
    struct ScriptedTrial {
        categorical: VecDeque<ParameterValue>,
        ints: VecDeque<i64>,
        floats: VecDeque<f64>,
        calls: Vec<String>,
    }

    impl Trial for ScriptedTrial {
        fn sample_categorical(
            &mut self,
            name: &str,
            values: &[ParameterValue],
        ) -> TbResult<ParameterValue> {
            self.calls.push(format!("categorical({name}, {})", values.len()));
            self.categorical
                .pop_front()
                .ok_or_else(|| TrialError::MissingValue { name: name.into() }.into())
        }

        fn sample_int(
            &mut self,
            name: &str,
            min: i64,
            max: i64,
            step: i64,
            log: bool,
        ) -> TbResult<i64> {
            self.calls
                .push(format!("int({name}, {min}, {max}, step={step}, log={log})"));
            self.ints
                .pop_front()
                .ok_or_else(|| TrialError::MissingValue { name: name.into() }.into())
        }

        fn sample_float(
            &mut self,
            name: &str,
            min: f64,
            max: f64,
            step: Option<f64>,
            log: bool,
        ) -> TbResult<f64> {
            self.calls
                .push(format!("float({name}, {min}, {max}, step={step:?}, log={log})"));
            self.floats
                .pop_front()
                .ok_or_else(|| TrialError::MissingValue { name: name.into() }.into())
        }
    }

    #[derive(Debug, PartialEq, Deserialize)]
    struct Model {
        a: i64,
        b: f64,
    }

    impl Instantiate for Model {
        fn from_kwargs(mut kwargs: KwArgs) -> Result<Self, ConstructionError> {
            let model = Self {
                a: kwargs.take("a")?,
                b: kwargs.take("b")?,
            };
            kwargs.ensure_consumed()?;
            Ok(model)
        }
    }

    fn numeric_schema() -> serde_json::Value {
        json!({
            "a": {"distribution": "int", "min": 1, "max": 10},
            "b": {"distribution": "float", "min": 0.0, "max": 1.0}
        })
    }

    #[test]
    fn resolve_int_passes_defaults() {
        let creator = InstanceCreator::<KwArgs>::from_json(&numeric_schema()).unwrap();
        let mut trial = ScriptedTrial {
            ints: VecDeque::from([5]),
            ..Default::default()
        };

        let spec = creator.space().get("a").unwrap().clone();
        let result = creator.resolve_parameter(&mut trial, "a", &spec).unwrap();

        assert_eq!(result, ("a".to_string(), ParameterValue::Int(5)));
        assert_eq!(trial.calls, vec!["int(a, 1, 10, step=1, log=false)"]);
    }

    #[test]
    fn resolve_float_is_continuous_by_default() {
        let creator = InstanceCreator::<KwArgs>::from_json(&numeric_schema()).unwrap();
        let mut trial = ScriptedTrial {
            floats: VecDeque::from([0.5]),
            ..Default::default()
        };

        let spec = creator.space().get("b").unwrap().clone();
        let result = creator.resolve_parameter(&mut trial, "b", &spec).unwrap();

        assert_eq!(result, ("b".to_string(), ParameterValue::Float(0.5)));
        assert_eq!(trial.calls, vec!["float(b, 0, 1, step=None, log=false)"]);
    }

    #[test]
    fn resolve_categorical() {
        let creator =
            InstanceCreator::<KwArgs>::from_json(&json!({"c": ["foo", "bar", "baz"]})).unwrap();
        let mut trial = ScriptedTrial {
            categorical: VecDeque::from([ParameterValue::Str("foo".into())]),
            ..Default::default()
        };

        let kwargs = creator.create(&mut trial).unwrap();
        assert_eq!(kwargs.get("c"), Some(&ParameterValue::Str("foo".into())));
        assert_eq!(kwargs.len(), 1);
        assert_eq!(trial.calls, vec!["categorical(c, 3)"]);
    }

    #[test]
    fn create_builds_target_from_sampled_values() {
        let creator = InstanceCreator::<Model>::from_json(&numeric_schema()).unwrap();
        let mut trial = ScriptedTrial {
            ints: VecDeque::from([2, 5]),
            floats: VecDeque::from([0.5, 0.75]),
            ..Default::default()
        };

        let model = creator.create(&mut trial).unwrap();
        assert_eq!(model, Model { a: 2, b: 0.5 });
        assert_eq!(trial.ints, VecDeque::from([5]));
        assert_eq!(trial.floats, VecDeque::from([0.75]));
    }

    #[test]
    fn unsupported_distribution_fails_before_construction() {
        let err = InstanceCreator::<Model>::from_json(&json!({"x": {"distribution": "bogus"}}))
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnsupportedDistribution {
                parameter: "x".into(),
                distribution: "bogus".into()
            }
        );
    }

    #[test]
    fn malformed_programmatic_space_rejected() {
        let space = ParameterSpace::new().add_categorical("c", Vec::<ParameterValue>::new());
        let err = InstanceCreator::<KwArgs>::new(space).unwrap_err();
        assert_eq!(err.parameter(), Some("c"));
    }

    #[test]
    fn construction_error_passes_through_unchanged() {
        let space = ParameterSpace::new().add_int("a", 1, 10);
        let creator = InstanceCreator::<Model>::new(space).unwrap();
        let mut trial = RandomTrial::seeded(0, 1);

        let err = creator.create(&mut trial).unwrap_err();
        match err {
            TbError::Construction(e) => assert_eq!(
                e,
                ConstructionError::MissingArgument { name: "b".into() }
            ),
            other => panic!("expected construction error, got {other:?}"),
        }
    }

    #[test]
    fn trial_errors_propagate() {
        let creator = InstanceCreator::<Model>::from_json(&numeric_schema()).unwrap();
        let mut trial = ScriptedTrial::default();
        assert!(matches!(
            creator.create(&mut trial),
            Err(TbError::Trial(TrialError::MissingValue { .. }))
        ));
    }

    #[test]
    fn all_categorical_schema_draws_declared_values() {
        let schema = json!({
            "boosting_type": ["gbdt", "rf"],
            "linear_tree": {"kind": "categorical", "values": [true, false]},
            "max_bin": {"values": [63, 255]}
        });
        let creator = InstanceCreator::<KwArgs>::from_json(&schema).unwrap();

        for seed in 0..20 {
            let mut trial = RandomTrial::seeded(0, seed);
            let kwargs = creator.create(&mut trial).unwrap();
            assert_eq!(kwargs.len(), 3);
            for param in creator.space().iter() {
                let value = kwargs.get(&param.name).unwrap();
                assert!(param.spec.contains(value), "{} = {value}", param.name);
            }
        }
    }

    #[test]
    fn sampled_numbers_stay_in_bounds() {
        let creator = InstanceCreator::<Model>::from_json(&numeric_schema()).unwrap();
        for seed in 0..50 {
            let mut trial = RandomTrial::seeded(0, seed);
            let model = creator.create(&mut trial).unwrap();
            assert!((1..=10).contains(&model.a));
            assert!((0.0..=1.0).contains(&model.b));
        }
    }

    #[test]
    fn independent_instances_per_trial() {
        let creator = InstanceCreator::<KwArgs>::from_json(&numeric_schema()).unwrap();

        let mut values = KwArgs::new();
        values.insert("a", 3i64);
        values.insert("b", 0.25);
        let mut first_trial = FixedTrial::new(values);

        let mut values = KwArgs::new();
        values.insert("a", 9i64);
        values.insert("b", 0.75);
        let mut second_trial = FixedTrial::new(values);

        let mut first = creator.create(&mut first_trial).unwrap();
        let second = creator.create(&mut second_trial).unwrap();

        first.insert("a", 100i64);
        assert_eq!(second.get("a"), Some(&ParameterValue::Int(9)));
        assert_eq!(first_trial.params().get("a"), Some(&ParameterValue::Int(3)));
    }

    #[test]
    fn explicit_constructor_and_serde_targets() {
        fn pair(mut kwargs: KwArgs) -> Result<(i64, f64), ConstructionError> {
            Ok((kwargs.take("a")?, kwargs.take("b")?))
        }

        let space = ParameterSpace::from_json(&numeric_schema()).unwrap();
        let creator = InstanceCreator::<(i64, f64)>::with_constructor(space.clone(), pair).unwrap();
        let serde_creator = InstanceCreator::<Model>::with_constructor(space, |kwargs: KwArgs| {
            kwargs.deserialize_into::<Model>()
        })
        .unwrap();

        let mut values = KwArgs::new();
        values.insert("a", 2i64);
        values.insert("b", 0.5);

        assert_eq!(
            creator.create(&mut FixedTrial::new(values.clone())).unwrap(),
            (2, 0.5)
        );
        assert_eq!(
            serde_creator.create(&mut FixedTrial::new(values)).unwrap(),
            Model { a: 2, b: 0.5 }
        );
    }

    #[test]
    fn json_target() {
        let creator = InstanceCreator::<serde_json::Value>::from_json(&numeric_schema()).unwrap();
        let mut values = KwArgs::new();
        values.insert("a", 2i64);
        values.insert("b", 0.5);

        let value = creator.create(&mut FixedTrial::new(values)).unwrap();
        assert_eq!(value, json!({"a": 2, "b": 0.5}));
    }
}
