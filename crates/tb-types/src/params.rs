//! Concrete parameter values and the keyword-argument bag handed to constructors.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::errors::ConstructionError;

/// A concrete parameter value produced by a trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParameterValue {
    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Integers widen to floats; everything else is `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Convert a JSON literal into a parameter value. Arrays, objects and
    /// null have no parameter representation.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float)),
            serde_json::Value::String(s) => Some(Self::Str(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<bool> for ParameterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

/// Types that can be pulled out of a [`KwArgs`] bag.
pub trait FromParameter: Sized {
    const EXPECTED: &'static str;

    fn from_parameter(value: &ParameterValue) -> Option<Self>;
}

impl FromParameter for ParameterValue {
    const EXPECTED: &'static str = "any";

    fn from_parameter(value: &ParameterValue) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromParameter for i64 {
    const EXPECTED: &'static str = "int";

    fn from_parameter(value: &ParameterValue) -> Option<Self> {
        value.as_i64()
    }
}

impl FromParameter for u32 {
    const EXPECTED: &'static str = "int (u32)";

    fn from_parameter(value: &ParameterValue) -> Option<Self> {
        value.as_i64().and_then(|v| u32::try_from(v).ok())
    }
}

impl FromParameter for usize {
    const EXPECTED: &'static str = "int (usize)";

    fn from_parameter(value: &ParameterValue) -> Option<Self> {
        value.as_i64().and_then(|v| usize::try_from(v).ok())
    }
}

impl FromParameter for f64 {
    const EXPECTED: &'static str = "float";

    fn from_parameter(value: &ParameterValue) -> Option<Self> {
        value.as_f64()
    }
}

impl FromParameter for bool {
    const EXPECTED: &'static str = "bool";

    fn from_parameter(value: &ParameterValue) -> Option<Self> {
        value.as_bool()
    }
}

impl FromParameter for String {
    const EXPECTED: &'static str = "str";

    fn from_parameter(value: &ParameterValue) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

/// Resolved keyword arguments: one value per parameter name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KwArgs {
    values: BTreeMap<String, ParameterValue>,
}

impl KwArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, returning the previous one for that name.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<ParameterValue>,
    ) -> Option<ParameterValue> {
        self.values.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParameterValue)> {
        self.values.iter()
    }

    /// Remove and convert a required argument.
    pub fn take<T: FromParameter>(&mut self, name: &str) -> Result<T, ConstructionError> {
        match self.take_opt(name)? {
            Some(value) => Ok(value),
            None => Err(ConstructionError::MissingArgument {
                name: name.to_string(),
            }),
        }
    }

    /// Remove and convert an optional argument.
    pub fn take_opt<T: FromParameter>(
        &mut self,
        name: &str,
    ) -> Result<Option<T>, ConstructionError> {
        let Some(value) = self.values.remove(name) else {
            return Ok(None);
        };
        T::from_parameter(&value)
            .map(Some)
            .ok_or_else(|| ConstructionError::TypeMismatch {
                name: name.to_string(),
                expected: T::EXPECTED.to_string(),
                found: value.type_name().to_string(),
            })
    }

    /// Fail on the first argument nobody consumed.
    pub fn ensure_consumed(&self) -> Result<(), ConstructionError> {
        match self.values.keys().next() {
            Some(name) => Err(ConstructionError::UnexpectedArgument { name: name.clone() }),
            None => Ok(()),
        }
    }

    /// Build any deserializable type whose fields match the argument names.
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> Result<T, ConstructionError> {
        let value = self.to_json();
        serde_json::from_value(value).map_err(|e| ConstructionError::Rejected {
            message: e.to_string(),
        })
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.values
                .iter()
                .map(|(k, v)| {
                    let json = match v {
                        ParameterValue::Bool(b) => serde_json::Value::from(*b),
                        ParameterValue::Int(i) => serde_json::Value::from(*i),
                        ParameterValue::Float(f) => serde_json::Value::from(*f),
                        ParameterValue::Str(s) => serde_json::Value::from(s.as_str()),
                    };
                    (k.clone(), json)
                })
                .collect(),
        )
    }
}

impl FromIterator<(String, ParameterValue)> for KwArgs {
    fn from_iter<I: IntoIterator<Item = (String, ParameterValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for KwArgs {
    type Item = (String, ParameterValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, ParameterValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untagged_values_deserialize_by_shape() {
        let values: Vec<ParameterValue> =
            serde_json::from_str(r#"[true, 3, 0.5, "gbdt"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                ParameterValue::Bool(true),
                ParameterValue::Int(3),
                ParameterValue::Float(0.5),
                ParameterValue::Str("gbdt".into()),
            ]
        );
    }

    #[test]
    fn from_json_rejects_containers() {
        assert_eq!(
            ParameterValue::from_json(&serde_json::json!(7)),
            Some(ParameterValue::Int(7))
        );
        assert_eq!(ParameterValue::from_json(&serde_json::json!([1, 2])), None);
        assert_eq!(ParameterValue::from_json(&serde_json::Value::Null), None);
    }

    #[test]
    fn take_converts_and_removes() {
        let mut kwargs = KwArgs::new();
        kwargs.insert("a", 2i64);
        kwargs.insert("b", 0.5);
        kwargs.insert("c", "foo");

        let a: i64 = kwargs.take("a").unwrap();
        let b: f64 = kwargs.take("b").unwrap();
        let c: String = kwargs.take("c").unwrap();
        assert_eq!((a, b, c.as_str()), (2, 0.5, "foo"));
        assert!(kwargs.is_empty());
        assert!(kwargs.ensure_consumed().is_ok());
    }

    #[test]
    fn int_widens_to_float() {
        let mut kwargs = KwArgs::new();
        kwargs.insert("min_split_gain", 3i64);
        let v: f64 = kwargs.take("min_split_gain").unwrap();
        assert_eq!(v, 3.0);
    }

    #[test]
    fn take_reports_missing_and_mismatched() {
        let mut kwargs = KwArgs::new();
        kwargs.insert("flag", "yes");

        let missing = kwargs.take::<i64>("depth").unwrap_err();
        assert_eq!(
            missing,
            ConstructionError::MissingArgument {
                name: "depth".into()
            }
        );

        let mismatch = kwargs.take::<bool>("flag").unwrap_err();
        assert!(matches!(
            mismatch,
            ConstructionError::TypeMismatch { ref found, .. } if found == "str"
        ));
    }

    #[test]
    fn negative_int_does_not_fit_usize() {
        let mut kwargs = KwArgs::new();
        kwargs.insert("n", -1i64);
        assert!(kwargs.take::<usize>("n").is_err());
    }

    #[test]
    fn leftover_arguments_are_reported() {
        let mut kwargs = KwArgs::new();
        kwargs.insert("unused", true);
        assert_eq!(
            kwargs.ensure_consumed().unwrap_err(),
            ConstructionError::UnexpectedArgument {
                name: "unused".into()
            }
        );
    }

    #[test]
    fn deserialize_into_struct() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Model {
            a: i64,
            b: f64,
            c: String,
        }

        let mut kwargs = KwArgs::new();
        kwargs.insert("a", 2i64);
        kwargs.insert("b", 0.5);
        kwargs.insert("c", "foo");

        let model: Model = kwargs.deserialize_into().unwrap();
        assert_eq!(
            model,
            Model {
                a: 2,
                b: 0.5,
                c: "foo".into()
            }
        );

        kwargs = KwArgs::new();
        kwargs.insert("a", 2i64);
        let err = kwargs.deserialize_into::<Model>().unwrap_err();
        assert!(matches!(err, ConstructionError::Rejected { .. }));
    }
}
