//! Ready-made search spaces for gradient-boosted tree models.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use tb_types::{validation_error, ConstructionError, KwArgs, TbError, TbResult};

use crate::creator::{InstanceCreator, Instantiate};
use crate::space::ParameterSpace;
use crate::trial::Trial;

/// Which LightGBM estimator the parameters are meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Classifier,
    Regressor,
    Ranker,
}

impl FromStr for ModelKind {
    type Err = TbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "classifier" => Ok(Self::Classifier),
            "regressor" => Ok(Self::Regressor),
            "ranker" => Ok(Self::Ranker),
            other => Err(validation_error!("unknown model kind: {}", other)),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Classifier => "classifier",
            Self::Regressor => "regressor",
            Self::Ranker => "ranker",
        };
        f.write_str(name)
    }
}

/// Constructor arguments for a LightGBM estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LgbmParams {
    pub boosting_type: String,
    pub n_estimators: u32,
    pub learning_rate: f64,
    pub num_leaves: u32,
    pub max_depth: i64,
    pub min_child_samples: u32,
    pub reg_alpha: f64,
    pub reg_lambda: f64,
    pub min_split_gain: f64,
    pub subsample: f64,
    pub subsample_freq: u32,
    pub colsample_bytree: f64,
    pub colsample_bynode: f64,
    pub linear_tree: bool,
    pub extra_trees: bool,
    pub random_state: i64,
}

impl Instantiate for LgbmParams {
    fn from_kwargs(mut kwargs: KwArgs) -> Result<Self, ConstructionError> {
        let params = Self {
            boosting_type: kwargs.take("boosting_type")?,
            n_estimators: kwargs.take("n_estimators")?,
            learning_rate: kwargs.take("learning_rate")?,
            num_leaves: kwargs.take("num_leaves")?,
            max_depth: kwargs.take("max_depth")?,
            min_child_samples: kwargs.take("min_child_samples")?,
            reg_alpha: kwargs.take("reg_alpha")?,
            reg_lambda: kwargs.take("reg_lambda")?,
            min_split_gain: kwargs.take("min_split_gain")?,
            subsample: kwargs.take("subsample")?,
            subsample_freq: kwargs.take("subsample_freq")?,
            colsample_bytree: kwargs.take("colsample_bytree")?,
            colsample_bynode: kwargs.take("colsample_bynode")?,
            linear_tree: kwargs.take("linear_tree")?,
            extra_trees: kwargs.take("extra_trees")?,
            random_state: kwargs.take("random_state")?,
        };
        kwargs.ensure_consumed()?;
        Ok(params)
    }
}

/// An estimator kind paired with its sampled parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LgbmModel {
    pub kind: ModelKind,
    pub params: LgbmParams,
}

/// LightGBM search space. `random_state` is not sampled; see [`instantiate_lgbm`].
pub fn lightgbm_space() -> ParameterSpace {
    ParameterSpace::new()
        .add_categorical("boosting_type", ["gbdt", "rf"])
        .add_int("n_estimators", 50, 1500)
        .add_float("learning_rate", 1e-5, 0.01)
        .add_int_step("num_leaves", 7, 31, 2)
        .add_int("max_depth", 1, 7)
        // The limits should loosely depend on the dataset size.
        .add_int("min_child_samples", 5, 10)
        .add_int("reg_alpha", 0, 100)
        .add_int("reg_lambda", 0, 100)
        .add_float("min_split_gain", 0.0, 15.0)
        .add_float_step("subsample", 0.4, 1.0, 0.05)
        .add_int("subsample_freq", 1, 100)
        .add_float_step("colsample_bytree", 0.2, 1.0, 0.05)
        .add_float_step("colsample_bynode", 0.2, 1.0, 0.05)
        .add_categorical("linear_tree", [true, false])
        .add_categorical("extra_trees", [true, false])
}

/// Sample a LightGBM estimator configuration for `kind`.
///
/// `random_state` is passed through to the constructor as a constant and never
/// reaches the trial.
pub fn instantiate_lgbm(
    trial: &mut dyn Trial,
    kind: &str,
    random_state: i64,
) -> TbResult<LgbmModel> {
    let kind: ModelKind = kind.parse()?;
    let creator = InstanceCreator::<LgbmParams>::new(lightgbm_space())?;
    let mut kwargs = creator.resolve_all(trial)?;
    kwargs.insert("random_state", random_state);
    let params = LgbmParams::from_kwargs(kwargs)?;
    tracing::debug!(%kind, n_estimators = params.n_estimators, "instantiated lightgbm model");
    Ok(LgbmModel { kind, params })
}
