//! # tb-optimizer
//!
//! Parameter spaces, trial sampling and instance creation for Tunebridge.
//!
//! A [`ParameterSpace`] describes every tunable parameter of a target type. An
//! [`InstanceCreator`] resolves each parameter through a [`Trial`] and builds a
//! fresh target per trial.

mod creator;
mod presets;
mod space;
mod trial;

pub use creator::{InstanceCreator, InstanceFactory, Instantiate};
pub use presets::{instantiate_lgbm, lightgbm_space, LgbmModel, LgbmParams, ModelKind};
pub use space::{ParameterDef, ParameterSpace, ParameterSpec};
pub use trial::{FixedTrial, RandomTrial, Trial, TrialRecord};
