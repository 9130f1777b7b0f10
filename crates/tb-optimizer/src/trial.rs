//! Trial sampling contract and the trials shipped with the crate.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use tb_types::{KwArgs, ParameterValue, TbResult, TrialError};

use crate::space::ParameterSpec;

/// A session that can sample one value for a named parameter.
///
/// Implementations own their sampling history; callers only ask for values.
pub trait Trial {
    fn sample_categorical(
        &mut self,
        name: &str,
        values: &[ParameterValue],
    ) -> TbResult<ParameterValue>;

    fn sample_int(&mut self, name: &str, min: i64, max: i64, step: i64, log: bool)
        -> TbResult<i64>;

    fn sample_float(
        &mut self,
        name: &str,
        min: f64,
        max: f64,
        step: Option<f64>,
        log: bool,
    ) -> TbResult<f64>;
}

/// Serializable snapshot of a finished trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub id: Uuid,
    pub number: usize,
    pub parameters: KwArgs,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Random trial
// ---------------------------------------------------------------------------

/// Independent random sampling, one value per parameter name.
///
/// Asking for a name twice with the same distribution returns the first
/// value; asking with a different distribution is a conflict.
#[derive(Debug, Clone)]
pub struct RandomTrial {
    id: Uuid,
    number: usize,
    created_at: DateTime<Utc>,
    rng: StdRng,
    params: KwArgs,
    distributions: HashMap<String, ParameterSpec>,
}

impl RandomTrial {
    pub fn new(number: usize) -> Self {
        Self::with_rng(number, StdRng::from_os_rng())
    }

    /// Reproducible trial: equal seeds yield equal samples.
    pub fn seeded(number: usize, seed: u64) -> Self {
        Self::with_rng(number, StdRng::seed_from_u64(seed))
    }

    fn with_rng(number: usize, rng: StdRng) -> Self {
        Self {
            id: Uuid::new_v4(),
            number,
            created_at: Utc::now(),
            rng,
            params: KwArgs::new(),
            distributions: HashMap::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn number(&self) -> usize {
        self.number
    }

    /// Values sampled so far.
    pub fn params(&self) -> &KwArgs {
        &self.params
    }

    pub fn distribution(&self, name: &str) -> Option<&ParameterSpec> {
        self.distributions.get(name)
    }

    pub fn into_record(self) -> TrialRecord {
        TrialRecord {
            id: self.id,
            number: self.number,
            parameters: self.params,
            created_at: self.created_at,
        }
    }

    /// Return the recorded value for `name`, or sample a fresh one.
    fn suggest(&mut self, name: &str, spec: ParameterSpec) -> TbResult<ParameterValue> {
        if let Some(previous) = self.distributions.get(name) {
            if *previous != spec {
                return Err(TrialError::ParameterConflict {
                    name: name.to_string(),
                    reason: format!(
                        "already sampled from a different {} distribution",
                        previous.kind()
                    ),
                }
                .into());
            }
            if let Some(value) = self.params.get(name) {
                return Ok(value.clone());
            }
        }

        let value = self.sample_one(name, &spec)?;
        tracing::trace!(trial = self.number, parameter = name, value = %value, "sampled");
        self.params.insert(name, value.clone());
        self.distributions.insert(name.to_string(), spec);
        Ok(value)
    }

    fn sample_one(&mut self, name: &str, spec: &ParameterSpec) -> TbResult<ParameterValue> {
        let rng = &mut self.rng;
        let value = match spec {
            ParameterSpec::Categorical { values } => {
                if values.is_empty() {
                    return Err(TrialError::EmptyChoices {
                        name: name.to_string(),
                    }
                    .into());
                }
                let idx = rng.random_range(0..values.len());
                values[idx].clone()
            }
            ParameterSpec::Int {
                min,
                max,
                step,
                log,
            } => {
                check_int_domain(name, *min, *max, *step, *log)?;
                let v = if *log {
                    // Widen by half a unit so the endpoints round as often as
                    // interior values.
                    let log_min = (*min as f64 - 0.5).ln();
                    let log_max = (*max as f64 + 0.5).ln();
                    let log_val: f64 = rng.random_range(log_min..=log_max);
                    (log_val.exp().round() as i64).clamp(*min, *max)
                } else {
                    let step = i128::from(*step);
                    let n_steps = (i128::from(*max) - i128::from(*min)) / step;
                    let k = rng.random_range(0..=n_steps);
                    (i128::from(*min) + k * step) as i64
                };
                ParameterValue::Int(v)
            }
            ParameterSpec::Float {
                min,
                max,
                step,
                log,
            } => {
                check_float_domain(name, *min, *max, *step, *log)?;
                let v = if min == max {
                    *min
                } else if *log {
                    let log_val: f64 = rng.random_range(min.ln()..=max.ln());
                    log_val.exp().clamp(*min, *max)
                } else if let Some(step) = step {
                    let n_steps = ((max - min) / step + 1e-9).floor() as u64;
                    let k = rng.random_range(0..=n_steps);
                    (min + k as f64 * step).min(*max)
                } else if (max - min).is_finite() {
                    rng.random_range(*min..=*max)
                } else {
                    // The span overflows f64; interpolate between the bounds.
                    let t: f64 = rng.random();
                    (min * (1.0 - t) + max * t).clamp(*min, *max)
                };
                ParameterValue::Float(v)
            }
        };
        Ok(value)
    }
}

fn check_int_domain(name: &str, min: i64, max: i64, step: i64, log: bool) -> TbResult<()> {
    if min > max || step <= 0 || (log && min <= 0) {
        return Err(TrialError::OutOfDomain {
            name: name.to_string(),
            value: format!("step={step}, log={log}"),
            domain: format!("[{min}, {max}]"),
        }
        .into());
    }
    Ok(())
}

fn check_float_domain(name: &str, min: f64, max: f64, step: Option<f64>, log: bool) -> TbResult<()> {
    let bad_step = step.is_some_and(|s| !(s > 0.0));
    if !(min <= max) || bad_step || (log && min <= 0.0) {
        return Err(TrialError::OutOfDomain {
            name: name.to_string(),
            value: format!("step={step:?}, log={log}"),
            domain: format!("[{min}, {max}]"),
        }
        .into());
    }
    Ok(())
}

impl Trial for RandomTrial {
    fn sample_categorical(
        &mut self,
        name: &str,
        values: &[ParameterValue],
    ) -> TbResult<ParameterValue> {
        self.suggest(
            name,
            ParameterSpec::Categorical {
                values: values.to_vec(),
            },
        )
    }

    fn sample_int(
        &mut self,
        name: &str,
        min: i64,
        max: i64,
        step: i64,
        log: bool,
    ) -> TbResult<i64> {
        let value = self.suggest(
            name,
            ParameterSpec::Int {
                min,
                max,
                step,
                log,
            },
        )?;
        Ok(value.as_i64().unwrap_or(min))
    }

    fn sample_float(
        &mut self,
        name: &str,
        min: f64,
        max: f64,
        step: Option<f64>,
        log: bool,
    ) -> TbResult<f64> {
        let value = self.suggest(
            name,
            ParameterSpec::Float {
                min,
                max,
                step,
                log,
            },
        )?;
        Ok(value.as_f64().unwrap_or(min))
    }
}

// ---------------------------------------------------------------------------
// Fixed trial
// ---------------------------------------------------------------------------

/// Replays preset values, e.g. the best parameters of a finished study.
///
/// Every requested value must be present and lie inside the requested domain.
#[derive(Debug, Clone, Default)]
pub struct FixedTrial {
    values: KwArgs,
    suggested: KwArgs,
}

impl FixedTrial {
    pub fn new(values: KwArgs) -> Self {
        Self {
            values,
            suggested: KwArgs::new(),
        }
    }

    /// Values handed out so far.
    pub fn params(&self) -> &KwArgs {
        &self.suggested
    }

    fn lookup(&mut self, name: &str, spec: &ParameterSpec) -> TbResult<ParameterValue> {
        let value = self
            .values
            .get(name)
            .cloned()
            .ok_or_else(|| TrialError::MissingValue {
                name: name.to_string(),
            })?;

        if !spec.contains(&value) {
            return Err(TrialError::OutOfDomain {
                name: name.to_string(),
                value: value.to_string(),
                domain: describe(spec),
            }
            .into());
        }

        self.suggested.insert(name, value.clone());
        Ok(value)
    }
}

impl From<TrialRecord> for FixedTrial {
    fn from(record: TrialRecord) -> Self {
        Self::new(record.parameters)
    }
}

fn describe(spec: &ParameterSpec) -> String {
    match spec {
        ParameterSpec::Categorical { values } => {
            let items: Vec<String> = values.iter().map(ToString::to_string).collect();
            format!("{{{}}}", items.join(", "))
        }
        ParameterSpec::Int { min, max, step, .. } => format!("[{min}, {max}] step {step}"),
        ParameterSpec::Float {
            min,
            max,
            step: Some(step),
            ..
        } => format!("[{min}, {max}] step {step}"),
        ParameterSpec::Float { min, max, .. } => format!("[{min}, {max}]"),
    }
}

impl Trial for FixedTrial {
    fn sample_categorical(
        &mut self,
        name: &str,
        values: &[ParameterValue],
    ) -> TbResult<ParameterValue> {
        self.lookup(
            name,
            &ParameterSpec::Categorical {
                values: values.to_vec(),
            },
        )
    }

    fn sample_int(
        &mut self,
        name: &str,
        min: i64,
        max: i64,
        step: i64,
        log: bool,
    ) -> TbResult<i64> {
        let spec = ParameterSpec::Int {
            min,
            max,
            step,
            log,
        };
        let value = self.lookup(name, &spec)?;
        Ok(value.as_i64().unwrap_or(min))
    }

    fn sample_float(
        &mut self,
        name: &str,
        min: f64,
        max: f64,
        step: Option<f64>,
        log: bool,
    ) -> TbResult<f64> {
        let spec = ParameterSpec::Float {
            min,
            max,
            step,
            log,
        };
        let value = self.lookup(name, &spec)?;
        Ok(value.as_f64().unwrap_or(min))
    }
}
