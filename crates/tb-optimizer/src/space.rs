//! Parameter space definitions and the declarative JSON schema loader.

use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::Path;

use tb_types::{ParameterValue, SchemaError, TbResult};

const DISTRIBUTED_FIELDS: [&str; 5] = ["distribution", "min", "max", "step", "log"];

/// Describes how a single parameter is sampled.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterSpec {
    /// Explicit finite set of literal values.
    Categorical { values: Vec<ParameterValue> },
    /// Integer range [min, max] inclusive, quantized by `step`.
    Int {
        min: i64,
        max: i64,
        step: i64,
        log: bool,
    },
    /// Real range [min, max]; continuous unless `step` is set.
    Float {
        min: f64,
        max: f64,
        step: Option<f64>,
        log: bool,
    },
}

impl ParameterSpec {
    pub fn categorical<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ParameterValue>,
    {
        Self::Categorical {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn int(min: i64, max: i64) -> Self {
        Self::Int {
            min,
            max,
            step: 1,
            log: false,
        }
    }

    pub fn float(min: f64, max: f64) -> Self {
        Self::Float {
            min,
            max,
            step: None,
            log: false,
        }
    }

    /// Human-readable kind, matching the schema's `distribution` names.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Categorical { .. } => "categorical",
            Self::Int { .. } => "int",
            Self::Float { .. } => "float",
        }
    }

    /// Check bounds, step and log-scale constraints.
    pub fn validate(&self, parameter: &str) -> Result<(), SchemaError> {
        match self {
            Self::Categorical { values } => {
                if values.is_empty() {
                    return Err(SchemaError::EmptyChoices {
                        parameter: parameter.to_string(),
                    });
                }
            }
            Self::Int {
                min,
                max,
                step,
                log,
            } => {
                if min > max {
                    return Err(invalid_bounds(parameter, min, max));
                }
                if *step <= 0 {
                    return Err(invalid_step(parameter, format!("step ({step}) must be positive")));
                }
                if *log && *min <= 0 {
                    return Err(SchemaError::InvalidLogBounds {
                        parameter: parameter.to_string(),
                        message: format!("min ({min}) must be positive for log scale"),
                    });
                }
                if *log && *step != 1 {
                    return Err(invalid_step(
                        parameter,
                        "log scale cannot be combined with step != 1".to_string(),
                    ));
                }
            }
            Self::Float {
                min,
                max,
                step,
                log,
            } => {
                if !min.is_finite() || !max.is_finite() || min > max {
                    return Err(invalid_bounds(parameter, min, max));
                }
                if let Some(step) = step {
                    if !step.is_finite() || *step <= 0.0 {
                        return Err(invalid_step(parameter, format!("step ({step}) must be positive")));
                    }
                    if *log {
                        return Err(invalid_step(
                            parameter,
                            "log scale cannot be combined with step".to_string(),
                        ));
                    }
                }
                if *log && *min <= 0.0 {
                    return Err(SchemaError::InvalidLogBounds {
                        parameter: parameter.to_string(),
                        message: format!("min ({min}) must be positive for log scale"),
                    });
                }
            }
        }
        Ok(())
    }

    /// Whether `value` is a member of this domain (on the step grid, if any).
    pub fn contains(&self, value: &ParameterValue) -> bool {
        match self {
            Self::Categorical { values } => values.contains(value),
            Self::Int { min, max, step, .. } => match value.as_i64() {
                Some(v) => {
                    v >= *min
                        && v <= *max
                        && (i128::from(v) - i128::from(*min)) % i128::from((*step).max(1)) == 0
                }
                None => false,
            },
            Self::Float { min, max, step, .. } => match value.as_f64() {
                Some(v) if v >= *min && v <= *max => match step {
                    Some(step) => {
                        let k = ((v - min) / step).round();
                        (min + k * step - v).abs() <= 1e-8 * step.max(1.0)
                    }
                    None => true,
                },
                _ => false,
            },
        }
    }

    /// Classify one declarative schema entry.
    ///
    /// A `distribution` field, or a string-valued `kind` field, selects the
    /// variant explicitly. Without one, only a bare array or a single-field
    /// object holding an array is read as categorical; anything else is
    /// rejected instead of guessed.
    pub fn classify(parameter: &str, spec: &Value) -> Result<Self, SchemaError> {
        let fields = match spec {
            Value::Array(values) => return categorical_from_json(parameter, values),
            Value::Object(fields) => fields,
            other => {
                return Err(invalid_spec(
                    parameter,
                    format!("expected an object or array, got {}", json_type(other)),
                ))
            }
        };

        if let Some(distribution) = fields.get("distribution") {
            return distributed_from_json(parameter, fields, "distribution", distribution);
        }

        if let Some(kind) = fields.get("kind").filter(|k| k.is_string()) {
            return match kind.as_str() {
                Some("categorical") => {
                    reject_unknown(parameter, fields, &["kind", "values"])?;
                    match fields.get("values") {
                        Some(Value::Array(values)) => categorical_from_json(parameter, values),
                        Some(other) => Err(invalid_spec(
                            parameter,
                            format!("\"values\" must be an array, got {}", json_type(other)),
                        )),
                        None => Err(missing_field(parameter, "values")),
                    }
                }
                _ => distributed_from_json(parameter, fields, "kind", kind),
            };
        }

        match fields.len() {
            1 => match fields.values().next() {
                Some(Value::Array(values)) => categorical_from_json(parameter, values),
                _ => Err(invalid_spec(
                    parameter,
                    "a single-field spec must hold an array of values".to_string(),
                )),
            },
            0 => Err(invalid_spec(parameter, "the spec is empty".to_string())),
            n => Err(invalid_spec(
                parameter,
                format!("{n} fields without a \"distribution\" or \"kind\" discriminator"),
            )),
        }
    }
}

fn categorical_from_json(parameter: &str, values: &[Value]) -> Result<ParameterSpec, SchemaError> {
    let values = values
        .iter()
        .map(|v| {
            ParameterValue::from_json(v).ok_or_else(|| {
                invalid_spec(
                    parameter,
                    format!("categorical values must be literals, got {}", json_type(v)),
                )
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let spec = ParameterSpec::Categorical { values };
    spec.validate(parameter)?;
    Ok(spec)
}

fn distributed_from_json(
    parameter: &str,
    fields: &Map<String, Value>,
    discriminator: &str,
    distribution: &Value,
) -> Result<ParameterSpec, SchemaError> {
    let Some(name) = distribution.as_str() else {
        return Err(invalid_spec(
            parameter,
            format!("\"{discriminator}\" must be a string"),
        ));
    };

    let spec = match name {
        "int" => {
            reject_unknown(parameter, fields, &with_discriminator(discriminator))?;
            ParameterSpec::Int {
                min: required_i64(parameter, fields, "min")?,
                max: required_i64(parameter, fields, "max")?,
                step: match fields.get("step") {
                    Some(v) => as_i64(parameter, "step", v)?,
                    None => 1,
                },
                log: optional_bool(parameter, fields, "log")?,
            }
        }
        "float" => {
            reject_unknown(parameter, fields, &with_discriminator(discriminator))?;
            ParameterSpec::Float {
                min: required_f64(parameter, fields, "min")?,
                max: required_f64(parameter, fields, "max")?,
                step: fields
                    .get("step")
                    .map(|v| as_f64(parameter, "step", v))
                    .transpose()?,
                log: optional_bool(parameter, fields, "log")?,
            }
        }
        other => {
            return Err(SchemaError::UnsupportedDistribution {
                parameter: parameter.to_string(),
                distribution: other.to_string(),
            })
        }
    };

    spec.validate(parameter)?;
    Ok(spec)
}

fn with_discriminator(discriminator: &str) -> Vec<&str> {
    let mut allowed: Vec<&str> = DISTRIBUTED_FIELDS.to_vec();
    allowed[0] = discriminator;
    allowed
}

fn reject_unknown(
    parameter: &str,
    fields: &Map<String, Value>,
    allowed: &[&str],
) -> Result<(), SchemaError> {
    match fields.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(field) => Err(SchemaError::UnknownField {
            parameter: parameter.to_string(),
            field: field.clone(),
        }),
        None => Ok(()),
    }
}

fn required_i64(parameter: &str, fields: &Map<String, Value>, field: &str) -> Result<i64, SchemaError> {
    let value = fields.get(field).ok_or_else(|| missing_field(parameter, field))?;
    as_i64(parameter, field, value)
}

fn required_f64(parameter: &str, fields: &Map<String, Value>, field: &str) -> Result<f64, SchemaError> {
    let value = fields.get(field).ok_or_else(|| missing_field(parameter, field))?;
    as_f64(parameter, field, value)
}

fn optional_bool(parameter: &str, fields: &Map<String, Value>, field: &str) -> Result<bool, SchemaError> {
    match fields.get(field) {
        None => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => Err(invalid_spec(
            parameter,
            format!("\"{field}\" must be a bool, got {}", json_type(other)),
        )),
    }
}

fn as_i64(parameter: &str, field: &str, value: &Value) -> Result<i64, SchemaError> {
    value.as_i64().ok_or_else(|| {
        invalid_spec(
            parameter,
            format!("\"{field}\" must be an integer, got {value}"),
        )
    })
}

fn as_f64(parameter: &str, field: &str, value: &Value) -> Result<f64, SchemaError> {
    value.as_f64().ok_or_else(|| {
        invalid_spec(
            parameter,
            format!("\"{field}\" must be a number, got {value}"),
        )
    })
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn invalid_spec(parameter: &str, message: String) -> SchemaError {
    SchemaError::InvalidSpec {
        parameter: parameter.to_string(),
        message,
    }
}

fn missing_field(parameter: &str, field: &str) -> SchemaError {
    SchemaError::MissingField {
        parameter: parameter.to_string(),
        field: field.to_string(),
    }
}

fn invalid_bounds<T: ToString>(parameter: &str, min: &T, max: &T) -> SchemaError {
    SchemaError::InvalidBounds {
        parameter: parameter.to_string(),
        min: min.to_string(),
        max: max.to_string(),
    }
}

fn invalid_step(parameter: &str, message: String) -> SchemaError {
    SchemaError::InvalidStep {
        parameter: parameter.to_string(),
        message,
    }
}

/// A single named parameter in the space.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDef {
    /// Keyword the resolved value is passed under (e.g. "num_leaves").
    pub name: String,
    pub spec: ParameterSpec,
}

/// The full parameter space: an ordered list of parameter definitions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSpace {
    pub parameters: Vec<ParameterDef>,
}

impl ParameterSpace {
    pub fn new() -> Self {
        Self {
            parameters: Vec::new(),
        }
    }

    pub fn add(mut self, name: impl Into<String>, spec: ParameterSpec) -> Self {
        self.parameters.push(ParameterDef {
            name: name.into(),
            spec,
        });
        self
    }

    pub fn add_int(self, name: impl Into<String>, min: i64, max: i64) -> Self {
        self.add(name, ParameterSpec::int(min, max))
    }

    pub fn add_int_step(self, name: impl Into<String>, min: i64, max: i64, step: i64) -> Self {
        self.add(
            name,
            ParameterSpec::Int {
                min,
                max,
                step,
                log: false,
            },
        )
    }

    pub fn add_log_int(self, name: impl Into<String>, min: i64, max: i64) -> Self {
        self.add(
            name,
            ParameterSpec::Int {
                min,
                max,
                step: 1,
                log: true,
            },
        )
    }

    pub fn add_float(self, name: impl Into<String>, min: f64, max: f64) -> Self {
        self.add(name, ParameterSpec::float(min, max))
    }

    pub fn add_float_step(self, name: impl Into<String>, min: f64, max: f64, step: f64) -> Self {
        self.add(
            name,
            ParameterSpec::Float {
                min,
                max,
                step: Some(step),
                log: false,
            },
        )
    }

    /// Log-uniform range (sampled in log-space then exponentiated).
    pub fn add_log_float(self, name: impl Into<String>, min: f64, max: f64) -> Self {
        self.add(
            name,
            ParameterSpec::Float {
                min,
                max,
                step: None,
                log: true,
            },
        )
    }

    pub fn add_categorical<I, V>(self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ParameterValue>,
    {
        self.add(name, ParameterSpec::categorical(values))
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.spec)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterDef> {
        self.parameters.iter()
    }

    /// Validate every spec and reject duplicate names.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut seen = HashSet::new();
        for param in &self.parameters {
            if !seen.insert(param.name.as_str()) {
                return Err(SchemaError::DuplicateParameter {
                    parameter: param.name.clone(),
                });
            }
            param.spec.validate(&param.name)?;
        }
        Ok(())
    }

    /// Parse a schema object of `name -> spec` entries.
    pub fn from_json(schema: &Value) -> Result<Self, SchemaError> {
        let Value::Object(entries) = schema else {
            return Err(SchemaError::NotAnObject {
                found: json_type(schema).to_string(),
            });
        };

        let mut space = Self::new();
        for (name, spec) in entries {
            let spec = ParameterSpec::classify(name, spec)?;
            space = space.add(name.clone(), spec);
        }
        Ok(space)
    }

    pub fn from_json_str(schema: &str) -> TbResult<Self> {
        let value: Value = serde_json::from_str(schema)?;
        Ok(Self::from_json(&value)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> TbResult<Self> {
        let path = path.as_ref();
        tracing::info!("Loading parameter space from: {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        let space = Self::from_json_str(&contents)?;
        tracing::debug!("Loaded {} parameters from {}", space.len(), path.display());
        Ok(space)
    }
}
