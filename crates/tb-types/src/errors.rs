use thiserror::Error;

/// Main error type for Tunebridge
#[derive(Error, Debug)]
pub enum TbError {
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Constructor failures pass through untouched.
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error("Trial error: {0}")]
    Trial(#[from] TrialError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Malformed or ambiguous parameter specifications
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("The space passed for the parameter \"{parameter}\" is not valid: {message}")]
    InvalidSpec { parameter: String, message: String },

    #[error("Unsupported distribution \"{distribution}\" for parameter \"{parameter}\"")]
    UnsupportedDistribution {
        parameter: String,
        distribution: String,
    },

    #[error("Parameter \"{parameter}\" is missing required field \"{field}\"")]
    MissingField { parameter: String, field: String },

    #[error("Parameter \"{parameter}\" has unexpected field \"{field}\"")]
    UnknownField { parameter: String, field: String },

    #[error("Invalid bounds for \"{parameter}\": min ({min}) must be less than or equal to max ({max})")]
    InvalidBounds {
        parameter: String,
        min: String,
        max: String,
    },

    #[error("Invalid log bounds for \"{parameter}\": {message}")]
    InvalidLogBounds { parameter: String, message: String },

    #[error("Invalid step for \"{parameter}\": {message}")]
    InvalidStep { parameter: String, message: String },

    #[error("Categorical parameter \"{parameter}\" has no values")]
    EmptyChoices { parameter: String },

    #[error("Parameter \"{parameter}\" is declared more than once")]
    DuplicateParameter { parameter: String },

    #[error("Schema must be a JSON object, got {found}")]
    NotAnObject { found: String },
}

impl SchemaError {
    /// Name of the offending parameter, if the error concerns one.
    pub fn parameter(&self) -> Option<&str> {
        match self {
            Self::InvalidSpec { parameter, .. }
            | Self::UnsupportedDistribution { parameter, .. }
            | Self::MissingField { parameter, .. }
            | Self::UnknownField { parameter, .. }
            | Self::InvalidBounds { parameter, .. }
            | Self::InvalidLogBounds { parameter, .. }
            | Self::InvalidStep { parameter, .. }
            | Self::EmptyChoices { parameter }
            | Self::DuplicateParameter { parameter } => Some(parameter),
            Self::NotAnObject { .. } => None,
        }
    }
}

/// Failures raised while building a target object from keyword arguments
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConstructionError {
    #[error("missing required argument: {name}")]
    MissingArgument { name: String },

    #[error("argument {name} has type {found}, expected {expected}")]
    TypeMismatch {
        name: String,
        expected: String,
        found: String,
    },

    #[error("unexpected keyword argument: {name}")]
    UnexpectedArgument { name: String },

    #[error("constructor rejected arguments: {message}")]
    Rejected { message: String },
}

/// Errors reported by a trial while sampling
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrialError {
    #[error("parameter conflict for '{name}': {reason}")]
    ParameterConflict { name: String, reason: String },

    #[error("no value available for parameter '{name}'")]
    MissingValue { name: String },

    #[error("value {value} for parameter '{name}' is outside its domain {domain}")]
    OutOfDomain {
        name: String,
        value: String,
        domain: String,
    },

    #[error("categorical choices for '{name}' cannot be empty")]
    EmptyChoices { name: String },
}

/// Data-source errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("Database connection failed: {message}")]
    DatabaseConnection { message: String },
}

/// Result type alias for Tunebridge operations
pub type TbResult<T> = Result<T, TbError>;

/// Macro for creating validation errors
#[macro_export]
macro_rules! validation_error {
    ($($arg:tt)*) => {
        $crate::TbError::Validation(format!($($arg)*))
    };
}

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::TbError::Config(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_names_parameter() {
        let error = SchemaError::UnsupportedDistribution {
            parameter: "x".to_string(),
            distribution: "bogus".to_string(),
        };

        assert!(error.to_string().contains("\"x\""));
        assert!(error.to_string().contains("bogus"));
        assert_eq!(error.parameter(), Some("x"));

        let not_object = SchemaError::NotAnObject {
            found: "array".to_string(),
        };
        assert_eq!(not_object.parameter(), None);
    }

    #[test]
    fn test_error_conversion() {
        let schema_error = SchemaError::EmptyChoices {
            parameter: "c".to_string(),
        };
        let tb_error: TbError = schema_error.into();

        match tb_error {
            TbError::Schema(_) => (),
            _ => panic!("Expected Schema error"),
        }
    }

    #[test]
    fn test_construction_error_is_transparent() {
        let inner = ConstructionError::MissingArgument {
            name: "alpha".to_string(),
        };
        let tb_error: TbError = inner.clone().into();

        assert_eq!(tb_error.to_string(), inner.to_string());
        match tb_error {
            TbError::Construction(e) => assert_eq!(e, inner),
            _ => panic!("Expected Construction error"),
        }
    }

    #[test]
    fn test_macros() {
        let validation_err = validation_error!("Invalid value: {}", 42);
        assert!(matches!(validation_err, TbError::Validation(ref m) if m == "Invalid value: 42"));

        let config_err = config_error!("Missing environment variable: {}", "MONGO_URL");
        assert!(config_err.to_string().contains("MONGO_URL"));
    }
}
