use serde::{Deserialize, Serialize};
use std::fmt;

use tb_types::{config_error, TbResult};

/// MongoDB connection settings
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct MongoConfig {
    pub url: String,
    pub user: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub auth_mechanism: String,
    pub auth_source: String,
}

impl MongoConfig {
    pub const URL_VAR: &'static str = "MONGO_URL";
    pub const USER_VAR: &'static str = "MONGO_USER";
    pub const PASSWORD_VAR: &'static str = "MONGO_PASS";
    pub const AUTH_MECHANISM_VAR: &'static str = "MONGO_AUTH_MECH";
    pub const AUTH_SOURCE_VAR: &'static str = "MONGO_AUTH_SRC";

    pub fn from_env() -> TbResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup` instead of the process environment.
    pub fn from_lookup<F>(lookup: F) -> TbResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            url: required(&lookup, Self::URL_VAR)?,
            user: required(&lookup, Self::USER_VAR)?,
            password: required(&lookup, Self::PASSWORD_VAR)?,
            auth_mechanism: required(&lookup, Self::AUTH_MECHANISM_VAR)?,
            auth_source: required(&lookup, Self::AUTH_SOURCE_VAR)?,
        })
    }

    /// Connection URI with percent-encoded credentials. The scheme of `url`
    /// (e.g. `mongodb+srv`) is kept; a bare host gets `mongodb://`.
    pub fn connection_uri(&self) -> String {
        let (scheme, host) = self
            .url
            .split_once("://")
            .unwrap_or(("mongodb", self.url.as_str()));
        format!(
            "{}://{}:{}@{}/?authSource={}&authMechanism={}",
            scheme,
            encode_component(&self.user),
            encode_component(&self.password),
            host.trim_end_matches('/'),
            encode_component(&self.auth_source),
            encode_component(&self.auth_mechanism),
        )
    }
}

impl fmt::Debug for MongoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MongoConfig")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("auth_mechanism", &self.auth_mechanism)
            .field("auth_source", &self.auth_source)
            .finish()
    }
}

/// SQL Server connection settings
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlConfig {
    pub url: String,
    pub user: String,
    #[serde(skip_serializing, default)]
    pub password: String,
}

impl SqlConfig {
    pub const URL_VAR: &'static str = "MSSQL_URL";
    pub const USER_VAR: &'static str = "MSSQL_USER";
    pub const PASSWORD_VAR: &'static str = "MSSQL_PASS";

    pub fn from_env() -> TbResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> TbResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            url: required(&lookup, Self::URL_VAR)?,
            user: required(&lookup, Self::USER_VAR)?,
            password: required(&lookup, Self::PASSWORD_VAR)?,
        })
    }

    /// ADO-style connection string. Values containing `;` or braces are
    /// brace-quoted so they cannot introduce extra keys.
    pub fn connection_string(&self) -> String {
        format!(
            "Server={};User Id={};Password={};",
            quote_value(&self.url),
            quote_value(&self.user),
            quote_value(&self.password)
        )
    }
}

impl fmt::Debug for SqlConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlConfig")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Types of data sources supported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source_type", rename_all = "lowercase")]
pub enum SourceConfig {
    Mongo(MongoConfig),
    Sql(SqlConfig),
}

impl SourceConfig {
    /// Host the source points at, for logging.
    pub fn url(&self) -> &str {
        match self {
            Self::Mongo(c) => &c.url,
            Self::Sql(c) => &c.url,
        }
    }

    pub fn source_type(&self) -> &'static str {
        match self {
            Self::Mongo(_) => "mongo",
            Self::Sql(_) => "sql",
        }
    }
}

fn required<F>(lookup: &F, key: &str) -> TbResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(config_error!("missing environment variable {}", key)),
    }
}

fn quote_value(raw: &str) -> String {
    if raw.contains([';', '{', '}']) {
        format!("{{{}}}", raw.replace('}', "}}"))
    } else {
        raw.to_string()
    }
}

fn encode_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
