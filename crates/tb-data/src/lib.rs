pub mod handlers;
pub mod sources;

pub use handlers::*;
pub use sources::*;

use tb_types::TbResult;

/// Sources a dataset build reads from, loaded from the environment.
#[derive(Debug, Clone)]
pub struct DatasetSources {
    pub mongo: MongoConfig,
    pub sql: Option<SqlConfig>,
}

impl DatasetSources {
    /// MongoDB settings are required; SQL Server settings are optional.
    pub fn from_env() -> TbResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> TbResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mongo = MongoConfig::from_lookup(&lookup)?;
        let sql = match lookup(SqlConfig::URL_VAR) {
            Some(_) => Some(SqlConfig::from_lookup(&lookup)?),
            None => None,
        };
        tracing::info!(
            mongo = %mongo.url,
            sql = sql.as_ref().map(|c| c.url.as_str()).unwrap_or("-"),
            "Configured dataset sources"
        );
        Ok(Self { mongo, sql })
    }

    pub fn configs(&self) -> Vec<SourceConfig> {
        let mut configs = vec![SourceConfig::Mongo(self.mongo.clone())];
        if let Some(sql) = &self.sql {
            configs.push(SourceConfig::Sql(sql.clone()));
        }
        configs
    }
}
