use tb_types::{DataError, TbResult};

use crate::sources::SourceConfig;

/// A data source that can hand out connections.
///
/// Handlers are immutable configuration; connection state lives in the
/// returned `Connection` and is passed back explicitly for health checks.
pub trait SourceHandler {
    type Connection;

    fn config(&self) -> &SourceConfig;

    /// Open a new connection. Driver errors propagate unmodified.
    fn connect(&self) -> TbResult<Self::Connection>;

    /// Whether `connection` is usable. Failures are reported, not raised.
    fn status(&self, connection: &Self::Connection) -> bool;
}

/// Connect and verify the connection before handing it out.
pub fn open_source<H: SourceHandler>(handler: &H) -> TbResult<H::Connection> {
    let config = handler.config();
    tracing::info!("Connect to {} database...", config.url());

    let connection = handler.connect()?;
    if !handler.status(&connection) {
        tracing::warn!("Exception while getting connection to {}", config.url());
        return Err(DataError::DatabaseConnection {
            message: format!("{} source at {} is not responding", config.source_type(), config.url()),
        }
        .into());
    }

    tracing::debug!("Connected to {} ({})", config.url(), config.source_type());
    Ok(connection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SqlConfig;
    use tb_types::TbError;

    #[derive(Debug)]
    struct FakeConnection {
        healthy: bool,
    }

    struct FakeHandler {
        config: SourceConfig,
        reachable: bool,
        healthy: bool,
    }

    impl FakeHandler {
        fn new(reachable: bool, healthy: bool) -> Self {
            Self {
                config: SourceConfig::Sql(SqlConfig {
                    url: "sql.internal".into(),
                    user: "reader".into(),
                    password: "secret".into(),
                }),
                reachable,
                healthy,
            }
        }
    }

    impl SourceHandler for FakeHandler {
        type Connection = FakeConnection;

        fn config(&self) -> &SourceConfig {
            &self.config
        }

        fn connect(&self) -> TbResult<FakeConnection> {
            if !self.reachable {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "connection refused",
                )
                .into());
            }
            Ok(FakeConnection {
                healthy: self.healthy,
            })
        }

        fn status(&self, connection: &FakeConnection) -> bool {
            connection.healthy
        }
    }

    #[test]
    fn open_healthy_source() {
        let handler = FakeHandler::new(true, true);
        let connection = open_source(&handler).unwrap();
        assert!(handler.status(&connection));
    }

    #[test]
    fn unhealthy_source_is_reported() {
        let handler = FakeHandler::new(true, false);
        let err = open_source(&handler).unwrap_err();
        assert!(matches!(err, TbError::Data(DataError::DatabaseConnection { .. })));
        assert!(err.to_string().contains("sql.internal"));
    }

    #[test]
    fn driver_errors_propagate() {
        let handler = FakeHandler::new(false, true);
        let err = open_source(&handler).unwrap_err();
        assert!(matches!(err, TbError::Io(ref e) if e.kind() == std::io::ErrorKind::ConnectionRefused));
    }

    #[test]
    fn connections_are_independent() {
        let handler = FakeHandler::new(true, true);
        let first = handler.connect().unwrap();
        let second = FakeConnection { healthy: false };
        assert!(handler.status(&first));
        assert!(!handler.status(&second));
    }
}
