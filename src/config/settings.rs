use serde::Deserialize;

/// Top-level configuration settings for the application.
///
/// Includes settings for the listener, the broker's per-connection delivery
/// and logging.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub broker: BrokerSettings,
    pub log: LogSettings,
}

/// Defines the host and port the server will bind to.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Controls how outbound frames reach a connection.
///
/// `outbound_buffer` bounds the per-connection queue; a subscriber whose
/// queue is full when a broadcast arrives is evicted. `write_timeout_ms`
/// bounds a single socket write in the writer task.
#[derive(Debug, Deserialize, Clone)]
pub struct BrokerSettings {
    pub outbound_buffer: usize,
    pub write_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Missing values are filled in from `Settings::default()`.
#[derive(Debug, Default, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub broker: Option<PartialBrokerSettings>,
    pub log: Option<PartialLogSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct PartialBrokerSettings {
    pub outbound_buffer: Option<usize>,
    pub write_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLogSettings {
    pub level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            broker: BrokerSettings {
                outbound_buffer: 256,
                write_timeout_ms: 5000,
            },
            log: LogSettings {
                level: "info".to_string(),
            },
        }
    }
}

impl PartialSettings {
    /// Overlays whatever was provided on top of the defaults.
    pub fn merge(self, default: Settings) -> Settings {
        let server = self.server;
        let broker = self.broker;
        let log = self.log;

        Settings {
            server: ServerSettings {
                host: server
                    .as_ref()
                    .and_then(|s| s.host.clone())
                    .unwrap_or(default.server.host),
                port: server
                    .as_ref()
                    .and_then(|s| s.port)
                    .unwrap_or(default.server.port),
            },
            broker: BrokerSettings {
                // zero is not usable for either value
                outbound_buffer: broker
                    .as_ref()
                    .and_then(|b| b.outbound_buffer)
                    .filter(|n| *n > 0)
                    .unwrap_or(default.broker.outbound_buffer),
                write_timeout_ms: broker
                    .as_ref()
                    .and_then(|b| b.write_timeout_ms)
                    .filter(|ms| *ms > 0)
                    .unwrap_or(default.broker.write_timeout_ms),
            },
            log: LogSettings {
                level: log
                    .as_ref()
                    .and_then(|l| l.level.clone())
                    .unwrap_or(default.log.level),
            },
        }
    }
}
