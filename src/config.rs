use std::net::SocketAddr;

use serde::Deserialize;

/// Runtime configuration, read from `FOODGRAM_*` environment variables.
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
    #[serde(default = "default_session_secret")]
    pub session_secret: String,
    pub log_level: Option<log::LevelFilter>,
}

fn default_database_url() -> String {
    "sqlite::memory:".to_owned()
}

fn default_max_connections() -> u32 {
    5
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

const DEFAULT_SESSION_SECRET: &str = "secret";

fn default_session_secret() -> String {
    DEFAULT_SESSION_SECRET.to_owned()
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed("FOODGRAM_").from_env()
    }

    /// True when no secret was configured and sessions use the public default key.
    pub fn has_default_secret(&self) -> bool {
        self.session_secret == DEFAULT_SESSION_SECRET
    }

    pub fn database(&self) -> DatabaseUrl {
        DatabaseUrl::parse_url(&self.database_url)
    }

    pub fn env_logger(&self) -> env_logger::Builder {
        let mut builder = env_logger::Builder::from_default_env();
        if let Some(level) = self.log_level {
            builder.filter_level(level);
        }
        builder
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            max_connections: default_max_connections(),
            listen_addr: default_listen_addr(),
            session_secret: default_session_secret(),
            log_level: None,
        }
    }
}

/// Which store a connection string points at; decides the DDL dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseUrl {
    SQLite { connection_string: String },
    PostgreSQL { connection_string: String },
    Memory,
}

impl DatabaseUrl {
    pub fn parse_url(s: &str) -> Self {
        if s == "sqlite::memory:" || s == "sqlite://:memory:" {
            Self::Memory
        } else if s.starts_with("postgresql://") || s.starts_with("postgres://") {
            Self::PostgreSQL {
                connection_string: s.to_owned(),
            }
        } else if s.starts_with("sqlite:") {
            Self::SQLite {
                connection_string: s.to_owned(),
            }
        } else {
            Self::SQLite {
                connection_string: format!("sqlite://{s}?mode=rwc"),
            }
        }
    }

    pub fn to_connection_string(&self) -> String {
        match self {
            Self::SQLite { connection_string } | Self::PostgreSQL { connection_string } => {
                connection_string.clone()
            }
            Self::Memory => "sqlite::memory:".to_owned(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::SQLite { .. } => "sqlite",
            Self::PostgreSQL { .. } => "postgresql",
            Self::Memory => "in-memory sqlite",
        }
    }

    pub fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }

    pub fn is_postgresql(&self) -> bool {
        matches!(self, Self::PostgreSQL { .. })
    }
}
