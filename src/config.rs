//! Service settings, read from the environment.
//!
//! - `GROUPSPLIT_STORE`: `mongo` (default) or `memory`
//! - `MONGODB_URI`: required for the `mongo` store
//! - `MONGODB_DATABASE`: database name (default: `OpenSplit`)
//! - `HOST` / `PORT`: listen address (default: `0.0.0.0:8080`)
//! - `AUTH_SECRET`: required, signs bearer tokens
use std::collections::HashMap;

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("You need to add the {0} to the env")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone, Debug, PartialEq)]
pub enum StoreBackend {
    Mongo { uri: String, database: String },
    Memory,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub store: StoreBackend,
    pub host: String,
    pub port: u16,
    pub auth_secret: String,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&std::env::vars().collect())
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |name: &str| vars.get(name).filter(|v| !v.trim().is_empty()).cloned();

        let store = match get("GROUPSPLIT_STORE").as_deref() {
            None | Some("mongo") => StoreBackend::Mongo {
                uri: get("MONGODB_URI").ok_or(ConfigError::Missing("MONGODB_URI"))?,
                database: get("MONGODB_DATABASE").unwrap_or_else(|| "OpenSplit".to_string()),
            },
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "GROUPSPLIT_STORE",
                    value: other.to_string(),
                })
            }
        };
        let port = match get("PORT") {
            Some(port) => port.parse::<u16>().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value: port.clone(),
            })?,
            None => 8080,
        };

        Ok(Self {
            store,
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            auth_secret: get("AUTH_SECRET").ok_or(ConfigError::Missing("AUTH_SECRET"))?,
        })
    }
}
