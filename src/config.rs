//! Environment configuration.
//!
//! | variable       | meaning                                   |
//! |----------------|-------------------------------------------|
//! | `PORT`         | TCP port to listen on (default 5000)      |
//! | `DATABASE_URL` | use the relational backend at this URL    |
//! | `REDIS_URL`    | use the key-value backend at this URL     |
//!
//! `DATABASE_URL` wins when both are set; with neither, counts are kept in
//! memory.

use std::net::{Ipv4Addr, SocketAddr};

use crate::error::Error;

/// Port used when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 5000;

/// Which storage backend to count into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Memory,
    /// Redis URL.
    Redis(String),
    /// Postgres or SQLite URL.
    Sql(String),
}

/// Everything the server needs to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Address to bind, always on all interfaces.
    pub listen: SocketAddr,
    /// Where counts are kept.
    pub backend: Backend,
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`, treating empty values as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let port = match get("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| Error::Config(format!("PORT must be a port number ({raw:?}): {e}")))?,
            None => DEFAULT_PORT,
        };

        let backend = if let Some(url) = get("DATABASE_URL") {
            Backend::Sql(url)
        } else if let Some(url) = get("REDIS_URL") {
            Backend::Redis(url)
        } else {
            Backend::Memory
        };

        Ok(Self {
            listen: SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
            backend,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, Error> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.listen, "0.0.0.0:5000".parse().unwrap());
        assert_eq!(cfg.backend, Backend::Memory);
    }

    #[test]
    fn test_port() {
        let cfg = config(&[("PORT", "8080")]).unwrap();
        assert_eq!(cfg.listen.port(), 8080);

        let err = config(&[("PORT", "http")]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_backend_selection() {
        let cfg = config(&[("REDIS_URL", "redis://localhost:6379")]).unwrap();
        assert_eq!(cfg.backend, Backend::Redis("redis://localhost:6379".to_string()));

        let cfg = config(&[
            ("REDIS_URL", "redis://localhost:6379"),
            ("DATABASE_URL", "postgres://localhost/robots"),
        ])
        .unwrap();
        assert_eq!(cfg.backend, Backend::Sql("postgres://localhost/robots".to_string()));
    }

    #[test]
    fn test_empty_values_are_unset() {
        let cfg = config(&[("PORT", ""), ("DATABASE_URL", "  ")]).unwrap();
        assert_eq!(cfg.listen.port(), DEFAULT_PORT);
        assert_eq!(cfg.backend, Backend::Memory);
    }
}
