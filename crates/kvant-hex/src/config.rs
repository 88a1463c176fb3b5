use anyhow::Context;
use serde::Deserialize;
use std::env;

pub const DEFAULT_PORT: &str = "8080";
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server_port: String,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let server_port = lookup("SERVER_PORT")
            .or_else(|| lookup("PORT"))
            .unwrap_or_else(|| DEFAULT_PORT.into());
        let database_url = lookup("DATABASE_URL").filter(|u| !u.trim().is_empty());

        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .context("JWT_SECRET must be set to a non-empty value")?;

        let token_ttl_hours = match lookup("JWT_TTL_HOURS") {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|h| *h > 0)
                .with_context(|| format!("JWT_TTL_HOURS must be a positive integer, got {raw:?}"))?,
            None => DEFAULT_TOKEN_TTL_HOURS,
        };

        Ok(Self {
            server_port,
            database_url,
            jwt_secret,
            token_ttl_hours,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let cfg = Config::from_lookup(lookup_from(&[("JWT_SECRET", "s3cret")])).unwrap();
        assert_eq!(cfg.server_port, "8080");
        assert_eq!(cfg.database_url, None);
        assert_eq!(cfg.token_ttl_hours, 24);
    }

    #[test]
    fn missing_or_empty_secret_is_rejected() {
        assert!(Config::from_lookup(lookup_from(&[])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("JWT_SECRET", "")])).is_err());
    }

    #[test]
    fn explicit_values_win() {
        let cfg = Config::from_lookup(lookup_from(&[
            ("JWT_SECRET", "s3cret"),
            ("PORT", "9000"),
            ("SERVER_PORT", "3000"),
            ("DATABASE_URL", "sqlite://data/kvant.db"),
            ("JWT_TTL_HOURS", "2"),
        ]))
        .unwrap();
        assert_eq!(cfg.server_port, "3000");
        assert_eq!(cfg.database_url.as_deref(), Some("sqlite://data/kvant.db"));
        assert_eq!(cfg.token_ttl_hours, 2);

        let cfg = Config::from_lookup(lookup_from(&[("JWT_SECRET", "x"), ("PORT", "9000")])).unwrap();
        assert_eq!(cfg.server_port, "9000");
    }

    #[test]
    fn bad_ttl_is_rejected() {
        let res = Config::from_lookup(lookup_from(&[("JWT_SECRET", "x"), ("JWT_TTL_HOURS", "0")]));
        assert!(res.is_err());
        let res = Config::from_lookup(lookup_from(&[("JWT_SECRET", "x"), ("JWT_TTL_HOURS", "day")]));
        assert!(res.is_err());
    }
}
