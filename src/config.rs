use std::{env, fmt::Display, str::FromStr};

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid {key} value: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub acl_model: String,
    pub acl_policy: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub token_ttl_hours: u64,
    pub seed_admin_email: String,
    pub seed_admin_password: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let required = |key: &'static str| var(key).ok_or(ConfigError::Missing(key));
        let or_default = |key: &'static str, default: &str| {
            var(key).unwrap_or_else(|| {
                info!("{key} not set, using default: {default}");
                default.to_owned()
            })
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            acl_model: or_default("ACL_MODEL", "acl/model.conf"),
            acl_policy: or_default("ACL_POLICY", "acl/policy.csv"),
            port: parse("PORT", or_default("PORT", "8080"))?,
            cors_origins: var("CORS_ORIGIN")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(str::trim)
                        .filter(|v| !v.is_empty())
                        .map(str::to_owned)
                        .collect()
                })
                .unwrap_or_default(),
            token_ttl_hours: parse("TOKEN_TTL_HOURS", or_default("TOKEN_TTL_HOURS", "24"))?,
            seed_admin_email: or_default("ADMIN_SEED_EMAIL", "admin@college.local"),
            seed_admin_password: var("ADMIN_SEED_PASSWORD").unwrap_or_else(|| "admin123".into()),
        })
    }
}

fn parse<T: FromStr>(key: &'static str, value: String) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/campus"),
            ("JWT_SECRET", "secret"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.token_ttl_hours, 24);
        assert_eq!(config.acl_model, "acl/model.conf");
        assert!(config.cors_origins.is_empty());
        assert_eq!(config.seed_admin_email, "admin@college.local");
    }

    #[test]
    fn required_values() {
        assert_eq!(
            Config::from_lookup(lookup(&[("JWT_SECRET", "secret")])).unwrap_err(),
            ConfigError::Missing("DATABASE_URL")
        );
        assert_eq!(
            Config::from_lookup(lookup(&[("DATABASE_URL", "x"), ("JWT_SECRET", "")]))
                .unwrap_err(),
            ConfigError::Missing("JWT_SECRET")
        );
    }

    #[test]
    fn cors_origins_are_split_and_trimmed() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "x"),
            ("JWT_SECRET", "y"),
            ("CORS_ORIGIN", "http://localhost:5173, https://campus.example.edu,,"),
            ("PORT", "3000"),
        ]))
        .unwrap();
        assert_eq!(
            config.cors_origins,
            vec!["http://localhost:5173", "https://campus.example.edu"]
        );
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn unparsable_port() {
        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "x"),
            ("JWT_SECRET", "y"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
    }
}
