//! Runtime configuration, read from the environment at startup.
//!
//! A `.env` file in the working directory is honoured for local use.

use std::path::PathBuf;
use std::time::Duration;

use crate::models::{Field, Scope};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

#[derive(Clone, Debug)]
pub struct Config {
    pub api_url: String,
    pub api_token: Option<String>,
    pub scope: Scope,
    pub request_timeout: Duration,
    pub page_size: usize,
    pub notifications_path: PathBuf,
    pub report_title: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("API_URL")
            .unwrap_or_else(|| "http://localhost:1337/api".to_string())
            .trim_end_matches('/')
            .to_string();

        let api_token = lookup("API_TOKEN").filter(|token| !token.trim().is_empty());

        let role = lookup("ROLE").unwrap_or_else(|| "super_admin".to_string());
        let scope = scope_for_role(&role, lookup("ASSIGNED_FIELD").as_deref())?;

        let request_timeout = match lookup("REQUEST_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_positive("REQUEST_TIMEOUT_SECS", &raw)? as u64),
            None => Duration::from_secs(30),
        };

        let page_size = match lookup("PAGE_SIZE") {
            Some(raw) => parse_positive("PAGE_SIZE", &raw)?,
            None => 100,
        };

        let notifications_path = lookup("NOTIFICATIONS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".batchmate-notifications.json"));

        let report_title =
            lookup("REPORT_TITLE").unwrap_or_else(|| "Batchmates Report".to_string());

        Ok(Self {
            api_url,
            api_token,
            scope,
            request_timeout,
            page_size,
            notifications_path,
            report_title,
        })
    }
}

pub fn scope_for_role(role: &str, assigned_field: Option<&str>) -> Result<Scope, ConfigError> {
    match role.trim() {
        "super_admin" => Ok(Scope::Unrestricted),
        "field_admin" => {
            let raw = assigned_field
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingVar("ASSIGNED_FIELD".to_string()))?;
            let field = raw
                .parse::<Field>()
                .map_err(|err| ConfigError::InvalidValue("ASSIGNED_FIELD".to_string(), err))?;
            Ok(Scope::Field(field))
        }
        other => Err(ConfigError::InvalidValue(
            "ROLE".to_string(),
            format!("'{other}' is not one of super_admin, field_admin"),
        )),
    }
}

fn parse_positive(key: &str, raw: &str) -> Result<usize, ConfigError> {
    match raw.trim().parse::<usize>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("'{raw}' is not a positive integer"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_lookup(lookup_from(&[])).expect("config");
        assert_eq!(config.api_url, "http://localhost:1337/api");
        assert_eq!(config.scope, Scope::Unrestricted);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.page_size, 100);
        assert!(config.api_token.is_none());
    }

    #[test]
    fn field_admin_needs_assigned_field() {
        let err = Config::from_lookup(lookup_from(&[("ROLE", "field_admin")])).unwrap_err();
        assert_eq!(err, ConfigError::MissingVar("ASSIGNED_FIELD".to_string()));

        let config = Config::from_lookup(lookup_from(&[
            ("ROLE", "field_admin"),
            ("ASSIGNED_FIELD", "Mechanical Engineering"),
            ("API_URL", "https://alumni.example.org/api/"),
        ]))
        .expect("config");
        assert_eq!(config.scope, Scope::Field(Field::Mechanical));
        assert_eq!(config.api_url, "https://alumni.example.org/api");
    }

    #[test]
    fn rejects_unknown_role_and_bad_numbers() {
        assert!(matches!(
            scope_for_role("viewer", None),
            Err(ConfigError::InvalidValue(key, _)) if key == "ROLE"
        ));
        assert!(Config::from_lookup(lookup_from(&[("PAGE_SIZE", "0")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("REQUEST_TIMEOUT_SECS", "soon")])).is_err());
    }
}
