//! Environment variables
//!
//! [`EnvVars`] is a snapshot of string variables with typed getters. Every
//! getter takes a default used when the variable is missing; a variable that
//! is present but malformed is an error rather than a silent default.

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use tracing::debug;

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvVars {
    variables: BTreeMap<String, String>,
}

impl EnvVars {
    pub fn new<I, K, V>(variables: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            variables: variables
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }

    /// Snapshot of the process environment.
    pub fn from_process() -> Self {
        Self::new(std::env::vars())
    }

    /// Variables declared in a dotenv file.
    ///
    /// A variable that is also set in the process environment takes the
    /// process value. The process environment is never modified.
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        if !path.is_file() {
            return Err(CoreError::EnvFileMissing {
                path: path.to_path_buf(),
            });
        }

        let env_file_error = |source: dotenv::Error| CoreError::EnvFile {
            path: path.to_path_buf(),
            source,
        };

        let mut variables = BTreeMap::new();
        for entry in dotenv::from_path_iter(path).map_err(env_file_error)? {
            let (name, value) = entry.map_err(env_file_error)?;
            let value = std::env::var(&name).unwrap_or(value);
            variables.insert(name, value);
        }

        debug!("Loaded {} variables from {}", variables.len(), path.display());
        Ok(Self { variables })
    }

    pub fn has(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    pub fn string(&self, name: &str, default: &str) -> String {
        self.get(name).unwrap_or(default).to_string()
    }

    pub fn int(&self, name: &str, default: i64) -> CoreResult<i64> {
        self.parse(name, default, "is not an integer")
    }

    pub fn float(&self, name: &str, default: f64) -> CoreResult<f64> {
        self.parse(name, default, "is not a float")
    }

    /// Accepts `true`/`false`, `1`/`0`, `yes`/`no` and `on`/`off`.
    pub fn bool(&self, name: &str, default: bool) -> CoreResult<bool> {
        let Some(value) = self.get(name) else {
            return Ok(default);
        };

        match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(CoreError::env(name, "is not a boolean")),
        }
    }

    /// Comma-separated values, trimmed, without empty items.
    pub fn list(&self, name: &str, default: &[&str]) -> Vec<String> {
        match self.get(name) {
            Some(value) => value
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
            None => default.iter().map(|item| item.to_string()).collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.variables
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    fn parse<T: FromStr>(&self, name: &str, default: T, reason: &str) -> CoreResult<T> {
        match self.get(name) {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| CoreError::env(name, reason)),
            None => Ok(default),
        }
    }
}
