//! Environment variable access
//!
//! Everything that consults the process environment goes through
//! [`EnvReader`], so tests can substitute a [`MockEnvReader`] instead of
//! mutating the real process environment.

use std::collections::BTreeMap;

/// Read-only view of a process environment
pub trait EnvReader: Send + Sync {
    /// Read an environment variable as a String
    ///
    /// # Errors
    ///
    /// Returns `VarError::NotPresent` if the variable is not set,
    /// or `VarError::NotUnicode` if the value contains invalid UTF-8.
    fn var(&self, key: &str) -> Result<String, std::env::VarError>;

    /// Every variable whose name and value are valid UTF-8
    fn vars(&self) -> Vec<(String, String)>;

    /// The variable's value when it is set and non-empty
    fn non_empty(&self, key: &str) -> Option<String> {
        self.var(key).ok().filter(|value| !value.is_empty())
    }
}

/// Production implementation that reads from std::env
#[derive(Clone, Default, Debug)]
pub struct RealEnvReader;

impl EnvReader for RealEnvReader {
    fn var(&self, key: &str) -> Result<String, std::env::VarError> {
        std::env::var(key)
    }

    fn vars(&self) -> Vec<(String, String)> {
        std::env::vars().collect()
    }
}

/// Fixed environment for tests
#[derive(Clone, Default, Debug)]
pub struct MockEnvReader {
    vars: BTreeMap<String, String>,
}

impl MockEnvReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_string(), value.to_string());
        self
    }
}

impl EnvReader for MockEnvReader {
    fn var(&self, key: &str) -> Result<String, std::env::VarError> {
        self.vars
            .get(key)
            .cloned()
            .ok_or(std::env::VarError::NotPresent)
    }

    fn vars(&self) -> Vec<(String, String)> {
        self.vars
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_env_reader() {
        let env = MockEnvReader::new()
            .with_env("TF_WORKSPACE", "")
            .with_env("AWS_PROFILE", "dev-admin");

        assert_eq!(env.var("AWS_PROFILE").unwrap(), "dev-admin");
        assert!(env.var("MISSING").is_err());
        assert_eq!(env.non_empty("TF_WORKSPACE"), None);
        assert_eq!(env.non_empty("AWS_PROFILE").as_deref(), Some("dev-admin"));
        assert_eq!(env.vars().len(), 2);
    }

    #[test]
    fn test_real_env_reader_sees_path() {
        let reader = RealEnvReader;
        assert!(reader.vars().iter().any(|(key, _)| key == "PATH"));
    }
}
