//! Context variables derived from a component's `vars`

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z_]+)\}").expect("Invalid regex pattern"));

/// The naming context of a component instance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentContext {
    pub namespace: String,
    pub tenant: String,
    pub environment: String,
    pub stage: String,
    pub region: String,
}

impl ComponentContext {
    pub fn from_vars(vars: &Map<String, Value>) -> Self {
        let get = |key: &str| {
            vars.get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        Self {
            namespace: get("namespace"),
            tenant: get("tenant"),
            environment: get("environment"),
            stage: get("stage"),
            region: get("region"),
        }
    }

    /// `(NAME, value)` pairs exported to tool processes
    pub fn env_pairs(&self) -> [(&'static str, &str); 5] {
        [
            ("NAMESPACE", self.namespace.as_str()),
            ("TENANT", self.tenant.as_str()),
            ("ENVIRONMENT", self.environment.as_str()),
            ("STAGE", self.stage.as_str()),
            ("REGION", self.region.as_str()),
        ]
    }

    fn token(&self, name: &str) -> Option<&str> {
        match name {
            "namespace" => Some(&self.namespace),
            "tenant" => Some(&self.tenant),
            "environment" => Some(&self.environment),
            "stage" => Some(&self.stage),
            "region" => Some(&self.region),
            _ => None,
        }
    }

    /// Substitute `{namespace}`, `{tenant}`, `{environment}`, `{stage}` and
    /// `{region}` in a pattern; other tokens are left untouched
    pub fn replace_tokens(&self, pattern: &str) -> String {
        TOKEN_PATTERN
            .replace_all(pattern, |caps: &regex::Captures| {
                self.token(&caps[1])
                    .map(str::to_string)
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}
