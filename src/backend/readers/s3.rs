use async_trait::async_trait;
use aws_sdk_s3::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::backend::error::{BackendError, BackendResult};
use crate::backend::registry::BackendReader;
use crate::backend::{backend_attribute, backend_of, workspace_of, BACKEND_TYPE_S3};
use crate::config::CliConfig;
use crate::context::Sections;

use super::is_default_workspace;

const DEFAULT_WORKSPACE_KEY_PREFIX: &str = "env:";
const DEFAULT_STATE_KEY: &str = "terraform.tfstate";

/// Reads state objects from an S3 backend
#[derive(Debug, Clone)]
pub struct S3BackendReader {
    max_attempts: u32,
    retry_delay: Duration,
}

impl Default for S3BackendReader {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// Where a component's state object lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3StateLocation {
    pub bucket: String,
    pub key: String,
    pub region: String,
}

impl S3StateLocation {
    pub fn from_sections(sections: &Sections) -> BackendResult<Self> {
        let backend = backend_of(sections).ok_or_else(|| {
            BackendError::configuration(BACKEND_TYPE_S3, "the component has no `backend` section")
        })?;

        let bucket = backend_attribute(backend, "bucket");
        if bucket.is_empty() {
            return Err(BackendError::configuration(
                BACKEND_TYPE_S3,
                "`bucket` is required",
            ));
        }

        let key = match backend_attribute(backend, "key") {
            "" => DEFAULT_STATE_KEY,
            key => key,
        };
        let prefix = match backend_attribute(backend, "workspace_key_prefix") {
            "" => DEFAULT_WORKSPACE_KEY_PREFIX,
            prefix => prefix,
        };

        let workspace = workspace_of(sections);
        let key = if is_default_workspace(workspace) {
            key.to_string()
        } else {
            format!("{prefix}/{workspace}/{key}")
        };

        Ok(Self {
            bucket: bucket.to_string(),
            key,
            region: backend_attribute(backend, "region").to_string(),
        })
    }

    fn display(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }
}

impl S3BackendReader {
    async fn client(region: &str) -> Client {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if !region.is_empty() {
            loader = loader.region(aws_config::Region::new(region.to_string()));
        }
        Client::new(&loader.load().await)
    }
}

#[async_trait]
impl BackendReader for S3BackendReader {
    fn backend_type(&self) -> &str {
        BACKEND_TYPE_S3
    }

    async fn read_state(&self, _config: &CliConfig, sections: &Sections) -> BackendResult<Vec<u8>> {
        let location = S3StateLocation::from_sections(sections)?;
        let client = Self::client(&location.region).await;
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            debug!("Reading {} (attempt {})", location.display(), attempt);

            match client
                .get_object()
                .bucket(&location.bucket)
                .key(&location.key)
                .send()
                .await
            {
                Ok(output) => {
                    let bytes = output
                        .body
                        .collect()
                        .await
                        .map_err(|e| BackendError::read(BACKEND_TYPE_S3, location.display(), e))?
                        .into_bytes();
                    return Ok(bytes.to_vec());
                }
                Err(err) => {
                    let service_error = err.into_service_error();
                    if service_error.is_no_such_key() {
                        debug!("No state object at {}", location.display());
                        return Ok(Vec::new());
                    }
                    last_error = service_error.to_string();
                    if attempt < self.max_attempts {
                        warn!(
                            "Reading {} failed: {}; retrying in {:?}",
                            location.display(),
                            last_error,
                            self.retry_delay
                        );
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        Err(BackendError::read(
            BACKEND_TYPE_S3,
            location.display(),
            last_error,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sections(value: serde_json::Value) -> Sections {
        match value {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_default_workspace_uses_plain_key() {
        let location = S3StateLocation::from_sections(&sections(json!({
            "workspace": "default",
            "backend": {"bucket": "tfstate", "key": "vpc/terraform.tfstate", "region": "us-east-2"}
        })))
        .unwrap();

        assert_eq!(location.key, "vpc/terraform.tfstate");
        assert_eq!(location.region, "us-east-2");
    }

    #[test]
    fn test_workspace_key_prefix() {
        let location = S3StateLocation::from_sections(&sections(json!({
            "workspace": "tenant1-ue2-dev",
            "backend": {"bucket": "tfstate", "workspace_key_prefix": "vpc"}
        })))
        .unwrap();
        assert_eq!(location.key, "vpc/tenant1-ue2-dev/terraform.tfstate");

        let location = S3StateLocation::from_sections(&sections(json!({
            "workspace": "dev",
            "backend": {"bucket": "tfstate", "key": "state.json"}
        })))
        .unwrap();
        assert_eq!(location.key, "env:/dev/state.json");
    }

    #[test]
    fn test_bucket_is_required() {
        let err = S3StateLocation::from_sections(&sections(json!({"backend": {}}))).unwrap_err();
        assert!(matches!(err, BackendError::Configuration { .. }));

        let err = S3StateLocation::from_sections(&Sections::new()).unwrap_err();
        assert!(matches!(err, BackendError::Configuration { .. }));
    }
}
