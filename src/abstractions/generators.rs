//! Backend and provider override files
//!
//! Terraform merges `*.tf.json` files in the component directory with the
//! component's own configuration, so the resolved `backend` and `providers`
//! sections are materialized there before `init`.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::artifacts::ArtifactWriter;
use crate::config::CliConfig;
use crate::context::InvocationContext;
use crate::error::StackError;

pub const BACKEND_FILE_NAME: &str = "backend.tf.json";
pub const PROVIDERS_OVERRIDE_FILE_NAME: &str = "providers_override.tf.json";

#[async_trait]
pub trait OverrideGenerator: Send + Sync {
    async fn generate(
        &self,
        config: &CliConfig,
        ctx: &InvocationContext,
        working_dir: &Path,
    ) -> Result<(), StackError>;
}

/// Writes `backend.tf.json` and `providers_override.tf.json`
pub struct TerraformJsonGenerator {
    writer: Arc<dyn ArtifactWriter>,
}

impl TerraformJsonGenerator {
    pub fn new(writer: Arc<dyn ArtifactWriter>) -> Self {
        Self { writer }
    }

    /// `{"terraform": {"backend": {"<type>": {...}}}}`
    pub fn backend_document(ctx: &InvocationContext) -> Map<String, Value> {
        let mut backend = Map::new();
        backend.insert(ctx.backend_type.clone(), Value::Object(ctx.backend.clone()));
        match json!({ "terraform": { "backend": backend } }) {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    /// `{"provider": {...}}`
    pub fn providers_document(ctx: &InvocationContext) -> Map<String, Value> {
        let mut document = Map::new();
        document.insert("provider".to_string(), Value::Object(ctx.providers.clone()));
        document
    }
}

#[async_trait]
impl OverrideGenerator for TerraformJsonGenerator {
    async fn generate(
        &self,
        config: &CliConfig,
        ctx: &InvocationContext,
        working_dir: &Path,
    ) -> Result<(), StackError> {
        if config.components.terraform.auto_generate_backend_file {
            if ctx.backend_type.is_empty() {
                return Err(StackError::invalid_invocation(format!(
                    "'auto_generate_backend_file' is enabled but component '{}' in stack '{}' has no backend_type",
                    ctx.component_from_arg, ctx.stack
                )));
            }

            let path = working_dir.join(BACKEND_FILE_NAME);
            if ctx.dry_run {
                info!("Dry run: would write {}", path.display());
            } else {
                debug!("Writing the backend config to {}", path.display());
                self.writer
                    .write_json(&path, &Self::backend_document(ctx))
                    .await?;
            }
        }

        if !ctx.providers.is_empty() {
            let path = working_dir.join(PROVIDERS_OVERRIDE_FILE_NAME);
            if ctx.dry_run {
                info!("Dry run: would write {}", path.display());
            } else {
                debug!("Writing the provider overrides to {}", path.display());
                self.writer
                    .write_json(&path, &Self::providers_document(ctx))
                    .await?;
            }
        }

        Ok(())
    }
}
