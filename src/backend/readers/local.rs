use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

use crate::backend::error::{BackendError, BackendResult};
use crate::backend::registry::BackendReader;
use crate::backend::{component_of, workspace_of, BACKEND_TYPE_LOCAL};
use crate::config::CliConfig;
use crate::context::Sections;

use super::is_default_workspace;

/// Reads `terraform.tfstate` from the component directory
///
/// Non-default workspaces live under `terraform.tfstate.d/<workspace>/`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalBackendReader;

impl LocalBackendReader {
    pub fn state_file_path(config: &CliConfig, sections: &Sections) -> PathBuf {
        let component_dir = config.terraform_dir().join(component_of(sections));
        let workspace = workspace_of(sections);

        if is_default_workspace(workspace) {
            component_dir.join("terraform.tfstate")
        } else {
            component_dir
                .join("terraform.tfstate.d")
                .join(workspace)
                .join("terraform.tfstate")
        }
    }
}

#[async_trait]
impl BackendReader for LocalBackendReader {
    fn backend_type(&self) -> &str {
        BACKEND_TYPE_LOCAL
    }

    async fn read_state(&self, config: &CliConfig, sections: &Sections) -> BackendResult<Vec<u8>> {
        let path = Self::state_file_path(config, sections);
        debug!("Reading local state file {}", path.display());

        match tokio::fs::read(&path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No state file at {}", path.display());
                Ok(Vec::new())
            }
            Err(e) => Err(BackendError::read(
                BACKEND_TYPE_LOCAL,
                path.display().to_string(),
                e,
            )),
        }
    }
}
