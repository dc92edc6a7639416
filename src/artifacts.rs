//! Var-file and plan-file naming, and writing artifacts to disk
//!
//! Names are `{stack prefix}-{component}.{suffix}` so different
//! stack+component pairs never collide. Two runs of the *same* pair share
//! the same files; there is no locking.

use async_trait::async_trait;
use regex::Regex;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::config::CliConfig;
use crate::context::{InvocationContext, ToolKind};
use crate::error::StackError;

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[/\\:\s]").expect("Invalid regex pattern"));

pub const TERRAFORM_VARFILE_SUFFIX: &str = "terraform.tfvars.json";
pub const TERRAFORM_PLANFILE_SUFFIX: &str = "planfile";
pub const HELMFILE_VARFILE_SUFFIX: &str = "helmfile.vars.yaml";

/// Replace characters that are unsafe in file names with `-`
pub fn sanitize(name: &str) -> String {
    UNSAFE_CHARS.replace_all(name, "-").into_owned()
}

fn artifact_name(ctx: &InvocationContext, suffix: &str) -> String {
    sanitize(&format!("{}-{}.{}", ctx.context_prefix(), ctx.component, suffix))
}

/// `<base>/<tool base>/<folder prefix>/<final component>`
pub fn component_path(config: &CliConfig, ctx: &InvocationContext) -> PathBuf {
    let tool_dir = match ctx.tool {
        ToolKind::Terraform => config.terraform_dir(),
        ToolKind::Helmfile => config.helmfile_dir(),
    };
    let mut path = tool_dir;
    if !ctx.component_folder_prefix.is_empty() {
        path.push(&ctx.component_folder_prefix);
    }
    path.push(&ctx.final_component);
    path
}

/// Directory the tool runs in
pub fn working_dir(config: &CliConfig, ctx: &InvocationContext) -> PathBuf {
    component_path(config, ctx)
}

fn resolve_override(config: &CliConfig, ctx: &InvocationContext, name: &str) -> PathBuf {
    let path = Path::new(name);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        working_dir(config, ctx).join(path)
    }
}

pub fn terraform_var_file_name(ctx: &InvocationContext) -> String {
    match &ctx.var_file {
        Some(name) => name.clone(),
        None => artifact_name(ctx, TERRAFORM_VARFILE_SUFFIX),
    }
}

pub fn terraform_var_file_path(config: &CliConfig, ctx: &InvocationContext) -> PathBuf {
    resolve_override(config, ctx, &terraform_var_file_name(ctx))
}

pub fn terraform_plan_file_name(ctx: &InvocationContext) -> String {
    match &ctx.plan_file {
        Some(name) => name.clone(),
        None => artifact_name(ctx, TERRAFORM_PLANFILE_SUFFIX),
    }
}

pub fn terraform_plan_file_path(config: &CliConfig, ctx: &InvocationContext) -> PathBuf {
    resolve_override(config, ctx, &terraform_plan_file_name(ctx))
}

pub fn helmfile_var_file_name(ctx: &InvocationContext) -> String {
    match &ctx.var_file {
        Some(name) => name.clone(),
        None => artifact_name(ctx, HELMFILE_VARFILE_SUFFIX),
    }
}

pub fn helmfile_var_file_path(config: &CliConfig, ctx: &InvocationContext) -> PathBuf {
    resolve_override(config, ctx, &helmfile_var_file_name(ctx))
}

/// Writes and removes artifact files
#[async_trait]
pub trait ArtifactWriter: Send + Sync {
    async fn write_json(&self, path: &Path, data: &Map<String, Value>) -> Result<(), StackError>;
    async fn write_yaml(&self, path: &Path, data: &Map<String, Value>) -> Result<(), StackError>;
    async fn remove(&self, path: &Path) -> std::io::Result<()>;
}

/// Writes artifacts to the local filesystem with mode `0644`
#[derive(Debug, Clone, Default)]
pub struct FsArtifactWriter;

impl FsArtifactWriter {
    async fn write(&self, path: &Path, content: Vec<u8>) -> Result<(), StackError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StackError::artifact(path, e))?;
        }

        tokio::fs::write(path, content)
            .await
            .map_err(|e| StackError::artifact(path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o644))
                .await
                .map_err(|e| StackError::artifact(path, e))?;
        }

        debug!("Wrote {}", path.display());
        Ok(())
    }
}

#[async_trait]
impl ArtifactWriter for FsArtifactWriter {
    async fn write_json(&self, path: &Path, data: &Map<String, Value>) -> Result<(), StackError> {
        let content = serde_json::to_vec_pretty(data).map_err(|e| StackError::artifact(path, e))?;
        self.write(path, content).await
    }

    async fn write_yaml(&self, path: &Path, data: &Map<String, Value>) -> Result<(), StackError> {
        let content = serde_yaml::to_string(data).map_err(|e| StackError::artifact(path, e))?;
        self.write(path, content.into_bytes()).await
    }

    async fn remove(&self, path: &Path) -> std::io::Result<()> {
        tokio::fs::remove_file(path).await
    }
}

/// Remove an artifact, logging instead of failing
///
/// A file that is already gone is not worth a warning.
pub async fn remove_best_effort(writer: &dyn ArtifactWriter, path: &Path) {
    match writer.remove(path).await {
        Ok(()) => debug!("Removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
    }
}
