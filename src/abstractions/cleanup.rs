//! Housekeeping for `clean`
//!
//! Cleaning must work for disabled, abstract and locked components, so it
//! runs before the rest of the gate and never touches the tool itself.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::artifacts::{sanitize, TERRAFORM_PLANFILE_SUFFIX, TERRAFORM_VARFILE_SUFFIX};
use crate::config::CliConfig;
use crate::context::InvocationContext;
use crate::error::StackError;

use super::generators::{BACKEND_FILE_NAME, PROVIDERS_OVERRIDE_FILE_NAME};

pub const SKIP_LOCK_FILE_FLAG: &str = "--skip-lock-file";
const TERRAFORM_DATA_DIR: &str = ".terraform";
const TERRAFORM_LOCK_FILE: &str = ".terraform.lock.hcl";

#[async_trait]
pub trait ComponentCleaner: Send + Sync {
    async fn clean(
        &self,
        ctx: &InvocationContext,
        component_path: &Path,
        config: &CliConfig,
    ) -> Result<(), StackError>;
}

/// Deletes generated files from a component directory
#[derive(Debug, Clone, Copy, Default)]
pub struct FsComponentCleaner;

impl FsComponentCleaner {
    /// Files and directories `clean` would delete, in a stable order
    pub fn targets(ctx: &InvocationContext, component_path: &Path) -> Vec<PathBuf> {
        let mut targets = vec![component_path.join(TERRAFORM_DATA_DIR)];
        if !ctx.has_additional_flag(SKIP_LOCK_FILE_FLAG) {
            targets.push(component_path.join(TERRAFORM_LOCK_FILE));
        }
        targets.push(component_path.join(BACKEND_FILE_NAME));
        targets.push(component_path.join(PROVIDERS_OVERRIDE_FILE_NAME));

        let dir = glob::Pattern::escape(&component_path.to_string_lossy());
        let name_prefix = if ctx.stack.is_empty() {
            String::new()
        } else {
            format!("{}-", glob::Pattern::escape(&sanitize(&ctx.context_prefix())))
        };

        for suffix in [TERRAFORM_PLANFILE_SUFFIX, TERRAFORM_VARFILE_SUFFIX] {
            let pattern = format!("{dir}/{name_prefix}*.{suffix}");
            match glob::glob(&pattern) {
                Ok(paths) => {
                    let mut matched: Vec<PathBuf> = paths.filter_map(|p| p.ok()).collect();
                    matched.sort();
                    targets.extend(matched);
                }
                Err(e) => warn!("Invalid clean pattern '{}': {}", pattern, e),
            }
        }

        targets
    }
}

#[async_trait]
impl ComponentCleaner for FsComponentCleaner {
    async fn clean(
        &self,
        ctx: &InvocationContext,
        component_path: &Path,
        _config: &CliConfig,
    ) -> Result<(), StackError> {
        let targets = Self::targets(ctx, component_path);

        for target in targets {
            if ctx.dry_run {
                info!("Dry run: would delete {}", target.display());
                continue;
            }

            let result = match tokio::fs::symlink_metadata(&target).await {
                Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(&target).await,
                Ok(_) => tokio::fs::remove_file(&target).await,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => Err(e),
            };

            match result {
                Ok(()) => info!("Deleted {}", target.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(StackError::artifact(&target, e)),
            }
        }

        debug!("Cleaned {}", component_path.display());
        Ok(())
    }
}
