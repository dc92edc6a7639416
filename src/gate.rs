//! Validation gate
//!
//! Checks run in a fixed order and stop at the first failure. The gate only
//! reads the context and probes the filesystem; it never spawns a process.

use tracing::{debug, info};

use crate::abstractions::PolicyValidator;
use crate::artifacts::component_path;
use crate::config::CliConfig;
use crate::context::{InvocationContext, ToolKind, SUBCOMMAND_CLEAN};
use crate::error::StackError;

const TERRAFORM_ABSTRACT_GUARDED: &[&str] =
    &["plan", "apply", "deploy", "destroy", "import", "workspace"];
const TERRAFORM_LOCKED_GUARDED: &[&str] = &[
    "apply", "deploy", "destroy", "import", "state", "taint", "untaint",
];
const HELMFILE_ABSTRACT_GUARDED: &[&str] = &["sync", "apply", "deploy", "destroy", "delete"];
const HELMFILE_LOCKED_GUARDED: &[&str] = &["sync", "apply", "deploy", "delete", "destroy"];

/// Result of a successful approval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Proceed,
    /// The component is disabled; the invocation ends without error
    Skip,
}

fn abstract_guarded(tool: ToolKind) -> &'static [&'static str] {
    match tool {
        ToolKind::Terraform => TERRAFORM_ABSTRACT_GUARDED,
        ToolKind::Helmfile => HELMFILE_ABSTRACT_GUARDED,
    }
}

fn locked_guarded(tool: ToolKind) -> &'static [&'static str] {
    match tool {
        ToolKind::Terraform => TERRAFORM_LOCKED_GUARDED,
        ToolKind::Helmfile => HELMFILE_LOCKED_GUARDED,
    }
}

/// Whether `sub_command` may not run against an abstract component
pub fn is_abstract_guarded(tool: ToolKind, sub_command: &str) -> bool {
    abstract_guarded(tool).contains(&sub_command)
}

/// Whether `sub_command` may not run against a locked component
pub fn is_locked_guarded(tool: ToolKind, sub_command: &str) -> bool {
    locked_guarded(tool).contains(&sub_command)
}

fn check_stack(ctx: &InvocationContext) -> Result<(), StackError> {
    let forced_clean = ctx.sub_command == SUBCOMMAND_CLEAN && ctx.force;
    if ctx.stack.is_empty() && !forced_clean {
        return Err(StackError::MissingStack {
            command: format!("{} {}", ctx.tool, ctx.command_line()),
        });
    }
    Ok(())
}

fn check_component_path(config: &CliConfig, ctx: &InvocationContext) -> Result<(), StackError> {
    if component_path(config, ctx).is_dir() {
        return Ok(());
    }

    let tool_dir = match ctx.tool {
        ToolKind::Terraform => config.terraform_dir(),
        ToolKind::Helmfile => config.helmfile_dir(),
    };
    let base_path = if ctx.component_folder_prefix.is_empty() {
        tool_dir
    } else {
        tool_dir.join(&ctx.component_folder_prefix)
    };

    Err(StackError::InvalidComponent {
        tool: ctx.tool.to_string(),
        component: ctx.component_from_arg.clone(),
        final_component: ctx.final_component.clone(),
        base_path,
    })
}

fn check_config(config: &CliConfig, tool: ToolKind) -> Result<(), StackError> {
    match tool {
        ToolKind::Terraform => config.check_terraform(),
        ToolKind::Helmfile => config.check_helmfile(),
    }
}

fn check_abstract(ctx: &InvocationContext) -> Result<(), StackError> {
    if ctx.is_abstract && is_abstract_guarded(ctx.tool, &ctx.sub_command) {
        return Err(StackError::AbstractComponent {
            component: ctx.component_from_arg.clone(),
            stack: ctx.stack.clone(),
            command: ctx.sub_command.clone(),
        });
    }
    Ok(())
}

fn check_locked(ctx: &InvocationContext) -> Result<(), StackError> {
    if ctx.locked && is_locked_guarded(ctx.tool, &ctx.sub_command) {
        return Err(StackError::LockedComponent {
            component: ctx.component_from_arg.clone(),
            stack: ctx.stack.clone(),
            command: ctx.sub_command.clone(),
        });
    }
    Ok(())
}

/// Whether the component's backend type has no notion of workspaces
pub fn workspaces_disabled(config: &CliConfig, ctx: &InvocationContext) -> bool {
    ctx.tool == ToolKind::Terraform
        && config
            .components
            .terraform
            .workspaces_disabled_backends
            .iter()
            .any(|backend| backend == &ctx.backend_type)
}

fn check_workspace_support(config: &CliConfig, ctx: &InvocationContext) -> Result<(), StackError> {
    if ctx.sub_command == "workspace" && workspaces_disabled(config, ctx) {
        return Err(StackError::UnsupportedWorkspaceOperation {
            backend_type: ctx.backend_type.clone(),
            component: ctx.component_from_arg.clone(),
            stack: ctx.stack.clone(),
        });
    }
    Ok(())
}

async fn check_policy(
    config: &CliConfig,
    ctx: &InvocationContext,
    policy: &dyn PolicyValidator,
) -> Result<(), StackError> {
    if ctx.sub_command == SUBCOMMAND_CLEAN || ctx.is_materialize_varfile() {
        return Ok(());
    }

    if !policy.validate(config, ctx).await? {
        return Err(StackError::ComponentNotValid {
            component: ctx.component_from_arg.clone(),
            stack: ctx.stack.clone(),
        });
    }
    Ok(())
}

/// Approve an invocation, or explain why it must not run
pub async fn approve(
    ctx: &InvocationContext,
    config: &CliConfig,
    policy: &dyn PolicyValidator,
) -> Result<GateDecision, StackError> {
    check_stack(ctx)?;

    if !ctx.enabled && ctx.sub_command != SUBCOMMAND_CLEAN {
        info!(
            "Component '{}' is not enabled in stack '{}', skipping",
            ctx.component_from_arg, ctx.stack
        );
        return Ok(GateDecision::Skip);
    }

    check_config(config, ctx.tool)?;
    check_component_path(config, ctx)?;
    check_abstract(ctx)?;
    check_locked(ctx)?;
    check_workspace_support(config, ctx)?;
    check_policy(config, ctx, policy).await?;

    debug!(
        "Approved `{}` for component '{}' in stack '{}'",
        ctx.command_line(),
        ctx.component_from_arg,
        ctx.stack
    );
    Ok(GateDecision::Proceed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abstractions::{AllowAllPolicy, MockPolicyValidator};
    use tempfile::TempDir;

    fn setup(tool: ToolKind) -> (TempDir, CliConfig, InvocationContext) {
        let temp = TempDir::new().unwrap();
        let config = CliConfig {
            base_path: temp.path().to_path_buf(),
            ..Default::default()
        };
        let ctx = InvocationContext {
            tool,
            sub_command: "plan".to_string(),
            component_from_arg: "vpc".to_string(),
            component: "vpc".to_string(),
            final_component: "vpc".to_string(),
            stack: "dev".to_string(),
            ..Default::default()
        };
        std::fs::create_dir_all(crate::artifacts::component_path(&config, &ctx)).unwrap();
        (temp, config, ctx)
    }

    #[tokio::test]
    async fn test_approves_plain_component() {
        let (_temp, config, ctx) = setup(ToolKind::Terraform);
        let decision = approve(&ctx, &config, &AllowAllPolicy).await.unwrap();
        assert_eq!(decision, GateDecision::Proceed);
    }

    #[tokio::test]
    async fn test_missing_stack() {
        let (_temp, config, mut ctx) = setup(ToolKind::Terraform);
        ctx.stack = String::new();
        let err = approve(&ctx, &config, &AllowAllPolicy).await.unwrap_err();
        assert!(matches!(err, StackError::MissingStack { .. }));

        ctx.sub_command = "clean".to_string();
        ctx.force = true;
        assert!(approve(&ctx, &config, &AllowAllPolicy).await.is_ok());
    }

    #[tokio::test]
    async fn test_disabled_component_is_skipped_except_clean() {
        let (_temp, config, mut ctx) = setup(ToolKind::Terraform);
        ctx.enabled = false;
        ctx.is_abstract = true;
        ctx.sub_command = "apply".to_string();
        assert_eq!(
            approve(&ctx, &config, &AllowAllPolicy).await.unwrap(),
            GateDecision::Skip
        );

        ctx.sub_command = "clean".to_string();
        assert_eq!(
            approve(&ctx, &config, &AllowAllPolicy).await.unwrap(),
            GateDecision::Proceed
        );
    }

    #[tokio::test]
    async fn test_config_is_checked_after_enabled() {
        let (_temp, mut config, mut ctx) = setup(ToolKind::Terraform);
        config.components.terraform.base_path = String::new();

        let err = approve(&ctx, &config, &AllowAllPolicy).await.unwrap_err();
        assert!(matches!(err, StackError::ConfigPrecondition { .. }));

        ctx.enabled = false;
        assert_eq!(
            approve(&ctx, &config, &AllowAllPolicy).await.unwrap(),
            GateDecision::Skip
        );
    }

    #[tokio::test]
    async fn test_missing_component_directory() {
        let (_temp, config, mut ctx) = setup(ToolKind::Terraform);
        ctx.component = "infra/eks".to_string();
        ctx.component_folder_prefix = "infra".to_string();
        ctx.final_component = "eks".to_string();

        let err = approve(&ctx, &config, &AllowAllPolicy).await.unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, StackError::InvalidComponent { .. }));
        assert!(message.contains("'eks'"));
        assert!(message.contains("components/terraform/infra"));
    }

    #[tokio::test]
    async fn test_abstract_component_guarded_subcommands() {
        let (_temp, config, mut ctx) = setup(ToolKind::Terraform);
        ctx.is_abstract = true;

        for sub_command in TERRAFORM_ABSTRACT_GUARDED {
            ctx.sub_command = sub_command.to_string();
            let err = approve(&ctx, &config, &AllowAllPolicy).await.unwrap_err();
            assert!(matches!(err, StackError::AbstractComponent { .. }));
        }

        ctx.sub_command = "show".to_string();
        assert!(approve(&ctx, &config, &AllowAllPolicy).await.is_ok());
    }

    #[tokio::test]
    async fn test_locked_component_allows_plan() {
        let (_temp, config, mut ctx) = setup(ToolKind::Terraform);
        ctx.locked = true;

        for sub_command in ["apply", "deploy", "destroy", "import"] {
            ctx.sub_command = sub_command.to_string();
            let err = approve(&ctx, &config, &AllowAllPolicy).await.unwrap_err();
            assert!(matches!(err, StackError::LockedComponent { .. }));
        }

        ctx.sub_command = "plan".to_string();
        assert!(approve(&ctx, &config, &AllowAllPolicy).await.is_ok());
    }

    #[tokio::test]
    async fn test_helmfile_sync_is_guarded() {
        let (_temp, config, mut ctx) = setup(ToolKind::Helmfile);
        ctx.sub_command = "sync".to_string();
        ctx.locked = true;
        let err = approve(&ctx, &config, &AllowAllPolicy).await.unwrap_err();
        assert!(matches!(err, StackError::LockedComponent { .. }));

        ctx.locked = false;
        ctx.is_abstract = true;
        let err = approve(&ctx, &config, &AllowAllPolicy).await.unwrap_err();
        assert!(matches!(err, StackError::AbstractComponent { .. }));

        ctx.sub_command = "diff".to_string();
        assert!(approve(&ctx, &config, &AllowAllPolicy).await.is_ok());
    }

    #[tokio::test]
    async fn test_workspace_on_http_backend() {
        let (_temp, config, mut ctx) = setup(ToolKind::Terraform);
        ctx.sub_command = "workspace".to_string();
        ctx.backend_type = "http".to_string();
        let err = approve(&ctx, &config, &AllowAllPolicy).await.unwrap_err();
        assert!(matches!(err, StackError::UnsupportedWorkspaceOperation { .. }));

        ctx.backend_type = "s3".to_string();
        assert!(approve(&ctx, &config, &AllowAllPolicy).await.is_ok());
    }

    #[tokio::test]
    async fn test_policy_rejection() {
        let (_temp, config, mut ctx) = setup(ToolKind::Terraform);
        let policy = MockPolicyValidator { verdict: false };
        let err = approve(&ctx, &config, &policy).await.unwrap_err();
        assert!(matches!(err, StackError::ComponentNotValid { .. }));

        ctx.sub_command = "varfile".to_string();
        assert!(approve(&ctx, &config, &policy).await.is_ok());
    }
}
