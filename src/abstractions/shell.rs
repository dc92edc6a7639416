//! Interactive shell in a component's context

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::environment::EnvReader;
use crate::error::StackError;
use crate::subprocess::{ShellExecutor, ShellInvocation};

pub const ENV_SHELL_WORKSPACE: &str = "STACKCTL_SHELL_WORKSPACE";
const DEFAULT_SHELL: &str = "bash";

/// Terraform subcommands that get the var file through `TF_CLI_ARGS_*`
const VAR_FILE_COMMANDS: &[&str] = &["plan", "apply", "refresh", "import", "destroy", "console"];

/// Everything the shell needs to behave like the component's terraform
#[derive(Debug, Clone, Default)]
pub struct ShellRequest {
    pub component: String,
    pub stack: String,
    pub working_dir: PathBuf,
    pub env: Vec<String>,
    pub var_file: String,
    pub workspace: String,
    pub dry_run: bool,
}

impl ShellRequest {
    /// The assembled environment plus the shell-specific variables
    pub fn shell_env(&self) -> Vec<String> {
        let mut env = self.env.clone();
        for command in VAR_FILE_COMMANDS {
            env.push(format!("TF_CLI_ARGS_{command}=-var-file={}", self.var_file));
        }
        env.push(format!("{ENV_SHELL_WORKSPACE}={}", self.workspace));
        env.push(format!("PS1=({} @ {}) $ ", self.component, self.stack));
        env
    }
}

#[async_trait]
pub trait ShellLauncher: Send + Sync {
    async fn launch(&self, request: ShellRequest) -> Result<(), StackError>;
}

/// Runs `$SHELL` (or bash) attached to the terminal
pub struct InteractiveShellLauncher {
    shell: ShellExecutor,
    env: Arc<dyn EnvReader>,
}

impl InteractiveShellLauncher {
    pub fn new(shell: ShellExecutor, env: Arc<dyn EnvReader>) -> Self {
        Self { shell, env }
    }

    fn program(&self) -> String {
        self.env
            .non_empty("SHELL")
            .unwrap_or_else(|| DEFAULT_SHELL.to_string())
    }
}

#[async_trait]
impl ShellLauncher for InteractiveShellLauncher {
    async fn launch(&self, request: ShellRequest) -> Result<(), StackError> {
        let program = self.program();
        info!(
            "Starting a new interactive shell for component '{}' in stack '{}' (workspace '{}')",
            request.component, request.stack, request.workspace
        );
        info!("Type 'exit' to return");

        self.shell
            .execute_interactive(
                ShellInvocation::new(&program, Vec::<String>::new())
                    .in_dir(&request.working_dir)
                    .with_env(&request.shell_env())
                    .dry_run(request.dry_run),
            )
            .await?;

        info!("Exited the shell for component '{}'", request.component);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::MockEnvReader;
    use crate::subprocess::{OutputMode, SubprocessManager};

    fn request() -> ShellRequest {
        ShellRequest {
            component: "vpc".to_string(),
            stack: "dev".to_string(),
            working_dir: PathBuf::from("/tmp/components/terraform/vpc"),
            env: vec!["TF_IN_AUTOMATION=true".to_string()],
            var_file: "dev-vpc.terraform.tfvars.json".to_string(),
            workspace: "dev".to_string(),
            dry_run: false,
        }
    }

    #[test]
    fn test_shell_env() {
        let env = request().shell_env();
        assert_eq!(env[0], "TF_IN_AUTOMATION=true");
        assert!(env.contains(&"TF_CLI_ARGS_plan=-var-file=dev-vpc.terraform.tfvars.json".to_string()));
        assert!(env.contains(&"TF_CLI_ARGS_console=-var-file=dev-vpc.terraform.tfvars.json".to_string()));
        assert!(env.contains(&"STACKCTL_SHELL_WORKSPACE=dev".to_string()));
    }

    #[tokio::test]
    async fn test_launch_uses_shell_variable() {
        let (subprocess, mut mock) = SubprocessManager::mock();
        mock.expect_command("/bin/zsh").finish();
        let launcher = InteractiveShellLauncher::new(
            subprocess.shell(),
            Arc::new(MockEnvReader::new().with_env("SHELL", "/bin/zsh")),
        );

        launcher.launch(request()).await.unwrap();

        let calls = mock.get_call_history();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].output, OutputMode::Interactive);
        assert_eq!(calls[0].env.get("STACKCTL_SHELL_WORKSPACE"), Some(&"dev".to_string()));
    }

    #[tokio::test]
    async fn test_falls_back_to_bash() {
        let (subprocess, mut mock) = SubprocessManager::mock();
        mock.expect_command("bash").finish();
        let launcher = InteractiveShellLauncher::new(subprocess.shell(), Arc::new(MockEnvReader::new()));

        launcher.launch(request()).await.unwrap();
        assert!(mock.verify_called("bash", 1));
    }
}
