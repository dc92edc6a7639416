//! Command routing and execution

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info};

use crate::backend::{get_backend, get_backend_variable, BackendRegistry};
use crate::cli::args::{Cli, Commands, ToolArgs};
use crate::config::{load_config, CliConfig};
use crate::context::{Sections, ToolKind};
use crate::environment::RealEnvReader;
use crate::error::StackError;
use crate::exec::{execute_helmfile, execute_terraform, Collaborators, ExecOutcome};

/// Read a resolver document
pub async fn load_sections(path: &Path) -> Result<Sections, StackError> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        StackError::invalid_invocation(format!(
            "cannot read context file '{}': {}",
            path.display(),
            e
        ))
    })?;

    serde_yaml::from_str::<Option<Sections>>(&content)
        .map(Option::unwrap_or_default)
        .map_err(|e| {
            StackError::invalid_invocation(format!(
                "context file '{}' is not a map of component sections: {}",
                path.display(),
                e
            ))
        })
}

/// Execute a CLI command based on the parsed arguments
pub async fn execute_command(cli: Cli) -> Result<()> {
    let config = load_config(&RealEnvReader, cli.config).await?;
    debug!("Using base path {}", config.base_path.display());

    match cli.command {
        Commands::Terraform(args) => run_tool(ToolKind::Terraform, args, &config).await,
        Commands::Helmfile(args) => run_tool(ToolKind::Helmfile, args, &config).await,
        Commands::State { context, output } => run_state(&context, output.as_deref(), &config).await,
    }
}

async fn run_tool(tool: ToolKind, args: ToolArgs, config: &CliConfig) -> Result<()> {
    let sections = match &args.context {
        Some(path) => load_sections(path).await?,
        None => Sections::new(),
    };
    let ctx = args.into_context(tool, sections)?;
    let description = format!("{} {}", tool, ctx.command_line());
    let component = ctx.component_from_arg.clone();

    let collaborators = Collaborators::production();
    let outcome = match tool {
        ToolKind::Terraform => execute_terraform(ctx, config, &collaborators).await,
        ToolKind::Helmfile => execute_helmfile(ctx, config, &collaborators).await,
    }
    .with_context(|| format!("`{description}` failed for component '{component}'"))?;

    if let ExecOutcome::Completed { sub_command } = outcome {
        debug!("{} {} finished", tool, sub_command);
    }
    Ok(())
}

async fn run_state(context: &Path, output: Option<&str>, config: &CliConfig) -> Result<()> {
    let sections = load_sections(context).await?;
    let registry = BackendRegistry::with_defaults();

    let Some(outputs) = get_backend(&registry, config, &sections)
        .await
        .map_err(StackError::from)?
    else {
        info!("No state found for component in {}", context.display());
        return Ok(());
    };

    let value = match output {
        Some(expression) => {
            get_backend_variable(&outputs, expression).map_err(StackError::from)?
        }
        None => serde_json::Value::Object(outputs),
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&value).map_err(StackError::from)?
    );
    Ok(())
}
