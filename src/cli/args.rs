//! CLI argument structures

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::abstractions::cleanup::SKIP_LOCK_FILE_FLAG;
use crate::context::{InvocationContext, Sections, ToolKind};
use crate::error::StackError;

/// Run terraform and helmfile against resolved stack components
#[derive(Parser, Debug)]
#[command(name = "stackctl")]
#[command(about = "stackctl - Orchestrate terraform and helmfile for components in stacks", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to stackctl.yaml
    #[arg(short = 'c', long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a terraform subcommand for a component
    Terraform(ToolArgs),

    /// Run a helmfile subcommand for a component
    Helmfile(ToolArgs),

    /// Print a component's outputs from its terraform state
    State {
        /// Resolved component sections (YAML or JSON)
        #[arg(long, value_name = "FILE")]
        context: PathBuf,

        /// Output to print, e.g. `vpc_id` or `.subnets[0]`
        output: Option<String>,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct ToolArgs {
    /// <SUBCOMMAND> [SUBCOMMAND2] [COMPONENT]
    #[arg(required = true, num_args = 1..=3, value_name = "ARGS")]
    pub positionals: Vec<String>,

    /// Stack the component is instantiated in
    #[arg(short = 's', long)]
    pub stack: Option<String>,

    /// Resolved component sections (YAML or JSON)
    #[arg(long, value_name = "FILE")]
    pub context: Option<PathBuf>,

    /// Print what would run without running it
    #[arg(long)]
    pub dry_run: bool,

    /// Do not run `terraform init` first
    #[arg(long)]
    pub skip_init: bool,

    /// Apply the previously generated plan
    #[arg(long)]
    pub from_plan: bool,

    /// Plan file to apply instead of the generated one
    #[arg(long, value_name = "FILE")]
    pub planfile: Option<String>,

    /// Send the tool's stderr to a file, /dev/stdout or /dev/null
    #[arg(long, value_name = "TARGET")]
    pub redirect_stderr: Option<String>,

    /// Helmfile options placed before the subcommand, e.g. "--no-color --namespace=test"
    #[arg(long, allow_hyphen_values = true, value_name = "OPTIONS")]
    pub global_options: Option<String>,

    /// `clean` without resolving a stack
    #[arg(long)]
    pub force: bool,

    /// `clean` keeps .terraform.lock.hcl
    #[arg(long)]
    pub skip_lock_file: bool,

    /// Arguments passed to the tool as-is
    #[arg(last = true)]
    pub extra: Vec<String>,
}

impl ToolArgs {
    /// `(subcommand, subcommand2, component)`
    pub fn split_positionals(&self) -> (String, String, String) {
        let get = |i: usize| self.positionals.get(i).cloned().unwrap_or_default();
        match self.positionals.len() {
            3 => (get(0), get(1), get(2)),
            _ => (get(0), String::new(), get(1)),
        }
    }

    /// Combine the command line with the resolved component sections
    pub fn into_context(
        self,
        tool: ToolKind,
        sections: Sections,
    ) -> Result<InvocationContext, StackError> {
        let (sub_command, sub_command2, component) = self.split_positionals();
        let stack = self.stack.clone().unwrap_or_default();

        let mut ctx = InvocationContext::from_sections(tool, &component, &stack, sections)?;
        ctx.sub_command = sub_command;
        ctx.sub_command2 = sub_command2;
        ctx.dry_run = self.dry_run;
        ctx.skip_init = self.skip_init;
        ctx.use_plan = self.from_plan || self.planfile.is_some();
        ctx.plan_file = self.planfile;
        ctx.redirect_stderr = self.redirect_stderr;
        ctx.force = self.force;

        if let Some(options) = self.global_options {
            ctx.global_options = shell_words::split(&options).map_err(|e| {
                StackError::invalid_invocation(format!("cannot parse --global-options: {e}"))
            })?;
        }

        ctx.additional_args = self.extra;
        if self.skip_lock_file {
            ctx.additional_args.push(SKIP_LOCK_FILE_FLAG.to_string());
        }

        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    fn tool_args(cli: Cli) -> ToolArgs {
        match cli.command {
            Commands::Terraform(args) | Commands::Helmfile(args) => args,
            Commands::State { .. } => panic!("expected a tool command"),
        }
    }

    #[test]
    fn test_parse_terraform_plan() {
        let cli = parse(&[
            "stackctl", "-vv", "terraform", "plan", "vpc", "-s", "dev", "--", "-lock=false",
        ]);
        assert_eq!(cli.verbose, 2);

        let ctx = tool_args(cli)
            .into_context(ToolKind::Terraform, Sections::new())
            .unwrap();
        assert_eq!(ctx.sub_command, "plan");
        assert_eq!(ctx.sub_command2, "");
        assert_eq!(ctx.component, "vpc");
        assert_eq!(ctx.stack, "dev");
        assert_eq!(ctx.additional_args, vec!["-lock=false"]);
    }

    #[test]
    fn test_parse_subcommand2() {
        let cli = parse(&["stackctl", "terraform", "workspace", "list", "vpc", "-s", "dev"]);
        let (sub, sub2, component) = tool_args(cli).split_positionals();
        assert_eq!((sub.as_str(), sub2.as_str(), component.as_str()), ("workspace", "list", "vpc"));
    }

    #[test]
    fn test_planfile_implies_from_plan() {
        let cli = parse(&[
            "stackctl", "terraform", "apply", "vpc", "-s", "dev", "--planfile", "reviewed.planfile",
        ]);
        let ctx = tool_args(cli)
            .into_context(ToolKind::Terraform, Sections::new())
            .unwrap();
        assert!(ctx.use_plan);
        assert_eq!(ctx.plan_file.as_deref(), Some("reviewed.planfile"));
    }

    #[test]
    fn test_global_options_are_split() {
        let cli = parse(&[
            "stackctl",
            "helmfile",
            "diff",
            "echo-server",
            "-s",
            "dev",
            "--global-options",
            "--no-color --namespace 'test ns'",
        ]);
        let ctx = tool_args(cli)
            .into_context(ToolKind::Helmfile, Sections::new())
            .unwrap();
        assert_eq!(ctx.global_options, vec!["--no-color", "--namespace", "test ns"]);
    }

    #[test]
    fn test_version_needs_no_component() {
        let cli = parse(&["stackctl", "terraform", "version"]);
        let (sub, _, component) = tool_args(cli).split_positionals();
        assert_eq!(sub, "version");
        assert!(component.is_empty());
    }
}
