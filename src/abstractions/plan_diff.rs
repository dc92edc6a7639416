//! `plan-diff`: compare two terraform plans
//!
//! Both plans are rendered with `terraform show -json` and compared as JSON
//! documents. `timestamp` fields differ between any two plans and are ignored.

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::artifacts::{terraform_var_file_name, working_dir};
use crate::config::CliConfig;
use crate::context::InvocationContext;
use crate::error::StackError;
use crate::subprocess::{ShellExecutor, ShellInvocation};

const ORIG_FLAG: &str = "--orig";
const NEW_FLAG: &str = "--new";
const IGNORED_KEYS: &[&str] = &["timestamp"];

#[async_trait]
pub trait PlanDiffer: Send + Sync {
    async fn diff(
        &self,
        config: &CliConfig,
        ctx: &InvocationContext,
        env: &[String],
    ) -> Result<(), StackError>;
}

/// Parsed `plan-diff` arguments
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlanDiffArgs {
    pub orig: String,
    pub new: Option<String>,
    /// Arguments passed through to `terraform plan` for the fresh plan
    pub passthrough: Vec<String>,
}

impl PlanDiffArgs {
    pub fn parse(args: &[String]) -> Result<Self, StackError> {
        let mut parsed = PlanDiffArgs::default();
        let mut orig = None;
        let mut iter = args.iter();

        while let Some(arg) = iter.next() {
            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) => (flag, Some(value.to_string())),
                None => (arg.as_str(), None),
            };

            if flag == ORIG_FLAG || flag == NEW_FLAG {
                let value = match inline {
                    Some(value) => value,
                    None => iter.next().cloned().ok_or_else(|| {
                        StackError::invalid_invocation(format!("{flag} requires a plan file"))
                    })?,
                };
                if flag == ORIG_FLAG {
                    orig = Some(value);
                } else {
                    parsed.new = Some(value);
                }
            } else {
                parsed.passthrough.push(arg.clone());
            }
        }

        parsed.orig = orig
            .filter(|o| !o.is_empty())
            .ok_or_else(|| StackError::invalid_invocation("plan-diff requires --orig <planfile>"))?;
        Ok(parsed)
    }
}

/// A difference between two JSON documents, addressed by a dotted path
#[derive(Debug, Clone, PartialEq)]
pub struct PlanDifference {
    pub path: String,
    pub orig: Option<Value>,
    pub new: Option<Value>,
}

impl std::fmt::Display for PlanDifference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.orig, &self.new) {
            (Some(orig), Some(new)) => write!(f, "~ {}: {} => {}", self.path, orig, new),
            (Some(orig), None) => write!(f, "- {}: {}", self.path, orig),
            (None, Some(new)) => write!(f, "+ {}: {}", self.path, new),
            (None, None) => write!(f, "  {}", self.path),
        }
    }
}

fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

/// Recursively collect differences between two plan documents
pub fn compare_plans(orig: &Value, new: &Value) -> Vec<PlanDifference> {
    let mut differences = Vec::new();
    compare_at("", orig, new, &mut differences);
    differences
}

fn compare_at(path: &str, orig: &Value, new: &Value, out: &mut Vec<PlanDifference>) {
    match (orig, new) {
        (Value::Object(a), Value::Object(b)) => {
            let mut keys: Vec<&String> = a.keys().chain(b.keys()).collect();
            keys.sort();
            keys.dedup();

            for key in keys {
                if IGNORED_KEYS.contains(&key.as_str()) {
                    continue;
                }
                let child = child_path(path, key);
                match (a.get(key), b.get(key)) {
                    (Some(x), Some(y)) => compare_at(&child, x, y, out),
                    (x, y) => out.push(PlanDifference {
                        path: child,
                        orig: x.cloned(),
                        new: y.cloned(),
                    }),
                }
            }
        }
        (Value::Array(a), Value::Array(b)) => {
            for index in 0..a.len().max(b.len()) {
                let child = format!("{path}[{index}]");
                match (a.get(index), b.get(index)) {
                    (Some(x), Some(y)) => compare_at(&child, x, y, out),
                    (x, y) => out.push(PlanDifference {
                        path: child,
                        orig: x.cloned(),
                        new: y.cloned(),
                    }),
                }
            }
        }
        (a, b) if a != b => out.push(PlanDifference {
            path: path.to_string(),
            orig: Some(a.clone()),
            new: Some(b.clone()),
        }),
        _ => {}
    }
}

/// Runs `terraform show -json` on both plans and compares the output
pub struct TerraformPlanDiffer {
    shell: ShellExecutor,
}

impl TerraformPlanDiffer {
    pub fn new(shell: ShellExecutor) -> Self {
        Self { shell }
    }

    async fn render(
        &self,
        program: &str,
        plan: &Path,
        dir: &Path,
        env: &[String],
        config: &CliConfig,
    ) -> Result<Value, StackError> {
        let plan_arg = plan.to_string_lossy();
        let stdout = self
            .shell
            .capture(
                ShellInvocation::new(program, ["show", "-json", plan_arg.as_ref()])
                    .in_dir(dir)
                    .with_env(env)
                    .timeout(config.components.terraform.command_timeout),
            )
            .await?;

        serde_json::from_str(&stdout).map_err(|e| {
            StackError::plan_diff(format!(
                "could not parse the rendered plan '{}': {}",
                plan.display(),
                e
            ))
        })
    }
}

fn resolve(dir: &Path, file: &str) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        dir.join(path)
    }
}

#[async_trait]
impl PlanDiffer for TerraformPlanDiffer {
    async fn diff(
        &self,
        config: &CliConfig,
        ctx: &InvocationContext,
        env: &[String],
    ) -> Result<(), StackError> {
        let args = PlanDiffArgs::parse(&ctx.additional_args)?;
        let dir = working_dir(config, ctx);
        let program = ctx.executable(&config.components.terraform.command);

        let orig = resolve(&dir, &args.orig);
        if !ctx.dry_run && !orig.exists() {
            return Err(StackError::plan_diff(format!(
                "original plan file '{}' does not exist",
                orig.display()
            )));
        }

        // Keeps a generated plan alive until both renders are done
        let mut scratch = None;
        let new = match &args.new {
            Some(new) => resolve(&dir, new),
            None => {
                let temp = tempfile::TempDir::new()
                    .map_err(|e| StackError::plan_diff(format!("cannot create a temp dir: {e}")))?;
                let new_plan = temp.path().join("new.planfile");
                info!("Generating a new plan to compare against {}", orig.display());

                let mut plan_args = vec![
                    "plan".to_string(),
                    "-var-file".to_string(),
                    terraform_var_file_name(ctx),
                    "-out".to_string(),
                    new_plan.to_string_lossy().into_owned(),
                ];
                plan_args.extend(args.passthrough.iter().cloned());

                self.shell
                    .execute(
                        ShellInvocation::new(program, &plan_args)
                            .in_dir(&dir)
                            .with_env(env)
                            .dry_run(ctx.dry_run)
                            .timeout(config.components.terraform.command_timeout),
                    )
                    .await?;
                scratch = Some(temp);
                new_plan
            }
        };

        if ctx.dry_run {
            info!(
                "Dry run: would compare {} with {}",
                orig.display(),
                new.display()
            );
            return Ok(());
        }

        let orig_doc = self.render(program, &orig, &dir, env, config).await?;
        let new_doc = self.render(program, &new, &dir, env, config).await?;
        drop(scratch);

        let differences = compare_plans(&orig_doc, &new_doc);
        if differences.is_empty() {
            info!("The planfiles are identical");
            return Ok(());
        }

        debug!("{} plan differences found", differences.len());
        println!("Plan differences:");
        for difference in &differences {
            println!("{difference}");
        }

        Err(StackError::plan_diff(format!(
            "{} differences between '{}' and '{}'",
            differences.len(),
            orig.display(),
            new.display()
        )))
    }
}
