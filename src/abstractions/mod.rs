//! Collaborator seams used by the orchestrator
//!
//! Each trait has one production implementation; tests substitute their own.

pub mod cleanup;
pub mod generators;
pub mod plan_diff;
pub mod policy;
pub mod shell;
pub mod terminal;

pub use cleanup::{ComponentCleaner, FsComponentCleaner};
pub use generators::{OverrideGenerator, TerraformJsonGenerator};
pub use plan_diff::{PlanDiffer, TerraformPlanDiffer};
pub use policy::{AllowAllPolicy, MockPolicyValidator, PolicyValidator};
pub use shell::{InteractiveShellLauncher, ShellLauncher, ShellRequest};
pub use terminal::{FixedTerminal, StdinTerminal, TerminalProbe};
