//! # stackctl
//!
//! Runs terraform and helmfile for a component instantiated in a stack, and
//! reads component outputs back from remote state.
//!
//! ## Modules
//!
//! - `context` - The resolved invocation for one component in one stack
//! - `gate` - Guard checks that run before anything is written or spawned
//! - `artifacts` - Var-file and plan-file naming and writing
//! - `environment` - Process environment assembly for tool invocations
//! - `workspace` - Terraform workspace selection with create-on-first-use
//! - `exec` - The terraform and helmfile orchestrators
//! - `abstractions` - Collaborator seams (policies, overrides, cleanup, plan diff, shell, terminal)
//! - `backend` - Pluggable remote state readers and state normalization
//! - `subprocess` - Process execution with a mockable runner
//! - `config` - `stackctl.yaml` loading and environment overrides
//! - `error` - Error types and codes
pub mod abstractions;
pub mod artifacts;
pub mod backend;
pub mod cli;
pub mod config;
pub mod context;
pub mod environment;
pub mod error;
pub mod exec;
pub mod gate;
pub mod subprocess;
pub mod workspace;
