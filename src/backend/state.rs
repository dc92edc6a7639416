//! Terraform state document parsing

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use super::error::{BackendError, BackendResult};
use super::NormalizedOutputs;

/// A raw Terraform state file
///
/// Only `outputs` is interpreted; the remaining fields are carried as-is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTerraformState {
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub terraform_version: String,
    #[serde(default)]
    pub outputs: HashMap<String, RawOutput>,
    #[serde(default)]
    pub resources: Option<Value>,
}

/// One entry of the state's `outputs` map
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawOutput {
    #[serde(default)]
    pub value: Value,
    #[serde(default, rename = "type")]
    pub output_type: Value,
}

/// Parse raw state bytes into a flat output name -> value map
///
/// Empty input means no state has been written yet and yields `Ok(None)`.
pub fn process_state_file(data: &[u8]) -> BackendResult<Option<NormalizedOutputs>> {
    if data.is_empty() {
        return Ok(None);
    }

    let raw: RawTerraformState = serde_json::from_slice(data).map_err(BackendError::StateParse)?;

    tracing::trace!(
        "Parsed state version {} written by terraform {} with {} outputs",
        raw.version,
        raw.terraform_version,
        raw.outputs.len()
    );

    Ok(Some(
        raw.outputs
            .into_iter()
            .map(|(name, output)| (name, output.value))
            .collect(),
    ))
}
