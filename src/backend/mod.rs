//! Remote state read path
//!
//! A component's `backend_type` selects a [`BackendReader`] from the
//! [`BackendRegistry`]; the raw state it returns is normalized into a flat
//! output map by [`state::process_state_file`].

pub mod error;
pub mod query;
pub mod readers;
pub mod registry;
pub mod state;

pub use error::{BackendError, BackendResult};
pub use query::get_backend_variable;
pub use registry::{get_backend, BackendReader, BackendRegistry};
pub use state::{process_state_file, RawTerraformState};

use serde_json::Value;

use crate::context::Sections;

pub const BACKEND_TYPE_LOCAL: &str = "local";
pub const BACKEND_TYPE_S3: &str = "s3";

/// Output name -> value, as produced by the state normalizer
pub type NormalizedOutputs = serde_json::Map<String, Value>;

fn string_section<'a>(sections: &'a Sections, name: &str) -> &'a str {
    sections.get(name).and_then(Value::as_str).unwrap_or("")
}

/// The `workspace` section, or `""`
pub fn workspace_of(sections: &Sections) -> &str {
    string_section(sections, "workspace")
}

/// The `component` section (the terraform component folder), or `""`
pub fn component_of(sections: &Sections) -> &str {
    string_section(sections, "component")
}

/// The `backend_type` section, or `""`
pub fn backend_type_of(sections: &Sections) -> &str {
    string_section(sections, "backend_type")
}

/// The `backend` section, if it is a map
pub fn backend_of(sections: &Sections) -> Option<&serde_json::Map<String, Value>> {
    sections.get("backend").and_then(Value::as_object)
}

/// A string attribute of a backend section, or `""`
pub fn backend_attribute<'a>(backend: &'a serde_json::Map<String, Value>, attribute: &str) -> &'a str {
    backend.get(attribute).and_then(Value::as_str).unwrap_or("")
}
