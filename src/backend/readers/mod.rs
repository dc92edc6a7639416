mod local;
#[cfg(feature = "s3")]
mod s3;

pub use local::LocalBackendReader;
#[cfg(feature = "s3")]
pub use s3::S3BackendReader;

/// Workspaces that map to the backend's top-level state object
pub(crate) fn is_default_workspace(workspace: &str) -> bool {
    workspace.is_empty() || workspace == "default"
}
