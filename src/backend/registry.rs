//! Backend type -> state reader registry

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::error::{BackendError, BackendResult};
use super::state::process_state_file;
use super::{backend_type_of, NormalizedOutputs, BACKEND_TYPE_LOCAL};
use crate::config::CliConfig;
use crate::context::Sections;

/// Reads the raw state document for one backend type
#[async_trait]
pub trait BackendReader: Send + Sync {
    /// The `backend_type` tag this reader serves
    fn backend_type(&self) -> &str;

    /// Fetch the raw state bytes; empty when no state has been written yet
    async fn read_state(&self, config: &CliConfig, sections: &Sections) -> BackendResult<Vec<u8>>;
}

/// Maps backend type tags to readers
///
/// Populated once at startup; adding a backend means registering a reader.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    readers: HashMap<String, Arc<dyn BackendReader>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every reader compiled into this build
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(super::readers::LocalBackendReader));
        #[cfg(feature = "s3")]
        registry.register(Arc::new(super::readers::S3BackendReader::default()));
        registry
    }

    /// Register a reader, replacing any previous one for the same type
    pub fn register(&mut self, reader: Arc<dyn BackendReader>) {
        let backend_type = reader.backend_type().to_string();
        debug!("Registering state reader for backend type '{}'", backend_type);
        self.readers.insert(backend_type, reader);
    }

    pub fn lookup(&self, backend_type: &str) -> Option<Arc<dyn BackendReader>> {
        self.readers.get(backend_type).cloned()
    }

    pub fn supported_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.readers.keys().cloned().collect();
        types.sort();
        types
    }
}

/// Read and normalize the outputs of a component's remote state
///
/// The backend type comes from the `backend_type` section and defaults to
/// `local`. State is read on every call; nothing is cached.
pub async fn get_backend(
    registry: &BackendRegistry,
    config: &CliConfig,
    sections: &Sections,
) -> BackendResult<Option<NormalizedOutputs>> {
    let backend_type = match backend_type_of(sections) {
        "" => BACKEND_TYPE_LOCAL,
        other => other,
    };

    let reader =
        registry
            .lookup(backend_type)
            .ok_or_else(|| BackendError::UnsupportedBackendType {
                backend_type: backend_type.to_string(),
                supported: registry.supported_types(),
            })?;

    debug!("Reading state through the '{}' backend", backend_type);
    let content = reader.read_state(config, sections).await?;
    process_state_file(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticReader {
        backend_type: &'static str,
        content: &'static [u8],
        reads: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl BackendReader for StaticReader {
        fn backend_type(&self) -> &str {
            self.backend_type
        }

        async fn read_state(&self, _config: &CliConfig, _sections: &Sections) -> BackendResult<Vec<u8>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.content.to_vec())
        }
    }

    fn sections(value: serde_json::Value) -> Sections {
        match value {
            serde_json::Value::Object(map) => map,
            _ => Sections::new(),
        }
    }

    #[tokio::test]
    async fn test_unregistered_type_is_rejected() {
        let registry = BackendRegistry::new();
        let err = get_backend(
            &registry,
            &CliConfig::default(),
            &sections(json!({"backend_type": "gcs"})),
        )
        .await
        .unwrap_err();

        match err {
            BackendError::UnsupportedBackendType { backend_type, .. } => {
                assert_eq!(backend_type, "gcs")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_type_defaults_to_local() {
        let reads = Arc::new(AtomicUsize::new(0));
        let mut registry = BackendRegistry::new();
        registry.register(Arc::new(StaticReader {
            backend_type: "local",
            content: br#"{"outputs": {"vpc_id": {"value": "vpc-123", "type": "string"}}}"#,
            reads: Arc::clone(&reads),
        }));

        let outputs = get_backend(&registry, &CliConfig::default(), &Sections::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outputs["vpc_id"], json!("vpc-123"));

        // State is never cached between calls
        get_backend(&registry, &CliConfig::default(), &Sections::new())
            .await
            .unwrap();
        assert_eq!(reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_registering_replaces_reader() {
        let mut registry = BackendRegistry::new();
        for content in [b"{}".as_slice(), b"".as_slice()] {
            registry.register(Arc::new(StaticReader {
                backend_type: "s3",
                content,
                reads: Arc::new(AtomicUsize::new(0)),
            }));
        }

        assert_eq!(registry.supported_types(), vec!["s3"]);
        let outputs = get_backend(
            &registry,
            &CliConfig::default(),
            &sections(json!({"backend_type": "s3"})),
        )
        .await
        .unwrap();
        assert!(outputs.is_none());
    }

    #[test]
    fn test_defaults_include_local() {
        let registry = BackendRegistry::with_defaults();
        assert!(registry.lookup("local").is_some());
        assert!(registry.supported_types().contains(&"local".to_string()));
    }
}
