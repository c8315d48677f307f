//! The schema-registry client contract. The HTTP transport lives outside
//! this crate; the adapter only depends on this trait.

use async_trait::async_trait;

/// Error code a registry returns when a subject or version does not exist.
pub const ERROR_CODE_SUBJECT_NOT_FOUND: i32 = 40401;

/// A schema as the registry stores it: its global id, the version under the
/// subject it was fetched through, and the schema JSON.
#[derive(Debug, Clone)]
pub struct RegisteredSchema {
    pub id: i32,
    pub version: i32,
    pub schema: String,
}

/// Errors surfaced by a registry client.
#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
    /// An error response from the registry API, carrying its error code.
    #[error("registry error {code}: {message}")]
    Api { code: i32, message: String },
    /// A transport-level failure (connection, timeout, malformed response).
    #[error("registry transport failed: {0}")]
    Transport(String),
}

impl RegistryError {
    /// The subject or version does not exist.
    pub fn is_subject_not_found(&self) -> bool {
        matches!(
            self,
            RegistryError::Api {
                code: ERROR_CODE_SUBJECT_NOT_FOUND,
                ..
            }
        )
    }
}

/// A client that resolves ids and subjects to schema JSON and registers new
/// schemas. Implementations are expected to supply their own transport
/// timeouts.
#[async_trait]
pub trait SchemaRegistry: Send + Sync {
    /// Resolves a schema id to its schema JSON.
    async fn schema_by_id(&self, id: i32) -> Result<String, RegistryError>;

    /// Resolves a subject to its latest registered schema.
    async fn latest_schema(&self, subject: &str) -> Result<RegisteredSchema, RegistryError>;

    /// Resolves a specific version of a subject to its schema JSON.
    async fn schema_by_version(&self, subject: &str, version: i32)
        -> Result<String, RegistryError>;

    /// Looks up the id of a schema already registered under a subject.
    async fn schema_id(&self, subject: &str, schema: &str) -> Result<i32, RegistryError>;

    /// Registers a schema under a subject, returning its id.
    async fn register_schema(&self, subject: &str, schema: &str) -> Result<i32, RegistryError>;
}
