//! Registry-backed encoders and decoders with per-key build caching.
//!
//! The caches store shared build futures rather than finished codecs: the
//! first caller for a subject or id starts the build, concurrent callers
//! attach to it, and the registry sees at most one lookup or registration
//! per key for the adapter's lifetime. A failed build stays cached, so every
//! later caller observes the same failure.

use super::registry::{RegistryError, SchemaRegistry};
use super::{read_wire_header, WireSerializer, WIRE_HEADER_LEN};
use crate::codec::BinaryDeserializer;
use crate::error::{AvrokitErr, AvrokitResult};
use crate::resolver::{infer_schema, TypeResolution};
use crate::value::Value;
use crate::Schema;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;

type BuildResult<T> = Result<Arc<T>, Arc<AvrokitErr>>;
type BuildFuture<T> = Shared<BoxFuture<'static, BuildResult<T>>>;

/// Whether a payload is the key or the value of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectRole {
    Key,
    Value,
}

impl fmt::Display for SubjectRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectRole::Key => write!(f, "key"),
            SubjectRole::Value => write!(f, "value"),
        }
    }
}

/// How subjects are derived from topics.
#[derive(Debug, Clone)]
pub enum SubjectNameStrategy {
    /// `{topic}-{key|value}`, the common default.
    TopicName,
    /// A fixed record fullname, independent of the topic.
    RecordName(String),
    /// `{topic}-{record fullname}`.
    TopicRecordName(String),
}

impl SubjectNameStrategy {
    pub fn subject(&self, topic: &str, role: SubjectRole) -> String {
        match self {
            SubjectNameStrategy::TopicName => format!("{}-{}", topic, role),
            SubjectNameStrategy::RecordName(record) => record.clone(),
            SubjectNameStrategy::TopicRecordName(record) => format!("{}-{}", topic, record),
        }
    }
}

/// Builds a wire serializer against the schema the registry holds for `id`.
pub async fn wire_serializer_for_id<C: SchemaRegistry>(
    client: &C,
    id: i32,
    resolution: &TypeResolution,
) -> AvrokitResult<WireSerializer> {
    let json = client.schema_by_id(id).await?;
    let schema = Schema::from_str(&json)?;
    WireSerializer::new(id, &schema, resolution)
}

/// Builds a wire serializer against a subject's schema: the latest version,
/// or a specific one.
pub async fn wire_serializer_for_subject<C: SchemaRegistry>(
    client: &C,
    subject: &str,
    version: Option<i32>,
    resolution: &TypeResolution,
) -> AvrokitResult<WireSerializer> {
    let (id, json) = subject_schema(client, subject, version).await?;
    let schema = Schema::from_str(&json)?;
    WireSerializer::new(id, &schema, resolution)
}

/// Builds a wire deserializer bound to `id` and the schema registered under
/// it. Without a resolution the decoding is schema-driven.
pub async fn wire_deserializer_for_id<C: SchemaRegistry>(
    client: &C,
    id: i32,
    resolution: Option<&TypeResolution>,
) -> AvrokitResult<super::WireDeserializer> {
    let json = client.schema_by_id(id).await?;
    let schema = Schema::from_str(&json)?;
    match resolution {
        Some(r) => super::WireDeserializer::new(id, &schema, r),
        None => super::WireDeserializer::natural(id, &schema),
    }
}

/// Builds a wire deserializer bound to the id a subject's schema carries.
pub async fn wire_deserializer_for_subject<C: SchemaRegistry>(
    client: &C,
    subject: &str,
    version: Option<i32>,
    resolution: Option<&TypeResolution>,
) -> AvrokitResult<super::WireDeserializer> {
    let (id, json) = subject_schema(client, subject, version).await?;
    let schema = Schema::from_str(&json)?;
    match resolution {
        Some(r) => super::WireDeserializer::new(id, &schema, r),
        None => super::WireDeserializer::natural(id, &schema),
    }
}

async fn subject_schema<C: SchemaRegistry>(
    client: &C,
    subject: &str,
    version: Option<i32>,
) -> Result<(i32, String), RegistryError> {
    match version {
        None => {
            let latest = client.latest_schema(subject).await?;
            Ok((latest.id, latest.schema))
        }
        Some(version) => {
            let json = client.schema_by_version(subject, version).await?;
            let id = client.schema_id(subject, &json).await?;
            Ok((id, json))
        }
    }
}

/// Serializes values of one host type against registry-managed schemas,
/// caching one compiled serializer per subject.
pub struct RegistryEncoder<C: SchemaRegistry + 'static> {
    client: Arc<C>,
    resolution: Arc<TypeResolution>,
    strategy: SubjectNameStrategy,
    auto_register: bool,
    cache: Mutex<HashMap<String, BuildFuture<WireSerializer>>>,
}

impl<C: SchemaRegistry + 'static> RegistryEncoder<C> {
    pub fn new(client: Arc<C>, resolution: TypeResolution) -> Self {
        RegistryEncoder {
            client,
            resolution: Arc::new(resolution),
            strategy: SubjectNameStrategy::TopicName,
            auto_register: false,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_strategy(mut self, strategy: SubjectNameStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Registers a schema inferred from the resolution when the subject has
    /// none, or when its latest schema cannot encode the host type.
    pub fn with_auto_register(mut self, enabled: bool) -> Self {
        self.auto_register = enabled;
        self
    }

    /// The compiled serializer for a topic and role. The build for each
    /// subject runs at most once; concurrent callers share it.
    pub async fn serializer(
        &self,
        topic: &str,
        role: SubjectRole,
    ) -> AvrokitResult<Arc<WireSerializer>> {
        let subject = self.strategy.subject(topic, role);
        let build = {
            let mut cache = self.cache.lock().await;
            cache
                .entry(subject.clone())
                .or_insert_with(|| {
                    build_serializer(
                        self.client.clone(),
                        self.resolution.clone(),
                        subject,
                        self.auto_register,
                    )
                    .boxed()
                    .shared()
                })
                .clone()
        };
        build.await.map_err(AvrokitErr::SharedBuild)
    }

    /// Encodes one value into a wire payload for the topic.
    pub async fn serialize(
        &self,
        topic: &str,
        role: SubjectRole,
        value: &Value,
    ) -> AvrokitResult<Vec<u8>> {
        let serializer = self.serializer(topic, role).await?;
        serializer.to_bytes(value)
    }
}

// Recoverable only with auto registration: the subject's schema cannot be
// paired with the host type.
fn is_incompatible(err: &AvrokitErr) -> bool {
    matches!(
        err,
        AvrokitErr::UnsupportedType(_)
            | AvrokitErr::ResolutionMismatch { .. }
            | AvrokitErr::ResolvedNameMismatch { .. }
    )
}

async fn build_serializer<C: SchemaRegistry>(
    client: Arc<C>,
    resolution: Arc<TypeResolution>,
    subject: String,
    auto_register: bool,
) -> BuildResult<WireSerializer> {
    match client.latest_schema(&subject).await {
        Ok(latest) => {
            let schema = Schema::from_str(&latest.schema).map_err(Arc::new)?;
            match WireSerializer::new(latest.id, &schema, &resolution) {
                Ok(serializer) => Ok(Arc::new(serializer)),
                Err(err) if auto_register && is_incompatible(&err) => {
                    log::debug!(
                        "latest schema for `{}` is incompatible ({}), registering a new one",
                        subject,
                        err
                    );
                    register_inferred(client, resolution, subject).await
                }
                Err(err) => Err(Arc::new(err)),
            }
        }
        Err(err) if auto_register && err.is_subject_not_found() => {
            register_inferred(client, resolution, subject).await
        }
        Err(err) => Err(Arc::new(AvrokitErr::Registry(err))),
    }
}

async fn register_inferred<C: SchemaRegistry>(
    client: Arc<C>,
    resolution: Arc<TypeResolution>,
    subject: String,
) -> BuildResult<WireSerializer> {
    let schema = infer_schema(&resolution).map_err(Arc::new)?;
    let json = schema.to_json(false).map_err(Arc::new)?;
    let id = client
        .register_schema(&subject, &json)
        .await
        .map_err(|e| Arc::new(AvrokitErr::Registry(e)))?;
    log::info!("registered schema id {} for subject `{}`", id, subject);
    WireSerializer::new(id, &schema, &resolution)
        .map(Arc::new)
        .map_err(Arc::new)
}

/// Deserializes wire payloads against registry-managed schemas, caching one
/// compiled decoder per schema id.
pub struct RegistryDecoder<C: SchemaRegistry + 'static> {
    client: Arc<C>,
    resolution: Option<Arc<TypeResolution>>,
    cache: Mutex<HashMap<i32, BuildFuture<BinaryDeserializer>>>,
}

impl<C: SchemaRegistry + 'static> RegistryDecoder<C> {
    /// A decoder that produces schema-shaped values.
    pub fn new(client: Arc<C>) -> Self {
        RegistryDecoder {
            client,
            resolution: None,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// A decoder that populates the host type described by `resolution`,
    /// skipping writer fields the host type does not carry.
    pub fn with_resolution(client: Arc<C>, resolution: TypeResolution) -> Self {
        RegistryDecoder {
            client,
            resolution: Some(Arc::new(resolution)),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// The compiled decoder for a schema id. The build for each id runs at
    /// most once; concurrent callers share it, and failures stay cached.
    pub async fn deserializer(&self, id: i32) -> AvrokitResult<Arc<BinaryDeserializer>> {
        let build = {
            let mut cache = self.cache.lock().await;
            cache
                .entry(id)
                .or_insert_with(|| {
                    build_deserializer(self.client.clone(), self.resolution.clone(), id)
                        .boxed()
                        .shared()
                })
                .clone()
        };
        build.await.map_err(AvrokitErr::SharedBuild)
    }

    /// Decodes one wire payload using the schema its header names.
    pub async fn deserialize(&self, payload: &[u8]) -> AvrokitResult<Value> {
        let id = read_wire_header(payload)?;
        let deserializer = self.deserializer(id).await?;
        let mut body = &payload[WIRE_HEADER_LEN..];
        deserializer.deserialize(&mut body)
    }
}

async fn build_deserializer<C: SchemaRegistry>(
    client: Arc<C>,
    resolution: Option<Arc<TypeResolution>>,
    id: i32,
) -> BuildResult<BinaryDeserializer> {
    let json = client
        .schema_by_id(id)
        .await
        .map_err(|e| Arc::new(AvrokitErr::Registry(e)))?;
    let schema = Schema::from_str(&json).map_err(Arc::new)?;
    let deserializer = match resolution {
        Some(r) => BinaryDeserializer::compile(&schema, &r),
        None => BinaryDeserializer::natural(&schema),
    };
    deserializer.map(Arc::new).map_err(Arc::new)
}
