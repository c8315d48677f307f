//! The registry-backed adapters: subject derivation, auto-registration and
//! at-most-once build semantics under concurrency.

use async_trait::async_trait;
use avrokit::resolver::{Resolver, TypeDescriptor};
use avrokit::wire::{
    read_wire_header, RegisteredSchema, RegistryDecoder, RegistryEncoder, RegistryError,
    SchemaRegistry, SubjectRole, ERROR_CODE_SUBJECT_NOT_FOUND,
};
use avrokit::{to_value, TypeResolution, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// An in-memory registry that counts lookups and registrations.
struct MockRegistry {
    schemas: Mutex<HashMap<String, RegisteredSchema>>,
    next_id: AtomicUsize,
    register_calls: AtomicUsize,
    latest_calls: AtomicUsize,
}

impl MockRegistry {
    fn new() -> Self {
        MockRegistry {
            schemas: Mutex::new(HashMap::new()),
            next_id: AtomicUsize::new(1),
            register_calls: AtomicUsize::new(0),
            latest_calls: AtomicUsize::new(0),
        }
    }

    fn with_subject(self, subject: &str, schema: &str) -> Self {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) as i32;
        self.schemas.lock().unwrap().insert(
            subject.to_string(),
            RegisteredSchema {
                id,
                version: 1,
                schema: schema.to_string(),
            },
        );
        self
    }
}

#[async_trait]
impl SchemaRegistry for MockRegistry {
    async fn schema_by_id(&self, id: i32) -> Result<String, RegistryError> {
        self.schemas
            .lock()
            .unwrap()
            .values()
            .find(|r| r.id == id)
            .map(|r| r.schema.clone())
            .ok_or(RegistryError::Api {
                code: ERROR_CODE_SUBJECT_NOT_FOUND,
                message: format!("schema id {} not found", id),
            })
    }

    async fn latest_schema(&self, subject: &str) -> Result<RegisteredSchema, RegistryError> {
        self.latest_calls.fetch_add(1, Ordering::SeqCst);
        self.schemas
            .lock()
            .unwrap()
            .get(subject)
            .cloned()
            .ok_or(RegistryError::Api {
                code: ERROR_CODE_SUBJECT_NOT_FOUND,
                message: format!("subject {} not found", subject),
            })
    }

    async fn schema_by_version(
        &self,
        subject: &str,
        _version: i32,
    ) -> Result<String, RegistryError> {
        self.latest_schema(subject).await.map(|r| r.schema)
    }

    async fn schema_id(&self, subject: &str, _schema: &str) -> Result<i32, RegistryError> {
        self.latest_schema(subject).await.map(|r| r.id)
    }

    async fn register_schema(&self, subject: &str, schema: &str) -> Result<i32, RegistryError> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) as i32;
        self.schemas.lock().unwrap().insert(
            subject.to_string(),
            RegisteredSchema {
                id,
                version: 1,
                schema: schema.to_string(),
            },
        );
        Ok(id)
    }
}

fn int_resolution() -> TypeResolution {
    Resolver::new()
        .resolve(&TypeDescriptor::Integer {
            size: 4,
            signed: true,
        })
        .unwrap()
}

#[tokio::test]
async fn serializes_against_registered_schema() {
    let registry = Arc::new(MockRegistry::new().with_subject("t-value", r##""int""##));
    let encoder = RegistryEncoder::new(registry.clone(), int_resolution());

    let payload = encoder
        .serialize("t", SubjectRole::Value, &Value::Int(5))
        .await
        .unwrap();
    assert_eq!(read_wire_header(&payload).unwrap(), 1);
    assert_eq!(payload[5..], [0x0a]);

    // the compiled serializer is cached per subject
    let _ = encoder
        .serialize("t", SubjectRole::Value, &Value::Int(6))
        .await
        .unwrap();
    assert_eq!(registry.latest_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn auto_registers_when_subject_is_missing() {
    let registry = Arc::new(MockRegistry::new());
    let encoder =
        RegistryEncoder::new(registry.clone(), int_resolution()).with_auto_register(true);

    let payload = encoder
        .serialize("t", SubjectRole::Value, &Value::Int(1))
        .await
        .unwrap();

    assert_eq!(registry.register_calls.load(Ordering::SeqCst), 1);
    let registered = registry.schemas.lock().unwrap()["t-value"].clone();
    assert_eq!(registered.schema, r##""int""##);
    assert_eq!(read_wire_header(&payload).unwrap(), registered.id);
}

#[tokio::test]
async fn auto_registers_when_latest_schema_is_incompatible() {
    // latest schema for the subject cannot encode an int host type
    let registry = Arc::new(MockRegistry::new().with_subject("t-value", r##""string""##));
    let encoder =
        RegistryEncoder::new(registry.clone(), int_resolution()).with_auto_register(true);

    let payload = encoder
        .serialize("t", SubjectRole::Value, &Value::Int(9))
        .await
        .unwrap();

    assert_eq!(registry.register_calls.load(Ordering::SeqCst), 1);
    let registered = registry.schemas.lock().unwrap()["t-value"].clone();
    assert_eq!(registered.schema, r##""int""##);
    assert_eq!(read_wire_header(&payload).unwrap(), registered.id);
}

#[tokio::test]
async fn without_auto_register_incompatibility_is_an_error() {
    let registry = Arc::new(MockRegistry::new().with_subject("t-value", r##""string""##));
    let encoder = RegistryEncoder::new(registry.clone(), int_resolution());

    let err = encoder
        .serialize("t", SubjectRole::Value, &Value::Int(9))
        .await;
    assert!(err.is_err());
    assert_eq!(registry.register_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn concurrent_callers_share_one_registration() {
    let registry = Arc::new(MockRegistry::new());
    let encoder = Arc::new(
        RegistryEncoder::new(registry.clone(), int_resolution()).with_auto_register(true),
    );

    let mut tasks = vec![];
    for i in 0..16 {
        let encoder = encoder.clone();
        tasks.push(tokio::spawn(async move {
            encoder
                .serialize("t", SubjectRole::Value, &Value::Int(i))
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(registry.register_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_builds_stay_cached() {
    let registry = Arc::new(MockRegistry::new());
    // no auto registration: the missing subject is a terminal failure
    let encoder = RegistryEncoder::new(registry.clone(), int_resolution());

    for _ in 0..3 {
        assert!(encoder
            .serialize("t", SubjectRole::Value, &Value::Int(0))
            .await
            .is_err());
    }
    // the failure was produced by a single lookup
    assert_eq!(registry.latest_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn decoder_caches_by_embedded_id() {
    let registry = Arc::new(MockRegistry::new().with_subject("t-value", r##""string""##));
    let encoder = RegistryEncoder::new(registry.clone(), Resolver::new()
        .resolve(&TypeDescriptor::Str)
        .unwrap());
    let payload = encoder
        .serialize("t", SubjectRole::Value, &to_value(&"sup").unwrap())
        .await
        .unwrap();

    let decoder = RegistryDecoder::new(registry.clone());
    for _ in 0..2 {
        let value = decoder.deserialize(&payload).await.unwrap();
        assert_eq!(value.as_string().unwrap(), "sup");
    }
}

#[tokio::test]
async fn one_shot_builders_bind_subject_and_id() {
    use avrokit::wire::{wire_deserializer_for_id, wire_serializer_for_subject};

    let registry = MockRegistry::new().with_subject("t-value", r##""int""##);
    let serializer = wire_serializer_for_subject(&registry, "t-value", None, &int_resolution())
        .await
        .unwrap();
    let payload = serializer.to_bytes(&Value::Int(12)).unwrap();

    let deserializer = wire_deserializer_for_id(&registry, serializer.schema_id(), None)
        .await
        .unwrap();
    assert_eq!(
        deserializer.deserialize(&payload).unwrap(),
        Value::Int(12)
    );

    // bound to a different id, the same payload is refused
    let other = wire_deserializer_for_id(&registry, serializer.schema_id(), None)
        .await
        .unwrap();
    let mut tampered = payload.clone();
    tampered[4] ^= 0x01;
    assert!(other.deserialize(&tampered).is_err());
}

#[tokio::test]
async fn subject_name_strategy_derives_topic_role_subjects() {
    use avrokit::wire::SubjectNameStrategy;
    let strategy = SubjectNameStrategy::TopicName;
    assert_eq!(strategy.subject("orders", SubjectRole::Key), "orders-key");
    assert_eq!(
        strategy.subject("orders", SubjectRole::Value),
        "orders-value"
    );
    assert_eq!(
        SubjectNameStrategy::RecordName("com.acme.Order".to_string())
            .subject("orders", SubjectRole::Value),
        "com.acme.Order"
    );
}
