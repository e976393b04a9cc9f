use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use serde_json::{json, Map, Value};
use tokio::sync::Notify;

use crate::wizard::photos::{PhotoFile, PhotoPipeline, PhotoReadError, PhotoReader};
use crate::wizard::schema::ListingSchema;
use crate::wizard::session::{SessionRegistry, SessionTemplate};
use crate::wizard::submission::{
    ListingTransport, SubmissionCoordinator, TransportError, TransportResponse,
};
use crate::wizard::{ContactInfo, PropertyDraft};

/// Scripted reply for [`RecordingTransport`].
#[derive(Debug, Clone)]
pub(super) enum Reply {
    Body(Value),
    Unreachable(String),
}

#[derive(Debug)]
pub(super) struct RecordingTransport {
    reply: Reply,
    calls: Mutex<Vec<Value>>,
}

impl RecordingTransport {
    pub(super) fn replying(body: Value) -> Self {
        Self {
            reply: Reply::Body(body),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn accepting() -> Self {
        Self::replying(json!({ "code": 200, "data": { "id": "listing-77" } }))
    }

    pub(super) fn unreachable() -> Self {
        Self {
            reply: Reply::Unreachable("connection refused".to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn calls(&self) -> Vec<Value> {
        self.calls.lock().expect("transport mutex poisoned").clone()
    }

    pub(super) fn call_count(&self) -> usize {
        self.calls.lock().expect("transport mutex poisoned").len()
    }
}

#[async_trait]
impl ListingTransport for RecordingTransport {
    async fn send(&self, payload: &Value) -> Result<TransportResponse, TransportError> {
        self.calls
            .lock()
            .expect("transport mutex poisoned")
            .push(payload.clone());
        match &self.reply {
            Reply::Body(body) => Ok(TransportResponse {
                http_status: 200,
                body: body.clone(),
            }),
            Reply::Unreachable(message) => Err(TransportError::Request {
                endpoint: "http://listing-backend.test".to_string(),
                message: message.clone(),
            }),
        }
    }
}

/// Holds every request until [`GatedTransport::release`] is called.
#[derive(Debug, Default)]
pub(super) struct GatedTransport {
    pub(super) entered: Notify,
    gate: Notify,
    calls: AtomicUsize,
}

impl GatedTransport {
    pub(super) fn release(&self) {
        self.gate.notify_one();
    }

    pub(super) fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ListingTransport for GatedTransport {
    async fn send(&self, _payload: &Value) -> Result<TransportResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        self.gate.notified().await;
        Ok(TransportResponse {
            http_status: 200,
            body: json!({ "status": "200" }),
        })
    }
}

/// Serves fixed bytes for every path except the ones marked missing.
#[derive(Debug, Default)]
pub(super) struct MemoryReader {
    missing: HashSet<PathBuf>,
}

impl MemoryReader {
    pub(super) fn missing(paths: &[&str]) -> Self {
        Self {
            missing: paths.iter().map(PathBuf::from).collect(),
        }
    }
}

#[async_trait]
impl PhotoReader for MemoryReader {
    async fn read(&self, file: &PhotoFile) -> Result<Vec<u8>, PhotoReadError> {
        if self.missing.contains(&file.path) {
            return Err(
                std::io::Error::new(std::io::ErrorKind::NotFound, "photo removed from device")
                    .into(),
            );
        }
        Ok(b"jpeg".to_vec())
    }
}

pub(super) fn coordinator(transport: Arc<dyn ListingTransport>) -> SubmissionCoordinator {
    SubmissionCoordinator::new(transport)
        .with_photo_pipeline(PhotoPipeline::new(Arc::new(MemoryReader::default())))
}

pub(super) fn registry(transport: Arc<dyn ListingTransport>) -> Arc<SessionRegistry> {
    let mut template = SessionTemplate::new(transport);
    template.photos = PhotoPipeline::new(Arc::new(MemoryReader::default()));
    Arc::new(SessionRegistry::new(template))
}

pub(super) fn object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("object literal")
}

pub(super) fn draft(partial: Value) -> PropertyDraft {
    PropertyDraft::with_defaults(&ListingSchema::standard()).merged(&object(partial))
}

pub(super) fn contact() -> ContactInfo {
    ContactInfo::from_fields(object(json!({
        "contactName": "Dana Reyes",
        "contactPhone": "+1 515 555 0100",
        "contactEmail": "dana@example.com",
    })))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
