use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::coercion;
use super::schema::ListingSchema;

pub(crate) const PHOTOS_KEY: &str = "photos";
pub(crate) const PHOTO_ORDER_KEY: &str = "photoOrder";

/// The accumulating listing document every wizard screen writes into.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyDraft {
    fields: Map<String, Value>,
}

impl PropertyDraft {
    /// A draft where every schema field holds its declared default.
    pub fn with_defaults(schema: &ListingSchema) -> Self {
        let mut fields = schema.draft_defaults();
        fields.insert(PHOTOS_KEY.to_string(), Value::Array(Vec::new()));
        Self { fields }
    }

    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Shallow merge: keys in `partial` replace existing values wholesale.
    pub fn merged(&self, partial: &Map<String, Value>) -> Self {
        let mut fields = self.fields.clone();
        for (key, value) in partial {
            fields.insert(key.clone(), value.clone());
        }
        Self { fields }
    }

    pub(crate) fn photo_entries(&self) -> Option<&Value> {
        self.fields.get(PHOTOS_KEY)
    }

    /// Photo ids in the user's chosen order, ignoring non-string entries.
    pub fn photo_order(&self) -> Vec<String> {
        coercion::ensure_array(self.fields.get(PHOTO_ORDER_KEY), &[])
            .into_iter()
            .filter_map(|entry| match entry {
                Value::String(id) => Some(id),
                _ => None,
            })
            .collect()
    }
}

/// Secondary document holding the lister's contact details.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactInfo {
    fields: Map<String, Value>,
}

impl ContactInfo {
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DraftError {
    #[error("draft updates must be JSON objects, got {0}")]
    NotAnObject(&'static str),
}

/// Holds the current draft snapshot plus a bounded undo history.
#[derive(Debug)]
pub struct DraftStore {
    initial: Arc<PropertyDraft>,
    current: Arc<PropertyDraft>,
    history: VecDeque<Arc<PropertyDraft>>,
    history_limit: usize,
}

impl DraftStore {
    pub const DEFAULT_HISTORY_LIMIT: usize = 32;

    pub fn new(schema: &ListingSchema) -> Self {
        Self::with_history_limit(schema, Self::DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_history_limit(schema: &ListingSchema, history_limit: usize) -> Self {
        let initial = Arc::new(PropertyDraft::with_defaults(schema));
        Self {
            current: initial.clone(),
            initial,
            history: VecDeque::new(),
            history_limit,
        }
    }

    pub fn read(&self) -> Arc<PropertyDraft> {
        self.current.clone()
    }

    pub fn update(&mut self, partial: &Value) -> Result<Arc<PropertyDraft>, DraftError> {
        let partial = partial
            .as_object()
            .ok_or_else(|| DraftError::NotAnObject(json_kind(partial)))?;

        let next = Arc::new(self.current.merged(partial));
        let previous = std::mem::replace(&mut self.current, next);
        if self.history_limit > 0 {
            if self.history.len() == self.history_limit {
                self.history.pop_front();
            }
            self.history.push_back(previous);
        }

        Ok(self.current.clone())
    }

    /// Restores the snapshot preceding the most recent update.
    pub fn undo(&mut self) -> Option<Arc<PropertyDraft>> {
        let previous = self.history.pop_back()?;
        self.current = previous;
        Some(self.current.clone())
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn reset(&mut self) {
        self.current = self.initial.clone();
        self.history.clear();
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
