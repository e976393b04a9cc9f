use serde::Serialize;
use serde_json::{Map, Value};

use super::draft::{ContactInfo, PropertyDraft, PHOTOS_KEY};
use super::schema::{FieldShape, FieldSource, ListingSchema};

/// Submission-shaped projection of a draft; every schema field has its declared shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NormalizedPayload {
    fields: Map<String, Value>,
}

impl NormalizedPayload {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Attaches the encoded photo list under the `photos` key.
    pub fn with_photos(mut self, photos: Vec<String>) -> Self {
        self.fields.insert(
            PHOTOS_KEY.to_string(),
            Value::Array(photos.into_iter().map(Value::String).collect()),
        );
        self
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionKind {
    /// The field was absent or null and received its default.
    Defaulted,
    /// The field held a value of the wrong shape and was converted.
    Coerced,
}

/// A single shape fix applied during normalization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Correction {
    pub field: &'static str,
    pub expected: FieldShape,
    pub kind: CorrectionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original: Option<Value>,
    pub corrected: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedListing {
    pub payload: NormalizedPayload,
    pub corrections: Vec<Correction>,
}

impl NormalizedListing {
    pub fn is_clean(&self) -> bool {
        self.corrections.is_empty()
    }
}

/// Coerces every schema field of `draft` and `contact` into its declared shape.
///
/// Draft keys the schema does not know about are dropped, as is the raw photo
/// list, which is encoded separately before transmission.
pub fn normalize(
    schema: &ListingSchema,
    draft: &PropertyDraft,
    contact: &ContactInfo,
) -> NormalizedListing {
    let mut fields = Map::with_capacity(schema.fields().len() + 1);
    let mut corrections = Vec::new();

    for field in schema.fields() {
        let raw = match field.source {
            FieldSource::Draft => draft.get(field.name),
            FieldSource::Contact => contact.get(field.name),
        };
        let corrected = field.coerce(raw);

        match raw {
            None | Some(Value::Null) => corrections.push(Correction {
                field: field.name,
                expected: field.shape,
                kind: CorrectionKind::Defaulted,
                original: raw.cloned(),
                corrected: corrected.clone(),
            }),
            Some(original) if original != &corrected => corrections.push(Correction {
                field: field.name,
                expected: field.shape,
                kind: CorrectionKind::Coerced,
                original: Some(original.clone()),
                corrected: corrected.clone(),
            }),
            Some(_) => {}
        }

        fields.insert(field.name.to_string(), corrected);
    }

    NormalizedListing {
        payload: NormalizedPayload { fields },
        corrections,
    }
}
