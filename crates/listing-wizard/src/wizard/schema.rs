use serde::Serialize;
use serde_json::{json, Map, Number, Value};

use super::coercion;

/// Statically expected shape of a single payload field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldShape {
    Object,
    Array,
    Number,
    String,
    Boolean,
}

impl FieldShape {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Array => "array",
            Self::Number => "number",
            Self::String => "string",
            Self::Boolean => "boolean",
        }
    }

    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
            Self::Number => value.is_number(),
            Self::String => value.is_string(),
            Self::Boolean => value.is_boolean(),
        }
    }
}

/// Which input document a field is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSource {
    Draft,
    Contact,
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub shape: FieldShape,
    pub source: FieldSource,
    pub default: Value,
}

impl FieldSpec {
    /// Forces `raw` into this field's shape, falling back to the declared default.
    pub fn coerce(&self, raw: Option<&Value>) -> Value {
        match self.shape {
            FieldShape::Object => {
                let default = self.default.as_object().cloned().unwrap_or_default();
                Value::Object(coercion::ensure_object(raw, &default))
            }
            FieldShape::Array => {
                let default = self.default.as_array().cloned().unwrap_or_default();
                Value::Array(coercion::ensure_array(raw, &default))
            }
            FieldShape::Number => {
                let default = match &self.default {
                    Value::Number(number) => number.clone(),
                    _ => Number::from(0),
                };
                Value::Number(coercion::ensure_number(raw, &default))
            }
            FieldShape::String => {
                Value::String(coercion::ensure_string(raw, self.default.as_str().unwrap_or("")))
            }
            FieldShape::Boolean => Value::Bool(coercion::ensure_boolean(
                raw,
                self.default.as_bool().unwrap_or(false),
            )),
        }
    }
}

/// Declarative description of every field the submission endpoint expects.
#[derive(Debug, Clone)]
pub struct ListingSchema {
    fields: Vec<FieldSpec>,
}

impl ListingSchema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    pub fn standard() -> Self {
        Self::new(standard_fields())
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn fields_from(&self, source: FieldSource) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(move |field| field.source == source)
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// All draft-sourced fields at their defaults.
    pub fn draft_defaults(&self) -> Map<String, Value> {
        self.fields_from(FieldSource::Draft)
            .map(|field| (field.name.to_string(), field.default.clone()))
            .collect()
    }
}

impl Default for ListingSchema {
    fn default() -> Self {
        Self::standard()
    }
}

fn draft(name: &'static str, shape: FieldShape, default: Value) -> FieldSpec {
    FieldSpec {
        name,
        shape,
        source: FieldSource::Draft,
        default,
    }
}

fn contact(name: &'static str, default: &str) -> FieldSpec {
    FieldSpec {
        name,
        shape: FieldShape::String,
        source: FieldSource::Contact,
        default: Value::String(default.to_string()),
    }
}

fn standard_fields() -> Vec<FieldSpec> {
    use FieldShape as S;

    vec![
        // Location
        draft("listingType", S::String, json!("rent")),
        draft("propertyType", S::String, json!("apartment")),
        draft("city", S::String, json!("")),
        draft("district", S::String, json!("")),
        draft("neighborhood", S::String, json!("")),
        draft("address", S::String, json!("")),
        draft("location", S::Object, json!({})),
        draft("streetInfo", S::Object, json!({})),
        // Structure
        draft("roomCount", S::Number, json!(1)),
        draft("livingRoomCount", S::Number, json!(1)),
        draft("bathroomCount", S::Number, json!(1)),
        draft("grossArea", S::Number, json!(0)),
        draft("netArea", S::Number, json!(0)),
        draft("floorNumber", S::Number, json!(0)),
        draft("totalFloors", S::Number, json!(1)),
        draft("buildingAge", S::Number, json!(0)),
        draft("heatingType", S::String, json!("")),
        draft("buildingInfo", S::Object, json!({})),
        // Features
        draft("furnished", S::Boolean, json!(false)),
        draft("hasBalcony", S::Boolean, json!(false)),
        draft("hasElevator", S::Boolean, json!(false)),
        draft("hasParking", S::Boolean, json!(false)),
        draft("petsAllowed", S::Boolean, json!(false)),
        draft("amenities", S::Array, json!([])),
        draft("interiorFeatures", S::Array, json!([])),
        draft("exteriorFeatures", S::Array, json!([])),
        draft("nearbyPlaces", S::Array, json!([])),
        draft("houseRules", S::Array, json!([])),
        // Copy
        draft("title", S::String, json!("")),
        draft("description", S::String, json!("")),
        // Pricing & availability
        draft("price", S::Number, json!(0)),
        draft("deposit", S::Number, json!(0)),
        draft("maintenanceFee", S::Number, json!(0)),
        draft("currency", S::String, json!("USD")),
        draft("pricing", S::Object, json!({})),
        draft("availability", S::Object, json!({})),
        // Photo metadata; the photo list itself goes through the photo pipeline
        draft("photoOrder", S::Array, json!([])),
        draft("photoDescriptions", S::Object, json!({})),
        // Contact
        contact("contactName", ""),
        contact("contactPhone", ""),
        contact("contactEmail", ""),
        contact("preferredContact", "phone"),
    ]
}
