use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::models::ResultVariant;

pub const ORIGINAL_NAME: &str = "original_name";

const FREE_SIMPLE_FIELDS: &[&str] = &["korean_name_suggestion", "social_share_content"];
const FREE_DETAILED_FIELDS: &[&str] = &["original_name_analysis", "korean_name_suggestion", "social_share_content"];
const PREMIUM_FIELDS: &[&str] = &["original_name_analysis", "korean_name_suggestion", "life_values", "cultural_impression"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("result is not a JSON object")]
    NotAnObject,
    #[error("result is missing required field `{field}`")]
    MissingField { field: String },
}

/// A validated model answer for one variant.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedResult {
    pub variant: ResultVariant,
    body: Map<String, Value>,
}

impl NormalizedResult {
    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    pub fn full_name(&self) -> Option<&str> {
        self.body.get("korean_name_suggestion")?.get("full_name")?.as_str()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.body)
    }
}

/// Top-level keys the variant must contain, in check order.
pub fn required_fields(variant: ResultVariant) -> &'static [&'static str] {
    match variant {
        ResultVariant::FreeSimple => FREE_SIMPLE_FIELDS,
        ResultVariant::FreeDetailed => FREE_DETAILED_FIELDS,
        ResultVariant::Premium => PREMIUM_FIELDS,
    }
}

// The declared responseSchema is only a hint; this always runs.
pub fn validate(value: Value, variant: ResultVariant, original_name: &str) -> Result<NormalizedResult, SchemaError> {
    let Value::Object(mut body) = value else {
        return Err(SchemaError::NotAnObject);
    };

    if let Some(field) = required_fields(variant)
        .iter()
        .find(|field| body.get(**field).map_or(true, Value::is_null))
    {
        return Err(SchemaError::MissingField { field: field.to_string() });
    }

    // The model is not trusted to echo the name verbatim.
    let echoed = body.get(ORIGINAL_NAME).and_then(Value::as_str).is_some_and(|name| !name.trim().is_empty());
    if !echoed {
        body.insert(ORIGINAL_NAME.to_string(), Value::String(original_name.to_string()));
    }

    Ok(NormalizedResult { variant, body })
}

// --- Gemini responseSchema declarations ---

fn string() -> Value {
    json!({ "type": "STRING" })
}

fn string_list() -> Value {
    json!({ "type": "ARRAY", "items": string() })
}

fn object(properties: Value, required: &[&str]) -> Value {
    json!({ "type": "OBJECT", "properties": properties, "required": required })
}

fn name_part() -> Value {
    object(
        json!({ "hangul": string(), "hanja": string(), "meaning": string() }),
        &["hangul", "hanja", "meaning"],
    )
}

fn korean_name_suggestion() -> Value {
    object(
        json!({
            "full_name": string(),
            "romanization": string(),
            "surname": name_part(),
            "given_name": name_part(),
            "naming_rationale": string()
        }),
        &["full_name", "romanization", "surname", "given_name", "naming_rationale"],
    )
}

fn original_name_analysis() -> Value {
    object(
        json!({ "origin": string(), "meaning": string(), "key_traits": string_list() }),
        &["origin", "meaning", "key_traits"],
    )
}

fn social_share_content() -> Value {
    object(
        json!({ "headline": string(), "share_text": string(), "hashtags": string_list() }),
        &["headline", "share_text", "hashtags"],
    )
}

fn life_values() -> Value {
    json!({
        "type": "ARRAY",
        "items": object(json!({ "value": string(), "description": string() }), &["value", "description"])
    })
}

fn cultural_impression() -> Value {
    object(
        json!({
            "first_impression": string(),
            "in_korea": string(),
            "similar_figures": {
                "type": "ARRAY",
                "items": object(json!({ "name": string(), "reason": string() }), &["name", "reason"])
            }
        }),
        &["first_impression", "in_korea", "similar_figures"],
    )
}

fn section(field: &str) -> Value {
    match field {
        "korean_name_suggestion" => korean_name_suggestion(),
        "original_name_analysis" => original_name_analysis(),
        "social_share_content" => social_share_content(),
        "life_values" => life_values(),
        "cultural_impression" => cultural_impression(),
        _ => string(),
    }
}

/// The `responseSchema` declared to Gemini for a variant.
pub fn output_schema(variant: ResultVariant) -> Value {
    let required = required_fields(variant);
    let mut properties = Map::new();
    properties.insert(ORIGINAL_NAME.to_string(), string());
    for field in required {
        properties.insert(field.to_string(), section(field));
    }
    if variant == ResultVariant::Premium {
        properties.insert("social_share_content".to_string(), social_share_content());
    }
    object(Value::Object(properties), required)
}
