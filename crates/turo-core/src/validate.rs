//! Structural validation and normalization of model output.
//!
//! The check and the normalization are deliberately separate passes:
//! `check` decides accept/reject on shape alone, `normalize` applies the
//! correction-sentinel repair. `validate` composes the two.

use serde_json::Value;
use thiserror::Error;
use turo_schema::TutorReply;

/// Sentinel the model emits instead of null when it has no correction.
const NO_CORRECTION_SENTINEL: &str = "None";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("response is not a JSON object")]
    NotAnObject,
    #[error("`tagalog` is missing, not a string, or empty")]
    MissingTagalog,
    #[error("`{0}` must be null or a string")]
    NotNullOrString(&'static str),
    #[error("`examples` must be null or an array of strings")]
    BadExamples,
}

/// Pure structural check. Rejection is a value the caller turns into a
/// retry; this never panics on any input shape.
pub fn check(candidate: &Value) -> Result<TutorReply, ValidationError> {
    let obj = candidate.as_object().ok_or(ValidationError::NotAnObject)?;

    let tagalog = match obj.get("tagalog") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        _ => return Err(ValidationError::MissingTagalog),
    };

    let sabihin = optional_string(obj, "sabihin")?;
    let meaning = optional_string(obj, "meaning")?;
    let correction = optional_string(obj, "correction")?;
    let note = optional_string(obj, "note")?;

    let examples = match obj.get("examples") {
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) => {
            let mut examples = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) => examples.push(s.clone()),
                    _ => return Err(ValidationError::BadExamples),
                }
            }
            Some(examples)
        }
        Some(_) => return Err(ValidationError::BadExamples),
    };

    Ok(TutorReply {
        tagalog,
        sabihin,
        meaning,
        correction,
        examples,
        note,
    })
}

fn optional_string(
    obj: &serde_json::Map<String, Value>,
    key: &'static str,
) -> Result<Option<String>, ValidationError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ValidationError::NotNullOrString(key)),
    }
}

/// Rewrites the "no correction" sentinel (and the empty string) to null.
/// Idempotent: normalizing an already-normalized reply is a no-op.
pub fn normalize(mut reply: TutorReply) -> TutorReply {
    if let Some(correction) = &reply.correction {
        if correction == NO_CORRECTION_SENTINEL || correction.is_empty() {
            reply.correction = None;
        }
    }
    reply
}

/// Full validation pass: structural check followed by normalization.
pub fn validate(candidate: &Value) -> Result<TutorReply, ValidationError> {
    check(candidate).map(normalize)
}
