//! Response envelope handling shared by every endpoint.

use serde_json::Value;

use crate::errors::{FinicityError, Result};
use crate::models::{MfaChallenge, MfaQuestion};
use crate::transport::{RawResponse, MFA_SESSION_HEADER};
use crate::xml;

pub const STATUS_MFA_REQUIRED: u16 = 203;
pub const STATUS_NO_CONTENT: u16 = 204;

/// Result of an operation that may be interrupted by an MFA challenge.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Complete(T),
    MfaRequired(MfaChallenge),
}

impl<T> Outcome<T> {
    pub fn complete(self) -> Option<T> {
        match self {
            Outcome::Complete(value) => Some(value),
            Outcome::MfaRequired(_) => None,
        }
    }

    pub fn challenge(&self) -> Option<&MfaChallenge> {
        match self {
            Outcome::MfaRequired(challenge) => Some(challenge),
            Outcome::Complete(_) => None,
        }
    }

    pub fn is_mfa_required(&self) -> bool {
        matches!(self, Outcome::MfaRequired(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Complete(value) => Outcome::Complete(f(value)),
            Outcome::MfaRequired(challenge) => Outcome::MfaRequired(challenge),
        }
    }
}

/// Turn an HTTP >= 400 response into a vendor error. An error body that does
/// not decode is itself a decode error, keeping the original status.
pub fn vendor_error(resp: &RawResponse) -> FinicityError {
    let parsed = xml::decode(&resp.body).ok();
    let error = parsed.as_ref().and_then(|doc| doc.get("error"));
    // An empty `<code/>` or `<message/>` decodes as null and reads as "".
    let field = |name: &str| match error.and_then(|e| e.get(name))? {
        Value::Null => Some(String::new()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    };

    match (field("code"), field("message")) {
        (Some(code), Some(message)) => {
            tracing::warn!(status = resp.status, %code, %message, "finicity error");
            FinicityError::Vendor {
                status: resp.status,
                code,
                message,
            }
        }
        _ => FinicityError::decode(format!(
            "HTTP {} with undecodable error body: {}",
            resp.status,
            truncate(&resp.body)
        )),
    }
}

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

pub fn ensure_success(resp: &RawResponse) -> Result<()> {
    if resp.status >= 400 {
        return Err(vendor_error(resp));
    }
    Ok(())
}

/// Fail on vendor errors and on MFA challenges from endpoints that never
/// expect one, then decode the body.
pub fn decode_success(resp: &RawResponse) -> Result<Value> {
    ensure_success(resp)?;
    if resp.status == STATUS_MFA_REQUIRED {
        return Err(FinicityError::decode(
            "unexpected MFA challenge from an endpoint without MFA support",
        ));
    }
    xml::decode(&resp.body)
}

/// Decode an HTTP 203 body into a challenge bound to the response's session.
pub fn mfa_challenge(resp: &RawResponse) -> Result<MfaChallenge> {
    let doc = xml::decode(&resp.body)?;
    let question = doc
        .pointer("/mfaChallenges/questions/question")
        .ok_or_else(|| FinicityError::decode("MFA response missing mfaChallenges.questions"))?;

    let questions = list(question)
        .iter()
        .map(MfaQuestion::classify)
        .collect::<Result<Vec<_>>>()?;

    let challenge = MfaChallenge::new(
        resp.header(MFA_SESSION_HEADER).map(str::to_string),
        questions,
    )?;
    tracing::info!(questions = challenge.questions.len(), "MFA challenge issued");
    Ok(challenge)
}

fn list(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    }
}

/// Normalize the items of a counted envelope into a sequence.
///
/// The XML decoder only produces an array when an element repeats, so a
/// single result arrives bare. A zero `displaying` (or `found`) count, or a
/// missing item element, yields an empty sequence.
pub fn items(envelope: Option<&Value>, item: &str) -> Vec<Value> {
    let Some(envelope) = envelope else {
        return Vec::new();
    };

    let count = ["@displaying", "@found"]
        .iter()
        .find_map(|key| envelope.get(*key))
        .and_then(Value::as_str)
        .and_then(|c| c.trim().parse::<u64>().ok());
    if count == Some(0) {
        return Vec::new();
    }

    envelope.get(item).map(list).unwrap_or_default()
}
