//! Multi-factor authentication challenges.
//!
//! A challenge is a session id plus an ordered list of questions. Each
//! decoded `<question>` element is classified into one variant by the keys
//! it carries; the caller fills in answers and resubmits them with the
//! same session id.

use serde::Serialize;
use serde_json::{json, Value};

use super::schema::{Field, Schema};
use crate::errors::{FinicityError, Result};

const QUESTION_SCHEMA: Schema = Schema::new(
    "MFAQuestion",
    &[
        Field::required("text"),
        Field::optional("image"),
        Field::optional("choice"),
        Field::optional("imageChoice"),
    ],
);

/// An image answer option: the value to submit and the data shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageChoice {
    pub value: String,
    pub display_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MfaQuestion {
    Text {
        text: String,
        answer: String,
    },
    Captcha {
        text: String,
        image: String,
        answer: String,
    },
    MultipleOptions {
        text: String,
        choices: Vec<String>,
        answer: String,
    },
    MultipleImages {
        text: String,
        image_choices: Vec<ImageChoice>,
        answer: String,
    },
    MultipleImagesWithCaptcha {
        text: String,
        image: String,
        image_choices: Vec<ImageChoice>,
        answer: String,
    },
}

/// A lone child decodes as a bare value; repeated children as an array.
fn as_list(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .get("#text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn choice_value(value: &Value) -> String {
    value
        .get("@value")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| text_of(value))
}

fn image_choice(value: &Value) -> ImageChoice {
    let display_text = text_of(value);
    let value = value
        .get("@value")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| display_text.clone());
    ImageChoice {
        value,
        display_text,
    }
}

impl MfaQuestion {
    /// Classify a decoded `<question>` element.
    ///
    /// Both `image` and `imageChoice` is checked first since it overlaps the
    /// captcha and multiple-image shapes.
    pub fn classify(node: &Value) -> Result<Self> {
        let attrs = QUESTION_SCHEMA.extract(node)?;
        let text = text_of(&attrs["text"]);
        let answer = String::new();

        let image = attrs.get("image").map(text_of);
        let image_choices = attrs
            .get("imageChoice")
            .map(|v| as_list(v).into_iter().map(image_choice).collect::<Vec<_>>());

        Ok(match (image, image_choices, attrs.get("choice")) {
            (Some(image), Some(image_choices), _) => MfaQuestion::MultipleImagesWithCaptcha {
                text,
                image,
                image_choices,
                answer,
            },
            (Some(image), None, _) => MfaQuestion::Captcha {
                text,
                image,
                answer,
            },
            (None, _, Some(choice)) => MfaQuestion::MultipleOptions {
                text,
                choices: as_list(choice).into_iter().map(choice_value).collect(),
                answer,
            },
            (None, Some(image_choices), None) => MfaQuestion::MultipleImages {
                text,
                image_choices,
                answer,
            },
            (None, None, None) => MfaQuestion::Text { text, answer },
        })
    }

    pub fn text(&self) -> &str {
        match self {
            MfaQuestion::Text { text, .. }
            | MfaQuestion::Captcha { text, .. }
            | MfaQuestion::MultipleOptions { text, .. }
            | MfaQuestion::MultipleImages { text, .. }
            | MfaQuestion::MultipleImagesWithCaptcha { text, .. } => text,
        }
    }

    pub fn answer(&self) -> &str {
        match self {
            MfaQuestion::Text { answer, .. }
            | MfaQuestion::Captcha { answer, .. }
            | MfaQuestion::MultipleOptions { answer, .. }
            | MfaQuestion::MultipleImages { answer, .. }
            | MfaQuestion::MultipleImagesWithCaptcha { answer, .. } => answer,
        }
    }

    /// Return the question with its answer filled in. For image questions the
    /// answer is the chosen `ImageChoice::value`.
    pub fn with_answer(mut self, value: impl Into<String>) -> Self {
        let value = value.into();
        match &mut self {
            MfaQuestion::Text { answer, .. }
            | MfaQuestion::Captcha { answer, .. }
            | MfaQuestion::MultipleOptions { answer, .. }
            | MfaQuestion::MultipleImages { answer, .. }
            | MfaQuestion::MultipleImagesWithCaptcha { answer, .. } => *answer = value,
        }
        self
    }
}

/// A pending MFA challenge tied to a vendor session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MfaChallenge {
    pub session: String,
    pub questions: Vec<MfaQuestion>,
}

impl MfaChallenge {
    /// The session comes from the `MFA-Session` response header; a challenge
    /// without one cannot be answered.
    pub fn new(session: Option<String>, questions: Vec<MfaQuestion>) -> Result<Self> {
        let session = session.ok_or_else(|| FinicityError::MissingRequiredFields {
            resource: "MFAChallenge",
            fields: vec!["session".to_string()],
        })?;
        Ok(Self { session, questions })
    }

    pub fn is_answered(&self) -> bool {
        self.questions.iter().all(|q| !q.answer().is_empty())
    }

    /// Request body resubmitting every question with its answer, in order.
    pub fn answers_body(&self) -> Value {
        let questions: Vec<Value> = self
            .questions
            .iter()
            .map(|q| json!({ "text": q.text(), "answer": q.answer() }))
            .collect();
        json!({
            "accounts": {
                "mfaChallenges": {
                    "questions": { "question": questions }
                }
            }
        })
    }
}
