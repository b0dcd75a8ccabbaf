use thiserror::Error;

pub type Result<T> = std::result::Result<T, FinicityError>;

#[derive(Debug, Error)]
pub enum FinicityError {
    #[error("{resource} is missing required fields: {}", .fields.join(", "))]
    MissingRequiredFields {
        resource: &'static str,
        fields: Vec<String>,
    },

    #[error("{resource} with id {id} does not exist")]
    NotFound { resource: &'static str, id: String },

    #[error("HTTP {status}, Finicity error {code}: {message}")]
    Vendor {
        status: u16,
        code: String,
        message: String,
    },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl FinicityError {
    pub(crate) fn decode(msg: impl Into<String>) -> Self {
        FinicityError::Decode(msg.into())
    }

    /// Vendor error code, when the failure came from an `<error>` envelope.
    pub fn vendor_code(&self) -> Option<&str> {
        match self {
            FinicityError::Vendor { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FinicityError::NotFound { .. })
    }
}
