//! Uniform result envelope for catalog reads.
//!
//! Serialized as `{"success": true, "message": .., "data": ..}` or
//! `{"success": false, "message": ..}`.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use tracing::Level;

use crate::Error;

/// Success with payload, or failure with a message.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope<T> {
    Success { message: String, data: T },
    Failure { message: String },
}

impl<T> Envelope<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Envelope::Success { message: message.into(), data }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Envelope::Failure { message: message.into() }
    }

    /// Wrap a read result, logging failures.
    pub fn from_result(context: &str, result: Result<T, Error>, message: impl Into<String>) -> Self {
        match result {
            Ok(data) => Envelope::success(message, data),
            Err(e) => {
                let level = failure_level(&e);
                if level == Level::DEBUG {
                    tracing::debug!(context, "read found nothing: {}", e);
                } else if level == Level::WARN {
                    tracing::warn!(context, "read rejected: {}", e);
                } else {
                    tracing::error!(context, "read failed: {}", e);
                }
                Envelope::failure(e.to_string())
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Envelope::Success { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            Envelope::Success { message, .. } | Envelope::Failure { message } => message,
        }
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Envelope::Success { data, .. } => Some(data),
            Envelope::Failure { .. } => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            Envelope::Success { data, .. } => Some(data),
            Envelope::Failure { .. } => None,
        }
    }
}

impl<T: Serialize> Serialize for Envelope<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Envelope::Success { message, data } => {
                let mut state = serializer.serialize_struct("Envelope", 3)?;
                state.serialize_field("success", &true)?;
                state.serialize_field("message", message)?;
                state.serialize_field("data", data)?;
                state.end()
            }
            Envelope::Failure { message } => {
                let mut state = serializer.serialize_struct("Envelope", 2)?;
                state.serialize_field("success", &false)?;
                state.serialize_field("message", message)?;
                state.end()
            }
        }
    }
}

/// Missing documents and rejected input are ordinary outcomes; only store and
/// query faults log at error.
fn failure_level(e: &Error) -> Level {
    match e {
        Error::NotFound(_) => Level::DEBUG,
        Error::InvalidInput(_) | Error::Validation(_) => Level::WARN,
        _ => Level::ERROR,
    }
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    pub page_count: u64,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self { data: Vec::new(), page_count: 0 }
    }
}
