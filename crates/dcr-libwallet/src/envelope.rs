//! Response envelope returned across the library boundary.
//!
//! Exactly one of `payload` and `error` is populated. `errorcode` is only
//! present for errors that need special handling.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use crate::error::ManagerError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub payload: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub errorcode: i32,
}

fn is_zero(v: &i32) -> bool {
    *v == 0
}

impl Envelope {
    pub fn success(payload: impl Into<String>) -> Self {
        let payload = payload.into();
        trace!("returning payload to consumer: {payload}");
        Self { payload, ..Default::default() }
    }

    pub fn failure(err: &ManagerError) -> Self {
        let errorcode = err.code().unwrap_or(0);
        if errorcode != 0 {
            error!("returning error with error code {errorcode} to consumer: {err}");
        } else {
            error!("returning error to consumer: {err}");
        }
        Self { error: err.to_string(), errorcode, ..Default::default() }
    }

    /// Serialize the success value as the payload. A value that serializes
    /// to a JSON string is carried bare.
    pub fn from_result<T: Serialize>(result: Result<T, ManagerError>) -> Self {
        let value = match result {
            Ok(value) => value,
            Err(e) => return Self::failure(&e),
        };
        match serde_json::to_value(&value) {
            Ok(serde_json::Value::String(s)) => Self::success(s),
            Ok(other) => Self::success(other.to_string()),
            Err(e) => {
                debug!("unable to marshal payload: {e}");
                Self { error: format!("unable to marshal payload: {e}"), ..Default::default() }
            }
        }
    }

    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }

    pub fn to_json(&self) -> String {
        // Three plain fields always serialize.
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl<T: Serialize> From<Result<T, ManagerError>> for Envelope {
    fn from(result: Result<T, ManagerError>) -> Self {
        Self::from_result(result)
    }
}
