//! Response definitions
//!
//! What [`super::QueryRouter::serve`] hands back to an external caller.

use crate::error::OrmError;

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    NotFound = 0x01,
    BadRequest = 0x02,
    Internal = 0x03,
}

/// A query response
#[derive(Debug, Clone)]
pub struct Response {
    pub status: Status,

    /// JSON envelope on success, error message otherwise
    pub payload: Vec<u8>,
}

impl Response {
    pub fn ok(payload: Vec<u8>) -> Self {
        Self {
            status: Status::Ok,
            payload,
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: Status::NotFound,
            payload: b"not found".to_vec(),
        }
    }

    pub fn bad_request(message: &str) -> Self {
        Self {
            status: Status::BadRequest,
            payload: message.as_bytes().to_vec(),
        }
    }

    /// Opaque failure; details stay in the server log
    pub fn internal() -> Self {
        Self {
            status: Status::Internal,
            payload: b"internal error".to_vec(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    /// Map a query failure onto the status a caller sees
    pub fn from_error(err: &OrmError) -> Self {
        match err {
            OrmError::NotFound => Self::not_found(),
            OrmError::InvalidArgument(_)
            | OrmError::UnknownRequest(_)
            | OrmError::TypeMismatch(_) => Self::bad_request(&err.to_string()),
            _ => {
                tracing::error!("Query failed: {}", err);
                Self::internal()
            }
        }
    }
}
