use std::fmt::{self, Display, Formatter};

#[cfg(feature = "rpc-server")]
use actix_web::{HttpResponse, ResponseError};

use super::{Id, JSON_RPC_VERSION};
use serde_json::{json, Value};
use thiserror::Error;

// Code returned when a node refuses a transaction at admission
pub const TRANSACTION_REJECTED_CODE: i16 = -32010;

/// Failure of a single JSON-RPC call, mapped to a code by [`get_code`].
///
/// [`get_code`]: InternalRpcError::get_code
#[derive(Error, Debug)]
pub enum InternalRpcError {
    #[error("Invalid body in request")]
    ParseBodyError,
    #[error("Expected jsonrpc set to '{}'", JSON_RPC_VERSION)]
    InvalidVersion,
    #[error("Method '{}' in request was not found", _0)]
    MethodNotFound(String),
    #[error("Invalid params: {}", _0)]
    InvalidJSONParams(#[from] serde_json::Error),
    #[error("Invalid params: {}", _0)]
    InvalidParams(&'static str),
    #[error("Invalid params: {:#}", _0)]
    InvalidParamsAny(anyhow::Error),
    #[error("Unexpected parameters for this method")]
    UnexpectedParams,
    #[error(transparent)]
    AnyError(#[from] anyhow::Error),
    // Application codes, kept out of the reserved -32768..-32000 range
    // except for the server error block
    #[error("{}", _1)]
    Custom(i16, String),
}

impl InternalRpcError {
    pub fn get_code(&self) -> i16 {
        match self {
            Self::ParseBodyError => -32700,
            Self::InvalidVersion => -32600,
            Self::MethodNotFound(_) => -32601,
            Self::InvalidJSONParams(_)
            | Self::InvalidParams(_)
            | Self::InvalidParamsAny(_)
            | Self::UnexpectedParams => -32602,
            Self::AnyError(_) => -32004,
            Self::Custom(code, _) => *code,
        }
    }
}

/// Error reply bound to the id of the request that caused it
#[derive(Debug)]
pub struct RpcResponseError {
    id: Option<Id>,
    error: InternalRpcError,
}

impl RpcResponseError {
    pub fn new<T: Into<InternalRpcError>>(id: Option<Id>, error: T) -> Self {
        Self {
            id,
            error: error.into(),
        }
    }

    pub fn get_error(&self) -> &InternalRpcError {
        &self.error
    }

    pub fn to_json(&self) -> Value {
        json!({
            "jsonrpc": JSON_RPC_VERSION,
            "id": self.id,
            "error": {
                "code": self.error.get_code(),
                "message": format!("{:#}", self.error),
            }
        })
    }
}

impl Display for RpcResponseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "RPC error {} for request {:?}: {:#}", self.error.get_code(), self.id, self.error)
    }
}

// JSON-RPC errors travel in a 200 response body
#[cfg(feature = "rpc-server")]
impl ResponseError for RpcResponseError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::Ok().json(self.to_json())
    }
}
