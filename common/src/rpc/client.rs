use super::JSON_RPC_VERSION;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum JsonRPCError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Server returned error {code}: {message}")]
    Server { code: i64, message: String },
    #[error("Response contains no result")]
    MissingResult,
    #[error("Invalid response: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

impl JsonRPCError {
    pub fn server_code(&self) -> Option<i64> {
        match self {
            Self::Server { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Minimal JSON-RPC 2.0 client over HTTP POST
pub struct JsonRPCClient {
    http: reqwest::Client,
    target: String,
    count: AtomicU64,
}

impl JsonRPCClient {
    pub fn new(target: impl Into<String>) -> Result<Self, JsonRPCError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            target: target.into(),
            count: AtomicU64::new(0),
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub async fn call<R: DeserializeOwned>(&self, method: &str) -> Result<R, JsonRPCError> {
        self.send(method, None).await
    }

    pub async fn call_with<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: &P,
    ) -> Result<R, JsonRPCError> {
        let params = serde_json::to_value(params)?;
        self.send(method, Some(params)).await
    }

    async fn send<R: DeserializeOwned>(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<R, JsonRPCError> {
        let id = self.count.fetch_add(1, Ordering::Relaxed);

        let mut request = Map::new();
        request.insert("jsonrpc".into(), Value::String(JSON_RPC_VERSION.into()));
        request.insert("id".into(), Value::Number(id.into()));
        request.insert("method".into(), Value::String(method.into()));
        if let Some(params) = params {
            request.insert("params".into(), params);
        }

        let response: Value = self
            .http
            .post(&self.target)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.get("error") {
            return Err(JsonRPCError::Server {
                code: error.get("code").and_then(Value::as_i64).unwrap_or(-32603),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            });
        }

        let result = response
            .get("result")
            .cloned()
            .ok_or(JsonRPCError::MissingResult)?;
        Ok(serde_json::from_value(result)?)
    }
}
