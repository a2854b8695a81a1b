use super::{InternalRpcError, RpcRequest, RpcResponse, RpcResponseError, JSON_RPC_VERSION};
use futures::future::BoxFuture;
use log::trace;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;

pub type RpcResult = Result<Value, InternalRpcError>;
pub type MethodFuture = BoxFuture<'static, RpcResult>;
pub type Handler<T> = Box<dyn Fn(T, Value) -> MethodFuture + Send + Sync>;

// Wrap an `async fn(T, Value) -> RpcResult` into a registrable handler
#[macro_export]
macro_rules! async_handler {
    ($func: expr) => {
        move |data, body| -> $crate::rpc::MethodFuture { Box::pin($func(data, body)) }
    };
}

/// Registry of JSON-RPC methods sharing the same application data `T`
pub struct RPCHandler<T: Clone + Send + Sync + 'static> {
    methods: HashMap<String, Handler<T>>,
    data: T,
}

impl<T> RPCHandler<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(data: T) -> Self {
        Self {
            methods: HashMap::new(),
            data,
        }
    }

    pub fn register_method<F>(&mut self, name: &str, handler: F)
    where
        F: Fn(T, Value) -> MethodFuture + Send + Sync + 'static,
    {
        self.methods.insert(name.into(), Box::new(handler));
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub async fn handle_request(&self, body: &[u8]) -> Result<Value, RpcResponseError> {
        let request = self.parse_request(body)?;
        self.execute_method(request).await
    }

    pub fn parse_request(&self, body: &[u8]) -> Result<RpcRequest, RpcResponseError> {
        let request: RpcRequest = serde_json::from_slice(body)
            .map_err(|_| RpcResponseError::new(None, InternalRpcError::ParseBodyError))?;
        if request.jsonrpc != JSON_RPC_VERSION {
            return Err(RpcResponseError::new(
                request.id,
                InternalRpcError::InvalidVersion,
            ));
        }
        Ok(request)
    }

    pub async fn execute_method(&self, request: RpcRequest) -> Result<Value, RpcResponseError> {
        let handler = match self.methods.get(&request.method) {
            Some(handler) => handler,
            None => {
                return Err(RpcResponseError::new(
                    request.id,
                    InternalRpcError::MethodNotFound(request.method),
                ))
            }
        };

        if log::log_enabled!(log::Level::Trace) {
            trace!("executing '{}' RPC method", request.method);
        }

        let params = request.params.unwrap_or(Value::Null);
        let result = handler(self.data.clone(), params)
            .await
            .map_err(|err| RpcResponseError::new(request.id.clone(), err))?;

        serde_json::to_value(RpcResponse::new(&request.id, result))
            .map_err(|err| RpcResponseError::new(request.id.clone(), err))
    }
}

pub fn parse_params<P: DeserializeOwned>(value: Value) -> Result<P, InternalRpcError> {
    serde_json::from_value(value).map_err(InternalRpcError::InvalidJSONParams)
}

pub fn require_no_params(value: Value) -> Result<(), InternalRpcError> {
    let empty = match &value {
        Value::Null => true,
        Value::Array(values) => values.is_empty(),
        Value::Object(values) => values.is_empty(),
        _ => false,
    };

    if !empty {
        return Err(InternalRpcError::UnexpectedParams);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn echo(prefix: String, body: Value) -> RpcResult {
        let value: String = parse_params(body)?;
        Ok(json!(format!("{}{}", prefix, value)))
    }

    async fn ping(_: String, body: Value) -> RpcResult {
        require_no_params(body)?;
        Ok(json!("pong"))
    }

    fn handler() -> RPCHandler<String> {
        let mut handler = RPCHandler::new("vela:".to_string());
        handler.register_method("echo", async_handler!(echo));
        handler.register_method("ping", async_handler!(ping));
        handler
    }

    #[tokio::test]
    async fn test_dispatch() {
        let handler = handler();
        let body = json!({"jsonrpc": "2.0", "id": 1, "method": "echo", "params": "hi"});
        let response = handler
            .handle_request(body.to_string().as_bytes())
            .await
            .unwrap();
        assert_eq!(response["result"], json!("vela:hi"));
        assert_eq!(response["id"], json!(1));
    }

    #[tokio::test]
    async fn test_error_codes() {
        let handler = handler();

        let err = handler.handle_request(b"not json").await.unwrap_err();
        assert_eq!(err.get_error().get_code(), -32700);

        let body = json!({"jsonrpc": "1.0", "id": 1, "method": "ping"});
        let err = handler
            .handle_request(body.to_string().as_bytes())
            .await
            .unwrap_err();
        assert_eq!(err.get_error().get_code(), -32600);

        let body = json!({"jsonrpc": "2.0", "id": 2, "method": "missing"});
        let err = handler
            .handle_request(body.to_string().as_bytes())
            .await
            .unwrap_err();
        assert_eq!(err.get_error().get_code(), -32601);
        assert_eq!(err.to_json()["id"], json!(2));

        let body = json!({"jsonrpc": "2.0", "id": 3, "method": "ping", "params": [1]});
        let err = handler
            .handle_request(body.to_string().as_bytes())
            .await
            .unwrap_err();
        assert_eq!(err.get_error().get_code(), -32602);
    }
}
