//! JSON-RPC over HTTP to `monero-wallet-rpc`.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use reqwest::StatusCode;
use serde_json::Value;
use tokio::sync::Mutex;

use super::digest::Challenge;
use super::{RpcRequest, WalletRpc};
use crate::error::RpcError;

const RPC_PATH: &str = "/json_rpc";

/// Where and how to reach the wallet.
#[derive(Debug, Clone)]
pub struct Endpoint {
    /// Host name or IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// RPC login user.
    pub user: String,
    /// RPC login password.
    pub password: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Endpoint {
    fn url(&self) -> String {
        format!("http://{}:{}{RPC_PATH}", self.host, self.port)
    }

    fn display(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Wallet client speaking HTTP Digest-authenticated JSON-RPC.
pub struct HttpWallet {
    endpoint: Endpoint,
    client: reqwest::Client,
    // last challenge and nonce count, reused until the server asks again
    auth: Mutex<Option<(Challenge, u32)>>,
}

impl HttpWallet {
    /// Build a client for `endpoint`.
    pub fn new(endpoint: Endpoint) -> Result<Self, RpcError> {
        let client = reqwest::Client::builder()
            .timeout(endpoint.timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| RpcError::Transport {
                endpoint: endpoint.display(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            endpoint,
            client,
            auth: Mutex::new(None),
        })
    }

    async fn post(&self, body: &Value, authorization: Option<String>) -> Result<reqwest::Response, RpcError> {
        let mut req = self.client.post(self.endpoint.url()).json(body);
        if let Some(value) = authorization {
            req = req.header(AUTHORIZATION, value);
        }
        req.send().await.map_err(|e| self.transport(e))
    }

    async fn next_authorization(&self) -> Option<String> {
        let mut guard = self.auth.lock().await;
        let (challenge, nc) = guard.as_mut()?;
        *nc += 1;
        let cnonce = hex::encode(rand::random::<[u8; 8]>());
        Some(challenge.authorization(
            &self.endpoint.user,
            &self.endpoint.password,
            "POST",
            RPC_PATH,
            &cnonce,
            *nc,
        ))
    }

    fn transport(&self, e: reqwest::Error) -> RpcError {
        RpcError::Transport {
            endpoint: self.endpoint.display(),
            reason: e.to_string(),
        }
    }
}

#[async_trait]
impl WalletRpc for HttpWallet {
    async fn call(&self, request: &RpcRequest) -> Result<Value, RpcError> {
        let method = request.method();
        let body = request.frame();

        let mut resp = self.post(&body, self.next_authorization().await).await?;

        if resp.status() == StatusCode::UNAUTHORIZED {
            let challenge = resp
                .headers()
                .get_all(WWW_AUTHENTICATE)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .find_map(Challenge::parse)
                .ok_or_else(|| RpcError::Transport {
                    endpoint: self.endpoint.display(),
                    reason: "401 without a usable Digest challenge".into(),
                })?;
            tracing::debug!(realm = %challenge.realm, "answering digest challenge");
            *self.auth.lock().await = Some((challenge, 0));
            resp = self.post(&body, self.next_authorization().await).await?;
        }

        let status = resp.status();
        if !status.is_success() {
            return Err(RpcError::Transport {
                endpoint: self.endpoint.display(),
                reason: format!("HTTP {status}"),
            });
        }

        let reply: Value = resp.json().await.map_err(|e| self.transport(e))?;
        tracing::trace!(method, %reply, "wallet reply");
        unwrap_envelope(method, reply)
    }
}

/// Pull `result` out of a JSON-RPC reply, or turn `error` into [`RpcError`].
pub fn unwrap_envelope(method: &'static str, mut reply: Value) -> Result<Value, RpcError> {
    if let Some(err) = reply.get("error") {
        return Err(RpcError::Remote {
            method,
            code: err.get("code").and_then(Value::as_i64).unwrap_or_default(),
            message: err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_owned(),
        });
    }
    match reply.get_mut("result") {
        Some(result) => Ok(result.take()),
        None => Err(RpcError::malformed(method, "reply has neither result nor error")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn result_is_unwrapped() {
        let r = unwrap_envelope("get_height", json!({"id": "0", "jsonrpc": "2.0", "result": {"height": 7}}));
        assert_eq!(r.unwrap(), json!({"height": 7}));
    }

    #[test]
    fn error_object_becomes_remote_error() {
        let r = unwrap_envelope(
            "get_transfer_by_txid",
            json!({"error": {"code": -8, "message": "Transaction not found."}}),
        );
        match r {
            Err(RpcError::Remote { code, message, .. }) => {
                assert_eq!(code, -8);
                assert_eq!(message, "Transaction not found.");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_envelope_is_malformed() {
        assert!(matches!(
            unwrap_envelope("get_balance", json!({"id": "0"})),
            Err(RpcError::Malformed { .. })
        ));
    }
}
