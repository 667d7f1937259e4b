//! JSON-RPC Ledger Client Adapter
//!
//! Implements the `LedgerClient` port over the ledger node's HTTP JSON-RPC
//! endpoint (`{protocol}://{host}:{port}/{route}`).

use crate::domain::LedgerError;
use crate::ports::LedgerClient;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use shared_types::{
    encode_hex, parse_quantity, Address, Bytes, Hash, LogEntry, Receipt, TransactionHandle,
    UnsignedTransaction, U256,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Methods whose RPC errors mean the ledger refused the transaction.
const SUBMISSION_METHODS: [&str; 2] = ["eth_sendTransaction", "eth_sendRawTransaction"];

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcTransaction {
    from: Address,
    nonce: String,
}

/// HTTP JSON-RPC ledger client.
pub struct JsonRpcLedgerClient {
    http: reqwest::Client,
    endpoint: String,
    next_id: AtomicU64,
}

impl JsonRpcLedgerClient {
    /// Client for an endpoint URL with a per-request timeout.
    pub fn new(endpoint: impl Into<String>, request_timeout: Duration) -> Result<Self, LedgerError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| LedgerError::Unavailable(e.to_string()))?;
        let endpoint = endpoint.into();
        info!(endpoint = %endpoint, "[lo-01] JSON-RPC ledger client created");
        Ok(Self {
            http,
            endpoint,
            next_id: AtomicU64::new(1),
        })
    }

    /// Endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, LedgerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!(method, id, "[lo-01] RPC request");

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LedgerError::Unavailable(format!("{method}: http status {status}")));
        }

        let reply: RpcResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::Decode(format!("{method}: {e}")))?;

        if let Some(err) = reply.error {
            warn!(method, code = err.code, message = %err.message, "[lo-01] RPC error");
            if SUBMISSION_METHODS.contains(&method) {
                return Err(LedgerError::Rejected(err.message));
            }
            return Err(LedgerError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        serde_json::from_value(reply.result.unwrap_or(Value::Null))
            .map_err(|e| LedgerError::Decode(format!("{method}: {e}")))
    }

    async fn quantity(&self, method: &str, params: Value) -> Result<u64, LedgerError> {
        let raw: String = self.request(method, params).await?;
        parse_quantity(&raw).map_err(LedgerError::Decode)
    }
}

fn hex_quantity(value: u64) -> String {
    format!("{value:#x}")
}

#[async_trait]
impl LedgerClient for JsonRpcLedgerClient {
    async fn list_managed_accounts(&self) -> Result<Vec<Address>, LedgerError> {
        self.request("eth_accounts", json!([])).await
    }

    async fn balance_of(&self, account: Address) -> Result<U256, LedgerError> {
        self.request("eth_getBalance", json!([account, "latest"])).await
    }

    async fn block_number(&self) -> Result<u64, LedgerError> {
        self.quantity("eth_blockNumber", json!([])).await
    }

    async fn transaction_count(&self, account: Address) -> Result<u64, LedgerError> {
        self.quantity("eth_getTransactionCount", json!([account, "pending"]))
            .await
    }

    async fn submit_raw_transaction(
        &self,
        payload: &[u8],
    ) -> Result<TransactionHandle, LedgerError> {
        let hash: Hash = self
            .request("eth_sendRawTransaction", json!([encode_hex(payload)]))
            .await?;

        // The payload is opaque here; the node tells us who signed it.
        let tx: Option<RpcTransaction> = self
            .request("eth_getTransactionByHash", json!([hash]))
            .await?;
        let tx = tx.ok_or_else(|| LedgerError::Decode(format!("transaction {hash} not found after submission")))?;
        let nonce = parse_quantity(&tx.nonce).map_err(LedgerError::Decode)?;

        Ok(TransactionHandle {
            hash,
            from: tx.from,
            nonce,
        })
    }

    async fn sign_and_submit(
        &self,
        tx: &UnsignedTransaction,
    ) -> Result<TransactionHandle, LedgerError> {
        let params = json!([{
            "from": tx.from,
            "to": tx.to,
            "data": tx.data,
            "gas": hex_quantity(tx.gas_limit),
            "gasPrice": tx.gas_price,
            "nonce": hex_quantity(tx.nonce),
            "value": tx.value,
        }]);
        let hash: Hash = self.request("eth_sendTransaction", params).await?;
        Ok(TransactionHandle {
            hash,
            from: tx.from,
            nonce: tx.nonce,
        })
    }

    async fn transaction_receipt(&self, hash: Hash) -> Result<Option<Receipt>, LedgerError> {
        self.request("eth_getTransactionReceipt", json!([hash])).await
    }

    async fn query_logs(
        &self,
        contract: Address,
        topics: &[Option<Hash>],
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<LogEntry>, LedgerError> {
        let params = json!([{
            "address": contract,
            "fromBlock": hex_quantity(from_block),
            "toBlock": hex_quantity(to_block),
            "topics": topics,
        }]);
        self.request("eth_getLogs", params).await
    }

    async fn call(&self, to: Address, data: &[u8]) -> Result<Bytes, LedgerError> {
        self.request(
            "eth_call",
            json!([{ "to": to, "data": encode_hex(data) }, "latest"]),
        )
        .await
    }

    async fn unlock_account(
        &self,
        account: Address,
        password: &str,
        duration: Duration,
    ) -> Result<(), LedgerError> {
        let unlocked: bool = self
            .request(
                "personal_unlockAccount",
                json!([account, password, duration.as_secs()]),
            )
            .await?;
        if !unlocked {
            return Err(LedgerError::Rejected(format!("could not unlock {account}")));
        }
        info!(account = %account, "[lo-01] Account unlocked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::Mutex;

    /// One-shot HTTP responder that records the request body.
    async fn serve_once(reply: Value) -> (String, Arc<Mutex<Option<Value>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = Arc::clone(&seen);

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            let body = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf).to_string();
                if let Some(split) = text.find("\r\n\r\n") {
                    let length = text[..split]
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if buf.len() >= split + 4 + length {
                        break buf[split + 4..split + 4 + length].to_vec();
                    }
                }
                if n == 0 {
                    break Vec::new();
                }
            };
            *seen_clone.lock().await = serde_json::from_slice(&body).ok();

            let payload = reply.to_string();
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                payload.len(),
                payload
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });

        (url, seen)
    }

    fn client(url: &str) -> JsonRpcLedgerClient {
        JsonRpcLedgerClient::new(url, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_transaction_count_requests_pending() {
        let (url, seen) = serve_once(json!({"jsonrpc": "2.0", "id": 1, "result": "0x1a"})).await;
        let count = client(&url).transaction_count(Address([1; 20])).await.unwrap();
        assert_eq!(count, 26);

        let request = seen.lock().await.clone().unwrap();
        assert_eq!(request["method"], "eth_getTransactionCount");
        assert_eq!(request["params"][1], "pending");
    }

    #[tokio::test]
    async fn test_submission_error_is_rejection() {
        let (url, _) = serve_once(json!({
            "jsonrpc": "2.0", "id": 1,
            "error": {"code": -32000, "message": "insufficient funds for gas * price + value"}
        }))
        .await;
        let tx = UnsignedTransaction::assemble(
            Address([1; 20]),
            &shared_types::ContractCall::new(Address([2; 20]), vec![]),
            &shared_types::FeePolicy::default(),
            0,
        );
        let result = client(&url).sign_and_submit(&tx).await;
        assert!(matches!(result, Err(LedgerError::Rejected(msg)) if msg.contains("insufficient")));
    }

    #[tokio::test]
    async fn test_query_error_is_rpc_error() {
        let (url, _) = serve_once(json!({
            "jsonrpc": "2.0", "id": 1,
            "error": {"code": -32601, "message": "method not found"}
        }))
        .await;
        let result = client(&url).block_number().await;
        assert!(matches!(result, Err(LedgerError::Rpc { code: -32601, .. })));
    }

    #[tokio::test]
    async fn test_pending_receipt_is_none() {
        let (url, _) = serve_once(json!({"jsonrpc": "2.0", "id": 1, "result": null})).await;
        let receipt = client(&url).transaction_receipt(Hash([3; 32])).await.unwrap();
        assert!(receipt.is_none());
    }

    #[tokio::test]
    async fn test_log_filter_shape() {
        let (url, seen) = serve_once(json!({"jsonrpc": "2.0", "id": 1, "result": []})).await;
        let topics = vec![Some(Hash([7; 32])), None, Some(Hash([8; 32]))];
        let logs = client(&url)
            .query_logs(Address([4; 20]), &topics, 10, 12)
            .await
            .unwrap();
        assert!(logs.is_empty());

        let request = seen.lock().await.clone().unwrap();
        let filter = &request["params"][0];
        assert_eq!(filter["fromBlock"], "0xa");
        assert_eq!(filter["toBlock"], "0xc");
        assert!(filter["topics"][1].is_null());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        let client = client("http://127.0.0.1:1/");
        let result = client.list_managed_accounts().await;
        assert!(matches!(result, Err(LedgerError::Unavailable(_))));
    }
}
