//! JSON-RPC fixtures over a wiremock server.

use alloy_primitives::{Address, TxHash, U256};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_sol_types::SolEvent;
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use crate::contract::IDeworld;

/// First well-known development key.
pub(crate) const ANVIL_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub(crate) const ANVIL_ADDRESS: Address =
    alloy_primitives::address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

/// Answers a JSON-RPC request with a fixed `result`, echoing its id.
struct RpcResult(Value);

impl Respond for RpcResult {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": body["id"],
            "result": self.0,
        }))
    }
}

/// Answers a JSON-RPC request with an error object.
struct RpcFailure(i64, &'static str);

impl Respond for RpcFailure {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": body["id"],
            "error": { "code": self.0, "message": self.1 },
        }))
    }
}

pub(crate) struct RpcMock {
    server: MockServer,
}

impl RpcMock {
    pub(crate) async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub(crate) fn url(&self) -> Url {
        self.server.uri().parse().unwrap()
    }

    pub(crate) fn provider(&self) -> DynProvider {
        ProviderBuilder::new().connect_http(self.url()).erased()
    }

    pub(crate) async fn respond(&self, rpc_method: &str, result: Value) {
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": rpc_method })))
            .respond_with(RpcResult(result))
            .mount(&self.server)
            .await;
    }

    /// Mounted ahead of [`respond`](Self::respond) mocks for the same method.
    pub(crate) async fn respond_once(&self, rpc_method: &str, result: Value) {
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": rpc_method })))
            .respond_with(RpcResult(result))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&self.server)
            .await;
    }

    pub(crate) async fn fail(&self, rpc_method: &str, code: i64, message: &'static str) {
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": rpc_method })))
            .respond_with(RpcFailure(code, message))
            .mount(&self.server)
            .await;
    }

    /// Bodies of every request received for `rpc_method`.
    pub(crate) async fn requests(&self, rpc_method: &str) -> Vec<Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter_map(|r| serde_json::from_slice::<Value>(&r.body).ok())
            .filter(|body| body["method"] == rpc_method)
            .collect()
    }
}

/// A mined receipt at block 16 using 21000 gas at 0.025 gwei, optionally
/// carrying a `Sale(purchase_id)` log from `marketplace`.
pub(crate) fn receipt_json(
    tx_hash: TxHash,
    success: bool,
    sale: Option<(Address, u64)>,
) -> Value {
    let logs: Vec<Value> = sale
        .map(|(marketplace, purchase_id)| {
            let data = IDeworld::Sale {
                purchaseId: U256::from(purchase_id),
                productId: U256::from(1u64),
                buyer: Address::repeat_byte(0xab),
                seller: Address::repeat_byte(0x55),
                totalAmount: U256::from(10_000_000u64),
            }
            .encode_log_data();
            json!({
                "address": marketplace,
                "topics": data.topics(),
                "data": data.data,
                "blockHash": TxHash::repeat_byte(0x0b),
                "blockNumber": "0x10",
                "transactionHash": tx_hash,
                "transactionIndex": "0x0",
                "logIndex": "0x0",
                "removed": false,
            })
        })
        .into_iter()
        .collect();
    json!({
        "transactionHash": tx_hash,
        "status": if success { "0x1" } else { "0x0" },
        "gasUsed": "0x5208",
        "effectiveGasPrice": "0x17d7840",
        "blockNumber": "0x10",
        "blockHash": TxHash::repeat_byte(0x0b),
        "transactionIndex": "0x0",
        "logs": logs,
    })
}
