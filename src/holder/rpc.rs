//! `getTokenAccountsByOwner` over JSON-RPC.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde_json::{json, Value};
use thiserror::Error;

use super::{CollectionDescriptor, HoldingResult};

pub const DEFAULT_RPC_ENDPOINT: &str = "https://api.mainnet-beta.solana.com";

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("RPC status {0}")]
    Status(u16),
    #[error("RPC transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("RPC decode: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Sends one JSON-RPC request and returns the decoded response body.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn call(&self, request: &Value) -> Result<Value, RpcError>;
}

#[derive(Clone, Debug)]
pub struct HttpTransport {
    url: String,
    client: Client,
}

impl HttpTransport {
    /// `timeout` of `None` leaves requests unbounded.
    pub fn new(url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, RpcError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let url = url.into();
        info!("🌐 [RPC] Using endpoint {}", url);
        Ok(Self {
            url,
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn call(&self, request: &Value) -> Result<Value, RpcError> {
        let res = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(RpcError::Status(status.as_u16()));
        }
        let body = res.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

pub fn token_accounts_request(owner: &str, mint: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": format!("holder-check-{mint}"),
        "method": "getTokenAccountsByOwner",
        "params": [
            owner,
            { "mint": mint },
            { "encoding": "jsonParsed" }
        ]
    })
}

/// True when any returned token account has a positive UI amount. Missing
/// fields count as zero.
pub fn holds_any(response: &Value) -> bool {
    response
        .get("result")
        .and_then(|r| r.get("value"))
        .and_then(Value::as_array)
        .map(|accounts| {
            accounts.iter().any(|account| {
                account
                    .pointer("/account/data/parsed/info/tokenAmount/uiAmount")
                    .and_then(Value::as_f64)
                    .unwrap_or(0.0)
                    > 0.0
            })
        })
        .unwrap_or(false)
}

fn rpc_error(response: &Value) -> Option<RpcError> {
    let error = response.get("error")?;
    Some(RpcError::Rpc {
        code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
        message: error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string(),
    })
}

/// Holding status of `owner` for one collection. Placeholder mints resolve
/// without touching the network.
pub async fn fetch_holding(
    transport: &dyn RpcTransport,
    owner: &str,
    collection: &CollectionDescriptor,
) -> Result<HoldingResult, RpcError> {
    if collection.is_placeholder() {
        debug!("⏳ [HOLDER] {} has no published mint", collection.name);
        return Ok(HoldingResult::pending());
    }

    let response = transport
        .call(&token_accounts_request(owner, &collection.mint))
        .await?;
    if let Some(err) = rpc_error(&response) {
        return Err(err);
    }
    Ok(HoldingResult::found(holds_any(&response)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    const OWNER: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
    const MINT: &str = "So11111111111111111111111111111111111111112";

    fn account(ui_amount: Value) -> Value {
        json!({
            "pubkey": "acct",
            "account": { "data": { "parsed": { "info": {
                "tokenAmount": { "uiAmount": ui_amount }
            } } } }
        })
    }

    fn response(accounts: Vec<Value>) -> Value {
        json!({ "jsonrpc": "2.0", "id": "x", "result": { "value": accounts } })
    }

    #[test]
    fn request_shape() {
        let req = token_accounts_request(OWNER, MINT);
        assert_eq!(req["method"], "getTokenAccountsByOwner");
        assert_eq!(req["id"], format!("holder-check-{MINT}"));
        assert_eq!(req["params"][0], OWNER);
        assert_eq!(req["params"][1]["mint"], MINT);
        assert_eq!(req["params"][2]["encoding"], "jsonParsed");
    }

    #[test]
    fn one_positive_account_is_enough() {
        let body = response(vec![account(json!(0)), account(json!(1)), account(json!(0.0))]);
        assert!(holds_any(&body));
    }

    #[test]
    fn zero_empty_or_malformed_is_not_holding() {
        assert!(!holds_any(&response(vec![account(json!(0)), account(json!(0.0))])));
        assert!(!holds_any(&response(vec![])));
        assert!(!holds_any(&response(vec![account(Value::Null), json!({})])));
        assert!(!holds_any(&json!({ "result": null })));
    }

    struct Unreachable;

    #[async_trait]
    impl RpcTransport for Unreachable {
        async fn call(&self, _: &Value) -> Result<Value, RpcError> {
            panic!("placeholder mints must not hit the network");
        }
    }

    #[tokio::test]
    async fn placeholder_mint_skips_network() {
        for owner in [OWNER, "", "anything"] {
            let collection =
                CollectionDescriptor::new("Founders Badge", "INSERT_FOUNDERS_BADGE_MINT", "");
            let result = fetch_holding(&Unreachable, owner, &collection).await.unwrap();
            assert_eq!(result, HoldingResult::pending());
        }
    }

    async fn serve(app: Router) -> SocketAddr {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let server = axum::Server::bind(&addr).serve(app.into_make_service());
        let addr = server.local_addr();
        tokio::spawn(server);
        addr
    }

    #[tokio::test]
    async fn http_transport_round_trip() {
        let seen: Arc<Mutex<Vec<Value>>> = Arc::default();
        let log = Arc::clone(&seen);
        let app = Router::new().route(
            "/",
            post(move |Json(body): Json<Value>| {
                let log = Arc::clone(&log);
                async move {
                    log.lock().unwrap().push(body);
                    Json(response(vec![account(json!(2))]))
                }
            }),
        );
        let addr = serve(app).await;

        let transport = HttpTransport::new(format!("http://{addr}/"), None).unwrap();
        let collection = CollectionDescriptor::new("Nether Utilities", MINT, "");
        let result = fetch_holding(&transport, OWNER, &collection).await.unwrap();

        assert!(result.found);
        let requests = seen.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0]["params"][1]["mint"], MINT);
    }

    #[tokio::test]
    async fn http_status_failure_is_reported() {
        let app = Router::new().route("/", post(|| async { StatusCode::SERVICE_UNAVAILABLE }));
        let addr = serve(app).await;

        let transport = HttpTransport::new(format!("http://{addr}/"), None).unwrap();
        let collection = CollectionDescriptor::new("Nether Utilities", MINT, "");
        let err = fetch_holding(&transport, OWNER, &collection).await.unwrap_err();
        assert!(matches!(err, RpcError::Status(503)));
        assert_eq!(err.to_string(), "RPC status 503");
    }

    #[tokio::test]
    async fn non_json_body_is_a_decode_error() {
        let app = Router::new().route("/", post(|| async { "<html>rate limited</html>" }));
        let addr = serve(app).await;

        let transport = HttpTransport::new(format!("http://{addr}/"), None).unwrap();
        let collection = CollectionDescriptor::new("Nether Utilities", MINT, "");
        let err = fetch_holding(&transport, OWNER, &collection).await.unwrap_err();
        assert!(matches!(err, RpcError::Decode(_)));
    }

    #[tokio::test]
    async fn rpc_error_object_is_an_error() {
        let app = Router::new().route(
            "/",
            post(|| async {
                Json(json!({
                    "jsonrpc": "2.0",
                    "id": "x",
                    "error": { "code": -32602, "message": "Invalid param: could not find mint" }
                }))
            }),
        );
        let addr = serve(app).await;

        let transport = HttpTransport::new(format!("http://{addr}/"), None).unwrap();
        let collection = CollectionDescriptor::new("Nether Utilities", MINT, "");
        let err = fetch_holding(&transport, OWNER, &collection).await.unwrap_err();
        assert!(matches!(err, RpcError::Rpc { code: -32602, .. }));
    }
}
