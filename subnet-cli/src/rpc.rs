//! Remote node API.
//!
//! [`PlatformApi`] is the set of node calls the tool depends on.
//! [`HttpPlatformClient`] implements it over JSON-RPC 2.0 on the node's
//! `/ext/P`, `/ext/info` and `/ext/bc/<chain>` endpoints.

use crate::{
    formatting::{hex_decode, hex_encode, FormattingError},
    ids::{Id, NodeId},
};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::{
    fmt,
    str::FromStr,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};
use tracing::trace;
use url::Url;

/// Default timeout for a single request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const PLATFORM_ENDPOINT: &str = "/ext/P";
const INFO_ENDPOINT: &str = "/ext/info";
const CHAIN_ENDPOINT_PREFIX: &str = "/ext/bc/";

/// Encoding requested for binary payloads.
const ENCODING: &str = "hex";

/// JSON-RPC request ID counter
static REQUEST_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP error: {0}")]
    Status(reqwest::StatusCode),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Missing result in RPC response")]
    MissingResult,

    #[error("Malformed response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Bad payload encoding: {0}")]
    Formatting(#[from] FormattingError),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Fee schedule reported by the node, in nDJTX.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxFees {
    #[serde(deserialize_with = "decimal")]
    pub tx_fee: u64,
    #[serde(deserialize_with = "decimal")]
    pub create_subnet_tx_fee: u64,
    #[serde(deserialize_with = "decimal")]
    pub create_blockchain_tx_fee: u64,
    /// Not reported by older nodes.
    #[serde(default, deserialize_with = "optional_decimal")]
    pub add_primary_network_validator_fee: Option<u64>,
}

/// Status of a submitted transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TxStatus {
    Committed,
    Aborted,
    Processing,
    Dropped,
    /// Not known to the node, possibly not yet indexed.
    Unknown,
}

impl TxStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TxStatus::Committed | TxStatus::Aborted | TxStatus::Dropped)
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TxStatus::Committed => "Committed",
            TxStatus::Aborted => "Aborted",
            TxStatus::Processing => "Processing",
            TxStatus::Dropped => "Dropped",
            TxStatus::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

impl FromStr for TxStatus {
    type Err = RpcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Committed" => Ok(TxStatus::Committed),
            "Aborted" => Ok(TxStatus::Aborted),
            "Processing" => Ok(TxStatus::Processing),
            "Dropped" => Ok(TxStatus::Dropped),
            "Unknown" => Ok(TxStatus::Unknown),
            other => Err(RpcError::Malformed(format!("unknown tx status {other:?}"))),
        }
    }
}

/// Operational status of a blockchain on the queried node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockchainStatus {
    Validating,
    Created,
    Preferred,
    Syncing,
    UnknownChain,
}

impl fmt::Display for BlockchainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BlockchainStatus::Validating => "Validating",
            BlockchainStatus::Created => "Created",
            BlockchainStatus::Preferred => "Preferred",
            BlockchainStatus::Syncing => "Syncing",
            BlockchainStatus::UnknownChain => "UnknownChain",
        };
        f.write_str(s)
    }
}

impl FromStr for BlockchainStatus {
    type Err = RpcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Validating" => Ok(BlockchainStatus::Validating),
            "Created" => Ok(BlockchainStatus::Created),
            "Preferred" => Ok(BlockchainStatus::Preferred),
            "Syncing" => Ok(BlockchainStatus::Syncing),
            "UnknownChain" => Ok(BlockchainStatus::UnknownChain),
            other => Err(RpcError::Malformed(format!(
                "unknown blockchain status {other:?}"
            ))),
        }
    }
}

/// Position to resume a UTXO listing from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoIndex {
    pub address: String,
    pub utxo: String,
}

/// One page of raw UTXO bytes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UtxoPage {
    pub utxos: Vec<Vec<u8>>,
    pub end_index: Option<UtxoIndex>,
}

/// Node calls used by the client.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PlatformApi: Send + Sync {
    /// `info.getNetworkName`
    async fn network_name(&self) -> Result<String, RpcError>;

    /// `info.getBlockchainID`
    async fn blockchain_id(&self, alias: &str) -> Result<Id, RpcError>;

    /// `avm.getAssetDescription` on the exchange chain reached via `chain`.
    async fn asset_id(&self, chain: &str, symbol: &str) -> Result<Id, RpcError>;

    /// `info.getTxFee`
    async fn tx_fees(&self) -> Result<TxFees, RpcError>;

    /// `info.isBootstrapped`
    async fn is_bootstrapped(&self, chain: &str) -> Result<bool, RpcError>;

    /// `platform.getBalance` for one formatted address.
    async fn balance(&self, address: &str) -> Result<u64, RpcError>;

    /// `platform.getUTXOs`
    async fn utxos(
        &self,
        addresses: &[String],
        limit: u32,
        start: Option<UtxoIndex>,
    ) -> Result<UtxoPage, RpcError>;

    /// `platform.issueTx`, returning the ID the node assigned.
    async fn issue_tx(&self, tx: &[u8]) -> Result<Id, RpcError>;

    /// `platform.getTx`, returning signed bytes.
    async fn get_tx(&self, tx_id: Id) -> Result<Vec<u8>, RpcError>;

    /// `platform.getTxStatus`
    async fn tx_status(&self, tx_id: Id) -> Result<TxStatus, RpcError>;

    /// `platform.getCurrentValidators`, as raw records.
    async fn current_validators(
        &self,
        subnet_id: Id,
        node_ids: &[NodeId],
    ) -> Result<Vec<Value>, RpcError>;

    /// `platform.getBlockchainStatus`
    async fn blockchain_status(&self, blockchain_id: Id) -> Result<BlockchainStatus, RpcError>;
}

/// Deserialize a decimal-string integer.
fn decimal<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    let s = String::deserialize(d)?;
    s.parse().map_err(serde::de::Error::custom)
}

fn optional_decimal<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    match Option::<String>::deserialize(d)? {
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// JSON-RPC 2.0 request
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: u64,
}

/// JSON-RPC 2.0 response
#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct BalanceReply {
    #[serde(deserialize_with = "decimal")]
    balance: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UtxosReply {
    utxos: Vec<String>,
    end_index: Option<UtxoIndex>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TxIdReply {
    #[serde(rename = "txID")]
    tx_id: String,
}

#[derive(Deserialize)]
struct TxReply {
    tx: String,
}

#[derive(Deserialize)]
struct StatusReply {
    status: String,
}

#[derive(Deserialize)]
struct ValidatorsReply {
    validators: Vec<Value>,
}

#[derive(Deserialize)]
struct NetworkNameReply {
    #[serde(rename = "networkName")]
    network_name: String,
}

#[derive(Deserialize)]
struct BlockchainIdReply {
    #[serde(rename = "blockchainID")]
    blockchain_id: String,
}

#[derive(Deserialize)]
struct AssetReply {
    #[serde(rename = "assetID")]
    asset_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BootstrappedReply {
    is_bootstrapped: bool,
}

fn parse_id(s: &str) -> Result<Id, RpcError> {
    Ok(s.parse()?)
}

/// JSON-RPC client for one node.
#[derive(Clone, Debug)]
pub struct HttpPlatformClient {
    http: reqwest::Client,
    base: Url,
}

impl HttpPlatformClient {
    pub fn new(base: Url, timeout: Duration) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    async fn call<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        method: &str,
        params: Value,
    ) -> Result<T, RpcError> {
        let url = self.base.join(endpoint)?;
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: REQUEST_ID.fetch_add(1, Ordering::SeqCst),
        };
        trace!(%url, method, "sending request");

        let response = self.http.post(url).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(RpcError::Status(response.status()));
        }

        let reply: JsonRpcResponse<T> = response.json().await?;
        if let Some(error) = reply.error {
            return Err(RpcError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        reply.result.ok_or(RpcError::MissingResult)
    }
}

#[async_trait]
impl PlatformApi for HttpPlatformClient {
    async fn network_name(&self) -> Result<String, RpcError> {
        let reply: NetworkNameReply = self
            .call(INFO_ENDPOINT, "info.getNetworkName", json!({}))
            .await?;
        Ok(reply.network_name)
    }

    async fn blockchain_id(&self, alias: &str) -> Result<Id, RpcError> {
        let reply: BlockchainIdReply = self
            .call(INFO_ENDPOINT, "info.getBlockchainID", json!({ "alias": alias }))
            .await?;
        parse_id(&reply.blockchain_id)
    }

    async fn asset_id(&self, chain: &str, symbol: &str) -> Result<Id, RpcError> {
        let endpoint = format!("{CHAIN_ENDPOINT_PREFIX}{chain}");
        let reply: AssetReply = self
            .call(&endpoint, "avm.getAssetDescription", json!({ "assetID": symbol }))
            .await?;
        parse_id(&reply.asset_id)
    }

    async fn tx_fees(&self) -> Result<TxFees, RpcError> {
        self.call(INFO_ENDPOINT, "info.getTxFee", json!({})).await
    }

    async fn is_bootstrapped(&self, chain: &str) -> Result<bool, RpcError> {
        let reply: BootstrappedReply = self
            .call(INFO_ENDPOINT, "info.isBootstrapped", json!({ "chain": chain }))
            .await?;
        Ok(reply.is_bootstrapped)
    }

    async fn balance(&self, address: &str) -> Result<u64, RpcError> {
        let reply: BalanceReply = self
            .call(
                PLATFORM_ENDPOINT,
                "platform.getBalance",
                json!({ "addresses": [address] }),
            )
            .await?;
        Ok(reply.balance)
    }

    async fn utxos(
        &self,
        addresses: &[String],
        limit: u32,
        start: Option<UtxoIndex>,
    ) -> Result<UtxoPage, RpcError> {
        let mut params = json!({
            "addresses": addresses,
            "limit": limit,
            "encoding": ENCODING,
        });
        if let Some(start) = start {
            params["startIndex"] = serde_json::to_value(start)?;
        }
        let reply: UtxosReply = self
            .call(PLATFORM_ENDPOINT, "platform.getUTXOs", params)
            .await?;
        let utxos = reply
            .utxos
            .iter()
            .map(|utxo| hex_decode(utxo))
            .collect::<Result<_, _>>()?;
        Ok(UtxoPage {
            utxos,
            end_index: reply.end_index,
        })
    }

    async fn issue_tx(&self, tx: &[u8]) -> Result<Id, RpcError> {
        let reply: TxIdReply = self
            .call(
                PLATFORM_ENDPOINT,
                "platform.issueTx",
                json!({ "tx": hex_encode(tx), "encoding": ENCODING }),
            )
            .await?;
        parse_id(&reply.tx_id)
    }

    async fn get_tx(&self, tx_id: Id) -> Result<Vec<u8>, RpcError> {
        let reply: TxReply = self
            .call(
                PLATFORM_ENDPOINT,
                "platform.getTx",
                json!({ "txID": tx_id.to_string(), "encoding": ENCODING }),
            )
            .await?;
        Ok(hex_decode(&reply.tx)?)
    }

    async fn tx_status(&self, tx_id: Id) -> Result<TxStatus, RpcError> {
        let reply: StatusReply = self
            .call(
                PLATFORM_ENDPOINT,
                "platform.getTxStatus",
                json!({ "txID": tx_id.to_string() }),
            )
            .await?;
        reply.status.parse()
    }

    async fn current_validators(
        &self,
        subnet_id: Id,
        node_ids: &[NodeId],
    ) -> Result<Vec<Value>, RpcError> {
        let node_ids: Vec<String> = node_ids.iter().map(ToString::to_string).collect();
        let reply: ValidatorsReply = self
            .call(
                PLATFORM_ENDPOINT,
                "platform.getCurrentValidators",
                json!({ "subnetID": subnet_id.to_string(), "nodeIDs": node_ids }),
            )
            .await?;
        Ok(reply.validators)
    }

    async fn blockchain_status(&self, blockchain_id: Id) -> Result<BlockchainStatus, RpcError> {
        let reply: StatusReply = self
            .call(
                PLATFORM_ENDPOINT,
                "platform.getBlockchainStatus",
                json!({ "blockchainID": blockchain_id.to_string() }),
            )
            .await?;
        reply.status.parse()
    }
}
