//! Client facade over one node.
//!
//! [`Client`] resolves the network once at construction and then runs each
//! operator action as one sequence: pre-flight checks, a single UTXO
//! snapshot, coin selection, assembly, submission and confirmation.

use crate::{
    assembler::{Assembler, ChainSpec},
    authorize::authorize,
    checker::{Checker, PollOutcome},
    codec::unmarshal,
    constants::{
        default_stake_amount, network_id, MAX_UTXO_PAGE_SIZE, NATIVE_ASSET_SYMBOL,
        PRIMARY_NETWORK_ID,
    },
    error::{Error, Result},
    ids::{Id, NodeId, ShortId},
    keys::Key,
    rpc::{BlockchainStatus, HttpPlatformClient, PlatformApi, TxStatus},
    stake::{stake, StakeRequest},
    tx::{OutputOwners, Tx, Utxo, Validator},
};
use serde_json::Value;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, info_span, warn, Instrument, Span};
use url::Url;

/// Alias of the exchange chain holding the native asset.
const EXCHANGE_CHAIN_ALIAS: &str = "X";

/// Whether confirmation of a submitted action was observed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Confirmation {
    /// Committed, or for a blockchain, validating and bootstrapped.
    Confirmed,
    /// Submitted, but the poll deadline passed first.
    TimedOut,
    /// Submitted, but polling was cancelled.
    Cancelled,
    /// Submitted without polling.
    Unpolled,
    /// Built and signed but never submitted.
    DryRun,
}

/// Result of an operator action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Receipt {
    /// ID of the transaction. For subnet and blockchain creation this is
    /// also the ID of the new subnet or blockchain.
    pub tx_id: Id,
    pub confirmation: Confirmation,
    pub took: Duration,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CreateSubnetOptions {
    /// Compute the subnet ID without submitting. Default: false.
    pub dry_mode: bool,
}

impl CreateSubnetOptions {
    pub fn with_dry_mode(mut self, dry_mode: bool) -> Self {
        self.dry_mode = dry_mode;
        self
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AddValidatorOptions {
    /// Amount to stake. Default: 2000 DJTX on mainnet, 1 DJTX elsewhere.
    pub stake_amount: Option<u64>,
    /// Delegation fee in parts per million. Default: 0.
    pub reward_shares: u32,
    /// Default: the key's first address.
    pub reward_address: Option<ShortId>,
    /// Default: the key's first address.
    pub change_address: Option<ShortId>,
}

impl AddValidatorOptions {
    pub fn with_stake_amount(mut self, amount: u64) -> Self {
        self.stake_amount = Some(amount);
        self
    }

    pub fn with_reward_shares(mut self, shares: u32) -> Self {
        self.reward_shares = shares;
        self
    }

    pub fn with_reward_address(mut self, address: ShortId) -> Self {
        self.reward_address = Some(address);
        self
    }

    pub fn with_change_address(mut self, address: ShortId) -> Self {
        self.change_address = Some(address);
        self
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AddSubnetValidatorOptions {
    /// Default: the key's first address.
    pub change_address: Option<ShortId>,
}

impl AddSubnetValidatorOptions {
    pub fn with_change_address(mut self, address: ShortId) -> Self {
        self.change_address = Some(address);
        self
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CreateBlockchainOptions {
    /// Wait until the node validates and has bootstrapped the new chain.
    /// Default: false.
    pub poll_status: bool,
}

impl CreateBlockchainOptions {
    pub fn with_poll_status(mut self, poll_status: bool) -> Self {
        self.poll_status = poll_status;
        self
    }
}

/// A validator addition request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValidationWindow {
    pub node_id: NodeId,
    /// Unix seconds.
    pub start: u64,
    /// Unix seconds.
    pub end: u64,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Read a decimal-string field of a validator record.
fn validator_time(record: &Value, field: &str) -> Result<u64> {
    record
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::InvalidValidatorData(format!("missing {field}")))?
        .parse()
        .map_err(|e| Error::InvalidValidatorData(format!("{field}: {e}")))
}

/// Operator actions against one node.
#[derive(Debug)]
pub struct Client<A = HttpPlatformClient> {
    api: A,
    network_id: u32,
    network_name: String,
    asset_id: Id,
    assembler: Assembler,
    checker: Checker,
    span: Span,
}

impl Client<HttpPlatformClient> {
    /// Connect to the node at `uri` over HTTP.
    pub async fn connect(uri: &str, request_timeout: Duration, checker: Checker) -> Result<Self> {
        if uri.is_empty() {
            return Err(Error::EmptyUri);
        }
        let url = Url::parse(uri)?;
        let api = HttpPlatformClient::new(url.clone(), request_timeout)?;
        Self::with_api(api, &url, checker).await
    }
}

impl<A: PlatformApi> Client<A> {
    /// Resolve the network behind `api`.
    ///
    /// `url` decides how the exchange chain is addressed: by alias when the
    /// URL has no explicit port (a public gateway), by chain ID otherwise.
    pub async fn with_api(api: A, url: &Url, checker: Checker) -> Result<Self> {
        if checker.interval().is_zero() {
            return Err(Error::InvalidInterval);
        }

        info!("fetching exchange chain ID");
        let x_chain_id = api.blockchain_id(EXCHANGE_CHAIN_ALIAS).await?;
        let x_chain = match url.port() {
            Some(_) => x_chain_id.to_string(),
            None => EXCHANGE_CHAIN_ALIAS.to_string(),
        };

        let asset_id = api.asset_id(&x_chain, NATIVE_ASSET_SYMBOL).await?;
        info!(%asset_id, "fetched {} asset ID", NATIVE_ASSET_SYMBOL);

        let network_name = api.network_name().await?;
        let network_id =
            network_id(&network_name).ok_or_else(|| Error::UnknownNetwork(network_name.clone()))?;
        info!(network_id, network_name = %network_name, "fetched network information");

        let span = info_span!(
            "client",
            endpoint = %url,
            network = %network_name,
            network_id
        );
        Ok(Self {
            api,
            network_id,
            network_name,
            asset_id,
            assembler: Assembler::new(network_id),
            checker,
            span,
        })
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn network_id(&self) -> u32 {
        self.network_id
    }

    pub fn network_name(&self) -> &str {
        &self.network_name
    }

    pub fn asset_id(&self) -> Id {
        self.asset_id
    }

    pub fn checker(&self) -> &Checker {
        &self.checker
    }

    /// Platform-chain balance of the key's first address.
    pub async fn balance(&self, key: &Key) -> Result<u64> {
        Ok(self.api.balance(key.primary_p_address()).await?)
    }

    async fn check_balance(&self, key: &Key, required: u64) -> Result<()> {
        let have = self.balance(key).await?;
        if have < required {
            return Err(Error::InsufficientFunds {
                address: key.primary_p_address().to_string(),
                required,
                have,
            });
        }
        Ok(())
    }

    /// Every UTXO owned by the key's addresses.
    pub async fn fetch_utxos(&self, key: &Key) -> Result<Vec<Utxo>> {
        let addresses = key.p_addresses().to_vec();
        let mut utxos = Vec::new();
        let mut start = None;
        loop {
            let page = self
                .api
                .utxos(&addresses, MAX_UTXO_PAGE_SIZE, start)
                .await?;
            let fetched = page.utxos.len();
            for raw in &page.utxos {
                utxos.push(unmarshal::<Utxo>(raw)?);
            }
            debug!(fetched, total = utxos.len(), "fetched UTXO page");

            if fetched < MAX_UTXO_PAGE_SIZE as usize {
                break;
            }
            match page.end_index {
                Some(end) => start = Some(end),
                None => break,
            }
        }
        Ok(utxos)
    }

    /// Validation window of `node_id` on `subnet_id` (the primary network
    /// when empty).
    pub async fn get_validator(&self, subnet_id: Id, node_id: NodeId) -> Result<(u64, u64)> {
        let subnet_id = if subnet_id.is_empty() {
            PRIMARY_NETWORK_ID
        } else {
            subnet_id
        };
        let records = self.api.current_validators(subnet_id, &[node_id]).await?;
        if records.is_empty() {
            return Err(Error::ValidatorNotFound);
        }

        let wanted = node_id.to_string();
        let mut found = None;
        for record in &records {
            let record_node = record
                .as_object()
                .ok_or_else(|| Error::InvalidValidatorData(format!("not an object: {record}")))?
                .get("nodeID")
                .and_then(Value::as_str)
                .ok_or_else(|| Error::InvalidValidatorData("missing nodeID".to_string()))?;
            if record_node == wanted {
                found = Some(record);
                break;
            }
        }
        let record = found.ok_or(Error::ValidatorNotFound)?;

        Ok((
            validator_time(record, "startTime")?,
            validator_time(record, "endTime")?,
        ))
    }

    /// Poll until `node_id` shows up in the current validators of
    /// `subnet_id`.
    pub async fn wait_validator(
        &self,
        subnet_id: Id,
        node_id: NodeId,
    ) -> Result<PollOutcome<(u64, u64)>> {
        async {
            info!(%node_id, %subnet_id, "waiting for validator to start validating");
            self.checker
                .poll_until(|| async move {
                    match self.get_validator(subnet_id, node_id).await {
                        Ok(window) => Ok(Some(window)),
                        Err(Error::ValidatorNotFound) => Ok(None),
                        Err(e) => Err(e),
                    }
                })
                .await
        }
        .instrument(self.span.clone())
        .await
    }

    async fn issue(&self, tx: &Tx) -> Result<Id> {
        let tx_id = self.api.issue_tx(tx.bytes()).await?;
        if tx_id != tx.id() {
            return Err(Error::UnexpectedTxId {
                expected: tx.id(),
                actual: tx_id,
            });
        }
        info!(%tx_id, "issued transaction");
        Ok(tx_id)
    }

    async fn confirm(&self, tx_id: Id) -> Result<Confirmation> {
        match self.checker.poll_tx(&self.api, tx_id).await? {
            PollOutcome::Done(TxStatus::Committed) => Ok(Confirmation::Confirmed),
            PollOutcome::Done(status) => Err(Error::UnexpectedTxStatus { tx_id, status }),
            PollOutcome::TimedOut => {
                warn!(%tx_id, "transaction submitted but not confirmed before deadline");
                Ok(Confirmation::TimedOut)
            }
            PollOutcome::Cancelled => {
                warn!(%tx_id, "stopped waiting for confirmation");
                Ok(Confirmation::Cancelled)
            }
        }
    }

    /// Create a subnet owned by the key's first address.
    pub async fn create_subnet(&self, key: &Key, opts: CreateSubnetOptions) -> Result<Receipt> {
        async {
            let started = Instant::now();
            let fee = self.api.tx_fees().await?.create_subnet_tx_fee;
            info!(dry_mode = opts.dry_mode, asset_id = %self.asset_id, fee, "creating subnet");
            self.check_balance(key, fee).await?;

            let utxos = self.fetch_utxos(key).await?;
            let funding = stake(
                key,
                &utxos,
                &StakeRequest {
                    asset_id: self.asset_id,
                    stake_amount: 0,
                    fee,
                    change_address: key.primary_address(),
                    now: unix_now(),
                },
            )?;
            let owner = OutputOwners::single(key.primary_address());
            let tx = self.assembler.create_subnet(key, funding, owner)?;

            let subnet_id = tx.id();
            if opts.dry_mode {
                info!(%subnet_id, "dry mode, not submitting");
                return Ok(Receipt {
                    tx_id: subnet_id,
                    confirmation: Confirmation::DryRun,
                    took: started.elapsed(),
                });
            }

            let tx_id = self.issue(&tx).await?;
            let confirmation = self.confirm(tx_id).await?;
            Ok(Receipt {
                tx_id,
                confirmation,
                took: started.elapsed(),
            })
        }
        .instrument(self.span.clone())
        .await
    }

    /// Add `window.node_id` as a primary network validator.
    pub async fn add_validator(
        &self,
        key: &Key,
        window: ValidationWindow,
        opts: AddValidatorOptions,
    ) -> Result<Receipt> {
        async {
            let started = Instant::now();
            let node_id = window.node_id;
            if node_id.is_empty() {
                return Err(Error::EmptyId("node ID"));
            }

            match self.get_validator(PRIMARY_NETWORK_ID, node_id).await {
                Ok(_) => return Err(Error::AlreadyValidator(node_id)),
                Err(Error::ValidatorNotFound) => {}
                Err(e) => return Err(e),
            }

            let stake_amount = match opts.stake_amount {
                Some(amount) if amount > 0 => amount,
                _ => {
                    let amount = default_stake_amount(&self.network_name);
                    info!(stake_amount = amount, "stake amount not set, using network default");
                    amount
                }
            };
            let reward_address = opts.reward_address.unwrap_or_else(|| {
                let address = key.primary_address();
                warn!(%address, "reward address not set, defaulting to self");
                address
            });
            let change_address = opts.change_address.unwrap_or_else(|| {
                let address = key.primary_address();
                warn!(%address, "change address not set, defaulting to self");
                address
            });

            let fee = self
                .api
                .tx_fees()
                .await?
                .add_primary_network_validator_fee
                .unwrap_or_default();
            info!(
                %node_id,
                start = window.start,
                end = window.end,
                stake_amount,
                fee,
                %reward_address,
                %change_address,
                "adding validator"
            );
            self.check_balance(key, stake_amount.saturating_add(fee)).await?;

            let utxos = self.fetch_utxos(key).await?;
            let funding = stake(
                key,
                &utxos,
                &StakeRequest {
                    asset_id: self.asset_id,
                    stake_amount,
                    fee,
                    change_address,
                    now: unix_now(),
                },
            )?;
            let validator = Validator {
                node_id,
                start: window.start,
                end: window.end,
                weight: stake_amount,
            };
            let tx = self.assembler.add_validator(
                key,
                funding,
                validator,
                OutputOwners::single(reward_address),
                opts.reward_shares,
            )?;

            let tx_id = self.issue(&tx).await?;
            let confirmation = self.confirm(tx_id).await?;
            Ok(Receipt {
                tx_id,
                confirmation,
                took: started.elapsed(),
            })
        }
        .instrument(self.span.clone())
        .await
    }

    /// Add `window.node_id` as a validator of `subnet_id` with `weight`.
    ///
    /// The node must already validate the primary network for a window
    /// containing the requested one.
    pub async fn add_subnet_validator(
        &self,
        key: &Key,
        subnet_id: Id,
        window: ValidationWindow,
        weight: u64,
        opts: AddSubnetValidatorOptions,
    ) -> Result<Receipt> {
        async {
            let started = Instant::now();
            let node_id = window.node_id;
            if subnet_id.is_empty() {
                return Err(Error::EmptyId("subnet ID"));
            }
            if node_id.is_empty() {
                return Err(Error::EmptyId("node ID"));
            }

            match self.get_validator(subnet_id, node_id).await {
                Ok(_) => return Err(Error::AlreadySubnetValidator { subnet_id, node_id }),
                Err(Error::ValidatorNotFound) => {}
                Err(e) => return Err(e),
            }

            let (primary_start, primary_end) =
                match self.get_validator(PRIMARY_NETWORK_ID, node_id).await {
                    Ok(primary) => primary,
                    Err(Error::ValidatorNotFound) => {
                        return Err(Error::NotValidatingPrimaryNetwork(node_id))
                    }
                    Err(e) => return Err(e),
                };
            if window.start < primary_start {
                return Err(Error::InvalidValidationPeriod(format!(
                    "start {} is before primary network start {}",
                    window.start, primary_start
                )));
            }
            if window.end > primary_end {
                return Err(Error::InvalidValidationPeriod(format!(
                    "end {} is after primary network end {}",
                    window.end, primary_end
                )));
            }

            let fee = self.api.tx_fees().await?.tx_fee;
            info!(
                %subnet_id,
                %node_id,
                start = window.start,
                end = window.end,
                weight,
                fee,
                "adding subnet validator"
            );
            self.check_balance(key, fee).await?;

            let utxos = self.fetch_utxos(key).await?;
            let funding = stake(
                key,
                &utxos,
                &StakeRequest {
                    asset_id: self.asset_id,
                    stake_amount: 0,
                    fee,
                    change_address: opts.change_address.unwrap_or_else(|| key.primary_address()),
                    now: unix_now(),
                },
            )?;
            let auth = authorize(&self.api, key, subnet_id, unix_now()).await?;
            let validator = Validator {
                node_id,
                start: window.start,
                end: window.end,
                weight,
            };
            let tx = self
                .assembler
                .add_subnet_validator(key, funding, validator, subnet_id, auth)?;

            let tx_id = self.issue(&tx).await?;
            let confirmation = self.confirm(tx_id).await?;
            Ok(Receipt {
                tx_id,
                confirmation,
                took: started.elapsed(),
            })
        }
        .instrument(self.span.clone())
        .await
    }

    /// Create a blockchain on `chain.subnet_id` running `chain.vm_id`.
    pub async fn create_blockchain(
        &self,
        key: &Key,
        chain: ChainSpec,
        opts: CreateBlockchainOptions,
    ) -> Result<Receipt> {
        async {
            let started = Instant::now();
            if chain.subnet_id.is_empty() {
                return Err(Error::EmptyId("subnet ID"));
            }
            if chain.vm_id.is_empty() {
                return Err(Error::EmptyId("VM ID"));
            }

            let fee = self.api.tx_fees().await?.create_blockchain_tx_fee;
            info!(
                subnet_id = %chain.subnet_id,
                chain_name = %chain.chain_name,
                vm_id = %chain.vm_id,
                fee,
                "creating blockchain"
            );
            self.check_balance(key, fee).await?;

            let utxos = self.fetch_utxos(key).await?;
            let funding = stake(
                key,
                &utxos,
                &StakeRequest {
                    asset_id: self.asset_id,
                    stake_amount: 0,
                    fee,
                    change_address: key.primary_address(),
                    now: unix_now(),
                },
            )?;
            let auth = authorize(&self.api, key, chain.subnet_id, unix_now()).await?;
            let tx = self.assembler.create_blockchain(key, funding, chain, auth)?;

            let blockchain_id = self.issue(&tx).await?;
            let confirmation = if opts.poll_status {
                self.confirm_blockchain(blockchain_id).await?
            } else {
                Confirmation::Unpolled
            };
            Ok(Receipt {
                tx_id: blockchain_id,
                confirmation,
                took: started.elapsed(),
            })
        }
        .instrument(self.span.clone())
        .await
    }

    /// Wait until the node validates `blockchain_id` and has bootstrapped it.
    ///
    /// Both checks share one deadline.
    async fn confirm_blockchain(&self, blockchain_id: Id) -> Result<Confirmation> {
        let chain = blockchain_id.to_string();
        let outcome = self
            .checker
            .poll_until(|| {
                let chain = chain.clone();
                async move {
                    let status = self.api.blockchain_status(blockchain_id).await?;
                    debug!(%blockchain_id, %status, "polled blockchain status");
                    if status != BlockchainStatus::Validating {
                        return Ok::<_, Error>(None);
                    }
                    let bootstrapped = self.api.is_bootstrapped(&chain).await?;
                    debug!(%blockchain_id, bootstrapped, "polled bootstrap status");
                    Ok(bootstrapped.then_some(()))
                }
            })
            .await?;
        Ok(match outcome {
            PollOutcome::Done(()) => Confirmation::Confirmed,
            PollOutcome::TimedOut => Confirmation::TimedOut,
            PollOutcome::Cancelled => Confirmation::Cancelled,
        })
    }
}
