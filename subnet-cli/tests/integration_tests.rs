//! Integration tests for subnet-cli
//!
//! These tests drive the client facade end to end against an in-memory node:
//! - Subnet creation, including dry mode
//! - Primary network and subnet validators
//! - Blockchain creation with status polling
//! - Key files
//! - Configuration

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::{collections::HashMap, time::Duration};
use tempfile::TempDir;
use url::Url;

use subnet_cli::{
    codec::marshal,
    constants::{LOCAL_ID, PRIMARY_NETWORK_ID},
    rpc::{BlockchainStatus, RpcError, TxFees, TxStatus, UtxoIndex, UtxoPage},
    tx::{Output, OutputOwners, TransferOutput, Tx, UnsignedTx, Utxo, UtxoId},
    AddSubnetValidatorOptions, AddValidatorOptions, ChainSpec, Checker, Client, Confirmation,
    CreateBlockchainOptions, CreateSubnetOptions, Error, Id, Key, NodeId, PlatformApi, ShortId,
    SoftKey, ValidationWindow,
};

const ASSET: Id = Id([0xaa; 32]);
const X_CHAIN: Id = Id([0x58; 32]);

// ============================================================================
// In-memory node
// ============================================================================

#[derive(Default)]
struct NodeState {
    utxos: Vec<Utxo>,
    txs: HashMap<Id, Vec<u8>>,
    issued: Vec<Id>,
    /// Statuses reported for every issued tx, one per poll; the last repeats.
    status_script: Vec<TxStatus>,
    polls: usize,
    validators: HashMap<Id, Vec<(NodeId, u64, u64)>>,
    chain_script: Vec<BlockchainStatus>,
    chain_polls: usize,
    bootstrapped: bool,
    /// When set, `issue_tx` answers with this ID instead of the real one.
    forged_id: Option<Id>,
}

/// A node that applies issued transactions to its UTXO set.
struct FakeNode {
    fees: TxFees,
    state: Mutex<NodeState>,
}

impl FakeNode {
    fn new(fees: TxFees) -> Self {
        Self {
            fees,
            state: Mutex::new(NodeState {
                status_script: vec![TxStatus::Committed],
                chain_script: vec![BlockchainStatus::Validating],
                bootstrapped: true,
                ..Default::default()
            }),
        }
    }

    fn fund(&self, owner: ShortId, tx_byte: u8, amount: u64) {
        self.state.lock().utxos.push(Utxo {
            utxo_id: UtxoId {
                tx_id: Id([tx_byte; 32]),
                output_index: 0,
            },
            asset_id: ASSET,
            out: Output::Transfer(TransferOutput {
                amount,
                owners: OutputOwners::single(owner),
            }),
        });
    }

    fn add_validator(&self, subnet_id: Id, node_id: NodeId, start: u64, end: u64) {
        self.state
            .lock()
            .validators
            .entry(subnet_id)
            .or_default()
            .push((node_id, start, end));
    }

    fn issued(&self) -> Vec<Tx> {
        let state = self.state.lock();
        state
            .issued
            .iter()
            .map(|id| Tx::parse(&state.txs[id]).unwrap())
            .collect()
    }

    fn unspent(&self) -> u64 {
        self.state.lock().utxos.iter().map(|u| u.out.amount()).sum()
    }

    fn apply(state: &mut NodeState, tx_id: Id, tx: &Tx) {
        let base = tx.unsigned().base();
        state
            .utxos
            .retain(|utxo| !base.ins.iter().any(|input| input.utxo_id == utxo.utxo_id));
        for (index, out) in base.outs.iter().enumerate() {
            state.utxos.push(Utxo {
                utxo_id: UtxoId {
                    tx_id,
                    output_index: index as u32,
                },
                asset_id: out.asset_id,
                out: out.out.clone(),
            });
        }

        match tx.unsigned() {
            UnsignedTx::AddValidator(add) => {
                let v = add.validator;
                state
                    .validators
                    .entry(PRIMARY_NETWORK_ID)
                    .or_default()
                    .push((v.node_id, v.start, v.end));
            }
            UnsignedTx::AddSubnetValidator(add) => {
                let v = add.validator;
                state
                    .validators
                    .entry(add.subnet_id)
                    .or_default()
                    .push((v.node_id, v.start, v.end));
            }
            UnsignedTx::CreateSubnet(_) | UnsignedTx::CreateChain(_) => {}
        }
    }
}

#[async_trait]
impl PlatformApi for FakeNode {
    async fn network_name(&self) -> Result<String, RpcError> {
        Ok("local".to_string())
    }

    async fn blockchain_id(&self, alias: &str) -> Result<Id, RpcError> {
        assert_eq!(alias, "X");
        Ok(X_CHAIN)
    }

    async fn asset_id(&self, chain: &str, symbol: &str) -> Result<Id, RpcError> {
        assert_eq!(chain, X_CHAIN.to_string());
        assert_eq!(symbol, "DJTX");
        Ok(ASSET)
    }

    async fn tx_fees(&self) -> Result<TxFees, RpcError> {
        Ok(self.fees)
    }

    async fn is_bootstrapped(&self, _chain: &str) -> Result<bool, RpcError> {
        Ok(self.state.lock().bootstrapped)
    }

    async fn balance(&self, _address: &str) -> Result<u64, RpcError> {
        Ok(self.unspent())
    }

    async fn utxos(
        &self,
        _addresses: &[String],
        limit: u32,
        start: Option<UtxoIndex>,
    ) -> Result<UtxoPage, RpcError> {
        let state = self.state.lock();
        let offset = match start {
            Some(index) => index
                .utxo
                .parse::<usize>()
                .map_err(|e| RpcError::Malformed(e.to_string()))?,
            None => 0,
        };
        let end = (offset + limit as usize).min(state.utxos.len());
        let utxos = state.utxos[offset..end]
            .iter()
            .map(|u| marshal(u).unwrap())
            .collect();
        let end_index = (end < state.utxos.len()).then(|| UtxoIndex {
            address: String::new(),
            utxo: end.to_string(),
        });
        Ok(UtxoPage { utxos, end_index })
    }

    async fn issue_tx(&self, bytes: &[u8]) -> Result<Id, RpcError> {
        let tx = Tx::parse(bytes).map_err(|e| RpcError::Malformed(e.to_string()))?;
        let tx_id = tx.id();
        let mut state = self.state.lock();
        state.txs.insert(tx_id, bytes.to_vec());
        state.issued.push(tx_id);
        Self::apply(&mut state, tx_id, &tx);
        Ok(state.forged_id.unwrap_or(tx_id))
    }

    async fn get_tx(&self, tx_id: Id) -> Result<Vec<u8>, RpcError> {
        self.state
            .lock()
            .txs
            .get(&tx_id)
            .cloned()
            .ok_or_else(|| RpcError::Rpc {
                code: -32000,
                message: "not found".to_string(),
            })
    }

    async fn tx_status(&self, _tx_id: Id) -> Result<TxStatus, RpcError> {
        let mut state = self.state.lock();
        let at = state.polls.min(state.status_script.len() - 1);
        state.polls += 1;
        Ok(state.status_script[at])
    }

    async fn current_validators(
        &self,
        subnet_id: Id,
        node_ids: &[NodeId],
    ) -> Result<Vec<Value>, RpcError> {
        let state = self.state.lock();
        Ok(state
            .validators
            .get(&subnet_id)
            .into_iter()
            .flatten()
            .filter(|(node, _, _)| node_ids.contains(node))
            .map(|(node, start, end)| {
                json!({
                    "nodeID": node.to_string(),
                    "startTime": start.to_string(),
                    "endTime": end.to_string(),
                })
            })
            .collect())
    }

    async fn blockchain_status(&self, _blockchain_id: Id) -> Result<BlockchainStatus, RpcError> {
        let mut state = self.state.lock();
        let at = state.chain_polls.min(state.chain_script.len() - 1);
        state.chain_polls += 1;
        Ok(state.chain_script[at])
    }
}

fn fees() -> TxFees {
    TxFees {
        tx_fee: 10,
        create_subnet_tx_fee: 2_000,
        create_blockchain_tx_fee: 20,
        add_primary_network_validator_fee: Some(100),
    }
}

fn key() -> Key {
    SoftKey::from_bytes(LOCAL_ID, &[42u8; 32]).unwrap().into()
}

fn node(byte: u8) -> NodeId {
    NodeId(ShortId([byte; 20]))
}

async fn client(node: FakeNode, checker: Checker) -> Client<FakeNode> {
    let url = Url::parse("http://127.0.0.1:9650").unwrap();
    Client::with_api(node, &url, checker).await.unwrap()
}

// ============================================================================
// Subnet Creation Tests
// ============================================================================

mod create_subnet {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fee_burns_entire_utxo() {
        let key = key();
        let node = FakeNode::new(fees());
        node.fund(key.primary_address(), 1, 2_000);

        let client = client(node, Checker::default()).await;
        let receipt = client
            .create_subnet(&key, CreateSubnetOptions::default())
            .await
            .unwrap();

        assert_eq!(receipt.confirmation, Confirmation::Confirmed);
        let issued = client.api().issued();
        assert_eq!(issued.len(), 1);
        assert_eq!(issued[0].id(), receipt.tx_id);
        assert!(issued[0].unsigned().base().outs.is_empty());
        assert_eq!(client.api().unspent(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dry_mode_submits_nothing() {
        let key = key();
        let node = FakeNode::new(fees());
        node.fund(key.primary_address(), 1, 5_000);

        let client = client(node, Checker::default()).await;
        let receipt = client
            .create_subnet(&key, CreateSubnetOptions::default().with_dry_mode(true))
            .await
            .unwrap();

        assert_eq!(receipt.confirmation, Confirmation::DryRun);
        assert!(client.api().issued().is_empty());
        assert_eq!(client.api().unspent(), 5_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmed_after_processing() {
        let key = key();
        let node = FakeNode::new(fees());
        node.fund(key.primary_address(), 1, 3_000);
        node.state.lock().status_script =
            vec![TxStatus::Unknown, TxStatus::Processing, TxStatus::Committed];

        let client = client(node, Checker::new(Duration::from_secs(1))).await;
        let receipt = client
            .create_subnet(&key, CreateSubnetOptions::default())
            .await
            .unwrap();

        assert_eq!(receipt.confirmation, Confirmation::Confirmed);
        assert_eq!(client.api().state.lock().polls, 3);
        // change comes back to the key
        assert_eq!(client.api().unspent(), 1_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_timeout_is_not_an_error() {
        let key = key();
        let node = FakeNode::new(fees());
        node.fund(key.primary_address(), 1, 3_000);
        node.state.lock().status_script = vec![TxStatus::Processing];

        let checker = Checker::new(Duration::from_secs(1)).with_timeout(Duration::from_secs(5));
        let client = client(node, checker).await;
        let receipt = client
            .create_subnet(&key, CreateSubnetOptions::default())
            .await
            .unwrap();

        assert_eq!(receipt.confirmation, Confirmation::TimedOut);
        assert_eq!(client.api().issued().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_is_an_error() {
        let key = key();
        let node = FakeNode::new(fees());
        node.fund(key.primary_address(), 1, 3_000);
        node.state.lock().status_script = vec![TxStatus::Dropped];

        let client = client(node, Checker::default()).await;
        let res = client
            .create_subnet(&key, CreateSubnetOptions::default())
            .await;
        assert!(matches!(
            res,
            Err(Error::UnexpectedTxStatus {
                status: TxStatus::Dropped,
                ..
            })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_foreign_tx_id_rejected() {
        let key = key();
        let node = FakeNode::new(fees());
        node.fund(key.primary_address(), 1, 3_000);
        node.state.lock().forged_id = Some(Id([9; 32]));

        let client = client(node, Checker::default()).await;
        let res = client
            .create_subnet(&key, CreateSubnetOptions::default())
            .await;
        assert!(matches!(res, Err(Error::UnexpectedTxId { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_insufficient_funds() {
        let key = key();
        let node = FakeNode::new(fees());
        node.fund(key.primary_address(), 1, 1_999);

        let client = client(node, Checker::default()).await;
        let res = client
            .create_subnet(&key, CreateSubnetOptions::default())
            .await;
        assert!(matches!(
            res,
            Err(Error::InsufficientFunds {
                required: 2_000,
                have: 1_999,
                ..
            })
        ));
        assert!(client.api().issued().is_empty());
    }
}

// ============================================================================
// Validator Tests
// ============================================================================

mod validators {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_add_validator_stakes_and_returns_change() {
        let key = key();
        let fake = FakeNode::new(fees());
        fake.fund(key.primary_address(), 1, 2_500);

        let client = client(fake, Checker::default()).await;
        let window = ValidationWindow {
            node_id: node(3),
            start: 1_000,
            end: 2_000,
        };
        let receipt = client
            .add_validator(
                &key,
                window,
                AddValidatorOptions::default()
                    .with_stake_amount(2_000)
                    .with_reward_shares(20_000),
            )
            .await
            .unwrap();
        assert_eq!(receipt.confirmation, Confirmation::Confirmed);

        let issued = client.api().issued();
        let UnsignedTx::AddValidator(add) = issued[0].unsigned() else {
            panic!("wrong tx type");
        };
        assert_eq!(add.stake.iter().map(|o| o.out.amount()).sum::<u64>(), 2_000);
        assert_eq!(add.base.outs.iter().map(|o| o.out.amount()).sum::<u64>(), 400);
        assert_eq!(add.shares, 20_000);
        assert_eq!(client.api().unspent(), 400);

        assert_eq!(
            client.get_validator(PRIMARY_NETWORK_ID, node(3)).await.unwrap(),
            (1_000, 2_000)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_existing_validator_rejected() {
        let key = key();
        let fake = FakeNode::new(fees());
        fake.fund(key.primary_address(), 1, 5_000);
        fake.add_validator(PRIMARY_NETWORK_ID, node(3), 0, 10);

        let client = client(fake, Checker::default()).await;
        let window = ValidationWindow {
            node_id: node(3),
            start: 1_000,
            end: 2_000,
        };
        let res = client
            .add_validator(&key, window, AddValidatorOptions::default())
            .await;
        assert!(matches!(res, Err(Error::AlreadyValidator(n)) if n == node(3)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_stake_fails() {
        let key = key();
        let fake = FakeNode::new(fees());
        fake.fund(key.primary_address(), 1, 2_100);
        // counts toward the reported balance but cannot fund the stake
        fake.state.lock().utxos.push(Utxo {
            utxo_id: UtxoId {
                tx_id: Id([2; 32]),
                output_index: 0,
            },
            asset_id: Id([0xbb; 32]),
            out: Output::Transfer(TransferOutput {
                amount: 1_000,
                owners: OutputOwners::single(key.primary_address()),
            }),
        });

        let client = client(fake, Checker::default()).await;
        let window = ValidationWindow {
            node_id: node(3),
            start: 1_000,
            end: 2_000,
        };
        let res = client
            .add_validator(
                &key,
                window,
                AddValidatorOptions::default().with_stake_amount(2_050),
            )
            .await;
        assert!(matches!(
            res,
            Err(Error::InsufficientBalanceForStake {
                required: 2_050,
                staked: 2_000,
            })
        ));
        assert!(client.api().issued().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_subnet_lifecycle() {
        let key = key();
        let fake = FakeNode::new(fees());
        fake.fund(key.primary_address(), 1, 2_500);
        fake.fund(key.primary_address(), 2, 500);
        fake.add_validator(PRIMARY_NETWORK_ID, node(4), 1_000, 100_000);

        let client = client(fake, Checker::default()).await;
        let subnet_id = client
            .create_subnet(&key, CreateSubnetOptions::default())
            .await
            .unwrap()
            .tx_id;

        let window = ValidationWindow {
            node_id: node(4),
            start: 2_000,
            end: 50_000,
        };
        let receipt = client
            .add_subnet_validator(
                &key,
                subnet_id,
                window,
                1_000,
                AddSubnetValidatorOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(receipt.confirmation, Confirmation::Confirmed);

        let issued = client.api().issued();
        assert_eq!(issued.len(), 2);
        // one credential per input plus the subnet authorization
        let inputs = issued[1].unsigned().base().ins.len();
        assert_eq!(issued[1].credentials().len(), inputs + 1);

        assert_eq!(
            client.get_validator(subnet_id, node(4)).await.unwrap(),
            (2_000, 50_000)
        );
        let res = client
            .add_subnet_validator(
                &key,
                subnet_id,
                window,
                1_000,
                AddSubnetValidatorOptions::default(),
            )
            .await;
        assert!(matches!(res, Err(Error::AlreadySubnetValidator { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_subnet_window_must_fit_primary() {
        let key = key();
        let fake = FakeNode::new(fees());
        fake.fund(key.primary_address(), 1, 5_000);
        fake.add_validator(PRIMARY_NETWORK_ID, node(4), 1_000, 10_000);

        let client = client(fake, Checker::default()).await;
        let subnet_id = client
            .create_subnet(&key, CreateSubnetOptions::default())
            .await
            .unwrap()
            .tx_id;

        let window = ValidationWindow {
            node_id: node(4),
            start: 2_000,
            end: 20_000,
        };
        let res = client
            .add_subnet_validator(
                &key,
                subnet_id,
                window,
                1,
                AddSubnetValidatorOptions::default(),
            )
            .await;
        assert!(matches!(res, Err(Error::InvalidValidationPeriod(_))));

        let stranger = ValidationWindow {
            node_id: node(5),
            ..window
        };
        let res = client
            .add_subnet_validator(
                &key,
                subnet_id,
                stranger,
                1,
                AddSubnetValidatorOptions::default(),
            )
            .await;
        assert!(matches!(res, Err(Error::NotValidatingPrimaryNetwork(n)) if n == node(5)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_validator_sees_late_registration() {
        let fake = FakeNode::new(fees());
        let client = client(
            fake,
            Checker::new(Duration::from_secs(1)).with_timeout(Duration::from_secs(3)),
        )
        .await;

        let outcome = client.wait_validator(PRIMARY_NETWORK_ID, node(6)).await.unwrap();
        assert_eq!(outcome, subnet_cli::PollOutcome::TimedOut);

        client.api().add_validator(PRIMARY_NETWORK_ID, node(6), 5, 50);
        let outcome = client.wait_validator(PRIMARY_NETWORK_ID, node(6)).await.unwrap();
        assert_eq!(outcome, subnet_cli::PollOutcome::Done((5, 50)));
    }
}

// ============================================================================
// Blockchain Tests
// ============================================================================

mod blockchains {
    use super::*;

    async fn subnet(client: &Client<FakeNode>, key: &Key) -> Id {
        client
            .create_subnet(key, CreateSubnetOptions::default())
            .await
            .unwrap()
            .tx_id
    }

    fn chain(subnet_id: Id) -> ChainSpec {
        ChainSpec {
            subnet_id,
            chain_name: "spacesvm".to_string(),
            vm_id: Id::from_name("spacesvm").unwrap(),
            genesis_data: br#"{"magic":1}"#.to_vec(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_without_polling() {
        let key = key();
        let fake = FakeNode::new(fees());
        fake.fund(key.primary_address(), 1, 3_000);

        let client = client(fake, Checker::default()).await;
        let subnet_id = subnet(&client, &key).await;
        let receipt = client
            .create_blockchain(&key, chain(subnet_id), CreateBlockchainOptions::default())
            .await
            .unwrap();

        assert_eq!(receipt.confirmation, Confirmation::Unpolled);
        assert_eq!(client.api().state.lock().chain_polls, 0);
        let issued = client.api().issued();
        let UnsignedTx::CreateChain(create) = issued[1].unsigned() else {
            panic!("wrong tx type");
        };
        assert_eq!(create.subnet_id, subnet_id);
        assert_eq!(create.chain_name, "spacesvm");
        assert_eq!(create.subnet_auth.sig_indices, vec![0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_validating_and_bootstrapped() {
        let key = key();
        let fake = FakeNode::new(fees());
        fake.fund(key.primary_address(), 1, 3_000);
        fake.state.lock().chain_script = vec![
            BlockchainStatus::UnknownChain,
            BlockchainStatus::Created,
            BlockchainStatus::Validating,
        ];

        let client = client(fake, Checker::default()).await;
        let subnet_id = subnet(&client, &key).await;
        let receipt = client
            .create_blockchain(
                &key,
                chain(subnet_id),
                CreateBlockchainOptions::default().with_poll_status(true),
            )
            .await
            .unwrap();

        assert_eq!(receipt.confirmation, Confirmation::Confirmed);
        assert_eq!(client.api().state.lock().chain_polls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_foreign_subnet_cannot_be_authorized() {
        let key = key();
        let other: Key = SoftKey::from_bytes(LOCAL_ID, &[43u8; 32]).unwrap().into();
        let fake = FakeNode::new(fees());
        fake.fund(other.primary_address(), 1, 3_000);
        fake.fund(key.primary_address(), 2, 3_000);

        let client = client(fake, Checker::default()).await;
        let subnet_id = subnet(&client, &other).await;
        let res = client
            .create_blockchain(&key, chain(subnet_id), CreateBlockchainOptions::default())
            .await;
        assert!(matches!(res, Err(Error::CantSign(id)) if id == subnet_id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrong_tx_type() {
        let key = key();
        let fake = FakeNode::new(fees());
        fake.fund(key.primary_address(), 1, 5_000);

        let client = client(fake, Checker::default()).await;
        let window = ValidationWindow {
            node_id: node(7),
            start: 1_000,
            end: 2_000,
        };
        let not_a_subnet = client
            .add_validator(
                &key,
                window,
                AddValidatorOptions::default().with_stake_amount(1_000),
            )
            .await
            .unwrap()
            .tx_id;

        let res = client
            .create_blockchain(&key, chain(not_a_subnet), CreateBlockchainOptions::default())
            .await;
        assert!(matches!(res, Err(Error::WrongTxType(_))));
    }
}

// ============================================================================
// Key File Tests
// ============================================================================

mod key_files {
    use super::*;
    use std::fs;

    #[test]
    fn test_save_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("key.pk");

        let key = SoftKey::generate(LOCAL_ID).unwrap();
        key.save(&path).unwrap();
        let loaded = SoftKey::load(LOCAL_ID, &path).unwrap();
        assert_eq!(*loaded.encode(), *key.encode());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_hex_with_line_endings() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("key.pk");
        let hex = hex::encode([42u8; 32]);

        let expected = key().primary_address();
        for ending in ["", "\n", "\r\n"] {
            fs::write(&path, format!("{hex}{ending}")).unwrap();
            let loaded = SoftKey::load(LOCAL_ID, &path).unwrap();
            assert_eq!(loaded.addresses()[0], expected);
        }

        fs::write(&path, &hex[..63]).unwrap();
        assert!(SoftKey::load(LOCAL_ID, &path).is_err());
    }

    #[test]
    fn test_encoded_form() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("key.pk");

        let key = SoftKey::from_bytes(LOCAL_ID, &[42u8; 32]).unwrap();
        fs::write(&path, format!("{}\n", key.encode().as_str())).unwrap();
        let loaded = SoftKey::load(LOCAL_ID, &path).unwrap();
        assert_eq!(loaded.p_addresses(), key.p_addresses());
        assert!(loaded.p_addresses()[0].starts_with("P-local1"));
    }
}

// ============================================================================
// Configuration Tests
// ============================================================================

mod configuration {
    use super::*;
    use subnet_cli::Config;

    #[test]
    fn test_saved_config_builds_checker() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let config = Config {
            poll_interval: 2,
            poll_timeout: Some(120),
            ..Default::default()
        };
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        loaded.validate().unwrap();
        let checker = loaded.checker();
        assert_eq!(checker.interval(), Duration::from_secs(2));
        assert_eq!(checker.timeout(), Some(Duration::from_secs(120)));
    }

    #[tokio::test]
    async fn test_zero_interval_rejected_by_client() {
        let url = Url::parse("http://127.0.0.1:9650").unwrap();
        let res = Client::with_api(FakeNode::new(fees()), &url, Checker::new(Duration::ZERO)).await;
        assert!(matches!(res, Err(Error::InvalidInterval)));
    }

    #[tokio::test]
    async fn test_empty_uri_rejected() {
        let res = Client::connect("", Duration::from_secs(1), Checker::default()).await;
        assert!(matches!(res, Err(Error::EmptyUri)));
    }
}
