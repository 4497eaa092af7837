//! Key held by a hardware signing device.

use super::{
    device::{DeviceConnection, DeviceConnector, DeviceError},
    KeyError,
};
use crate::{
    constants::{hrp, PLATFORM_CHAIN_ALIAS},
    formatting::format_address,
    ids::ShortId,
    tx::Credential,
};
use parking_lot::Mutex;
use tracing::info;

/// A key whose private half never leaves the device.
///
/// The device session is opened once at construction and released when the
/// key is dropped or explicitly disconnected.
pub struct HardKey {
    connection: Mutex<DeviceConnection>,
    account_index: u32,
    addresses: Vec<ShortId>,
    p_addresses: Vec<String>,
}

impl std::fmt::Debug for HardKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HardKey")
            .field("account_index", &self.account_index)
            .field("p_addresses", &self.p_addresses)
            .finish_non_exhaustive()
    }
}

impl HardKey {
    /// Connect to the device and derive the address at `account_index`.
    ///
    /// The session is closed again if derivation fails.
    pub fn connect(
        connector: &dyn DeviceConnector,
        network_id: u32,
        account_index: u32,
    ) -> Result<Self, KeyError> {
        info!("connecting to hardware device");
        let mut connection = DeviceConnection::open(connector)?;

        let hrp = hrp(network_id);
        let address = connection.device()?.address(hrp, account_index, 0)?;
        let p_address = format_address(PLATFORM_CHAIN_ALIAS, hrp, address.as_bytes())?;
        info!(address = %p_address, account_index, "derived address from hardware device");

        Ok(Self {
            connection: Mutex::new(connection),
            account_index,
            addresses: vec![address],
            p_addresses: vec![p_address],
        })
    }

    pub fn account_index(&self) -> u32 {
        self.account_index
    }

    pub fn addresses(&self) -> &[ShortId] {
        &self.addresses
    }

    pub fn p_addresses(&self) -> &[String] {
        &self.p_addresses
    }

    /// Release the device session.
    pub fn disconnect(self) -> Result<(), KeyError> {
        self.connection.into_inner().close()?;
        Ok(())
    }

    pub(super) fn credentials(
        &self,
        hash: &[u8; 32],
        signers: &[Vec<ShortId>],
    ) -> Result<Vec<Credential>, KeyError> {
        let mut connection = self.connection.lock();
        let device = connection.device()?;
        let path = [0, self.account_index];

        let mut creds = Vec::with_capacity(signers.len());
        for input_signers in signers {
            let mut sigs = Vec::with_capacity(input_signers.len());
            for signer in input_signers {
                if !self.addresses.contains(signer) {
                    return Err(KeyError::CantSpend(*signer));
                }
                let mut signed = device.sign_hash(hash, &[path])?;
                let sig = signed.pop().ok_or(DeviceError::SignatureCount {
                    expected: 1,
                    actual: 0,
                })?;
                sigs.push(sig);
            }
            creds.push(Credential { sigs });
        }
        Ok(creds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        constants::LOCAL_ID,
        keys::{device::DerivationPath, HardwareDevice, Key},
        tx::{BaseTx, CreateSubnetTx, OutputOwners, Tx, UnsignedTx},
    };
    use assert_matches::assert_matches;
    use snc_crypto_secp256k1::{recover_short_address, Secp256k1Keypair, SIGNATURE_LEN};
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    /// Software stand-in for a device, backed by a real keypair.
    struct FakeDevice {
        keypair: Secp256k1Keypair,
        sign_calls: Arc<AtomicUsize>,
        disconnects: Arc<AtomicUsize>,
        fail_after: Option<usize>,
    }

    impl HardwareDevice for FakeDevice {
        fn address(&mut self, _: &str, _: u32, _: u32) -> Result<ShortId, DeviceError> {
            Ok(ShortId(self.keypair.short_address()))
        }

        fn sign_hash(
            &mut self,
            hash: &[u8; 32],
            paths: &[DerivationPath],
        ) -> Result<Vec<[u8; SIGNATURE_LEN]>, DeviceError> {
            let calls = self.sign_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_after.is_some_and(|n| calls >= n) {
                return Err(DeviceError::Rejected("user declined".to_string()));
            }
            paths
                .iter()
                .map(|_| {
                    self.keypair
                        .sign_hash(hash)
                        .map_err(|e| DeviceError::Malformed(e.to_string()))
                })
                .collect()
        }

        fn disconnect(&mut self) -> Result<(), DeviceError> {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeConnector {
        sign_calls: Arc<AtomicUsize>,
        disconnects: Arc<AtomicUsize>,
        fail_after: Option<usize>,
    }

    impl DeviceConnector for FakeConnector {
        fn connect(&self) -> Result<Box<dyn HardwareDevice>, DeviceError> {
            Ok(Box::new(FakeDevice {
                keypair: Secp256k1Keypair::from_bytes(&[3u8; 32]).map_err(|e| DeviceError::Malformed(e.to_string()))?,
                sign_calls: self.sign_calls.clone(),
                disconnects: self.disconnects.clone(),
                fail_after: self.fail_after,
            }))
        }
    }

    fn unsigned_tx(owner: ShortId) -> Tx {
        Tx::new(UnsignedTx::CreateSubnet(CreateSubnetTx {
            base: BaseTx::default(),
            owner: OutputOwners::single(owner),
        }))
        .unwrap()
    }

    #[test]
    fn test_one_device_call_per_signature() {
        let connector = FakeConnector::default();
        let key: Key = HardKey::connect(&connector, LOCAL_ID, 0).unwrap().into();
        let me = key.primary_address();
        assert!(key.primary_p_address().starts_with("P-local1"));

        let mut tx = unsigned_tx(me);
        key.sign(&mut tx, &[vec![me], vec![me, me]]).unwrap();

        assert_eq!(connector.sign_calls.load(Ordering::SeqCst), 3);
        assert_eq!(tx.credentials().len(), 2);
        assert_eq!(tx.credentials()[1].sigs.len(), 2);

        let hash = tx.signing_hash().unwrap();
        let recovered = recover_short_address(&hash, &tx.credentials()[0].sigs[0]).unwrap();
        assert_eq!(ShortId(recovered), me);
    }

    #[test]
    fn test_device_failure_leaves_tx_unsigned() {
        let connector = FakeConnector {
            fail_after: Some(1),
            ..Default::default()
        };
        let key: Key = HardKey::connect(&connector, LOCAL_ID, 0).unwrap().into();
        let me = key.primary_address();

        let mut tx = unsigned_tx(me);
        let before = tx.clone();
        assert_matches!(
            key.sign(&mut tx, &[vec![me], vec![me]]),
            Err(KeyError::Device(DeviceError::Rejected(_)))
        );
        assert_eq!(tx, before);
        assert!(tx.credentials().is_empty());
    }

    #[test]
    fn test_disconnect_on_drop_and_explicit() {
        let connector = FakeConnector::default();
        drop(HardKey::connect(&connector, LOCAL_ID, 0).unwrap());
        assert_eq!(connector.disconnects.load(Ordering::SeqCst), 1);

        HardKey::connect(&connector, LOCAL_ID, 1)
            .unwrap()
            .disconnect()
            .unwrap();
        assert_eq!(connector.disconnects.load(Ordering::SeqCst), 2);
    }
}
