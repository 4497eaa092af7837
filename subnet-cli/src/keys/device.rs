//! Hardware signing devices.
//!
//! The device itself is an opaque capability behind [`HardwareDevice`].
//! [`BridgeConnector`] reaches a local signing bridge process that owns the
//! USB transport, speaking newline-delimited JSON over TCP.

use crate::ids::ShortId;
use serde::{Deserialize, Serialize};
use snc_crypto_secp256k1::SIGNATURE_LEN;
use std::{
    io::{BufRead, BufReader, Write},
    net::{SocketAddr, TcpStream},
    time::Duration,
};
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, warn};

/// Default address of the signing bridge.
pub const DEFAULT_BRIDGE_ADDRESS: &str = "127.0.0.1:7345";

/// Connect and read timeout for the bridge.
const BRIDGE_TIMEOUT: Duration = Duration::from_secs(120);

/// A (change, address index) derivation suffix under the device's account.
pub type DerivationPath = [u32; 2];

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed bridge message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Device rejected request: {0}")]
    Rejected(String),

    #[error("Unexpected device response: {0}")]
    Malformed(String),

    #[error("Expected {expected} signatures, device returned {actual}")]
    SignatureCount { expected: usize, actual: usize },

    #[error("Device connection is closed")]
    Closed,
}

/// An external signer.
pub trait HardwareDevice: Send {
    /// Derive the address at `account`/`index` for a network `hrp`.
    fn address(&mut self, hrp: &str, account: u32, index: u32) -> Result<ShortId, DeviceError>;

    /// Sign `hash` once for every path, in order.
    fn sign_hash(
        &mut self,
        hash: &[u8; 32],
        paths: &[DerivationPath],
    ) -> Result<Vec<[u8; SIGNATURE_LEN]>, DeviceError>;

    fn disconnect(&mut self) -> Result<(), DeviceError>;
}

/// Run blocking device I/O without stalling other tasks on a runtime worker.
fn blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

/// Opens device sessions.
pub trait DeviceConnector {
    fn connect(&self) -> Result<Box<dyn HardwareDevice>, DeviceError>;
}

/// An open device session, disconnected when dropped.
pub struct DeviceConnection {
    device: Option<Box<dyn HardwareDevice>>,
}

impl DeviceConnection {
    pub fn open(connector: &dyn DeviceConnector) -> Result<Self, DeviceError> {
        let device = connector.connect()?;
        debug!("hardware device connected");
        Ok(Self {
            device: Some(device),
        })
    }

    pub fn device(&mut self) -> Result<&mut dyn HardwareDevice, DeviceError> {
        match self.device.as_mut() {
            Some(device) => Ok(device.as_mut()),
            None => Err(DeviceError::Closed),
        }
    }

    /// Disconnect now, reporting any failure.
    pub fn close(mut self) -> Result<(), DeviceError> {
        match self.device.take() {
            Some(mut device) => device.disconnect(),
            None => Ok(()),
        }
    }
}

impl Drop for DeviceConnection {
    fn drop(&mut self) {
        if let Some(mut device) = self.device.take() {
            if let Err(e) = device.disconnect() {
                warn!("Failed to disconnect hardware device: {}", e);
            }
        }
    }
}

/// Requests understood by the signing bridge.
#[derive(Debug, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
enum BridgeRequest<'a> {
    Address {
        hrp: &'a str,
        account: u32,
        index: u32,
    },
    SignHash {
        hash: String,
        paths: &'a [DerivationPath],
    },
    Disconnect,
}

#[derive(Debug, Default, Deserialize)]
struct BridgeResponse {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    signatures: Option<Vec<String>>,
    #[serde(default)]
    error: Option<String>,
}

/// Connects to a signing bridge at a TCP address.
#[derive(Clone, Debug)]
pub struct BridgeConnector {
    addr: SocketAddr,
}

impl BridgeConnector {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }
}

impl DeviceConnector for BridgeConnector {
    fn connect(&self) -> Result<Box<dyn HardwareDevice>, DeviceError> {
        let stream = blocking(|| TcpStream::connect_timeout(&self.addr, BRIDGE_TIMEOUT))?;
        stream.set_read_timeout(Some(BRIDGE_TIMEOUT))?;
        let reader = BufReader::new(stream.try_clone()?);
        Ok(Box::new(BridgeDevice {
            writer: stream,
            reader,
        }))
    }
}

struct BridgeDevice {
    writer: TcpStream,
    reader: BufReader<TcpStream>,
}

impl BridgeDevice {
    fn call(&mut self, request: &BridgeRequest<'_>) -> Result<BridgeResponse, DeviceError> {
        let mut line = serde_json::to_vec(request)?;
        line.push(b'\n');

        let mut reply = String::new();
        let read = blocking(|| -> std::io::Result<usize> {
            self.writer.write_all(&line)?;
            self.writer.flush()?;
            self.reader.read_line(&mut reply)
        })?;
        if read == 0 {
            return Err(DeviceError::Closed);
        }
        let response: BridgeResponse = serde_json::from_str(&reply)?;
        match response.error {
            Some(e) => Err(DeviceError::Rejected(e)),
            None => Ok(response),
        }
    }
}

impl HardwareDevice for BridgeDevice {
    fn address(&mut self, hrp: &str, account: u32, index: u32) -> Result<ShortId, DeviceError> {
        let response = self.call(&BridgeRequest::Address {
            hrp,
            account,
            index,
        })?;
        let address = response
            .address
            .ok_or_else(|| DeviceError::Malformed("missing address".to_string()))?;
        let bytes = hex::decode(&address).map_err(|e| DeviceError::Malformed(e.to_string()))?;
        ShortId::from_slice(&bytes).map_err(|e| DeviceError::Malformed(e.to_string()))
    }

    fn sign_hash(
        &mut self,
        hash: &[u8; 32],
        paths: &[DerivationPath],
    ) -> Result<Vec<[u8; SIGNATURE_LEN]>, DeviceError> {
        let response = self.call(&BridgeRequest::SignHash {
            hash: hex::encode(hash),
            paths,
        })?;
        let signatures = response.signatures.unwrap_or_default();
        if signatures.len() != paths.len() {
            return Err(DeviceError::SignatureCount {
                expected: paths.len(),
                actual: signatures.len(),
            });
        }
        signatures
            .iter()
            .map(|sig| {
                let mut out = [0u8; SIGNATURE_LEN];
                hex::decode_to_slice(sig, &mut out)
                    .map_err(|e| DeviceError::Malformed(e.to_string()))?;
                Ok(out)
            })
            .collect()
    }

    fn disconnect(&mut self) -> Result<(), DeviceError> {
        self.call(&BridgeRequest::Disconnect)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        net::TcpListener,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        thread,
    };

    struct CountingDevice {
        disconnects: Arc<AtomicUsize>,
    }

    impl HardwareDevice for CountingDevice {
        fn address(&mut self, _: &str, _: u32, _: u32) -> Result<ShortId, DeviceError> {
            Ok(ShortId([1; 20]))
        }

        fn sign_hash(
            &mut self,
            _: &[u8; 32],
            paths: &[DerivationPath],
        ) -> Result<Vec<[u8; SIGNATURE_LEN]>, DeviceError> {
            Ok(vec![[0u8; SIGNATURE_LEN]; paths.len()])
        }

        fn disconnect(&mut self) -> Result<(), DeviceError> {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct CountingConnector(Arc<AtomicUsize>);

    impl DeviceConnector for CountingConnector {
        fn connect(&self) -> Result<Box<dyn HardwareDevice>, DeviceError> {
            Ok(Box::new(CountingDevice {
                disconnects: self.0.clone(),
            }))
        }
    }

    #[test]
    fn test_drop_disconnects() {
        let count = Arc::new(AtomicUsize::new(0));
        {
            let _conn = DeviceConnection::open(&CountingConnector(count.clone())).unwrap();
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_close_disconnects_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let conn = DeviceConnection::open(&CountingConnector(count.clone())).unwrap();
        conn.close().unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_bridge_protocol() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let bridge = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut writer = stream;
            let mut methods = Vec::new();
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap() == 0 {
                    break;
                }
                let request: serde_json::Value = serde_json::from_str(&line).unwrap();
                let method = request["method"].as_str().unwrap().to_string();
                let reply = match method.as_str() {
                    "address" => serde_json::json!({ "address": hex::encode([9u8; 20]) }),
                    "sign_hash" => serde_json::json!({ "signatures": [hex::encode([5u8; 65])] }),
                    _ => serde_json::json!({}),
                };
                writer.write_all(format!("{reply}\n").as_bytes()).unwrap();
                methods.push(method.clone());
                if method == "disconnect" {
                    break;
                }
            }
            methods
        });

        let mut conn = DeviceConnection::open(&BridgeConnector::new(addr)).unwrap();
        let device = conn.device().unwrap();
        assert_eq!(device.address("local", 0, 0).unwrap(), ShortId([9; 20]));
        let sigs = device.sign_hash(&[1u8; 32], &[[0, 0]]).unwrap();
        assert_eq!(sigs, vec![[5u8; 65]]);
        conn.close().unwrap();

        assert_eq!(
            bridge.join().unwrap(),
            vec!["address", "sign_hash", "disconnect"]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_bridge_wait_leaves_worker_free() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<()>();

        // the bridge answers only after another task on the same worker has run
        let bridge = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut writer = stream;
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            ready_rx.recv().unwrap();
            let reply = serde_json::json!({ "address": hex::encode([4u8; 20]) });
            writer.write_all(format!("{reply}\n").as_bytes()).unwrap();
        });

        let address = tokio::spawn(async move {
            tokio::spawn(async move {
                ready_tx.send(()).unwrap();
            });
            let mut device = BridgeConnector::new(addr).connect().unwrap();
            device.address("local", 0, 0)
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(address, ShortId([4; 20]));
        bridge.join().unwrap();
    }
}
