//! Proof of authority over a subnet.
//!
//! A subnet is owned by the owner set in the transaction that created
//! it. Actions scoped to a subnet carry a [`SubnetAuth`] naming which of
//! those owners sign, and one extra credential with their signatures.

use crate::{
    codec::CodecError,
    error::{Error, Result},
    ids::{Id, ShortId},
    keys::Key,
    rpc::PlatformApi,
    tx::{SubnetAuth, Tx, UnsignedTx},
};
use tracing::debug;

/// Authorization input plus the signers that must produce its credential.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Authorization {
    pub auth: SubnetAuth,
    pub signers: Vec<ShortId>,
}

/// Authorize `key` against the creation transaction of `subnet_id`.
pub async fn authorize<A>(api: &A, key: &Key, subnet_id: Id, now: u64) -> Result<Authorization>
where
    A: PlatformApi + ?Sized,
{
    let bytes = api.get_tx(subnet_id).await?;
    authorize_with_tx(key, subnet_id, &bytes, now)
}

/// Authorize `key` against the signed bytes of a subnet creation
/// transaction.
pub fn authorize_with_tx(
    key: &Key,
    subnet_id: Id,
    tx_bytes: &[u8],
    now: u64,
) -> Result<Authorization> {
    let tx = match Tx::parse(tx_bytes) {
        Ok(tx) => tx,
        Err(CodecError::UnsupportedType(_)) => return Err(Error::WrongTxType(subnet_id)),
        Err(CodecError::UnknownOwner(_)) => return Err(Error::UnknownOwners(subnet_id)),
        Err(e) => return Err(e.into()),
    };
    let UnsignedTx::CreateSubnet(create) = tx.unsigned() else {
        return Err(Error::WrongTxType(subnet_id));
    };

    let (sig_indices, signers) = key
        .match_owners(&create.owner, now)
        .ok_or(Error::CantSign(subnet_id))?;
    debug!(%subnet_id, ?sig_indices, "authorized subnet action");

    Ok(Authorization {
        auth: SubnetAuth { sig_indices },
        signers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        constants::LOCAL_ID,
        ids::NodeId,
        keys::SoftKey,
        rpc::MockPlatformApi,
        tx::{AddSubnetValidatorTx, BaseTx, CreateSubnetTx, OutputOwners, Validator},
    };
    use assert_matches::assert_matches;

    /// Offset of the owner type ID in a create-subnet tx with an empty base.
    const OWNER_TYPE_OFFSET: usize = 54;

    fn key() -> Key {
        SoftKey::from_bytes(LOCAL_ID, &[9u8; 32]).unwrap().into()
    }

    fn create_subnet_bytes(owner: OutputOwners) -> Vec<u8> {
        Tx::new(UnsignedTx::CreateSubnet(CreateSubnetTx {
            base: BaseTx::default(),
            owner,
        }))
        .unwrap()
        .bytes()
        .to_vec()
    }

    #[test]
    fn test_authorizes_owner() {
        let key = key();
        let me = key.primary_address();
        let owner = OutputOwners {
            locktime: 0,
            threshold: 1,
            addrs: vec![ShortId([1; 20]), me],
        };
        let subnet_id = Id([4; 32]);

        let auth = authorize_with_tx(&key, subnet_id, &create_subnet_bytes(owner), 0).unwrap();
        assert_eq!(auth.auth.sig_indices, vec![1]);
        assert_eq!(auth.signers, vec![me]);
    }

    #[test]
    fn test_foreign_owner_cant_sign() {
        let key = key();
        let bytes = create_subnet_bytes(OutputOwners::single(ShortId([1; 20])));
        assert_matches!(
            authorize_with_tx(&key, Id([4; 32]), &bytes, 0),
            Err(Error::CantSign(_))
        );
    }

    #[test]
    fn test_wrong_tx_type() {
        let key = key();
        let bytes = Tx::new(UnsignedTx::AddSubnetValidator(AddSubnetValidatorTx {
            base: BaseTx::default(),
            validator: Validator {
                node_id: NodeId(ShortId([2; 20])),
                start: 1,
                end: 2,
                weight: 1,
            },
            subnet_id: Id([4; 32]),
            subnet_auth: SubnetAuth::default(),
        }))
        .unwrap()
        .bytes()
        .to_vec();

        assert_matches!(
            authorize_with_tx(&key, Id([4; 32]), &bytes, 0),
            Err(Error::WrongTxType(_))
        );
    }

    #[test]
    fn test_unknown_owner_type() {
        let key = key();
        let mut bytes = create_subnet_bytes(OutputOwners::single(key.primary_address()));
        // rewrite the OutputOwners type ID (11) as TransferOutput (7)
        assert_eq!(bytes[OWNER_TYPE_OFFSET..OWNER_TYPE_OFFSET + 4], [0, 0, 0, 11]);
        bytes[OWNER_TYPE_OFFSET + 3] = 7;

        assert_matches!(
            authorize_with_tx(&key, Id([4; 32]), &bytes, 0),
            Err(Error::UnknownOwners(_))
        );
    }

    #[tokio::test]
    async fn test_fetches_subnet_tx() {
        let key = key();
        let subnet_id = Id([4; 32]);
        let bytes = create_subnet_bytes(OutputOwners::single(key.primary_address()));

        let mut api = MockPlatformApi::new();
        api.expect_get_tx()
            .withf(move |id| *id == subnet_id)
            .times(1)
            .returning(move |_| Ok(bytes.clone()));

        let auth = authorize(&api, &key, subnet_id, 0).await.unwrap();
        assert_eq!(auth.auth.sig_indices, vec![0]);
    }
}
