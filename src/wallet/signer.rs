use crate::{Error, Result};
use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use secrecy::{ExposeSecret, SecretString};

/// An in-memory signing wallet for the current session.
///
/// Holds the parsed signer, not the raw key material. `Debug` output never
/// reveals anything derived from the key besides the public address.
#[derive(Clone)]
pub struct SessionWallet {
    signer: PrivateKeySigner,
    address: Address,
}

impl SessionWallet {
    /// Parse a hex-encoded private key (with or without `0x` prefix).
    pub fn from_key(key: &SecretString) -> Result<Self> {
        let hex = key.expose_secret().trim();
        let hex = hex.strip_prefix("0x").unwrap_or(hex);

        let signer: PrivateKeySigner = hex
            .parse()
            .map_err(|_| Error::InvalidKey("not a valid secp256k1 private key".to_string()))?;
        let address = signer.address();

        Ok(Self { signer, address })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// The signer wrapped for transaction building.
    pub fn ethereum_wallet(&self) -> EthereumWallet {
        EthereumWallet::from(self.signer.clone())
    }
}

impl std::fmt::Debug for SessionWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionWallet")
            .field("address", &self.address)
            .field("signer", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known Anvil dev key, never funded on a real network.
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const DEV_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    #[test]
    fn derives_address_from_key() {
        let wallet = SessionWallet::from_key(&SecretString::from(DEV_KEY)).unwrap();
        assert_eq!(wallet.address().to_string(), DEV_ADDRESS);
    }

    #[test]
    fn accepts_key_without_prefix() {
        let bare = DEV_KEY.trim_start_matches("0x");
        let wallet = SessionWallet::from_key(&SecretString::from(bare)).unwrap();
        assert_eq!(wallet.address().to_string(), DEV_ADDRESS);
    }

    #[test]
    fn rejects_malformed_key() {
        let err = SessionWallet::from_key(&SecretString::from("0xnot-a-key")).unwrap_err();
        assert!(matches!(err, Error::InvalidKey(_)));
    }

    #[test]
    fn debug_never_prints_key_material() {
        let wallet = SessionWallet::from_key(&SecretString::from(DEV_KEY)).unwrap();
        let output = format!("{:?}", wallet);
        assert!(output.contains("REDACTED"));
        assert!(!output.contains("ac0974be"));
    }
}
