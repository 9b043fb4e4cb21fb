//! Local Ed25519 signing identity for the relayer account

use crate::chain::AccountAddress;
use crate::config::WalletConfig;
use crate::error::{TradelogError, TradelogResult};
use crate::tx::{RawTransaction, SignedTransaction};

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use sha3::{Digest, Sha3_256};
use std::fmt;

/// Authentication-key scheme byte for single-signer Ed25519 accounts
const ED25519_SCHEME: u8 = 0x00;

/// Prefix used by some wallets when exporting keys
const EXPORT_PREFIX: &str = "ed25519-priv-";

/// Account identity holding the private key
pub struct LocalAccount {
    signing_key: SigningKey,
    address: AccountAddress,
}

impl LocalAccount {
    /// Load the key named by the wallet configuration from the environment
    pub fn load(config: &WalletConfig) -> TradelogResult<Self> {
        match std::env::var(&config.private_key_env) {
            Ok(key) if !key.trim().is_empty() => Self::from_private_key_hex(&key),
            _ => Err(TradelogError::Config(format!(
                "No wallet configured. Set {}",
                config.private_key_env
            ))),
        }
    }

    pub fn from_private_key_hex(key: &str) -> TradelogResult<Self> {
        let trimmed = key.trim();
        let trimmed = trimmed.strip_prefix(EXPORT_PREFIX).unwrap_or(trimmed);
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);

        let bytes = hex::decode(digits)
            .map_err(|e| TradelogError::Signing(format!("Invalid private key: {}", e)))?;
        let seed: [u8; 32] = bytes
            .try_into()
            .map_err(|_| TradelogError::Signing("Invalid Ed25519 private key length".into()))?;

        Ok(Self::from_seed(seed))
    }

    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        let address = derive_address(&signing_key.verifying_key());
        Self {
            signing_key,
            address,
        }
    }

    pub fn address(&self) -> AccountAddress {
        self.address
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Sign an envelope built for this account
    pub fn sign_transaction(&self, raw: RawTransaction) -> TradelogResult<SignedTransaction> {
        if raw.sender() != self.address {
            return Err(TradelogError::Signing(format!(
                "Envelope sender {} does not match signer {}",
                raw.sender(),
                self.address
            )));
        }

        let signature: Signature = self.signing_key.sign(&raw.signing_message()?);
        Ok(SignedTransaction::new(
            raw,
            self.public_key(),
            signature.to_bytes(),
        ))
    }
}

impl fmt::Debug for LocalAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalAccount")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// `sha3_256(public_key || scheme)`
pub fn derive_address(public_key: &VerifyingKey) -> AccountAddress {
    let mut hasher = Sha3_256::new();
    hasher.update(public_key.as_bytes());
    hasher.update([ED25519_SCHEME]);
    AccountAddress::new(hasher.finalize().into())
}

/// Check a signed transaction's authenticator against its envelope
pub fn verify_signed_transaction(txn: &SignedTransaction) -> TradelogResult<()> {
    let public_key = VerifyingKey::try_from(txn.public_key())
        .map_err(|e| TradelogError::Signing(format!("Invalid public key: {}", e)))?;

    if derive_address(&public_key) != txn.raw().sender() {
        return Err(TradelogError::Signing(
            "Public key does not authenticate the sender".into(),
        ));
    }

    let signature = Signature::from_slice(txn.signature())
        .map_err(|e| TradelogError::Signing(format!("Invalid signature: {}", e)))?;
    public_key
        .verify(&txn.raw().signing_message()?, &signature)
        .map_err(|e| TradelogError::Signing(format!("Signature check failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::{build_envelope, string_arg, EntryFunction, GasBudget, ModuleId};

    const KEY: &str = "0x9bf49a6a0755f953811fce125f2683d50429c3bb49e074147e0089a52eae155f";

    fn envelope(sender: AccountAddress) -> RawTransaction {
        let module = ModuleId::new(AccountAddress::from_hex("0x2").unwrap(), "log").unwrap();
        let payload =
            EntryFunction::new(module, "log_trade", vec![string_arg("Trade: LONG").unwrap()]).unwrap();
        build_envelope(
            sender,
            3,
            payload,
            GasBudget {
                max_gas_amount: 50_000,
                gas_unit_price: 100,
            },
            1_700_000_600,
            2,
        )
    }

    #[test]
    fn test_key_formats_agree() {
        let plain = LocalAccount::from_private_key_hex(KEY).unwrap();
        let bare = LocalAccount::from_private_key_hex(KEY.trim_start_matches("0x")).unwrap();
        let exported =
            LocalAccount::from_private_key_hex(&format!("ed25519-priv-{}", KEY)).unwrap();

        assert_eq!(plain.address(), bare.address());
        assert_eq!(plain.address(), exported.address());
    }

    #[test]
    fn test_address_is_sha3_of_key_and_scheme() {
        let account = LocalAccount::from_private_key_hex(KEY).unwrap();
        let mut preimage = account.public_key().to_vec();
        preimage.push(0x00);
        let expected: [u8; 32] = Sha3_256::digest(&preimage).into();
        assert_eq!(account.address().as_bytes(), &expected);
    }

    #[test]
    fn test_load_requires_key_in_env() {
        let unset = WalletConfig {
            private_key_env: "TRADELOG_TEST_WALLET_UNSET".into(),
        };
        let err = LocalAccount::load(&unset).unwrap_err();
        assert!(matches!(err, TradelogError::Config(ref m) if m.contains("TRADELOG_TEST_WALLET_UNSET")));

        std::env::set_var("TRADELOG_TEST_WALLET_BLANK", "   ");
        let blank = WalletConfig {
            private_key_env: "TRADELOG_TEST_WALLET_BLANK".into(),
        };
        assert!(matches!(
            LocalAccount::load(&blank),
            Err(TradelogError::Config(_))
        ));
    }

    #[test]
    fn test_load_reads_key_from_env() {
        std::env::set_var("TRADELOG_TEST_WALLET_SET", KEY);
        let config = WalletConfig {
            private_key_env: "TRADELOG_TEST_WALLET_SET".into(),
        };
        let loaded = LocalAccount::load(&config).unwrap();
        let direct = LocalAccount::from_private_key_hex(KEY).unwrap();
        assert_eq!(loaded.address(), direct.address());
    }

    #[test]
    fn test_rejects_malformed_keys() {
        assert!(matches!(
            LocalAccount::from_private_key_hex("0x1234"),
            Err(TradelogError::Signing(_))
        ));
        assert!(matches!(
            LocalAccount::from_private_key_hex("not-hex"),
            Err(TradelogError::Signing(_))
        ));
    }

    #[test]
    fn test_signature_verifies() {
        let account = LocalAccount::from_private_key_hex(KEY).unwrap();
        let signed = account.sign_transaction(envelope(account.address())).unwrap();

        assert!(verify_signed_transaction(&signed).is_ok());

        let bytes = signed.to_bcs().unwrap();
        let raw_len = signed.raw().to_bcs().unwrap().len();
        assert_eq!(bytes.len(), raw_len + 1 + 1 + 32 + 1 + 64);
        assert_eq!(bytes[raw_len], 0);
    }

    #[test]
    fn test_refuses_foreign_envelope() {
        let account = LocalAccount::from_private_key_hex(KEY).unwrap();
        let other = AccountAddress::from_hex("0x1").unwrap();
        assert!(matches!(
            account.sign_transaction(envelope(other)),
            Err(TradelogError::Signing(_))
        ));
    }

    #[test]
    fn test_debug_hides_key() {
        let account = LocalAccount::from_private_key_hex(KEY).unwrap();
        let debug = format!("{:?}", account);
        assert!(!debug.contains("9bf49a6a"));
        assert!(debug.contains(&account.address().to_hex()));
    }
}
