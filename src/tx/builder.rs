//! Transaction envelope construction
//!
//! Builds the unsigned `RawTransaction` for an entry-function call and its
//! BCS signing message. Everything here is pure: no I/O, no clock.

use super::gas::GasBudget;
use crate::chain::AccountAddress;
use crate::error::{TradelogError, TradelogResult};

use serde::{Serialize, Serializer};
use sha3::{Digest, Sha3_256};

/// Domain separator hashed into every signing message
const RAW_TRANSACTION_SALT: &[u8] = b"APTOS::RawTransaction";

/// `module_address::module_name`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleId {
    #[serde(serialize_with = "address_bytes")]
    address: AccountAddress,
    name: String,
}

impl ModuleId {
    pub fn new(address: AccountAddress, name: &str) -> TradelogResult<Self> {
        validate_identifier(name)?;
        Ok(Self {
            address,
            name: name.to_string(),
        })
    }
}

impl std::fmt::Display for ModuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.address, self.name)
    }
}

/// Move type argument; trade-log calls never pass any
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
enum TypeTag {}

/// Entry-function call with BCS-encoded arguments and no type arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryFunction {
    module: ModuleId,
    function: String,
    ty_args: Vec<TypeTag>,
    args: Vec<Vec<u8>>,
}

impl EntryFunction {
    pub fn new(module: ModuleId, function: &str, args: Vec<Vec<u8>>) -> TradelogResult<Self> {
        validate_identifier(function)?;
        Ok(Self {
            module,
            function: function.to_string(),
            ty_args: Vec::new(),
            args,
        })
    }

    pub fn args(&self) -> &[Vec<u8>] {
        &self.args
    }
}

/// Payload enum as the ledger numbers it; only `EntryFunction` is ever built
#[derive(Serialize)]
#[allow(dead_code)]
enum TransactionPayload<'a> {
    Script,
    ModuleBundle,
    EntryFunction(&'a EntryFunction),
}

/// Unsigned transaction envelope; immutable once built
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawTransaction {
    #[serde(serialize_with = "address_bytes")]
    sender: AccountAddress,
    sequence_number: u64,
    #[serde(serialize_with = "entry_function_payload")]
    payload: EntryFunction,
    max_gas_amount: u64,
    gas_unit_price: u64,
    expiration_timestamp_secs: u64,
    chain_id: u8,
}

impl RawTransaction {
    pub fn sender(&self) -> AccountAddress {
        self.sender
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn payload(&self) -> &EntryFunction {
        &self.payload
    }

    pub fn expiration_timestamp_secs(&self) -> u64 {
        self.expiration_timestamp_secs
    }

    pub fn to_bcs(&self) -> TradelogResult<Vec<u8>> {
        encode(self)
    }

    /// `sha3_256(salt) || bcs(raw_txn)`, the bytes an account signs
    pub fn signing_message(&self) -> TradelogResult<Vec<u8>> {
        let mut message = Sha3_256::digest(RAW_TRANSACTION_SALT).to_vec();
        message.extend_from_slice(&self.to_bcs()?);
        Ok(message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
enum TransactionAuthenticator {
    Ed25519 {
        public_key: Vec<u8>,
        signature: Vec<u8>,
    },
}

/// Envelope plus an Ed25519 authenticator, ready for submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedTransaction {
    raw: RawTransaction,
    authenticator: TransactionAuthenticator,
}

impl SignedTransaction {
    pub(crate) fn new(raw: RawTransaction, public_key: [u8; 32], signature: [u8; 64]) -> Self {
        Self {
            raw,
            authenticator: TransactionAuthenticator::Ed25519 {
                public_key: public_key.to_vec(),
                signature: signature.to_vec(),
            },
        }
    }

    pub fn raw(&self) -> &RawTransaction {
        &self.raw
    }

    pub fn public_key(&self) -> &[u8] {
        match &self.authenticator {
            TransactionAuthenticator::Ed25519 { public_key, .. } => public_key,
        }
    }

    pub fn signature(&self) -> &[u8] {
        match &self.authenticator {
            TransactionAuthenticator::Ed25519 { signature, .. } => signature,
        }
    }

    /// Body for `POST /transactions` with the signed-transaction BCS content type
    pub fn to_bcs(&self) -> TradelogResult<Vec<u8>> {
        encode(self)
    }
}

/// BCS encoding of a string argument
pub fn string_arg(value: &str) -> TradelogResult<Vec<u8>> {
    encode(&value)
}

/// Assemble an envelope for one entry-function call
pub fn build_envelope(
    sender: AccountAddress,
    sequence_number: u64,
    payload: EntryFunction,
    gas: GasBudget,
    expiration_timestamp_secs: u64,
    chain_id: u8,
) -> RawTransaction {
    RawTransaction {
        sender,
        sequence_number,
        payload,
        max_gas_amount: gas.max_gas_amount,
        gas_unit_price: gas.gas_unit_price,
        expiration_timestamp_secs,
        chain_id,
    }
}

fn encode<T: Serialize + ?Sized>(value: &T) -> TradelogResult<Vec<u8>> {
    bcs::to_bytes(value)
        .map_err(|e| TradelogError::Signing(format!("Cannot encode transaction: {}", e)))
}

/// Addresses go on the wire as 32 raw bytes, not the JSON hex form
fn address_bytes<S: Serializer>(address: &AccountAddress, serializer: S) -> Result<S::Ok, S::Error> {
    address.as_bytes().serialize(serializer)
}

fn entry_function_payload<S: Serializer>(
    payload: &EntryFunction,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    TransactionPayload::EntryFunction(payload).serialize(serializer)
}

/// Move identifiers: `[A-Za-z_][A-Za-z0-9_]*`
fn validate_identifier(name: &str) -> TradelogResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(TradelogError::InvalidInput(format!(
            "Invalid Move identifier: {:?}",
            name
        )))
    }
}
