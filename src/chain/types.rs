//! Ledger REST API types

use crate::error::{TradelogError, TradelogResult};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DeserializeFromStr, DisplayFromStr, SerializeDisplay};
use std::fmt;
use std::str::FromStr;

const ADDRESS_LENGTH: usize = 32;

/// 32-byte account address
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, SerializeDisplay, DeserializeFromStr)]
pub struct AccountAddress([u8; ADDRESS_LENGTH]);

impl AccountAddress {
    pub const LENGTH: usize = ADDRESS_LENGTH;

    pub const fn new(bytes: [u8; Self::LENGTH]) -> Self {
        Self(bytes)
    }

    /// Parse a hex address with or without `0x`; short forms are zero-padded
    pub fn from_hex(input: &str) -> TradelogResult<Self> {
        let trimmed = input.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if digits.is_empty() || digits.len() > Self::LENGTH * 2 {
            return Err(TradelogError::InvalidInput(format!(
                "Invalid account address: {:?}",
                input
            )));
        }

        let padded = format!("{:0>width$}", digits, width = Self::LENGTH * 2);
        let mut bytes = [0u8; Self::LENGTH];
        hex::decode_to_slice(&padded, &mut bytes).map_err(|e| {
            TradelogError::InvalidInput(format!("Invalid account address {:?}: {}", input, e))
        })?;

        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; Self::LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl FromStr for AccountAddress {
    type Err = TradelogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountAddress({})", self.to_hex())
    }
}

/// Hash returned by the node for a submitted transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(String);

impl TxHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `GET /accounts/{address}`
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountInfo {
    #[serde_as(as = "DisplayFromStr")]
    pub sequence_number: u64,
    pub authentication_key: String,
}

/// One entry of `GET /accounts/{address}/resources`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResource {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub data: serde_json::Value,
}

/// One entry of `GET /accounts/{address}/transactions`
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub hash: String,
    #[serde(default)]
    pub success: bool,
    /// Commit time in microseconds since the epoch
    #[serde_as(as = "DisplayFromStr")]
    pub timestamp: u64,
}

impl TransactionSummary {
    pub fn time(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.timestamp)
            .ok()
            .and_then(DateTime::from_timestamp_micros)
    }
}

/// Response body of `POST /transactions`
#[derive(Debug, Clone, Deserialize)]
pub struct SubmittedTransaction {
    pub hash: String,
}

/// Response body of `GET /transactions/by_hash/{hash}`
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionInfo {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub vm_status: Option<String>,
}

impl TransactionInfo {
    pub fn status(&self) -> TransactionStatus {
        if self.kind == "pending_transaction" {
            return TransactionStatus::Pending;
        }
        TransactionStatus::Committed {
            success: self.success.unwrap_or(false),
            vm_status: self.vm_status.clone().unwrap_or_default(),
        }
    }
}

/// Where a submitted transaction stands from the node's point of view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    /// The node has not seen the hash (yet)
    NotFound,
    /// In the mempool, not yet committed
    Pending,
    /// Committed to the ledger
    Committed { success: bool, vm_status: String },
}

/// Response body of `GET /estimate_gas_price`
#[derive(Debug, Clone, Deserialize)]
pub struct GasEstimate {
    pub gas_estimate: u64,
}

/// Error body returned by the node on non-2xx responses
#[derive(Debug, Clone, Deserialize)]
pub struct NodeError {
    pub message: String,
    #[serde(default)]
    pub error_code: Option<String>,
}
