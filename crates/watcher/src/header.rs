use alloy::rpc::types::Header;
use alloy_primitives::{B256, U256};

/// A new-head notification as consumed by the watcher.
///
/// Only `number` is reported. The other fields are kept for debug logging and are
/// dropped along with the header once it has been reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    /// Block height. Arbitrary precision, rendered in decimal.
    pub number: U256,
    pub hash: B256,
    pub parent_hash: B256,
    /// Unix timestamp in seconds.
    pub timestamp: u64,
    pub gas_used: u64,
    pub base_fee_per_gas: Option<u64>,
}

impl BlockHeader {
    /// A header carrying only a block number; every other field is zeroed.
    pub fn with_number(number: U256) -> Self {
        Self {
            number,
            hash: B256::ZERO,
            parent_hash: B256::ZERO,
            timestamp: 0,
            gas_used: 0,
            base_fee_per_gas: None,
        }
    }
}

impl From<&Header> for BlockHeader {
    fn from(header: &Header) -> Self {
        Self {
            number: U256::from(header.inner.number),
            hash: header.hash,
            parent_hash: header.inner.parent_hash,
            timestamp: header.inner.timestamp,
            gas_used: header.inner.gas_used,
            base_fee_per_gas: header.inner.base_fee_per_gas,
        }
    }
}
