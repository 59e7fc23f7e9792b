pub mod mock_node;
pub mod recording;
pub mod test_env;
pub mod ws_node;

use alloy_primitives::U256;
use watcher::BlockHeader;

/// A header with the given number and every other field zeroed.
pub fn header(number: u64) -> BlockHeader {
    BlockHeader::with_number(U256::from(number))
}
