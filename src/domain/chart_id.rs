// Chart identifiers served by the default registry.

pub const MEMPOOL_SIZE: &str = "mempool-size";
pub const MEMPOOL_TX_COUNT: &str = "mempool-tx-count";
pub const MEMPOOL_FEES: &str = "mempool-fees";

pub const BLOCK_PROPAGATION: &str = "block-propagation";
pub const BLOCK_TIMESTAMP: &str = "block-timestamp";
pub const VOTES_RECEIVE_TIME: &str = "votes-receive-time";

pub const POW: &str = "pow";
pub const VSP: &str = "vsp";

pub const EXCHANGE: &str = "exchange";

pub const NODES: &str = "nodes";
pub const NODE_LOCATIONS: &str = "node-locations";
pub const NODE_VERSIONS: &str = "node-versions";

pub const BLOCK_SIZE: &str = "block-size";
pub const TX_COUNT: &str = "tx-count";
pub const FEES: &str = "fees";
pub const CUMULATIVE_FEES: &str = "cumulative-fees";
pub const CHAINWORK: &str = "chainwork";
pub const DURATION_BTW_BLOCKS: &str = "duration-btw-blocks";
pub const TICKET_PRICE: &str = "ticket-price";
pub const POW_DIFFICULTY: &str = "pow-difficulty";
pub const MISSED_VOTES: &str = "missed-votes";
