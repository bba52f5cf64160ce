//! Activity tracking ids.
//!
//! Ids are snowflake values rendered as decimal strings, so they sort by
//! creation time and stay unique across agents configured with distinct
//! node numbers.

use parking_lot::{const_mutex, Mutex};
use snowflake::SnowflakeIdBucket;

/// Node number used until [`set_node`] is called.
pub const DEFAULT_NODE: u8 = 1;

/// Largest node number the generator accepts.
pub const MAX_NODE: u8 = 31;

const MACHINE: i32 = 1;

static TRACKING_IDS: Mutex<Option<(u8, SnowflakeIdBucket)>> = const_mutex(None);

/// Binds the generator to `node`. Numbers above [`MAX_NODE`] are clamped.
pub fn set_node(node: u8) {
    let node = node.min(MAX_NODE);
    *TRACKING_IDS.lock() = Some((node, SnowflakeIdBucket::new(MACHINE, i32::from(node))));
}

/// Node number the generator currently stamps into ids.
pub fn node() -> u8 {
    TRACKING_IDS
        .lock()
        .as_ref()
        .map_or(DEFAULT_NODE, |(node, _)| *node)
}

/// Next activity tracking id.
pub fn next_id() -> String {
    let mut ids = TRACKING_IDS.lock();
    let (_, bucket) = ids.get_or_insert_with(|| {
        (
            DEFAULT_NODE,
            SnowflakeIdBucket::new(MACHINE, i32::from(DEFAULT_NODE)),
        )
    });
    bucket.get_id().to_string()
}
