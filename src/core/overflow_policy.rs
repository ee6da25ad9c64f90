//! What a queued appender does when its queue is full

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Policy for a full queue
///
/// Events at ERROR or above ignore the policy and always wait for space.
///
/// # Example
///
/// ```
/// use rust_logger_hierarchy::OverflowPolicy;
/// use std::time::Duration;
///
/// let policy = OverflowPolicy::default();
/// assert_eq!(policy, OverflowPolicy::Block);
///
/// let policy = OverflowPolicy::BlockWithTimeout(Duration::from_millis(100));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverflowPolicy {
    /// Wait until space is available
    #[default]
    Block,

    /// Wait up to the timeout, then drop
    BlockWithTimeout(Duration),

    /// Drop the incoming event
    DropNewest,
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::Block => write!(f, "Block"),
            OverflowPolicy::BlockWithTimeout(d) => write!(f, "BlockWithTimeout({:?})", d),
            OverflowPolicy::DropNewest => write!(f, "DropNewest"),
        }
    }
}

/// Called on the first drop and every 1000th after it, with the total number
/// of dropped events
pub type OverflowCallback = Arc<dyn Fn(u64) + Send + Sync>;
