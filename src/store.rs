//! CounterStore trait - the contract every counting backend implements.
//!
//! A store maps an identifier (a User-Agent string) to the number of times
//! it has been counted. Counts start at zero, go up by exactly one per
//! successful [`CounterStore::count`] and never go down.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::sync::Arc;

use crate::error::Result;

/// How many times a given user agent has been seen.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RobotInfo {
    /// The counted identifier.
    pub user_agent: String,
    /// Number of successful counts so far.
    pub seen: u64,
}

impl RobotInfo {
    /// Create a record for `user_agent` seen `seen` times.
    pub fn new(user_agent: impl Into<String>, seen: u64) -> Self {
        Self {
            user_agent: user_agent.into(),
            seen,
        }
    }
}

/// The core counting trait.
///
/// Implementations must be safe to share between concurrent requests and
/// must never lose an increment, whatever the interleaving of callers.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Add one to the count for `identifier`, creating it at 1 if unseen.
    ///
    /// No retries happen inside the store; a reported failure is final for
    /// this attempt.
    async fn count(&self, identifier: &str) -> Result<()>;

    /// Snapshot of every known identifier with its count.
    ///
    /// Order is whatever the backend yields.
    async fn list(&self) -> Result<Vec<RobotInfo>>;
}

/// The two independent stores the service counts into.
#[derive(Clone)]
pub struct Stores {
    /// Every client that fetched robots.txt.
    pub robots: Arc<dyn CounterStore>,
    /// Clients that went where robots.txt told them not to.
    pub cheaters: Arc<dyn CounterStore>,
}

impl Stores {
    /// Pair two stores; they must not share state.
    pub fn new(robots: Arc<dyn CounterStore>, cheaters: Arc<dyn CounterStore>) -> Self {
        Self { robots, cheaters }
    }
}

/// Render a listing as one `"<seen>: \"<user agent>\"\n"` line per entry.
///
/// The count is right-aligned in a field at least three characters wide.
pub fn format_listing(robots: &[RobotInfo]) -> String {
    let mut out = String::new();
    for robot in robots {
        // Writing into a String cannot fail.
        let _ = writeln!(out, "{:>3}: {:?}", robot.seen, robot.user_agent);
    }
    out
}
