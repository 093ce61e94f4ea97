//! # robotoscope
//!
//! Counts which clients (by User-Agent) read `robots.txt`, and which of them
//! then fetch the paths it disallows.
//!
//! Counts go into two independent [`CounterStore`]s, "robots" and
//! "cheaters", backed by one of:
//!
//! - [`MemoryStore`]: in-process map, lost on exit (default)
//! - [`RedisStore`]: one key per identifier, counted with `INCR`
//! - [`SqlStore`]: one table per store, counted with an upsert
//!
//! Requests are routed by a first-match [`PathRouter`] of unanchored path
//! regexes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use robotoscope::{CounterStore, MemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> robotoscope::Result<()> {
//!     let store = MemoryStore::new();
//!
//!     store.count("Googlebot/2.1").await?;
//!     store.count("Googlebot/2.1").await?;
//!
//!     for robot in store.list().await? {
//!         println!("{} seen {} times", robot.user_agent, robot.seen);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Routing
//!
//! ```rust
//! use robotoscope::PathRouter;
//!
//! let router = PathRouter::new()
//!     .route("/robots.txt", "robots")
//!     .unwrap()
//!     .route("/", "index")
//!     .unwrap();
//!
//! assert_eq!(router.dispatch("/robots.txt"), Some(&"robots"));
//! assert_eq!(router.dispatch("/anything/else"), Some(&"index"));
//! ```

pub mod config;
pub mod error;
pub mod html;
pub mod kv;
pub mod memory;
pub mod router;
pub mod server;
pub mod sql;
pub mod store;

// Re-export main types
pub use config::{Backend, Config};
pub use error::{Error, Result, StoreError};
pub use kv::{KvClient, KvValue, RedisStore};
pub use memory::MemoryStore;
pub use router::{PathRouter, Route};
pub use sql::SqlStore;
pub use store::{format_listing, CounterStore, RobotInfo, Stores};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{Result, StoreError};
    pub use crate::memory::MemoryStore;
    pub use crate::kv::RedisStore;
    pub use crate::router::PathRouter;
    pub use crate::sql::SqlStore;
    pub use crate::store::{CounterStore, RobotInfo, Stores};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryStore::new();

        store.count("Bot/1.0").await.unwrap();
        assert_eq!(store.list().await.unwrap(), vec![RobotInfo::new("Bot/1.0", 1)]);
    }

    #[tokio::test]
    async fn test_stores_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}

        assert_send_sync::<MemoryStore>();
        assert_send_sync::<SqlStore>();
        assert_send_sync::<RedisStore>();
        assert_send_sync::<Stores>();
    }
}
