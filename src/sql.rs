//! Relational counter store.
//!
//! Each logical store is one table with a unique `user_agent` column and a
//! `seen` counter. Counting is a single upsert, so concurrent counts for the
//! same identifier are serialized by the database.
//!
//! The pool uses SQLx's `Any` driver: Postgres URLs in production,
//! `sqlite:` URLs for embedded use and tests.

use async_trait::async_trait;
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::store::{CounterStore, RobotInfo, Stores};

/// Maximum number of rows returned by [`SqlStore::list`].
///
/// Rows beyond this are left out of the listing; there is no paging.
pub const LIST_LIMIT: i64 = 640;

/// Open a connection pool for the database at `url`.
pub async fn open_database(url: &str) -> Result<AnyPool> {
    sqlx::any::install_default_drivers();

    let pool = AnyPoolOptions::new()
        .max_connections(5)
        .connect(url)
        .await
        .map_err(|e| StoreError::Connection(e.to_string()))?;

    info!("Opened {} database", url.split(':').next().unwrap_or("sql"));
    Ok(pool)
}

/// Table names are spliced into SQL text, so only plain identifiers pass.
fn validate_table_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if !valid {
        return Err(StoreError::InvalidName(format!(
            "{name:?} is not a valid table name"
        )));
    }
    Ok(())
}

/// Relational implementation of CounterStore.
pub struct SqlStore {
    pool: AnyPool,
    table: String,
    upsert_sql: String,
    select_sql: String,
}

impl SqlStore {
    /// Create a store backed by `table`, creating the table if needed.
    pub async fn new(pool: AnyPool, table: &str) -> Result<Self> {
        validate_table_name(table)?;

        let store = Self {
            upsert_sql: format!(
                "INSERT INTO {table} (user_agent, seen) VALUES ($1, 1) \
                 ON CONFLICT (user_agent) DO UPDATE SET seen = {table}.seen + 1"
            ),
            select_sql: format!(
                "SELECT user_agent, CAST(seen AS BIGINT) FROM {table} LIMIT {LIST_LIMIT}"
            ),
            table: table.to_string(),
            pool,
        };

        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        let create = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                user_agent TEXT NOT NULL,
                seen BIGINT NOT NULL,
                UNIQUE (user_agent)
            )
            "#,
            self.table
        );
        sqlx::query(&create).execute(&self.pool).await?;

        debug!("Table {} initialized", self.table);
        Ok(())
    }
}

#[async_trait]
impl CounterStore for SqlStore {
    async fn count(&self, identifier: &str) -> Result<()> {
        let result = sqlx::query(&self.upsert_sql)
            .bind(identifier)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() != 1 {
            return Err(StoreError::Constraint("no rows updated".to_string()));
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<RobotInfo>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(&self.select_sql)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|(user_agent, seen)| {
                let seen = u64::try_from(seen).map_err(|_| {
                    StoreError::Decode(format!("negative count {seen} for {user_agent:?}"))
                })?;
                Ok(RobotInfo { user_agent, seen })
            })
            .collect()
    }
}

impl Stores {
    /// "robots" and "cheaters" tables in one database.
    pub async fn sql(pool: AnyPool) -> Result<Self> {
        let robots = SqlStore::new(pool.clone(), "robots").await?;
        let cheaters = SqlStore::new(pool, "cheaters").await?;
        Ok(Self::new(Arc::new(robots), Arc::new(cheaters)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_pool() -> AnyPool {
        sqlx::any::install_default_drivers();
        AnyPoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    fn sorted(mut robots: Vec<RobotInfo>) -> Vec<RobotInfo> {
        robots.sort_by(|a, b| a.user_agent.cmp(&b.user_agent));
        robots
    }

    #[test]
    fn test_validate_table_name() {
        assert!(validate_table_name("robots").is_ok());
        assert!(validate_table_name("_bots_2").is_ok());
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("2bots").is_err());
        assert!(validate_table_name("robots; DROP TABLE x").is_err());
    }

    #[tokio::test]
    async fn test_sql_count_and_list() {
        let store = SqlStore::new(memory_pool().await, "robots").await.unwrap();

        for _ in 0..3 {
            store.count("Bot/1.0").await.unwrap();
        }
        store.count("Bot/2.0").await.unwrap();

        assert_eq!(
            sorted(store.list().await.unwrap()),
            vec![RobotInfo::new("Bot/1.0", 3), RobotInfo::new("Bot/2.0", 1)]
        );
    }

    #[tokio::test]
    async fn test_sql_schema_is_idempotent() {
        let pool = memory_pool().await;
        let first = SqlStore::new(pool.clone(), "robots").await.unwrap();
        first.count("Bot/1.0").await.unwrap();

        let second = SqlStore::new(pool, "robots").await.unwrap();
        assert_eq!(second.list().await.unwrap(), vec![RobotInfo::new("Bot/1.0", 1)]);
    }

    #[tokio::test]
    async fn test_sql_repeated_list_is_stable() {
        let store = SqlStore::new(memory_pool().await, "robots").await.unwrap();
        store.count("a").await.unwrap();
        store.count("b").await.unwrap();
        store.count("b").await.unwrap();

        let first = sorted(store.list().await.unwrap());
        let second = sorted(store.list().await.unwrap());
        assert_eq!(first, second);
        assert_eq!(first, vec![RobotInfo::new("a", 1), RobotInfo::new("b", 2)]);
    }

    #[tokio::test]
    async fn test_sql_reads_numeric_seen_column() {
        let pool = memory_pool().await;
        sqlx::query(
            "CREATE TABLE robots (user_agent text not null, seen numeric, unique(user_agent))",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO robots (user_agent, seen) VALUES ('Bot/1.0', 41)")
            .execute(&pool)
            .await
            .unwrap();

        let store = SqlStore::new(pool, "robots").await.unwrap();
        store.count("Bot/1.0").await.unwrap();

        assert_eq!(store.list().await.unwrap(), vec![RobotInfo::new("Bot/1.0", 42)]);
    }

    #[tokio::test]
    async fn test_sql_invalid_table() {
        let result = SqlStore::new(memory_pool().await, "robots--").await;
        assert!(matches!(result, Err(StoreError::InvalidName(_))));
    }

    #[tokio::test]
    async fn test_sql_zero_rows_is_an_error() {
        let pool = memory_pool().await;
        let store = SqlStore::new(pool.clone(), "robots").await.unwrap();

        sqlx::query(
            "CREATE TRIGGER robots_frozen BEFORE INSERT ON robots \
             BEGIN SELECT RAISE(IGNORE); END",
        )
        .execute(&pool)
        .await
        .unwrap();

        let result = store.count("Bot/1.0").await;
        assert!(matches!(result, Err(StoreError::Constraint(_))));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sql_list_is_capped() {
        let store = SqlStore::new(memory_pool().await, "robots").await.unwrap();

        for i in 0..(LIST_LIMIT + 10) {
            store.count(&format!("Bot/{i}")).await.unwrap();
        }

        assert_eq!(store.list().await.unwrap().len(), LIST_LIMIT as usize);
    }

    #[tokio::test]
    async fn test_sql_negative_count_is_a_decode_error() {
        let pool = memory_pool().await;
        let store = SqlStore::new(pool.clone(), "robots").await.unwrap();

        sqlx::query("INSERT INTO robots (user_agent, seen) VALUES ('Bot/1.0', -4)")
            .execute(&pool)
            .await
            .unwrap();

        assert!(matches!(store.list().await, Err(StoreError::Decode(_))));
    }

    #[tokio::test]
    async fn test_sql_concurrent_counts() {
        let store = Arc::new(SqlStore::new(memory_pool().await, "robots").await.unwrap());

        let mut handles = Vec::new();
        for _ in 0..4 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                for _ in 0..25 {
                    store.count("Bot/1.0").await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.list().await.unwrap(), vec![RobotInfo::new("Bot/1.0", 100)]);
    }

    #[tokio::test]
    async fn test_sql_named_stores_are_isolated() {
        let stores = Stores::sql(memory_pool().await).await.unwrap();

        stores.robots.count("Bot/1.0").await.unwrap();
        stores.cheaters.count("Sneaky/0.1").await.unwrap();

        assert_eq!(
            stores.robots.list().await.unwrap(),
            vec![RobotInfo::new("Bot/1.0", 1)]
        );
        assert_eq!(
            stores.cheaters.list().await.unwrap(),
            vec![RobotInfo::new("Sneaky/0.1", 1)]
        );
    }
}
