use anyhow::{Context as _, Result};
use sqlx::{sqlite::SqliteConnectOptions, SqlitePool};
use std::{path::Path, str::FromStr};

/// Default timeout for individual store queries.
/// Prevents a hung query from blocking a request handler indefinitely.
const QUERY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Execute a future with the standard query timeout.
/// Returns an error if the operation takes longer than `QUERY_TIMEOUT`.
async fn with_timeout<T>(fut: impl std::future::Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(QUERY_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!(
            "store query timed out after {}s",
            QUERY_TIMEOUT.as_secs()
        )),
    }
}

/// Key-value store adapter.
///
/// One connection pool per process, opened in `main` and shared by every
/// handler. The surface is five operations over string keys and string
/// values — get / set / delete / keys / multi_get — callers never see SQL.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub async fn new(data_dir: &Path) -> Result<Self> {
        Self::new_with_slow_query(data_dir, 0).await
    }

    /// Open the store with slow-query logging enabled.
    ///
    /// `slow_query_ms` is the threshold in milliseconds — queries exceeding it
    /// are logged at WARN level. Set to 0 to disable slow-query logging.
    pub async fn new_with_slow_query(data_dir: &Path, slow_query_ms: u64) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir).await?;
        let db_path = data_dir.join("taskd.db");
        let mut opts =
            SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", db_path.display()))?
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .create_if_missing(true);

        if slow_query_ms > 0 {
            use sqlx::ConnectOptions as _;
            opts = opts.log_slow_statements(
                log::LevelFilter::Warn,
                std::time::Duration::from_millis(slow_query_ms),
            );
        }

        let pool = SqlitePool::connect_with(opts).await?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    async fn migrate(pool: &SqlitePool) -> Result<()> {
        sqlx::query("CREATE TABLE IF NOT EXISTS kv (key TEXT PRIMARY KEY, value TEXT NOT NULL)")
            .execute(pool)
            .await
            .context("failed to create kv table")?;
        Ok(())
    }

    /// Fetch the value stored under `key`, or `None` if absent.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(value,)| value))
    }

    /// Store `value` under `key`, replacing any existing value.
    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO kv (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Remove `key`. Returns the number of entries removed (0 or 1).
    pub async fn delete(&self, key: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM kv WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// List keys matching a glob pattern (`*` = any run, `?` = one char).
    /// `"*"` lists every key.
    pub async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        with_timeout(async {
            let rows: Vec<(String,)> =
                sqlx::query_as("SELECT key FROM kv WHERE key LIKE ? ESCAPE '\\' ORDER BY key")
                    .bind(glob_to_like(pattern))
                    .fetch_all(&self.pool)
                    .await?;
            Ok(rows.into_iter().map(|(key,)| key).collect())
        })
        .await
    }

    /// Fetch many keys at once. The result is positional: `result[i]` is the
    /// value for `keys[i]`, `None` where the key is absent.
    pub async fn multi_get(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        with_timeout(async {
            let mut values = Vec::with_capacity(keys.len());
            for key in keys {
                let row: Option<(String,)> = sqlx::query_as("SELECT value FROM kv WHERE key = ?")
                    .bind(key)
                    .fetch_optional(&self.pool)
                    .await?;
                values.push(row.map(|(value,)| value));
            }
            Ok(values)
        })
        .await
    }
}

/// Translate a glob pattern to a SQL LIKE pattern.
/// LIKE metacharacters in the input are escaped so they match literally.
fn glob_to_like(pattern: &str) -> String {
    let mut like = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        match c {
            '*' => like.push('%'),
            '?' => like.push('_'),
            '%' | '_' | '\\' => {
                like.push('\\');
                like.push(c);
            }
            other => like.push(other),
        }
    }
    like
}
