use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection};

use super::DecisionStore;
use crate::error::{AppError, AppResult};
use crate::model::decision::Decision;

/// Local decision log in a single SQLite table. Inserts run on the blocking
/// thread pool, off the instrument workers.
pub struct SqliteStore {
    inner: Arc<Inner>,
}

struct Inner {
    conn: Mutex<Connection>,
    table: String,
}

impl Inner {
    fn conn(&self) -> AppResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Config("sqlite connection lock poisoned".to_string()))
    }

    fn insert(&self, decision: &Decision) -> AppResult<()> {
        self.conn()?.execute(
            &format!(
                "INSERT INTO {} (timestamp, symbol, price, signal, confidence, risk_level, sentiment_score, reasoning)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                self.table
            ),
            params![
                decision.timestamp.to_rfc3339(),
                decision.symbol,
                decision.price,
                decision.signal.as_str(),
                decision.confidence,
                decision.risk_level.as_str(),
                decision.sentiment_score,
                decision.reasoning,
            ],
        )?;
        Ok(())
    }
}

impl SqliteStore {
    pub fn open(path: &Path, table: &str) -> AppResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::with_connection(Connection::open(path)?, table)
    }

    pub fn with_connection(conn: Connection, table: &str) -> AppResult<Self> {
        if !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') || table.is_empty() {
            return Err(AppError::Config(format!("invalid table name '{}'", table)));
        }
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                symbol TEXT NOT NULL,
                price REAL NOT NULL,
                signal TEXT NOT NULL,
                confidence REAL NOT NULL,
                risk_level TEXT NOT NULL,
                sentiment_score REAL NOT NULL,
                reasoning TEXT NOT NULL
            );
            "#
        ))?;
        Ok(Self {
            inner: Arc::new(Inner {
                conn: Mutex::new(conn),
                table: table.to_string(),
            }),
        })
    }

    /// Synchronous insert on the calling thread.
    pub fn insert(&self, decision: &Decision) -> AppResult<()> {
        self.inner.insert(decision)
    }

    /// Number of stored decisions.
    pub fn count(&self) -> AppResult<i64> {
        let n = self.inner.conn()?.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.inner.table),
            [],
            |row| row.get(0),
        )?;
        Ok(n)
    }
}

#[async_trait]
impl DecisionStore for SqliteStore {
    async fn record(&self, decision: &Decision) {
        let inner = self.inner.clone();
        let row = decision.clone();
        match tokio::task::spawn_blocking(move || inner.insert(&row)).await {
            Ok(Ok(())) => tracing::debug!(symbol = %decision.symbol, "Decision saved to sqlite"),
            Ok(Err(e)) => tracing::error!(error = %e, symbol = %decision.symbol, "Failed to save decision to sqlite"),
            Err(e) => tracing::error!(error = %e, symbol = %decision.symbol, "SQLite insert task failed"),
        }
    }
}
