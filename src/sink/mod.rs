pub mod sqlite;
pub mod supabase;
pub mod telegram;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{AlertConfig, PersistenceBackend, PersistenceConfig};
use crate::model::decision::Decision;

pub use sqlite::SqliteStore;
pub use supabase::SupabaseStore;
pub use telegram::{format_alert, TelegramAlert};

/// Decision persistence. Implementations log their own failures and never
/// propagate them into the pipeline.
#[async_trait]
pub trait DecisionStore: Send + Sync {
    async fn record(&self, decision: &Decision);
}

/// Operator notification channel with the same non-propagating contract.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, message: &str);
}

#[derive(Debug, Clone, Default)]
pub struct NoopStore;

#[async_trait]
impl DecisionStore for NoopStore {
    async fn record(&self, _decision: &Decision) {}
}

#[derive(Debug, Clone, Default)]
pub struct NoopAlert;

#[async_trait]
impl AlertSink for NoopAlert {
    async fn send(&self, _message: &str) {}
}

pub fn store_from_config(config: &PersistenceConfig) -> Arc<dyn DecisionStore> {
    match config.backend {
        PersistenceBackend::Supabase => {
            match (config.supabase_url.as_deref(), config.supabase_key.as_deref()) {
                (Some(url), Some(key)) => match SupabaseStore::new(url, key, config) {
                    Ok(store) => {
                        tracing::info!(table = %config.table, "Supabase persistence enabled");
                        Arc::new(store)
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to build Supabase client, persistence disabled");
                        Arc::new(NoopStore)
                    }
                },
                _ => {
                    tracing::warn!("Missing SUPABASE_URL or SUPABASE_KEY, persistence disabled");
                    Arc::new(NoopStore)
                }
            }
        }
        PersistenceBackend::Sqlite => match SqliteStore::open(&config.sqlite_path, &config.table) {
            Ok(store) => {
                tracing::info!(path = %config.sqlite_path.display(), "SQLite persistence enabled");
                Arc::new(store)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to open SQLite store, persistence disabled");
                Arc::new(NoopStore)
            }
        },
        PersistenceBackend::None => Arc::new(NoopStore),
    }
}

pub fn alert_from_config(config: &AlertConfig) -> Arc<dyn AlertSink> {
    match (
        config.telegram_token.as_deref(),
        config.telegram_chat_id.as_deref(),
    ) {
        (Some(token), Some(chat_id)) => match TelegramAlert::new(config, token, chat_id) {
            Ok(alert) => {
                tracing::info!("Telegram alerts enabled");
                Arc::new(alert)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to build Telegram client, alerts disabled");
                Arc::new(NoopAlert)
            }
        },
        _ => {
            tracing::warn!("Telegram credentials missing, alerts disabled");
            Arc::new(NoopAlert)
        }
    }
}
