use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

use crate::model::tick::{MarketTick, TradeMessage};
use crate::pipeline::{DecisionPipeline, PipelineContext, TickOutcome};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouterReport {
    pub routed: u64,
    /// Non-trade events and payloads that are not trade objects.
    pub ignored: u64,
    /// Trade events without a numeric price.
    pub rejected: u64,
    /// Ticks dropped because the instrument queue was full.
    pub dropped: u64,
    pub decisions: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub ticks: u64,
    pub evaluations: u64,
    pub decisions: u64,
    pub failures: u64,
}

struct Worker {
    tx: mpsc::Sender<MarketTick>,
    handle: JoinHandle<WorkerStats>,
}

/// Fans decoded feed messages out to one pipeline task per instrument.
/// Each instrument is processed in arrival order; a slow instrument never
/// blocks routing for the others.
pub struct Router {
    ctx: PipelineContext,
    capacity: usize,
    heartbeat_every: u64,
    workers: HashMap<String, Worker>,
    report: RouterReport,
}

impl Router {
    pub fn new(ctx: PipelineContext, capacity: usize, heartbeat_every: u64) -> Self {
        Self {
            ctx,
            capacity: capacity.max(1),
            heartbeat_every,
            workers: HashMap::new(),
            report: RouterReport::default(),
        }
    }

    /// Route until the feed channel closes, then drain every worker.
    pub async fn run(mut self, mut rx: mpsc::Receiver<serde_json::Value>) -> RouterReport {
        let mut since_heartbeat = 0u64;

        while let Some(value) = rx.recv().await {
            let Some(msg) = TradeMessage::from_value(value).filter(TradeMessage::is_trade) else {
                self.report.ignored += 1;
                continue;
            };
            let Some(tick) = msg.to_tick() else {
                tracing::debug!(symbol = ?msg.symbol, "Trade without numeric price, dropping");
                self.report.rejected += 1;
                continue;
            };

            since_heartbeat += 1;
            if self.heartbeat_every > 0 && since_heartbeat >= self.heartbeat_every {
                tracing::debug!(symbol = %tick.symbol, price = tick.price, "Listening");
                since_heartbeat = 0;
            }

            self.route(tick);
        }

        let workers = std::mem::take(&mut self.workers);
        for (symbol, worker) in workers {
            drop(worker.tx);
            match worker.handle.await {
                Ok(stats) => {
                    tracing::debug!(symbol = %symbol, ticks = stats.ticks, decisions = stats.decisions, "Worker finished");
                    self.report.decisions += stats.decisions;
                }
                Err(e) => tracing::error!(symbol = %symbol, error = %e, "Worker task failed"),
            }
        }
        self.report
    }

    fn route(&mut self, tick: MarketTick) {
        let symbol = tick.symbol.clone();
        let worker = self
            .workers
            .entry(symbol.clone())
            .or_insert_with(|| spawn_worker(&symbol, self.ctx.clone(), self.capacity));

        match worker.tx.try_send(tick) {
            Ok(()) => self.report.routed += 1,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(symbol = %symbol, "Instrument queue full, dropping tick");
                self.report.dropped += 1;
            }
            Err(TrySendError::Closed(_)) => {
                // Next tick for this symbol starts a fresh worker.
                tracing::error!(symbol = %symbol, "Instrument worker gone, dropping tick");
                self.workers.remove(&symbol);
                self.report.dropped += 1;
            }
        }
    }
}

fn spawn_worker(symbol: &str, ctx: PipelineContext, capacity: usize) -> Worker {
    tracing::info!(symbol = %symbol, "Tracking new instrument");
    let (tx, mut rx) = mpsc::channel::<MarketTick>(capacity);
    let handle = tokio::spawn(async move {
        let mut pipeline = DecisionPipeline::new(ctx);
        let mut stats = WorkerStats::default();
        while let Some(tick) = rx.recv().await {
            stats.ticks += 1;
            match pipeline.on_tick(&tick).await {
                Ok(TickOutcome::Emitted(_)) => {
                    stats.evaluations += 1;
                    stats.decisions += 1;
                }
                Ok(TickOutcome::Held { .. }) => stats.evaluations += 1,
                Ok(TickOutcome::WarmingUp | TickOutcome::CoolingDown) => {}
                Err(e) => {
                    stats.failures += 1;
                    tracing::error!(symbol = %tick.symbol, error = %e, "Tick processing failed, skipping");
                }
            }
        }
        stats
    });
    Worker { tx, handle }
}
