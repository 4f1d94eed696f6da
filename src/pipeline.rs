use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::{AppError, AppResult};
use crate::indicator::{TechnicalEngine, TechnicalSnapshot};
use crate::model::decision::{reasoning_text, Decision, RiskLevel};
use crate::model::signal::{Signal, TechnicalSignal};
use crate::model::tick::MarketTick;
use crate::sentiment::{SentimentReading, SentimentSource};
use crate::sink::{format_alert, AlertSink, DecisionStore};

const NEGATIVE_NEWS: f64 = -0.5;
const POSITIVE_NEWS: f64 = 0.5;

/// Minimum wall-clock spacing between decision evaluations.
#[derive(Debug, Clone)]
pub struct CooldownGate {
    last_fire: Option<DateTime<Utc>>,
    interval: Duration,
}

impl CooldownGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            last_fire: None,
            interval,
        }
    }

    pub fn is_cooling(&self, now: DateTime<Utc>) -> bool {
        // A clock stepping backwards reads as still cooling.
        self.last_fire.map_or(false, |last| {
            now.signed_duration_since(last)
                .to_std()
                .map_or(true, |elapsed| elapsed < self.interval)
        })
    }

    /// Consume the gate at `now` unless it is still cooling.
    pub fn try_fire(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_cooling(now) {
            return false;
        }
        self.last_fire = Some(now);
        true
    }

    pub fn last_fire(&self) -> Option<DateTime<Utc>> {
        self.last_fire
    }
}

/// Indicator state and cooldown for one instrument.
#[derive(Debug, Clone)]
pub struct InstrumentState {
    pub engine: TechnicalEngine,
    pub gate: CooldownGate,
}

impl InstrumentState {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            engine: TechnicalEngine::new(),
            gate: CooldownGate::new(cooldown),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub signal: Signal,
    pub risk_level: RiskLevel,
    pub confidence: f64,
}

/// Apply the news filter to a technical signal.
pub fn resolve(base: Signal, sentiment_score: f64) -> Resolution {
    let (signal, risk_level, confidence) = match base {
        Signal::Buy if sentiment_score < NEGATIVE_NEWS => (Signal::Hold, RiskLevel::BlockedByNews, 0.0),
        Signal::Buy if sentiment_score > POSITIVE_NEWS => (Signal::Buy, RiskLevel::Low, 0.95),
        Signal::Buy => (Signal::Buy, RiskLevel::Moderate, 0.75),
        Signal::Sell if sentiment_score < NEGATIVE_NEWS => (Signal::Sell, RiskLevel::Low, 0.90),
        Signal::Sell => (Signal::Sell, RiskLevel::Moderate, 0.70),
        Signal::Hold => (Signal::Hold, RiskLevel::Moderate, 0.75),
    };
    Resolution {
        signal,
        risk_level,
        confidence,
    }
}

/// What one tick did to its instrument.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Fewer samples than the slow EMA needs.
    WarmingUp,
    /// Inside the cooldown window; sentiment was not queried.
    CoolingDown,
    /// Evaluated (gate consumed) but resolved to HOLD.
    Held {
        technical: TechnicalSignal,
        resolution: Resolution,
        sentiment: SentimentReading,
    },
    Emitted(Decision),
}

/// Shared collaborators handed to every pipeline instance.
#[derive(Clone)]
pub struct PipelineContext {
    pub cooldown: Duration,
    pub sentiment: Arc<dyn SentimentSource>,
    pub store: Arc<dyn DecisionStore>,
    pub alerts: Arc<dyn AlertSink>,
}

/// Turns ticks into risk-scored decisions, one state entry per symbol.
pub struct DecisionPipeline {
    ctx: PipelineContext,
    instruments: HashMap<String, InstrumentState>,
}

impl DecisionPipeline {
    pub fn new(ctx: PipelineContext) -> Self {
        Self {
            ctx,
            instruments: HashMap::new(),
        }
    }

    pub fn instrument(&self, symbol: &str) -> Option<&InstrumentState> {
        self.instruments.get(symbol)
    }

    pub async fn on_tick(&mut self, tick: &MarketTick) -> AppResult<TickOutcome> {
        self.on_tick_at(tick, Utc::now()).await
    }

    pub async fn on_tick_at(
        &mut self,
        tick: &MarketTick,
        now: DateTime<Utc>,
    ) -> AppResult<TickOutcome> {
        if !tick.price.is_finite() {
            return Err(AppError::InvalidPrice {
                symbol: tick.symbol.clone(),
                price: tick.price,
            });
        }

        let cooldown = self.ctx.cooldown;
        let state = self
            .instruments
            .entry(tick.symbol.clone())
            .or_insert_with(|| InstrumentState::new(cooldown));

        state.engine.update(tick.price);
        let snapshot = state.engine.evaluate();
        let Some(base) = snapshot.signal.as_signal() else {
            return Ok(TickOutcome::WarmingUp);
        };

        // Consumed before sentiment: the gate throttles evaluations, not emissions.
        if !state.gate.try_fire(now) {
            return Ok(TickOutcome::CoolingDown);
        }

        let sentiment = self.ctx.sentiment.fetch_sentiment().await;
        let resolution = resolve(base, sentiment.score);
        tracing::debug!(
            symbol = %tick.symbol,
            technical = %snapshot.signal,
            final_signal = %resolution.signal,
            sentiment = sentiment.score,
            "Evaluated tick"
        );

        if resolution.signal == Signal::Hold {
            return Ok(TickOutcome::Held {
                technical: snapshot.signal,
                resolution,
                sentiment,
            });
        }

        let decision = build_decision(tick, &snapshot, resolution, sentiment, now);
        self.dispatch(&decision).await;
        Ok(TickOutcome::Emitted(decision))
    }

    async fn dispatch(&self, decision: &Decision) {
        tracing::info!(
            symbol = %decision.symbol,
            price = decision.price,
            signal = %decision.signal,
            confidence = decision.confidence,
            sentiment = decision.sentiment_score,
            risk = %decision.risk_level,
            "Decision"
        );
        let message = format_alert(decision);
        tokio::join!(
            self.ctx.store.record(decision),
            self.ctx.alerts.send(&message)
        );
    }
}

fn build_decision(
    tick: &MarketTick,
    snapshot: &TechnicalSnapshot,
    resolution: Resolution,
    sentiment: SentimentReading,
    now: DateTime<Utc>,
) -> Decision {
    Decision {
        symbol: tick.symbol.clone(),
        price: tick.price,
        signal: resolution.signal,
        confidence: resolution.confidence,
        risk_level: resolution.risk_level,
        reasoning: reasoning_text(snapshot.trend, snapshot.rsi, sentiment.score, &sentiment.headline),
        sentiment_score: sentiment.score,
        headline: sentiment.headline,
        trend: snapshot.trend,
        rsi: snapshot.rsi,
        timestamp: now,
    }
}
