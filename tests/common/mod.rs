#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use trade_vision::error::{AppError, AppResult};
use trade_vision::feed::{FeedConnection, FeedConnector, Frames};
use trade_vision::model::decision::Decision;
use trade_vision::pipeline::PipelineContext;
use trade_vision::sentiment::{SentimentReading, SentimentSource};
use trade_vision::sink::{AlertSink, DecisionStore};

pub struct FixedSentiment {
    pub score: f64,
    pub calls: AtomicUsize,
}

impl FixedSentiment {
    pub fn new(score: f64) -> Arc<Self> {
        Arc::new(Self {
            score,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SentimentSource for FixedSentiment {
    async fn fetch_sentiment(&self) -> SentimentReading {
        self.calls.fetch_add(1, Ordering::SeqCst);
        SentimentReading {
            score: self.score,
            headline: "Scripted headline".to_string(),
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    pub decisions: Mutex<Vec<Decision>>,
}

#[async_trait]
impl DecisionStore for MemoryStore {
    async fn record(&self, decision: &Decision) {
        self.decisions.lock().unwrap().push(decision.clone());
    }
}

#[derive(Default)]
pub struct MemoryAlert {
    pub messages: Mutex<Vec<String>>,
}

#[async_trait]
impl AlertSink for MemoryAlert {
    async fn send(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

pub struct Harness {
    pub sentiment: Arc<FixedSentiment>,
    pub store: Arc<MemoryStore>,
    pub alerts: Arc<MemoryAlert>,
    pub ctx: PipelineContext,
}

pub fn harness(sentiment_score: f64, cooldown: Duration) -> Harness {
    let sentiment = FixedSentiment::new(sentiment_score);
    let store = Arc::new(MemoryStore::default());
    let alerts = Arc::new(MemoryAlert::default());
    let ctx = PipelineContext {
        cooldown,
        sentiment: sentiment.clone(),
        store: store.clone(),
        alerts: alerts.clone(),
    };
    Harness {
        sentiment,
        store,
        alerts,
        ctx,
    }
}

/// `count` strictly falling prices: RSI pins at 0, so a warm engine says BUY.
pub fn falling(count: usize) -> Vec<f64> {
    (0..count).map(|i| 1_000.0 - i as f64).collect()
}

/// `count` strictly rising prices: RSI pins at 100, so a warm engine says SELL.
pub fn rising(count: usize) -> Vec<f64> {
    (0..count).map(|i| 1_000.0 + i as f64).collect()
}

pub fn trade_json(symbol: &str, price: f64) -> String {
    format!(r#"{{"e":"trade","E":1700000000000,"s":"{}","t":1,"p":"{}","q":"0.5","m":false}}"#, symbol, price)
}

#[derive(Debug, Clone)]
pub enum Step {
    Message(Frames),
    Fail,
}

pub fn frames(topic: &str, payload: &str) -> Step {
    Step::Message(vec![topic.as_bytes().to_vec(), payload.as_bytes().to_vec()])
}

/// Each `connect` consumes the next script; an exhausted script blocks like an
/// idle socket.
pub struct ScriptedConnector {
    scripts: Mutex<VecDeque<Vec<Step>>>,
    pub connects: Arc<AtomicUsize>,
    pub closed: Arc<AtomicUsize>,
    pub refuse_first: AtomicBool,
}

impl ScriptedConnector {
    pub fn new(scripts: Vec<Vec<Step>>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            connects: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicUsize::new(0)),
            refuse_first: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl FeedConnector for ScriptedConnector {
    async fn connect(&self) -> AppResult<Box<dyn FeedConnection>> {
        if self.refuse_first.swap(false, Ordering::SeqCst) {
            return Err(AppError::Transport("connection refused".to_string()));
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        let script = self.scripts.lock().unwrap().pop_front().unwrap_or_default();
        Ok(Box::new(ScriptedConnection {
            steps: script.into(),
            closed: self.closed.clone(),
        }))
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

struct ScriptedConnection {
    steps: VecDeque<Step>,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl FeedConnection for ScriptedConnection {
    async fn recv(&mut self) -> AppResult<Frames> {
        match self.steps.pop_front() {
            Some(Step::Message(frames)) => Ok(frames),
            Some(Step::Fail) => Err(AppError::Transport("socket reset".to_string())),
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}
