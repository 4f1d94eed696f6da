pub mod ema;
pub mod engine;
pub mod ring;
pub mod rsi;
pub mod sma;

pub use engine::{TechnicalEngine, TechnicalSnapshot};
