pub mod aggregate;
pub mod bands;
pub mod cache;
pub mod calibration;
pub mod config;
pub mod engine;
pub mod error;
pub mod ev;
pub mod factors;
pub mod goals;
pub mod justify;
pub mod logging;
pub mod markets;
pub mod normalize;
pub mod recommend;
pub mod record;
pub mod sample;
pub mod weights;

pub use config::EngineConfig;
pub use engine::{AnalysisMode, AnalysisResult, Engine};
pub use error::{ConfigError, EngineError, InputError};
pub use record::{MarketOdds, MatchRecord, Outcome, Side};
