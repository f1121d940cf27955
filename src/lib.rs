pub mod codec;
pub mod config;
pub mod data_loader;
pub mod detector;
pub mod error;
pub mod features;
pub mod geometry;
pub mod io;
pub mod matching;
pub mod observer;
pub mod optimization;
pub mod patches;
pub mod robust_matcher;
pub mod template;
pub mod types;

pub use error::{LogoError, LogoResult};
pub use robust_matcher::{Detection, MatchOutcome, NoMatchReason, RobustMatcher};
