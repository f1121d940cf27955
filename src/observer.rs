//! Observability hooks handed to the matcher instead of global debug switches.

use log::{debug, trace};

use crate::robust_matcher::NoMatchReason;
use crate::types::Rect;

/// Pipeline stages that report how many correspondences they kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ForwardCandidates,
    ReverseCandidates,
    ForwardRefined,
    ReverseRefined,
    Symmetric,
}

pub trait MatchObserver: Send + Sync {
    fn stage(&self, _stage: Stage, _count: usize) {}
    fn rejected(&self, _reason: &NoMatchReason) {}
    fn matched(&self, _rect: &Rect) {}
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl MatchObserver for NoopObserver {}

/// Forwards to the `log` facade: stage counts at trace, verdicts at debug.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl MatchObserver for LogObserver {
    fn stage(&self, stage: Stage, count: usize) {
        trace!("{:?}: {}", stage, count);
    }

    fn rejected(&self, reason: &NoMatchReason) {
        debug!("no match: {}", reason);
    }

    fn matched(&self, rect: &Rect) {
        debug!(
            "logo found at ({}, {}) {}x{}",
            rect.x, rect.y, rect.width, rect.height
        );
    }
}
