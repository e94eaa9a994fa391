//! Training run finite state machine.
//!
//! Stages:
//! - Started
//! - Ingested
//! - Validated
//! - Transformed
//! - Trained
//! - Evaluated
//! - Pushed
//!
//! Transitions are one-shot and strictly forward; the time spent reaching
//! each stage is recorded for logging and the stage latency histogram.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::{Result, RulError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum TrainingStage { Started, Ingested, Validated, Transformed, Trained, Evaluated, Pushed }

impl TrainingStage {
    pub fn next(self) -> Option<TrainingStage> {
        use TrainingStage::*;
        match self { Started => Some(Ingested), Ingested => Some(Validated), Validated => Some(Transformed), Transformed => Some(Trained), Trained => Some(Evaluated), Evaluated => Some(Pushed), Pushed => None }
    }

    pub fn as_str(self) -> &'static str {
        use TrainingStage::*;
        match self { Started => "started", Ingested => "ingested", Validated => "validated", Transformed => "transformed", Trained => "trained", Evaluated => "evaluated", Pushed => "pushed" }
    }
}

#[derive(Debug)]
pub struct TrainingRun {
    stage: TrainingStage,
    started_at: Instant,
    stage_started_at: Instant,
    durations: Vec<(TrainingStage, Duration)>,
}

impl Default for TrainingRun {
    fn default() -> Self { Self::new() }
}

impl TrainingRun {
    pub fn new() -> Self { let now = Instant::now(); Self { stage: TrainingStage::Started, started_at: now, stage_started_at: now, durations: Vec::new() } }
    pub fn stage(&self) -> TrainingStage { self.stage }

    /// Move to `to`, which must be the immediate successor of the current stage.
    /// Returns the time spent producing `to`.
    pub fn advance(&mut self, to: TrainingStage) -> Result<Duration> {
        if self.stage.next() != Some(to) {
            return Err(RulError::invalid(format!("illegal stage transition {} -> {}", self.stage.as_str(), to.as_str())));
        }
        let now = Instant::now();
        let dur = now - self.stage_started_at;
        self.durations.push((to, dur));
        self.stage = to;
        self.stage_started_at = now;
        Ok(dur)
    }

    pub fn is_complete(&self) -> bool { self.stage == TrainingStage::Pushed }
    pub fn elapsed(&self) -> Duration { self.started_at.elapsed() }
    pub fn durations(&self) -> &[(TrainingStage, Duration)] { &self.durations }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fsm_progresses_in_order() {
        let mut run = TrainingRun::new();
        let mut stage = run.stage();
        while let Some(next) = stage.next() {
            run.advance(next).unwrap();
            stage = next;
        }
        assert!(run.is_complete());
        assert_eq!(run.durations().len(), 6);
    }

    #[test]
    fn skipping_or_repeating_fails() {
        let mut run = TrainingRun::new();
        assert!(run.advance(TrainingStage::Validated).is_err());
        run.advance(TrainingStage::Ingested).unwrap();
        assert!(run.advance(TrainingStage::Ingested).is_err());
        assert_eq!(run.stage(), TrainingStage::Ingested);
    }
}
