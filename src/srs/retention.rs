//! Bayesian-decay retention model.
//!
//! A review re-estimates the recall probability from Beta-style
//! pseudo-counts and then discounts it for elapsed time:
//!
//! p = (α + s) / (α + β + s + f) × e^(−λ × Δt / 86400)
//!
//! where s/f are the cumulative success/failure counters after the current
//! observation and α/β are the entry's own priors. Every review counts as a
//! success; a lookup additionally adds `lookup_penalty` to the failures.
//! That asymmetry is inherited from the stored histories and must not be
//! normalized away.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::RetentionParams;
use crate::error::SrsError;

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionState {
    pub alpha_prior: f64,
    pub beta_prior: f64,
    pub recall_successes: f64,
    pub recall_failures: f64,
    pub last_recall_update: Option<DateTime<Utc>>,
    pub retention_rate: f64,
}

impl RetentionState {
    pub fn new(params: &RetentionParams) -> Self {
        Self {
            alpha_prior: params.default_alpha,
            beta_prior: params.default_beta,
            recall_successes: 0.0,
            recall_failures: 0.0,
            last_recall_update: None,
            retention_rate: params.initial_retention,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetentionModel {
    params: RetentionParams,
}

impl RetentionModel {
    pub fn new(params: RetentionParams) -> Self {
        Self { params }
    }

    /// Exponential discount for `delta_seconds` since the last review.
    /// Strictly decreasing in the elapsed time for a positive decay rate.
    pub fn time_decay(&self, delta_seconds: f64) -> f64 {
        (-self.params.lambda_decay * delta_seconds / SECONDS_PER_DAY).exp()
    }

    /// Applies one review observation, committing the updated counters and
    /// retention rate into `state`. Returns the new retention rate.
    ///
    /// An unset `last_recall_update` means no decay: the first review is
    /// scored at full strength.
    pub fn review(
        &self,
        state: &mut RetentionState,
        had_lookup: bool,
        now: DateTime<Utc>,
    ) -> Result<f64, SrsError> {
        validate_state(state)?;

        let delta_seconds = state
            .last_recall_update
            .map(|prev| ((now - prev).num_milliseconds() as f64 / 1000.0).max(0.0))
            .unwrap_or(0.0);
        let decay = self.time_decay(delta_seconds);

        let penalty = if had_lookup {
            self.params.lookup_penalty
        } else {
            0.0
        };
        let success_count = state.recall_successes + 1.0;
        let failure_count = state.recall_failures + penalty;

        let raw = (state.alpha_prior + success_count)
            / (state.alpha_prior + state.beta_prior + success_count + failure_count);
        let rate = (raw * decay).clamp(0.0, 1.0);

        state.retention_rate = rate;
        state.recall_successes = success_count;
        state.recall_failures = failure_count;
        state.last_recall_update = Some(now);

        Ok(rate)
    }
}

fn validate_state(state: &RetentionState) -> Result<(), SrsError> {
    let fields = [
        ("alpha_prior", state.alpha_prior),
        ("beta_prior", state.beta_prior),
        ("recall_successes", state.recall_successes),
        ("recall_failures", state.recall_failures),
    ];
    for (name, value) in fields {
        if !value.is_finite() || value < 0.0 {
            return Err(SrsError::InvalidParameter(format!(
                "{name} must be a non-negative finite number, got {value}"
            )));
        }
    }
    Ok(())
}
