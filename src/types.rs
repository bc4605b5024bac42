use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::srs::inertia::InertiaState;
use crate::srs::retention::RetentionState;

/// How many of the most recent hover durations are kept per entry.
pub const MAX_TRACKED_DURATIONS: usize = 5;

/// A user's tracked vocabulary unit, keyed by `(user_id, word)`.
/// Carries the Bayesian retention state plus encounter and hover stats.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabEntry {
    pub id: String,
    pub user_id: String,
    /// Dictionary (base) form emitted by the tagger.
    pub word: String,
    pub pos: String,
    pub grammar_info: String,
    pub translation: String,
    pub encounter_count: i64,
    pub hover_count: i64,
    pub total_hover_ms: f64,
    /// Newest-first hover durations in milliseconds, capped at
    /// [`MAX_TRACKED_DURATIONS`].
    pub last_durations: Vec<f64>,
    pub alpha_prior: f64,
    pub beta_prior: f64,
    pub recall_successes: f64,
    pub recall_failures: f64,
    pub last_recall_update: Option<DateTime<Utc>>,
    pub retention_rate: f64,
    pub created_at: DateTime<Utc>,
    pub last_reviewed: DateTime<Utc>,
}

impl VocabEntry {
    pub fn retention_state(&self) -> RetentionState {
        RetentionState {
            alpha_prior: self.alpha_prior,
            beta_prior: self.beta_prior,
            recall_successes: self.recall_successes,
            recall_failures: self.recall_failures,
            last_recall_update: self.last_recall_update,
            retention_rate: self.retention_rate,
        }
    }

    pub fn apply_retention(&mut self, state: &RetentionState) {
        self.recall_successes = state.recall_successes;
        self.recall_failures = state.recall_failures;
        self.retention_rate = state.retention_rate;
        self.last_recall_update = state.last_recall_update;
        if let Some(ts) = state.last_recall_update {
            self.last_reviewed = ts;
        }
    }

    /// Pushes a hover duration onto the bounded history and updates the
    /// cumulative counters.
    pub fn record_hover(&mut self, duration_ms: f64) {
        self.last_durations.insert(0, duration_ms);
        self.last_durations.truncate(MAX_TRACKED_DURATIONS);
        self.hover_count += 1;
        self.total_hover_ms += duration_ms;
    }

    pub fn average_hover_ms(&self) -> f64 {
        if self.hover_count == 0 {
            return 0.0;
        }
        self.total_hover_ms / self.hover_count as f64
    }
}

/// Column values for entries created implicitly (first encounter, prior
/// adjustment of an unknown word).
#[derive(Debug, Clone)]
pub struct EntryDefaults {
    pub pos: String,
    pub grammar_info: String,
    pub translation: String,
    pub alpha_prior: f64,
    pub beta_prior: f64,
    pub retention_rate: f64,
}

impl Default for EntryDefaults {
    fn default() -> Self {
        Self {
            pos: String::new(),
            grammar_info: String::new(),
            translation: String::new(),
            alpha_prior: 1.0,
            beta_prior: 10.0,
            retention_rate: 0.1,
        }
    }
}

/// Per-user memorization-card state, the inertia model's table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardState {
    pub user_id: String,
    pub word: String,
    pub translation: String,
    pub count: i64,
    pub recall: Option<f64>,
    pub learning_inertia: Option<f64>,
    pub last_viewed: Option<DateTime<Utc>>,
}

impl CardState {
    pub fn inertia_state(&self) -> InertiaState {
        InertiaState {
            learning_inertia: self.learning_inertia,
            recall: self.recall,
            last_viewed: self.last_viewed,
        }
    }

    pub fn apply_inertia(&mut self, state: &InertiaState) {
        self.learning_inertia = state.learning_inertia;
        self.recall = state.recall;
        self.last_viewed = state.last_viewed;
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionResult {
    pub word: String,
    pub retention_rate: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpdateResult {
    pub updated_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InertiaResult {
    pub word: String,
    pub recall: f64,
    pub learning_inertia: f64,
}

/// One slot of the Mode A review queue.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewCard {
    pub word: String,
    pub translation: String,
    pub count: i64,
    pub recall: Option<f64>,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorAdjustment {
    pub alpha_updated: usize,
    pub beta_updated: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSummary {
    /// Distinct `(base, pos)` pairs the tagger produced for the text.
    pub words: usize,
    /// How many of those were seen for the first time for this user.
    pub new_words: usize,
}
