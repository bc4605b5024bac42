//! The operations the crate exposes to its callers: retention updates,
//! card reviews, queue selection, listing, text ingestion, and hover
//! tracking. Orchestration only; the math lives in `crate::srs`.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::clock::Clock;
use crate::config::SrsConfig;
use crate::db::{VocabStore, MAX_BATCH_SIZE};
use crate::error::SrsError;
use crate::srs::selector::{build_review_queue, sort_entries, SortKey};
use crate::srs::{InertiaModel, RetentionModel};
use crate::tokenizer::{collect_occurrences, Tokenizer};
use crate::types::{
    BatchUpdateResult, EntryDefaults, InertiaResult, IngestSummary, PriorAdjustment,
    RetentionResult, ReviewCard, VocabEntry,
};

/// Translation provider consumed when entries are created implicitly. The
/// returned string is stored opaquely, never interpreted.
pub trait TranslationLookup: Send + Sync {
    fn translate(&self, base: &str) -> Option<String>;
}

/// Default provider: no translations, entries display the word itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTranslations;

impl TranslationLookup for NoTranslations {
    fn translate(&self, _base: &str) -> Option<String> {
        None
    }
}

pub struct ReviewService {
    store: VocabStore,
    config: SrsConfig,
    retention: RetentionModel,
    inertia: InertiaModel,
    clock: Arc<dyn Clock>,
    translations: Arc<dyn TranslationLookup>,
}

impl ReviewService {
    pub fn new(store: VocabStore, config: SrsConfig, clock: Arc<dyn Clock>) -> Self {
        let retention = RetentionModel::new(config.retention.clone());
        let inertia = InertiaModel::new(config.inertia.clone());
        Self {
            store,
            config,
            retention,
            inertia,
            clock,
            translations: Arc::new(NoTranslations),
        }
    }

    pub fn with_translations(mut self, translations: Arc<dyn TranslationLookup>) -> Self {
        self.translations = translations;
        self
    }

    pub fn config(&self) -> &SrsConfig {
        &self.config
    }

    fn defaults_for(&self, pos: &str, grammar_info: &str, word: &str) -> EntryDefaults {
        EntryDefaults {
            pos: pos.to_string(),
            grammar_info: grammar_info.to_string(),
            translation: self
                .translations
                .translate(word)
                .unwrap_or_else(|| word.to_string()),
            alpha_prior: self.config.retention.default_alpha,
            beta_prior: self.config.retention.default_beta,
            retention_rate: self.config.retention.initial_retention,
        }
    }

    // ------------------------------------------------------------------
    // Retention model
    // ------------------------------------------------------------------

    /// Scores one interaction for one entry and persists the result.
    pub async fn retention_update(
        &self,
        user_id: &str,
        word: &str,
        had_lookup: bool,
    ) -> Result<RetentionResult, SrsError> {
        let mut entry = self
            .store
            .get_entry(user_id, word)
            .await?
            .ok_or_else(|| SrsError::NotFound(word.to_string()))?;

        let rate = self.apply_retention(&mut entry, had_lookup)?;
        self.store
            .bulk_update_retention(std::slice::from_ref(&entry))
            .await?;

        debug!(user_id, word, had_lookup, retention_rate = rate, "retention updated");
        Ok(RetentionResult {
            word: entry.word,
            retention_rate: rate,
        })
    }

    /// Scores a page worth of interactions. Unknown words are skipped
    /// silently; everything found is written in one transaction. Returns
    /// how many entries were actually updated.
    pub async fn retention_batch_update(
        &self,
        user_id: &str,
        interactions: &[(String, bool)],
    ) -> Result<BatchUpdateResult, SrsError> {
        // the cap applies to the request, not to whatever subset resolves
        if interactions.len() > MAX_BATCH_SIZE {
            return Err(SrsError::InvalidParameter(format!(
                "batch of {} exceeds limit of {MAX_BATCH_SIZE}",
                interactions.len()
            )));
        }

        let mut updated: Vec<VocabEntry> = Vec::with_capacity(interactions.len());

        for (word, had_lookup) in interactions {
            let Some(mut entry) = self.store.get_entry(user_id, word).await? else {
                continue;
            };
            self.apply_retention(&mut entry, *had_lookup)?;
            updated.push(entry);
        }

        self.store.bulk_update_retention(&updated).await?;

        info!(
            user_id,
            requested = interactions.len(),
            updated = updated.len(),
            "retention batch update"
        );
        Ok(BatchUpdateResult {
            updated_count: updated.len(),
        })
    }

    fn apply_retention(&self, entry: &mut VocabEntry, had_lookup: bool) -> Result<f64, SrsError> {
        let now = self.clock.now();
        let mut state = entry.retention_state();
        let rate = self.retention.review(&mut state, had_lookup, now)?;
        entry.apply_retention(&state);
        Ok(rate)
    }

    /// Applies consolidated alpha/beta deltas per word, creating entries
    /// for unknown words first. Non-finite deltas are dropped, matching
    /// the lenient original endpoint.
    pub async fn adjust_priors(
        &self,
        user_id: &str,
        alpha_deltas: &[(String, f64)],
        beta_deltas: &[(String, f64)],
    ) -> Result<PriorAdjustment, SrsError> {
        let alpha_map = consolidate(alpha_deltas);
        let beta_map = consolidate(beta_deltas);

        let mut all_words: Vec<&String> = alpha_map.keys().chain(beta_map.keys()).collect();
        all_words.sort();
        all_words.dedup();
        if all_words.is_empty() {
            return Ok(PriorAdjustment::default());
        }

        let now = self.clock.now();
        let to_create: Vec<(String, EntryDefaults)> = all_words
            .iter()
            .map(|word| ((*word).clone(), self.defaults_for("", "", word)))
            .collect();
        self.store
            .bulk_create_ignore_conflicts(user_id, &to_create, now)
            .await?;

        let mut adjustment = PriorAdjustment::default();
        let mut to_update: Vec<VocabEntry> = Vec::new();
        for word in all_words {
            let a = alpha_map.get(word).copied().unwrap_or(0.0);
            let b = beta_map.get(word).copied().unwrap_or(0.0);
            if a == 0.0 && b == 0.0 {
                continue;
            }

            let Some(mut entry) = self.store.get_entry(user_id, word).await? else {
                continue;
            };
            if a != 0.0 {
                entry.alpha_prior += a;
                adjustment.alpha_updated += 1;
            }
            if b != 0.0 {
                entry.beta_prior += b;
                adjustment.beta_updated += 1;
            }
            entry.last_reviewed = now;
            to_update.push(entry);
        }

        self.store.bulk_update_priors(&to_update).await?;

        info!(
            user_id,
            alpha_updated = adjustment.alpha_updated,
            beta_updated = adjustment.beta_updated,
            "priors adjusted"
        );
        Ok(adjustment)
    }

    // ------------------------------------------------------------------
    // Inertia model
    // ------------------------------------------------------------------

    /// Registers a successful card review. The caller decides whether the
    /// review counts (the card endpoint only calls this on success) and
    /// passes the failure count accumulated during the attempt.
    pub async fn inertia_update(
        &self,
        user_id: &str,
        word: &str,
        failures: i64,
    ) -> Result<InertiaResult, SrsError> {
        let mut card = self
            .store
            .get_card(user_id, word)
            .await?
            .ok_or_else(|| SrsError::NotFound(word.to_string()))?;

        let now = self.clock.now();
        let mut state = card.inertia_state();
        let recall = self.inertia.update_recall(&mut state, failures, now)?;
        card.apply_inertia(&state);
        self.store.save_card_inertia(&card).await?;

        debug!(user_id, word, failures, recall, "card review scored");
        Ok(InertiaResult {
            word: card.word,
            recall,
            learning_inertia: state
                .learning_inertia
                .unwrap_or(self.config.inertia.default_inertia),
        })
    }

    /// Ages a card's displayed recall without registering a review.
    /// Returns `None` for cards never viewed (nothing to age).
    pub async fn inertia_recompute(
        &self,
        user_id: &str,
        word: &str,
    ) -> Result<Option<InertiaResult>, SrsError> {
        let card = self
            .store
            .get_card(user_id, word)
            .await?
            .ok_or_else(|| SrsError::NotFound(word.to_string()))?;

        let mut state = card.inertia_state();
        let Some(recall) = self.inertia.recompute_recall(&mut state, self.clock.now())? else {
            return Ok(None);
        };

        self.store.save_card_recall(user_id, word, recall).await?;
        Ok(Some(InertiaResult {
            word: card.word,
            recall,
            learning_inertia: state
                .learning_inertia
                .unwrap_or(self.config.inertia.default_inertia),
        }))
    }

    // ------------------------------------------------------------------
    // Selection / listing
    // ------------------------------------------------------------------

    /// Mode A: the weighted review queue, at most `limit` cards (the
    /// configured daily limit when unspecified).
    pub async fn select_review_queue(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ReviewCard>, SrsError> {
        let cards = self.store.list_cards(user_id).await?;
        let limit = limit.unwrap_or(self.config.selector.default_daily_limit);
        let queue = build_review_queue(&cards, limit, &self.config.selector);

        debug!(user_id, candidates = cards.len(), selected = queue.len(), "review queue built");
        Ok(queue)
    }

    /// Mode B: the full vocabulary listing, sorted.
    pub async fn list_vocabulary(
        &self,
        user_id: &str,
        sort: SortKey,
    ) -> Result<Vec<VocabEntry>, SrsError> {
        let mut entries = self.store.list_entries(user_id).await?;
        sort_entries(&mut entries, sort);
        Ok(entries)
    }

    // ------------------------------------------------------------------
    // Ingestion / interaction tracking
    // ------------------------------------------------------------------

    /// Runs text through the tagger and records every interactive base
    /// form: entries are created on first sight, encounter counts and card
    /// counts bumped by the occurrence count.
    pub async fn ingest_text(
        &self,
        user_id: &str,
        tokenizer: &dyn Tokenizer,
        text: &str,
    ) -> Result<IngestSummary, SrsError> {
        let tokens = tokenizer.analyze(text)?;
        let occurrences = collect_occurrences(&tokens);

        let now = self.clock.now();
        let mut summary = IngestSummary {
            words: occurrences.len(),
            new_words: 0,
        };

        for occurrence in &occurrences {
            let defaults =
                self.defaults_for(occurrence.pos.as_str(), "", &occurrence.base);
            let (entry, created) = self
                .store
                .get_or_create_entry(user_id, &occurrence.base, &defaults, now)
                .await?;
            if created {
                summary.new_words += 1;
            }

            self.store
                .increment_encounter(user_id, &occurrence.base, occurrence.count)
                .await?;
            self.store
                .upsert_card_count(user_id, &occurrence.base, &entry.translation, occurrence.count)
                .await?;
        }

        info!(
            user_id,
            words = summary.words,
            new_words = summary.new_words,
            "text ingested"
        );
        Ok(summary)
    }

    /// Records one hover/dwell interaction on an entry.
    pub async fn record_hover(
        &self,
        user_id: &str,
        word: &str,
        duration_ms: f64,
    ) -> Result<(), SrsError> {
        if !duration_ms.is_finite() || duration_ms < 0.0 {
            return Err(SrsError::InvalidParameter(format!(
                "hover duration must be a non-negative finite number, got {duration_ms}"
            )));
        }

        let mut entry = self
            .store
            .get_entry(user_id, word)
            .await?
            .ok_or_else(|| SrsError::NotFound(word.to_string()))?;

        entry.record_hover(duration_ms);
        entry.last_reviewed = self.clock.now();
        self.store.update_hover(&entry).await?;

        debug!(user_id, word, duration_ms, "hover recorded");
        Ok(())
    }
}

fn consolidate(deltas: &[(String, f64)]) -> BTreeMap<String, f64> {
    let mut map = BTreeMap::new();
    for (word, delta) in deltas {
        if !delta.is_finite() {
            continue;
        }
        *map.entry(word.clone()).or_insert(0.0) += delta;
    }
    map
}
