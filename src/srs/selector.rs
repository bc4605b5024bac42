//! Review selection: the weighted card queue (Mode A) and the full-listing
//! sort used by the profile table (Mode B). Both are pure functions over a
//! snapshot of rows.

use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::SelectorConfig;
use crate::error::SrsError;
use crate::types::{CardState, ReviewCard, VocabEntry};

/// Builds the daily review queue: cards weighted by encounter share times
/// inverse recall, unseen cards standing in with `unseen_weight`. Ties
/// break by word so the queue order is deterministic.
pub fn build_review_queue(
    cards: &[CardState],
    limit: usize,
    config: &SelectorConfig,
) -> Vec<ReviewCard> {
    let total: i64 = cards.iter().map(|c| c.count).sum();
    if total <= 0 {
        return Vec::new();
    }

    let mut queue: Vec<ReviewCard> = cards
        .iter()
        .map(|card| {
            let weight = card.recall.map(|r| 1.0 - r).unwrap_or(config.unseen_weight);
            ReviewCard {
                word: card.word.clone(),
                translation: card.translation.clone(),
                count: card.count,
                recall: card.recall,
                score: (card.count as f64 / total as f64) * weight,
            }
        })
        .collect();

    queue.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.word.cmp(&b.word))
    });
    queue.truncate(limit);
    queue
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Word,
    Translation,
    Retention,
    Added,
    #[default]
    Reviewed,
}

impl FromStr for SortField {
    type Err = SrsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "korean_word" | "word" => Ok(Self::Word),
            "english" | "translation" => Ok(Self::Translation),
            "retention" => Ok(Self::Retention),
            "added" | "created" => Ok(Self::Added),
            "reviewed" => Ok(Self::Reviewed),
            other => Err(SrsError::InvalidParameter(format!(
                "unknown sort field: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortDirection {
    type Err = SrsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(SrsError::InvalidParameter(format!(
                "unknown sort direction: {other}"
            ))),
        }
    }
}

/// Sort selection for the profile listing. Defaults to most recently
/// reviewed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortKey {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    pub fn parse(field: &str, direction: &str) -> Result<Self, SrsError> {
        Ok(Self {
            field: field.parse()?,
            direction: direction.parse()?,
        })
    }
}

/// Mode B: orders the full vocabulary listing in place. No truncation.
pub fn sort_entries(entries: &mut [VocabEntry], key: SortKey) {
    entries.sort_by(|a, b| {
        let ord = match key.field {
            SortField::Word => a.word.cmp(&b.word),
            SortField::Translation => a.translation.cmp(&b.translation),
            SortField::Retention => a
                .retention_rate
                .partial_cmp(&b.retention_rate)
                .unwrap_or(Ordering::Equal),
            SortField::Added => a.created_at.cmp(&b.created_at),
            SortField::Reviewed => a.last_reviewed.cmp(&b.last_reviewed),
        };
        match key.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn card(word: &str, count: i64, recall: Option<f64>) -> CardState {
        CardState {
            user_id: "u1".into(),
            word: word.into(),
            translation: String::new(),
            count,
            recall,
            learning_inertia: None,
            last_viewed: None,
        }
    }

    fn entry(word: &str, translation: &str, retention: f64, created: i64, reviewed: i64) -> VocabEntry {
        VocabEntry {
            id: word.into(),
            user_id: "u1".into(),
            word: word.into(),
            pos: "NNG".into(),
            grammar_info: String::new(),
            translation: translation.into(),
            encounter_count: 1,
            hover_count: 0,
            total_hover_ms: 0.0,
            last_durations: Vec::new(),
            alpha_prior: 1.0,
            beta_prior: 10.0,
            recall_successes: 0.0,
            recall_failures: 0.0,
            last_recall_update: None,
            retention_rate: retention,
            created_at: ts(created),
            last_reviewed: ts(reviewed),
        }
    }

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn empty_or_zero_counts_yield_empty_queue() {
        let config = SelectorConfig::default();
        assert!(build_review_queue(&[], 10, &config).is_empty());
        assert!(build_review_queue(&[card("가다", 0, Some(0.5))], 10, &config).is_empty());
    }

    #[test]
    fn queue_respects_limit() {
        let config = SelectorConfig::default();
        let cards: Vec<CardState> = (0..20)
            .map(|i| card(&format!("w{i:02}"), i + 1, Some(0.5)))
            .collect();
        assert_eq!(build_review_queue(&cards, 10, &config).len(), 10);
    }

    #[test]
    fn low_recall_outranks_high_recall() {
        let config = SelectorConfig::default();
        let cards = vec![
            card("알다", 5, Some(0.9)),
            card("모르다", 5, Some(0.1)),
        ];
        let queue = build_review_queue(&cards, 10, &config);
        assert_eq!(queue[0].word, "모르다");
    }

    #[test]
    fn unseen_card_uses_default_weight() {
        let config = SelectorConfig::default();
        let cards = vec![
            card("새롭다", 5, None),
            card("알다", 5, Some(0.9)),
        ];
        let queue = build_review_queue(&cards, 10, &config);
        // 0.5 * 0.8 beats 0.5 * 0.1
        assert_eq!(queue[0].word, "새롭다");
        assert!((queue[0].score - 0.4).abs() < 1e-9);
    }

    #[test]
    fn queue_ties_break_by_word() {
        let config = SelectorConfig::default();
        let cards = vec![
            card("나", 2, Some(0.5)),
            card("가", 2, Some(0.5)),
        ];
        let queue = build_review_queue(&cards, 10, &config);
        assert_eq!(queue[0].word, "가");
    }

    #[test]
    fn sort_field_parsing() {
        assert_eq!("retention".parse::<SortField>().unwrap(), SortField::Retention);
        assert_eq!("korean_word".parse::<SortField>().unwrap(), SortField::Word);
        assert_eq!("english".parse::<SortField>().unwrap(), SortField::Translation);
        assert_eq!("created".parse::<SortField>().unwrap(), SortField::Added);
        assert!("health".parse::<SortField>().is_err());
        assert!("sideways".parse::<SortDirection>().is_err());
    }

    #[test]
    fn default_sort_is_reviewed_desc() {
        let mut entries = vec![
            entry("가다", "to go", 0.5, 100, 100),
            entry("오다", "to come", 0.2, 200, 300),
        ];
        sort_entries(&mut entries, SortKey::default());
        assert_eq!(entries[0].word, "오다");
    }

    #[test]
    fn retention_asc_and_desc_are_reversals() {
        let mut asc = vec![
            entry("가다", "to go", 0.7, 1, 1),
            entry("오다", "to come", 0.2, 2, 2),
            entry("보다", "to see", 0.4, 3, 3),
        ];
        let mut desc = asc.clone();

        sort_entries(&mut asc, SortKey::new(SortField::Retention, SortDirection::Asc));
        sort_entries(&mut desc, SortKey::new(SortField::Retention, SortDirection::Desc));

        let asc_words: Vec<_> = asc.iter().map(|e| e.word.clone()).collect();
        let mut desc_words: Vec<_> = desc.iter().map(|e| e.word.clone()).collect();
        desc_words.reverse();
        assert_eq!(asc_words, desc_words);
        assert_eq!(asc_words, vec!["오다", "보다", "가다"]);
    }
}
