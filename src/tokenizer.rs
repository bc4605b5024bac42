//! Interface to the external morphological tagger plus the filtering that
//! decides which tokens become tracked vocabulary. The tagger itself (MeCab
//! or equivalent) is a collaborator; this module only consumes its output.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::SrsError;

/// Tags whose tokens are tracked as-is (nouns, pronouns, numerals,
/// adverbs, determiners).
const INTERACTIVE_TAGS: [&str; 7] = ["NNG", "NNP", "NP", "NR", "MAG", "MAJ", "MM"];

/// Compound tags containing any of these markers are tracked too
/// (verbs, adjectives, auxiliaries, e.g. `VV+EC`).
const PREDICATE_MARKERS: [&str; 3] = ["VV", "VA", "VX"];

/// A Sejong-style part-of-speech tag. The tag set is open: the tagger can
/// emit compound tags joined with `+`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PosTag(String);

impl PosTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether tokens with this tag are worth tracking for the learner.
    pub fn is_interactive(&self) -> bool {
        INTERACTIVE_TAGS.contains(&self.0.as_str())
            || PREDICATE_MARKERS.iter().any(|marker| self.0.contains(marker))
    }

    /// Human-readable tag name; unknown tags fall back to the raw tag.
    pub fn describe(&self) -> &str {
        match self.0.as_str() {
            "NNG" => "General Noun",
            "NNP" => "Proper Noun",
            "NNB" => "Bound Noun",
            "NP" => "Pronoun",
            "NR" => "Numeral",
            "VV" => "Verb",
            "VA" => "Adjective",
            "VX" => "Auxiliary Verb",
            "VCP" => "Copula",
            "VCN" => "Negative Copula",
            "MM" => "Determiner",
            "MAG" => "General Adverb",
            "MAJ" => "Conjunctive Adverb",
            "IC" => "Interjection",
            "JKS" => "Subject Particle",
            "JKC" => "Complement Particle",
            "JKG" => "Genitive Particle",
            "JKO" => "Object Particle",
            "JKB" => "Adverbial Particle",
            "JKV" => "Vocative Particle",
            "JKQ" => "Quotative Particle",
            "JX" => "Auxiliary Particle",
            "JC" => "Conjunctive Particle",
            "EP" => "Pre-final Ending",
            "EF" => "Final Ending",
            "EC" => "Conjunctive Ending",
            "ETN" => "Nominal Ending",
            "ETM" => "Adnominal Ending",
            "XPN" => "Prefix",
            "XSN" => "Noun Suffix",
            "XSV" => "Verb Suffix",
            "XSA" => "Adjective Suffix",
            "XR" => "Root",
            "SF" => "Sentence-final Punctuation",
            "SP" => "Separator",
            "SS" => "Symbol",
            "SE" => "Ellipsis",
            "SO" => "Opening Bracket",
            "SW" => "Closing Bracket",
            "SL" => "Foreign Word",
            "SH" => "Chinese Character",
            "SN" => "Number",
            _ => self.0.as_str(),
        }
    }
}

/// One analyzed morpheme as reported by the tagger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub surface: String,
    /// Dictionary form; `None` when the tagger could not lemmatize.
    pub base: Option<String>,
    pub pos: PosTag,
    pub grammar_info: String,
}

impl Token {
    pub fn new(
        surface: impl Into<String>,
        base: Option<String>,
        pos: impl Into<String>,
        grammar_info: impl Into<String>,
    ) -> Self {
        Self {
            surface: surface.into(),
            base,
            pos: PosTag::new(pos),
            grammar_info: grammar_info.into(),
        }
    }
}

/// External morphological analyzer.
pub trait Tokenizer: Send + Sync {
    fn analyze(&self, text: &str) -> Result<Vec<Token>, SrsError>;
}

/// An aggregated `(base, pos)` occurrence within one piece of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub base: String,
    pub pos: PosTag,
    pub count: i64,
}

/// Keeps the interactive tokens that carry a base form and folds duplicates
/// into counts. Output order is deterministic (base, then tag).
pub fn collect_occurrences(tokens: &[Token]) -> Vec<Occurrence> {
    let mut counts: BTreeMap<(String, PosTag), i64> = BTreeMap::new();
    for token in tokens {
        if !token.pos.is_interactive() {
            continue;
        }
        let Some(base) = token.base.as_deref() else {
            continue;
        };
        if base.is_empty() {
            continue;
        }
        *counts
            .entry((base.to_string(), token.pos.clone()))
            .or_insert(0) += 1;
    }

    counts
        .into_iter()
        .map(|((base, pos), count)| Occurrence { base, pos, count })
        .collect()
}
