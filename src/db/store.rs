//! SQLite-backed item store. Exposes the logical operations the scoring
//! service needs: keyed reads, insert-or-ignore creation, transactional
//! bulk updates of specific field groups, and single-field increments.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::db::schema::{split_sql_statements, SCHEMA_SQL};
use crate::error::SrsError;
use crate::types::{CardState, EntryDefaults, VocabEntry};

/// Upper bound on rows per bulk mutation, mirroring the chunk size the
/// original update paths used.
pub const MAX_BATCH_SIZE: usize = 500;

const SCHEMA_VERSION: &str = "1";

#[derive(Clone)]
pub struct VocabStore {
    pool: SqlitePool,
}

impl VocabStore {
    /// Opens (creating if missing) a file-backed store in WAL mode.
    pub async fn open(path: &Path) -> Result<Self, SrsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SrsError::InvalidParameter(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let url = format!("sqlite:{}?mode=rwc", path.display());
        let options = SqliteConnectOptions::from_str(&url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// In-memory store for tests and ephemeral use. Capped at one
    /// connection: each pooled SQLite connection would otherwise see its
    /// own empty database.
    pub async fn open_in_memory() -> Result<Self, SrsError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn run_migrations(&self) -> Result<(), SrsError> {
        let version: Option<String> = sqlx::query_scalar(
            r#"SELECT "value" FROM "_db_metadata" WHERE "key" = 'schema_version'"#,
        )
        .fetch_optional(&self.pool)
        .await
        .unwrap_or(None);

        if version.is_some() {
            return Ok(());
        }

        for statement in split_sql_statements(SCHEMA_SQL) {
            sqlx::query(&statement).execute(&self.pool).await?;
        }

        sqlx::query(
            r#"INSERT OR REPLACE INTO "_db_metadata" ("key", "value") VALUES ('schema_version', ?)"#,
        )
        .bind(SCHEMA_VERSION)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ------------------------------------------------------------------
    // vocab_entries
    // ------------------------------------------------------------------

    pub async fn get_entry(
        &self,
        user_id: &str,
        word: &str,
    ) -> Result<Option<VocabEntry>, SrsError> {
        let row = sqlx::query(
            r#"
            SELECT * FROM "vocab_entries"
            WHERE "userId" = ? AND "word" = ?
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(word)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(map_entry_row))
    }

    /// Newest-created first, matching the original listing order.
    pub async fn list_entries(&self, user_id: &str) -> Result<Vec<VocabEntry>, SrsError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM "vocab_entries"
            WHERE "userId" = ?
            ORDER BY "createdAt" DESC, "word" ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(map_entry_row).collect())
    }

    /// Insert-or-ignore followed by a read. The bool reports whether the
    /// row was created by this call.
    pub async fn get_or_create_entry(
        &self,
        user_id: &str,
        word: &str,
        defaults: &EntryDefaults,
        now: DateTime<Utc>,
    ) -> Result<(VocabEntry, bool), SrsError> {
        let created = self
            .insert_entry_ignore_conflict(&self.pool, user_id, word, defaults, now)
            .await?;

        let entry = self
            .get_entry(user_id, word)
            .await?
            .ok_or_else(|| SrsError::NotFound(word.to_string()))?;
        Ok((entry, created))
    }

    async fn insert_entry_ignore_conflict<'e, E>(
        &self,
        executor: E,
        user_id: &str,
        word: &str,
        defaults: &EntryDefaults,
        now: DateTime<Utc>,
    ) -> Result<bool, SrsError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO "vocab_entries"
              ("id", "userId", "word", "pos", "grammarInfo", "translation",
               "alphaPrior", "betaPrior", "retentionRate", "createdAt", "lastReviewed")
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(word)
        .bind(&defaults.pos)
        .bind(&defaults.grammar_info)
        .bind(&defaults.translation)
        .bind(defaults.alpha_prior)
        .bind(defaults.beta_prior)
        .bind(defaults.retention_rate)
        .bind(to_millis(now))
        .bind(to_millis(now))
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Creates any of the given words that do not exist yet, in one
    /// transaction. Returns how many rows were inserted.
    pub async fn bulk_create_ignore_conflicts(
        &self,
        user_id: &str,
        words: &[(String, EntryDefaults)],
        now: DateTime<Utc>,
    ) -> Result<usize, SrsError> {
        if words.len() > MAX_BATCH_SIZE {
            return Err(batch_too_large(words.len()));
        }

        let mut tx = self.pool.begin().await?;
        let mut created = 0usize;
        for (word, defaults) in words {
            if self
                .insert_entry_ignore_conflict(&mut *tx, user_id, word, defaults, now)
                .await?
            {
                created += 1;
            }
        }
        tx.commit().await?;
        Ok(created)
    }

    /// Writes the retention fields of all given entries in one transaction
    /// (all-or-nothing).
    pub async fn bulk_update_retention(&self, entries: &[VocabEntry]) -> Result<(), SrsError> {
        if entries.len() > MAX_BATCH_SIZE {
            return Err(batch_too_large(entries.len()));
        }

        let mut tx = self.pool.begin().await?;
        for entry in entries {
            sqlx::query(
                r#"
                UPDATE "vocab_entries"
                SET "retentionRate" = ?,
                    "recallSuccesses" = ?,
                    "recallFailures" = ?,
                    "lastRecallUpdate" = ?,
                    "lastReviewed" = ?
                WHERE "userId" = ? AND "word" = ?
                "#,
            )
            .bind(entry.retention_rate)
            .bind(entry.recall_successes)
            .bind(entry.recall_failures)
            .bind(entry.last_recall_update.map(to_millis))
            .bind(to_millis(entry.last_reviewed))
            .bind(&entry.user_id)
            .bind(&entry.word)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Writes the prior fields of all given entries in one transaction.
    pub async fn bulk_update_priors(&self, entries: &[VocabEntry]) -> Result<(), SrsError> {
        if entries.len() > MAX_BATCH_SIZE {
            return Err(batch_too_large(entries.len()));
        }

        let mut tx = self.pool.begin().await?;
        for entry in entries {
            sqlx::query(
                r#"
                UPDATE "vocab_entries"
                SET "alphaPrior" = ?,
                    "betaPrior" = ?,
                    "lastReviewed" = ?
                WHERE "userId" = ? AND "word" = ?
                "#,
            )
            .bind(entry.alpha_prior)
            .bind(entry.beta_prior)
            .bind(to_millis(entry.last_reviewed))
            .bind(&entry.user_id)
            .bind(&entry.word)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Atomic single-field increment. Returns false when the entry does
    /// not exist.
    pub async fn increment_encounter(
        &self,
        user_id: &str,
        word: &str,
        by: i64,
    ) -> Result<bool, SrsError> {
        let result = sqlx::query(
            r#"
            UPDATE "vocab_entries"
            SET "encounterCount" = "encounterCount" + ?
            WHERE "userId" = ? AND "word" = ?
            "#,
        )
        .bind(by)
        .bind(user_id)
        .bind(word)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Persists the hover counters and bounded duration history.
    pub async fn update_hover(&self, entry: &VocabEntry) -> Result<(), SrsError> {
        let durations = serde_json::to_string(&entry.last_durations)
            .map_err(|e| SrsError::InvalidParameter(format!("hover durations: {e}")))?;

        sqlx::query(
            r#"
            UPDATE "vocab_entries"
            SET "hoverCount" = ?,
                "totalHoverMs" = ?,
                "lastDurations" = ?,
                "lastReviewed" = ?
            WHERE "userId" = ? AND "word" = ?
            "#,
        )
        .bind(entry.hover_count)
        .bind(entry.total_hover_ms)
        .bind(durations)
        .bind(to_millis(entry.last_reviewed))
        .bind(&entry.user_id)
        .bind(&entry.word)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ------------------------------------------------------------------
    // card_states
    // ------------------------------------------------------------------

    pub async fn get_card(&self, user_id: &str, word: &str) -> Result<Option<CardState>, SrsError> {
        let row = sqlx::query(
            r#"
            SELECT * FROM "card_states"
            WHERE "userId" = ? AND "word" = ?
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(word)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(map_card_row))
    }

    pub async fn list_cards(&self, user_id: &str) -> Result<Vec<CardState>, SrsError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM "card_states"
            WHERE "userId" = ?
            ORDER BY "word" ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(map_card_row).collect())
    }

    /// Creates the card or bumps its encounter count atomically.
    pub async fn upsert_card_count(
        &self,
        user_id: &str,
        word: &str,
        translation: &str,
        by: i64,
    ) -> Result<(), SrsError> {
        sqlx::query(
            r#"
            INSERT INTO "card_states" ("id", "userId", "word", "translation", "count")
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT ("userId", "word")
            DO UPDATE SET "count" = "card_states"."count" + excluded."count"
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(word)
        .bind(translation)
        .bind(by)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Persists a full inertia update (recall, inertia, last_viewed).
    pub async fn save_card_inertia(&self, card: &CardState) -> Result<(), SrsError> {
        sqlx::query(
            r#"
            UPDATE "card_states"
            SET "recall" = ?,
                "learningInertia" = ?,
                "lastViewed" = ?
            WHERE "userId" = ? AND "word" = ?
            "#,
        )
        .bind(card.recall)
        .bind(card.learning_inertia)
        .bind(card.last_viewed.map(to_millis))
        .bind(&card.user_id)
        .bind(&card.word)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Persists only a recomputed recall (read-time aging).
    pub async fn save_card_recall(
        &self,
        user_id: &str,
        word: &str,
        recall: f64,
    ) -> Result<(), SrsError> {
        sqlx::query(
            r#"
            UPDATE "card_states"
            SET "recall" = ?
            WHERE "userId" = ? AND "word" = ?
            "#,
        )
        .bind(recall)
        .bind(user_id)
        .bind(word)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn batch_too_large(len: usize) -> SrsError {
    SrsError::InvalidParameter(format!("batch of {len} exceeds limit of {MAX_BATCH_SIZE}"))
}

fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_else(Utc::now)
}

fn map_entry_row(row: &SqliteRow) -> VocabEntry {
    let durations_json: String = row.try_get("lastDurations").unwrap_or_default();
    let last_durations: Vec<f64> = serde_json::from_str(&durations_json).unwrap_or_default();

    VocabEntry {
        id: row.try_get("id").unwrap_or_default(),
        user_id: row.try_get("userId").unwrap_or_default(),
        word: row.try_get("word").unwrap_or_default(),
        pos: row.try_get("pos").unwrap_or_default(),
        grammar_info: row.try_get("grammarInfo").unwrap_or_default(),
        translation: row.try_get("translation").unwrap_or_default(),
        encounter_count: row.try_get("encounterCount").unwrap_or(0),
        hover_count: row.try_get("hoverCount").unwrap_or(0),
        total_hover_ms: row.try_get("totalHoverMs").unwrap_or(0.0),
        last_durations,
        alpha_prior: row.try_get("alphaPrior").unwrap_or(1.0),
        beta_prior: row.try_get("betaPrior").unwrap_or(10.0),
        recall_successes: row.try_get("recallSuccesses").unwrap_or(0.0),
        recall_failures: row.try_get("recallFailures").unwrap_or(0.0),
        last_recall_update: row
            .try_get::<Option<i64>, _>("lastRecallUpdate")
            .unwrap_or(None)
            .map(from_millis),
        retention_rate: row.try_get("retentionRate").unwrap_or(0.1),
        created_at: from_millis(row.try_get("createdAt").unwrap_or(0)),
        last_reviewed: from_millis(row.try_get("lastReviewed").unwrap_or(0)),
    }
}

fn map_card_row(row: &SqliteRow) -> CardState {
    CardState {
        user_id: row.try_get("userId").unwrap_or_default(),
        word: row.try_get("word").unwrap_or_default(),
        translation: row.try_get("translation").unwrap_or_default(),
        count: row.try_get("count").unwrap_or(0),
        recall: row.try_get::<Option<f64>, _>("recall").unwrap_or(None),
        learning_inertia: row
            .try_get::<Option<f64>, _>("learningInertia")
            .unwrap_or(None),
        last_viewed: row
            .try_get::<Option<i64>, _>("lastViewed")
            .unwrap_or(None)
            .map(from_millis),
    }
}
