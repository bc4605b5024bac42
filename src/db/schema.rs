//! Embedded SQLite schema, applied statement-by-statement on first connect.

pub const SCHEMA_SQL: &str = r#"
-- Retention-model table: one row per (user, base form).
CREATE TABLE IF NOT EXISTS "vocab_entries" (
  "id" TEXT PRIMARY KEY,
  "userId" TEXT NOT NULL,
  "word" TEXT NOT NULL,
  "pos" TEXT NOT NULL DEFAULT '',
  "grammarInfo" TEXT NOT NULL DEFAULT '',
  "translation" TEXT NOT NULL DEFAULT '',
  "encounterCount" INTEGER NOT NULL DEFAULT 0,
  "hoverCount" INTEGER NOT NULL DEFAULT 0,
  "totalHoverMs" REAL NOT NULL DEFAULT 0,
  "lastDurations" TEXT NOT NULL DEFAULT '[]',
  "alphaPrior" REAL NOT NULL DEFAULT 1.0,
  "betaPrior" REAL NOT NULL DEFAULT 10.0,
  "recallSuccesses" REAL NOT NULL DEFAULT 0,
  "recallFailures" REAL NOT NULL DEFAULT 0,
  "lastRecallUpdate" INTEGER,
  "retentionRate" REAL NOT NULL DEFAULT 0.1,
  "createdAt" INTEGER NOT NULL,
  "lastReviewed" INTEGER NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS "idx_vocab_entries_user_word"
  ON "vocab_entries" ("userId", "word");

-- Inertia-model table backing the memorization-card queue.
CREATE TABLE IF NOT EXISTS "card_states" (
  "id" TEXT PRIMARY KEY,
  "userId" TEXT NOT NULL,
  "word" TEXT NOT NULL,
  "translation" TEXT NOT NULL DEFAULT '',
  "count" INTEGER NOT NULL DEFAULT 0,
  "recall" REAL,
  "learningInertia" REAL,
  "lastViewed" INTEGER
);

CREATE UNIQUE INDEX IF NOT EXISTS "idx_card_states_user_word"
  ON "card_states" ("userId", "word");

CREATE TABLE IF NOT EXISTS "_db_metadata" (
  "key" TEXT PRIMARY KEY,
  "value" TEXT NOT NULL
);
"#;

/// Splits the schema into executable statements, honoring quoted strings so
/// a semicolon inside a literal never ends a statement.
pub fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in sql.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            None if ch == '\'' || ch == '"' => quote = Some(ch),
            None if ch == ';' => {
                push_statement(&mut statements, &current);
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    push_statement(&mut statements, &current);

    statements
}

fn push_statement(statements: &mut Vec<String>, raw: &str) {
    // drop comment-only lines before deciding whether anything remains
    let body: String = raw
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");
    let trimmed = body.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
}
