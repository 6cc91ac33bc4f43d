//! Append-only conversation persistence over SQLite.
//!
//! Each successful exchange is stored as two rows: the user's turn, tagged
//! with a coarse language classification, and the assistant's turn with the
//! reply fields remapped onto storage columns (`sabihin` -> `hint`, skill
//! mode -> `tone`). `meaning`, `examples` and `note` are per-turn context
//! and are deliberately not persisted.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use tokio::task;
use turo_schema::{Persona, TutorReply};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredTurn {
    pub role: String,
    pub content: String,
    pub language: Option<String>,
    pub hint: Option<String>,
    pub correction: Option<String>,
    pub tone: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct ConversationStore {
    db: Arc<Mutex<Connection>>,
}

/// Coarse user-utterance classification: any ASCII letter marks the text as
/// English, otherwise Tagalog. Knowingly misclassifies romanized Tagalog;
/// kept for compatibility with existing stored history.
pub fn classify_language(text: &str) -> &'static str {
    if text.chars().any(|c| c.is_ascii_alphabetic()) {
        "english"
    } else {
        "tagalog"
    }
}

impl ConversationStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating store directory {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("opening conversation db {}", path.display()))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS turns (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                persona TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                language TEXT,
                hint TEXT,
                correction TEXT,
                tone TEXT,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_turns_user ON turns(user_id, id);",
        )?;
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    /// Appends the user turn and the assistant turn for one exchange.
    /// Callers treat failure as non-fatal: log and move on.
    pub async fn append_exchange(
        &self,
        user_id: &str,
        persona: Persona,
        user_text: &str,
        reply: &TutorReply,
    ) -> Result<()> {
        let db = self.db.clone();
        let user_id = user_id.to_string();
        let user_text = user_text.to_string();
        let reply = reply.clone();
        let now = Utc::now().to_rfc3339();

        task::spawn_blocking(move || -> Result<()> {
            let mut conn = db.lock().unwrap_or_else(|e| e.into_inner());
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO turns (user_id, persona, role, content, language, created_at)
                 VALUES (?1, ?2, 'user', ?3, ?4, ?5)",
                params![
                    user_id,
                    persona.as_str(),
                    user_text,
                    classify_language(&user_text),
                    now
                ],
            )?;
            tx.execute(
                "INSERT INTO turns (user_id, persona, role, content, hint, correction, tone, created_at)
                 VALUES (?1, ?2, 'assistant', ?3, ?4, ?5, ?6, ?7)",
                params![
                    user_id,
                    persona.as_str(),
                    reply.tagalog,
                    reply.sabihin,
                    reply.correction,
                    persona.skill_mode().as_str(),
                    now
                ],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await?
    }

    /// Newest `limit` turns for a user, returned in chronological order.
    pub async fn recent_turns(&self, user_id: &str, limit: usize) -> Result<Vec<StoredTurn>> {
        let db = self.db.clone();
        let user_id = user_id.to_string();

        task::spawn_blocking(move || -> Result<Vec<StoredTurn>> {
            let conn = db.lock().unwrap_or_else(|e| e.into_inner());
            let mut stmt = conn.prepare(
                "SELECT role, content, language, hint, correction, tone, created_at
                 FROM turns WHERE user_id = ?1 ORDER BY id DESC LIMIT ?2",
            )?;
            let mut turns: Vec<StoredTurn> = stmt
                .query_map(params![user_id, limit as i64], |row| {
                    Ok(StoredTurn {
                        role: row.get(0)?,
                        content: row.get(1)?,
                        language: row.get(2)?,
                        hint: row.get(3)?,
                        correction: row.get(4)?,
                        tone: row.get(5)?,
                        created_at: row
                            .get::<_, String>(6)?
                            .parse::<DateTime<Utc>>()
                            .unwrap_or_else(|_| Utc::now()),
                    })
                })?
                .collect::<std::result::Result<_, _>>()?;
            turns.reverse();
            Ok(turns)
        })
        .await?
    }

    pub async fn turn_count(&self, user_id: &str) -> Result<i64> {
        let db = self.db.clone();
        let user_id = user_id.to_string();
        task::spawn_blocking(move || -> Result<i64> {
            let conn = db.lock().unwrap_or_else(|e| e.into_inner());
            let count = conn.query_row(
                "SELECT COUNT(*) FROM turns WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await?
    }
}
