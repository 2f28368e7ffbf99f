//! Per-learner, per-lesson CMI state

use std::collections::BTreeMap;
use std::sync::Arc;

use scorm_common::CmiTree;
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Runtime-state repository
///
/// Merges are read-modify-write; the write lock serializes them within the
/// process so concurrent commits for the same row never lose updates.
#[derive(Clone)]
pub struct RuntimeStore {
    pool: SqlitePool,
    write_lock: Arc<Mutex<()>>,
}

impl RuntimeStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Stored tree, `None` when the learner never committed to the lesson
    pub async fn load_runtime(
        &self,
        learner_id: &str,
        lesson_id: &str,
    ) -> Result<Option<CmiTree>, sqlx::Error> {
        let state_json: Option<String> = sqlx::query_scalar(
            "SELECT state_json FROM scorm_runtime WHERE learner_id = ? AND lesson_id = ?",
        )
        .bind(learner_id)
        .bind(lesson_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(state_json.map(|json| parse_stored(&json, learner_id, lesson_id)))
    }

    /// Merge flat `updates` into the stored tree and persist the result
    ///
    /// Updates pass through the same guard as on the client: unsafe keys are
    /// dropped and suspend data is capped.
    pub async fn merge_runtime(
        &self,
        learner_id: &str,
        lesson_id: &str,
        updates: &BTreeMap<String, String>,
    ) -> Result<CmiTree, sqlx::Error> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let state_json: Option<String> = sqlx::query_scalar(
            "SELECT state_json FROM scorm_runtime WHERE learner_id = ? AND lesson_id = ?",
        )
        .bind(learner_id)
        .bind(lesson_id)
        .fetch_optional(&mut *tx)
        .await?;

        let mut tree = state_json
            .map(|json| parse_stored(&json, learner_id, lesson_id))
            .unwrap_or_default();
        let applied = tree.merge(updates);

        sqlx::query(
            r#"
            INSERT INTO scorm_runtime (learner_id, lesson_id, state_json, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(learner_id, lesson_id) DO UPDATE SET
                state_json = excluded.state_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(learner_id)
        .bind(lesson_id)
        .bind(tree.to_json().to_string())
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(
            learner_id = %learner_id,
            lesson_id = %lesson_id,
            received = updates.len(),
            applied,
            "Runtime state merged"
        );
        Ok(tree)
    }
}

fn parse_stored(json: &str, learner_id: &str, lesson_id: &str) -> CmiTree {
    let parsed = serde_json::from_str::<serde_json::Value>(json)
        .map_err(scorm_common::Error::from)
        .and_then(|value| CmiTree::from_json(&value));

    match parsed {
        Ok(tree) => tree,
        Err(e) => {
            warn!(
                learner_id = %learner_id,
                lesson_id = %lesson_id,
                error = %e,
                "Stored runtime state unreadable, starting fresh"
            );
            CmiTree::new()
        }
    }
}
