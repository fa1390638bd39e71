//! Result persistence hook
//!
//! The engine hands a finished result array to a `ResultSink` exactly once per
//! submission. Removing results left over from an earlier run of the same
//! submission is the caller's job (`delete_results`).

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::core::{SubmissionStatus, TestCase, TestResult};

/// Redis key constants
pub mod keys {
    /// Submission job queue key
    pub const EXEC_QUEUE: &str = "exec:queue";

    /// Result key prefix (for polling)
    pub const RESULT_PREFIX: &str = "exec:result:";

    /// Submission status key prefix
    pub const STATUS_PREFIX: &str = "exec:status:";

    /// Result channel (for pub/sub)
    pub const RESULT_CHANNEL: &str = "exec:results";
}

const RESULT_EXPIRY_SECS: u64 = 3600; // 1 hour

/// One persisted row: a test case zipped with its result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTestResult {
    pub test_index: usize,
    pub is_hidden: bool,
    pub points: u32,
    #[serde(flatten)]
    pub result: TestResult,
}

/// Zip test cases with results positionally
pub fn zip_results(
    test_cases: &[TestCase],
    results: &[TestResult],
) -> Result<Vec<StoredTestResult>> {
    if test_cases.len() != results.len() {
        anyhow::bail!(
            "Result count {} does not match test case count {}",
            results.len(),
            test_cases.len()
        );
    }

    Ok(test_cases
        .iter()
        .zip(results)
        .enumerate()
        .map(|(test_index, (tc, result))| StoredTestResult {
            test_index,
            is_hidden: tc.is_hidden,
            points: tc.points,
            result: result.clone(),
        })
        .collect())
}

#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn save_results(
        &self,
        submission_id: i64,
        test_cases: &[TestCase],
        results: &[TestResult],
    ) -> Result<()>;
}

/// In-process store, used for tests and embedding
#[derive(Debug, Clone, Default)]
pub struct MemoryResultStore {
    rows: Arc<Mutex<HashMap<i64, Vec<StoredTestResult>>>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, submission_id: i64) -> Option<Vec<StoredTestResult>> {
        self.rows.lock().await.get(&submission_id).cloned()
    }

    pub async fn delete_results(&self, submission_id: i64) {
        self.rows.lock().await.remove(&submission_id);
    }
}

#[async_trait]
impl ResultSink for MemoryResultStore {
    async fn save_results(
        &self,
        submission_id: i64,
        test_cases: &[TestCase],
        results: &[TestResult],
    ) -> Result<()> {
        let rows = zip_results(test_cases, results)?;
        let mut store = self.rows.lock().await;
        if store.contains_key(&submission_id) {
            anyhow::bail!("Results for submission {} already exist", submission_id);
        }
        store.insert(submission_id, rows);
        Ok(())
    }
}

/// Message published on the result channel
#[derive(Debug, Serialize, Deserialize)]
pub struct ResultNotice {
    pub submission_id: i64,
    pub status: SubmissionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Redis-backed store: results for polling plus a pub/sub notice
#[derive(Clone)]
pub struct RedisResultStore {
    conn: MultiplexedConnection,
}

impl RedisResultStore {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }

    pub fn result_key(submission_id: i64) -> String {
        format!("{}{}", keys::RESULT_PREFIX, submission_id)
    }

    pub fn status_key(submission_id: i64) -> String {
        format!("{}{}", keys::STATUS_PREFIX, submission_id)
    }

    /// Remove results of an earlier run before re-executing a submission
    pub async fn delete_results(&self, submission_id: i64) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(vec![
            Self::result_key(submission_id),
            Self::status_key(submission_id),
        ])
        .await
        .context("Failed to delete previous results")?;
        Ok(())
    }

    pub async fn set_status(&self, submission_id: i64, status: SubmissionStatus) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(
            Self::status_key(submission_id),
            status.to_string(),
            RESULT_EXPIRY_SECS,
        )
        .await
        .context("Failed to store submission status")?;
        Ok(())
    }

    /// Mark a submission failed after an internal error, with a generic diagnostic
    pub async fn mark_failed(&self, submission_id: i64, message: &str) -> Result<()> {
        self.set_status(submission_id, SubmissionStatus::Failed).await?;
        self.publish(&ResultNotice {
            submission_id,
            status: SubmissionStatus::Failed,
            error_message: Some(message.to_string()),
        })
        .await
    }

    async fn publish(&self, notice: &ResultNotice) -> Result<()> {
        let payload = serde_json::to_string(notice)?;
        let mut conn = self.conn.clone();
        if let Err(e) = conn
            .publish::<_, _, ()>(keys::RESULT_CHANNEL, &payload)
            .await
        {
            // Polling still works through the stored key
            warn!(
                "Redis publish failed for submission {}: {}",
                notice.submission_id, e
            );
        }
        Ok(())
    }
}

#[async_trait]
impl ResultSink for RedisResultStore {
    async fn save_results(
        &self,
        submission_id: i64,
        test_cases: &[TestCase],
        results: &[TestResult],
    ) -> Result<()> {
        let rows = zip_results(test_cases, results)?;
        let payload = serde_json::to_string(&rows)?;
        let key = Self::result_key(submission_id);

        let mut conn = self.conn.clone();
        let created: bool = redis::cmd("SET")
            .arg(&key)
            .arg(&payload)
            .arg("NX")
            .arg("EX")
            .arg(RESULT_EXPIRY_SECS)
            .query_async::<Option<String>>(&mut conn)
            .await
            .context("Failed to store results")?
            .is_some();
        if !created {
            anyhow::bail!("Results for submission {} already exist", submission_id);
        }

        self.set_status(submission_id, SubmissionStatus::Completed)
            .await?;
        self.publish(&ResultNotice {
            submission_id,
            status: SubmissionStatus::Completed,
            error_message: None,
        })
        .await?;

        info!("Stored {} results for submission {}", rows.len(), submission_id);
        Ok(())
    }
}
