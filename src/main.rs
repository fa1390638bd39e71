use std::sync::Arc;

use anyhow::{Context, Result};
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

use exec_engine::core::{Assignment, ExecutionRequest, Submission, SubmissionStatus, TestCase};
use exec_engine::storage::{keys, RedisResultStore};
use exec_engine::{EngineConfig, ExecutionEngine, ExecutionError, LanguageTable};

/// Job received from the Redis queue
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmissionJob {
    pub submission_id: i64,
    pub assignment: Assignment,
    pub submission: Submission,
    pub test_cases: Vec<TestCase>,
}

const BLPOP_TIMEOUT_SECS: f64 = 1.0;
const SLOT_POLL_INTERVAL: Duration = Duration::from_millis(50);
const INTERNAL_ERROR_MESSAGE: &str = "Internal error during execution";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("exec_engine=info".parse()?)
                .add_directive("exec_worker=info".parse()?),
        )
        .init();

    let config = EngineConfig::from_env()?;
    let table = LanguageTable::load_or_embedded(config.languages_config.as_deref())?;
    info!(
        "Loaded languages: {}",
        table.supported_languages().join(", ")
    );
    info!(
        "Engine config: max_concurrent={}, workspace_root={}, compile_time_limit={}ms",
        config.max_concurrent,
        config.workspace_root.display(),
        config.compile_time_limit_ms
    );
    let engine = Arc::new(ExecutionEngine::new(config, &table));

    let redis_url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".into());

    info!("Starting execution worker...");

    let client = redis::Client::open(redis_url.clone())?;
    let mut conn = get_redis_connection(&client).await?;
    info!("Connected to Redis at {}", redis_url);

    let store = RedisResultStore::new(conn.clone());
    let mut jobs = JoinSet::new();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!("Waiting for jobs...");

    loop {
        // Reap finished jobs so the set does not grow
        while let Some(joined) = jobs.try_join_next() {
            if let Err(e) = joined {
                error!("Job task panicked: {}", e);
            }
        }

        if engine.available_slots() == 0 {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = sleep(SLOT_POLL_INTERVAL) => continue,
            }
        }

        let popped: redis::RedisResult<Option<(String, String)>> = tokio::select! {
            _ = &mut shutdown => break,
            res = conn.blpop(keys::EXEC_QUEUE, BLPOP_TIMEOUT_SECS) => res,
        };

        let job_data = match popped {
            Ok(Some((_, job_data))) => job_data,
            Ok(None) => continue,
            Err(e) => {
                warn!("Redis BLPOP failed: {}. Attempting to reconnect...", e);
                conn = get_redis_connection(&client).await?;
                continue;
            }
        };

        let job = match serde_json::from_str::<SubmissionJob>(&job_data) {
            Ok(job) => job,
            Err(e) => {
                warn!("Failed to parse job data: {}", e);
                continue;
            }
        };

        info!(
            "Received job: submission_id={}, test_cases={}",
            job.submission_id,
            job.test_cases.len()
        );

        let engine = Arc::clone(&engine);
        let store = store.clone();
        let conn = conn.clone();
        jobs.spawn(async move {
            let submission_id = job.submission_id;
            if let Err(e) = process_job(&engine, &store, conn, job, job_data).await {
                error!("Failed to process job {}: {:#}", submission_id, e);
                if let Err(e) = store.mark_failed(submission_id, INTERNAL_ERROR_MESSAGE).await {
                    error!("Failed to mark submission {} failed: {:#}", submission_id, e);
                }
            }
        });
    }

    info!("Shutdown requested, waiting for {} in-flight jobs", jobs.len());
    while let Some(joined) = jobs.join_next().await {
        if let Err(e) = joined {
            error!("Job task panicked: {}", e);
        }
    }
    info!("Worker stopped");
    Ok(())
}

async fn process_job(
    engine: &ExecutionEngine,
    store: &RedisResultStore,
    mut conn: MultiplexedConnection,
    job: SubmissionJob,
    job_data: String,
) -> Result<()> {
    let submission_id = job.submission_id;
    let request =
        ExecutionRequest::for_submission(&job.assignment, &job.submission, job.test_cases);

    store.delete_results(submission_id).await?;
    store.set_status(submission_id, SubmissionStatus::Running).await?;

    match engine.execute_and_save(submission_id, &request, store).await {
        Ok(results) => {
            let passed = results.iter().filter(|r| r.is_passed()).count();
            info!(
                "Job completed: submission_id={}, passed={}/{}",
                submission_id,
                passed,
                results.len()
            );
            Ok(())
        }
        Err(ExecutionError::ResourceExhausted { limit }) => {
            warn!(
                "Capacity exhausted ({} in flight), requeueing submission {}",
                limit, submission_id
            );
            store.set_status(submission_id, SubmissionStatus::Pending).await?;
            conn.rpush::<_, _, ()>(keys::EXEC_QUEUE, job_data)
                .await
                .context("Failed to requeue job")?;
            Ok(())
        }
        Err(e @ ExecutionError::UnsupportedLanguage(_)) => {
            warn!("Rejected submission {}: {}", submission_id, e);
            store.mark_failed(submission_id, &e.to_string()).await
        }
        Err(e) => Err(e.into()),
    }
}

async fn get_redis_connection(client: &redis::Client) -> Result<MultiplexedConnection> {
    loop {
        match client.get_multiplexed_async_connection().await {
            Ok(conn) => return Ok(conn),
            Err(e) => {
                warn!(
                    "Failed to connect to Redis: {}. Retrying in 3 seconds...",
                    e
                );
                sleep(Duration::from_secs(3)).await;
            }
        }
    }
}
