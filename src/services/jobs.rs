use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::sleep;
use utoipa::ToSchema;
use uuid::Uuid;

/// Where a transcription job currently stands. Serialized with a `state`
/// tag so clients can switch on it.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Processing,
    Completed {
        transcriptions: Vec<String>,
        transcript_key: String,
    },
    Failed {
        message: String,
    },
}

impl JobState {
    pub fn is_finished(&self) -> bool {
        matches!(self, JobState::Completed { .. } | JobState::Failed { .. })
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JobRecord {
    pub id: Uuid,
    pub filename: String,
    pub status: JobState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// In-memory registry of transcription jobs, keyed by job id. Small scale
/// by design: records live here only until the sweeper evicts them.
#[derive(Default)]
pub struct JobStore {
    jobs: DashMap<Uuid, JobRecord>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, filename: &str) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        self.jobs.insert(
            id,
            JobRecord {
                id,
                filename: filename.to_string(),
                status: JobState::Queued,
                created_at: now,
                updated_at: now,
            },
        );
        id
    }

    pub fn update(&self, id: Uuid, status: JobState) {
        if let Some(mut record) = self.jobs.get_mut(&id) {
            record.status = status;
            record.updated_at = Utc::now();
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<JobRecord> {
        self.jobs.get(id).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Drops finished records last touched before `cutoff`; returns how many.
    pub fn remove_finished_before(&self, cutoff: DateTime<Utc>) -> usize {
        let before = self.jobs.len();
        self.jobs
            .retain(|_, record| !(record.status.is_finished() && record.updated_at < cutoff));
        before - self.jobs.len()
    }
}

/// Background task that evicts finished job records after their TTL.
pub struct JobSweeper {
    jobs: std::sync::Arc<JobStore>,
    ttl: Duration,
    shutdown: watch::Receiver<bool>,
}

impl JobSweeper {
    pub fn new(
        jobs: std::sync::Arc<JobStore>,
        ttl_secs: u64,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            jobs,
            ttl: Duration::seconds(ttl_secs as i64),
            shutdown,
        }
    }

    pub async fn run(mut self) {
        tracing::info!("🚀 Job sweeper started");

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    tracing::info!("🛑 Job sweeper shutting down");
                    break;
                }
                _ = sleep(std::time::Duration::from_secs(60)) => {
                    let removed = self.jobs.remove_finished_before(Utc::now() - self.ttl);
                    if removed > 0 {
                        tracing::info!("🧹 Swept {} finished job record(s)", removed);
                    }
                }
            }
        }
    }
}
