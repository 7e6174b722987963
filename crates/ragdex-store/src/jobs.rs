//! Build job records. The pipeline only ever writes terminal status; the
//! in-memory implementation additionally exposes reads for binaries and
//! tests.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;

use ragdex_core::traits::JobStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Error,
}

#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: String,
    pub status: JobStatus,
    pub message: Option<String>,
    pub index_name: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Default)]
pub struct MemoryJobStore {
    jobs: Mutex<HashMap<String, JobRecord>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, job_id: &str) {
        let now = timestamp();
        let record = JobRecord {
            id: job_id.to_string(),
            status: JobStatus::Queued,
            message: None,
            index_name: None,
            created_at: now.clone(),
            updated_at: now,
        };
        if let Ok(mut jobs) = self.jobs.lock() {
            jobs.insert(job_id.to_string(), record);
        }
    }

    pub fn get(&self, job_id: &str) -> Option<JobRecord> {
        self.jobs.lock().ok()?.get(job_id).cloned()
    }

    fn update(&self, job_id: &str, f: impl FnOnce(&mut JobRecord)) {
        let Ok(mut jobs) = self.jobs.lock() else { return };
        let record = jobs.entry(job_id.to_string()).or_insert_with(|| {
            let now = timestamp();
            JobRecord {
                id: job_id.to_string(),
                status: JobStatus::Queued,
                message: None,
                index_name: None,
                created_at: now.clone(),
                updated_at: now,
            }
        });
        f(record);
        record.updated_at = timestamp();
    }
}

impl JobStore for MemoryJobStore {
    fn set_running(&self, job_id: &str) {
        self.update(job_id, |r| r.status = JobStatus::Running);
    }

    fn set_done(&self, job_id: &str, index_name: &str) {
        let index_name = index_name.to_string();
        self.update(job_id, move |r| {
            r.status = JobStatus::Done;
            r.index_name = Some(index_name);
        });
    }

    fn set_error(&self, job_id: &str, message: &str) {
        let message = message.to_string();
        self.update(job_id, move |r| {
            r.status = JobStatus::Error;
            r.message = Some(message);
        });
    }
}

fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}
