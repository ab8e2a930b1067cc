use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::engine::AnalysisReport;
use crate::errors::AnalyzeError;
use crate::progress::ProgressReporter;

/// How long a finished task's record stays pollable before reclamation.
pub const COMPLETED_TASK_TTL: Duration = Duration::from_secs(300);

pub type TaskId = u64;

/// Pollable state of one background analysis.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TaskStatus {
    Running { progress: u8 },
    Completed { result: AnalysisReport },
    Failed { error: String },
}

struct TaskEntry {
    status: TaskStatus,
    finished_at: Option<Instant>,
}

/// Dispatches analyses onto background threads and tracks their status by
/// generated task id.
///
/// Callers poll [`TaskRegistry::status`]; running tasks report progress
/// through the registry, finished ones keep their result or error around for
/// the TTL and are reclaimed lazily on the next registry access. Started
/// tasks always run to completion; there is no cancellation.
pub struct TaskRegistry {
    tasks: Arc<Mutex<HashMap<TaskId, TaskEntry>>>,
    next_id: AtomicU64,
    ttl: Duration,
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::with_ttl(COMPLETED_TASK_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        TaskRegistry {
            tasks: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
            ttl,
        }
    }

    /// Spawns `job` on a new thread and returns its task id immediately. The
    /// job receives a progress reporter wired back into this registry.
    pub fn spawn<F>(&self, job: F) -> TaskId
    where
        F: FnOnce(&ProgressReporter) -> Result<AnalysisReport, AnalyzeError> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.insert(
                id,
                TaskEntry {
                    status: TaskStatus::Running { progress: 0 },
                    finished_at: None,
                },
            );
        }

        let tasks = Arc::clone(&self.tasks);
        let progress_tasks = Arc::clone(&self.tasks);
        thread::spawn(move || {
            let progress = ProgressReporter::new(move |pct| {
                if let Ok(mut tasks) = progress_tasks.lock() {
                    if let Some(entry) = tasks.get_mut(&id) {
                        if let TaskStatus::Running { progress } = &mut entry.status {
                            *progress = pct;
                        }
                    }
                }
            });

            let outcome = job(&progress);

            if let Ok(mut tasks) = tasks.lock() {
                if let Some(entry) = tasks.get_mut(&id) {
                    entry.status = match outcome {
                        Ok(result) => TaskStatus::Completed { result },
                        Err(e) => TaskStatus::Failed {
                            error: e.to_string(),
                        },
                    };
                    entry.finished_at = Some(Instant::now());
                }
            }
        });

        id
    }

    /// Current status of a task, or `None` if the id is unknown or its
    /// record has been reclaimed. Expired records are swept on each call.
    pub fn status(&self, id: TaskId) -> Option<TaskStatus> {
        let mut tasks = self.tasks.lock().ok()?;
        let ttl = self.ttl;
        tasks.retain(|_, entry| entry.finished_at.is_none_or(|t| t.elapsed() < ttl));
        tasks.get(&id).map(|entry| entry.status.clone())
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().map(|tasks| tasks.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
