// ABOUTME: Journaled background termination of superseded and abandoned environments.
// ABOUTME: Also detects orphans left behind by interrupted deployments.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use crate::error::Result;
use crate::platform::{EnvironmentDescription, PlatformClient, TerminateEnvironmentRequest};
use crate::types::{ApplicationName, EnvironmentName, PhysicalName};

/// Why an environment is being terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupReason {
    /// Replaced by a successful deploy.
    Superseded,
    /// Created by a failed deploy.
    Abandoned,
    /// Left behind by an interrupted deploy.
    Orphaned,
    /// Pending in a journal from an earlier run.
    Recovered,
}

/// A physical environment that should be terminated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupIntent {
    pub application: ApplicationName,
    pub environment: PhysicalName,
    pub reason: CleanupReason,
}

impl CleanupIntent {
    pub fn new(application: ApplicationName, environment: PhysicalName, reason: CleanupReason) -> Self {
        Self {
            application,
            environment,
            reason,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupState {
    Queued,
    Done,
    Failed,
}

/// One journal line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanupRecord {
    #[serde(flatten)]
    pub intent: CleanupIntent,
    pub state: CleanupState,
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Records kept in memory for inspection; the journal file keeps everything.
const HISTORY_LIMIT: usize = 256;

type IntentKey = (ApplicationName, PhysicalName);

/// Latest non-`Done` intent per environment, in the order first queued.
#[derive(Debug, Default)]
struct Outstanding {
    entries: BTreeMap<u64, CleanupIntent>,
    index: HashMap<IntentKey, u64>,
    next: u64,
}

impl Outstanding {
    fn apply(&mut self, intent: &CleanupIntent, state: CleanupState) {
        let key = (intent.application.clone(), intent.environment.clone());
        if state == CleanupState::Done {
            if let Some(seq) = self.index.remove(&key) {
                self.entries.remove(&seq);
            }
            return;
        }
        if !self.index.contains_key(&key) {
            self.entries.insert(self.next, intent.clone());
            self.index.insert(key, self.next);
            self.next += 1;
        }
    }

    fn contains(&self, application: &ApplicationName, environment: &PhysicalName) -> bool {
        self.index
            .contains_key(&(application.clone(), environment.clone()))
    }

    fn intents(&self) -> Vec<CleanupIntent> {
        self.entries.values().cloned().collect()
    }
}

#[derive(Debug, Default)]
struct JournalState {
    history: VecDeque<CleanupRecord>,
    outstanding: Outstanding,
}

#[derive(Debug)]
struct Journal {
    path: Option<PathBuf>,
    state: Mutex<JournalState>,
}

impl Journal {
    fn record(&self, intent: &CleanupIntent, state: CleanupState, error: Option<String>) {
        let record = CleanupRecord {
            intent: intent.clone(),
            state,
            at: Utc::now(),
            error,
        };

        if let Some(path) = &self.path
            && let Err(e) = append_record(path, &record)
        {
            tracing::warn!(
                path = %path.display(),
                environment = %intent.environment,
                "failed to write cleanup journal: {e}"
            );
        }

        let mut journal = self.state.lock();
        journal.outstanding.apply(intent, state);
        if journal.history.len() == HISTORY_LIMIT {
            journal.history.pop_front();
        }
        journal.history.push_back(record);
    }
}

fn append_record(path: &Path, record: &CleanupRecord) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let line = serde_json::to_string(record)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")?;
    Ok(())
}

/// Intents whose latest record is not `Done`, in the order first seen.
fn outstanding(records: impl IntoIterator<Item = CleanupRecord>) -> Vec<CleanupIntent> {
    let mut outstanding = Outstanding::default();
    for record in records {
        outstanding.apply(&record.intent, record.state);
    }
    outstanding.intents()
}

/// Read a journal file and return intents that never completed.
///
/// A missing file has nothing pending. Lines that fail to parse are skipped
/// with a warning.
pub fn pending_from_journal(path: &Path) -> Result<Vec<CleanupIntent>> {
    if !path.exists() {
        return Ok(vec![]);
    }

    let content = std::fs::read_to_string(path)?;
    let records = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<CleanupRecord>(line) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(path = %path.display(), "skipping corrupt journal line: {e}");
                None
            }
        });
    Ok(outstanding(records))
}

enum Command {
    Terminate(CleanupIntent),
    Flush(oneshot::Sender<()>),
}

/// Fire-and-forget environment termination drained by one background task.
///
/// Every intent is journaled as `Queued` before `enqueue` returns, then
/// `Done` or `Failed` once the worker has called the platform. Clones share
/// the same worker and journal.
#[derive(Debug, Clone)]
pub struct CleanupQueue {
    sender: mpsc::UnboundedSender<Command>,
    journal: Arc<Journal>,
}

impl CleanupQueue {
    /// Start the worker. Must be called inside a tokio runtime.
    pub fn spawn<P>(platform: Arc<P>, journal_path: Option<PathBuf>) -> Self
    where
        P: PlatformClient + ?Sized + 'static,
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        let journal = Arc::new(Journal {
            path: journal_path,
            state: Mutex::new(JournalState::default()),
        });
        tokio::spawn(run_worker(platform, receiver, journal.clone()));
        Self { sender, journal }
    }

    pub fn enqueue(&self, intent: CleanupIntent) {
        tracing::info!(
            application = %intent.application,
            environment = %intent.environment,
            reason = ?intent.reason,
            "queued environment termination"
        );
        self.journal.record(&intent, CleanupState::Queued, None);

        if self.sender.send(Command::Terminate(intent)).is_err() {
            tracing::warn!("cleanup worker has stopped; termination stays pending");
        }
    }

    /// Wait until everything enqueued so far has been processed.
    pub async fn flush(&self) {
        let (done, finished) = oneshot::channel();
        if self.sender.send(Command::Flush(done)).is_ok() {
            let _ = finished.await;
        }
    }

    /// The most recent journal records written by this queue, oldest first.
    pub fn records(&self) -> Vec<CleanupRecord> {
        self.journal.state.lock().history.iter().cloned().collect()
    }

    /// Intents of this queue that have not completed.
    pub fn pending(&self) -> Vec<CleanupIntent> {
        self.journal.state.lock().outstanding.intents()
    }

    /// Whether a termination of `environment` is queued or has failed.
    pub fn is_pending(&self, application: &ApplicationName, environment: &PhysicalName) -> bool {
        self.journal
            .state
            .lock()
            .outstanding
            .contains(application, environment)
    }

    pub fn journal_path(&self) -> Option<&Path> {
        self.journal.path.as_deref()
    }
}

async fn run_worker<P>(
    platform: Arc<P>,
    mut receiver: mpsc::UnboundedReceiver<Command>,
    journal: Arc<Journal>,
) where
    P: PlatformClient + ?Sized,
{
    while let Some(command) = receiver.recv().await {
        let intent = match command {
            Command::Terminate(intent) => intent,
            Command::Flush(done) => {
                let _ = done.send(());
                continue;
            }
        };

        let request = TerminateEnvironmentRequest::new(intent.environment.clone());
        match platform.terminate_environment(&request).await {
            Ok(_) => {
                tracing::debug!(environment = %intent.environment, "termination accepted");
                journal.record(&intent, CleanupState::Done, None);
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!(environment = %intent.environment, "environment already gone");
                journal.record(&intent, CleanupState::Done, None);
            }
            Err(e) => {
                tracing::warn!(
                    application = %intent.application,
                    environment = %intent.environment,
                    "failed to terminate environment: {e}"
                );
                journal.record(&intent, CleanupState::Failed, Some(e.to_string()));
            }
        }
    }
}

/// Live environments of a slot that are not the known current one.
///
/// An orphan:
/// - belongs to `slot` by name
/// - is neither terminating nor terminated
/// - is not `current`
pub fn detect_orphans(
    slot: &EnvironmentName,
    current: Option<&PhysicalName>,
    environments: &[EnvironmentDescription],
) -> Vec<EnvironmentDescription> {
    environments
        .iter()
        .filter(|env| slot.owns(&env.environment_name))
        .filter(|env| !env.status.is_gone())
        .filter(|env| Some(&env.environment_name) != current)
        .cloned()
        .collect()
}
