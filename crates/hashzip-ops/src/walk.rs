//! Recursive batch walker.
//!
//! Every selected path is inspected concurrently on the current task. A
//! directory is listed once and its full child list is walked as one batch,
//! so sibling entries at every level fan out together and are joined before
//! the parent branch completes. Failures stay local to the entry that hit
//! them; the remaining branches carry on and the error is collected into the
//! final [`BatchComplete`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use futures::future::{BoxFuture, FutureExt, join_all};
use tokio::sync::mpsc;

use hashzip_core::{
    Digester, EnabledTypes, HashzipError, MediaClassifier, RemovalMode, Result,
};

use crate::marker::{MarkerChange, append_marker, remove_marker};
use crate::progress::{BatchComplete, BatchEvent, EntryOutcome, OutcomeStatus, SkipReason};
use crate::{FileAction, OPERATION_CHANNEL_SIZE, OperationError};

/// Restricts a batch to files of enabled media kinds.
#[derive(Debug, Clone)]
pub struct MediaFilter {
    pub classifier: MediaClassifier,
    pub enabled: EnabledTypes,
}

impl MediaFilter {
    pub fn new(classifier: MediaClassifier, enabled: EnabledTypes) -> Self {
        Self {
            classifier,
            enabled,
        }
    }
}

/// Options for a batch walk.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub action: FileAction,
    pub marker: String,
    pub removal_mode: RemovalMode,
    /// Only files admitted by the filter are acted on (None = every file).
    pub filter: Option<MediaFilter>,
    /// Compute before/after digests (None = no digests).
    pub digester: Option<Digester>,
}

impl BatchOptions {
    pub fn new(action: FileAction, marker: impl Into<String>) -> Self {
        Self {
            action,
            marker: marker.into(),
            removal_mode: RemovalMode::default(),
            filter: None,
            digester: None,
        }
    }

    /// Options that only list files.
    pub fn visit() -> Self {
        Self::new(FileAction::Visit, "")
    }

    pub fn with_filter(mut self, filter: MediaFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_digester(mut self, digester: Digester) -> Self {
        self.digester = Some(digester);
        self
    }

    pub fn with_removal_mode(mut self, mode: RemovalMode) -> Self {
        self.removal_mode = mode;
        self
    }
}

/// Start a batch on the tokio runtime.
///
/// Returns a receiver for events; the last one is always `Complete`.
pub fn start_batch(selection: Vec<PathBuf>, options: BatchOptions) -> mpsc::Receiver<BatchEvent> {
    let (tx, rx) = mpsc::channel(OPERATION_CHANNEL_SIZE);

    tokio::spawn(async move {
        let complete = walk(selection, options, Some(tx.clone())).await;
        let _ = tx.send(BatchEvent::Complete(complete)).await;
    });

    rx
}

/// Walk `selection` and apply the action to every qualifying file.
///
/// The sender, when given, must be drained concurrently.
pub async fn walk(
    selection: Vec<PathBuf>,
    options: BatchOptions,
    events: Option<mpsc::Sender<BatchEvent>>,
) -> BatchComplete {
    let start = Instant::now();
    let action = options.action;
    tracing::info!(%action, roots = selection.len(), "batch started");

    let ctx = Arc::new(WalkContext {
        options,
        events,
        visited: Mutex::new(HashSet::new()),
    });
    let outcomes = walk_paths(selection, ctx).await;

    let complete = BatchComplete {
        action,
        outcomes,
        elapsed_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
    };
    tracing::info!(elapsed_ms = complete.elapsed_ms, "{}", complete.summary());
    complete
}

struct WalkContext {
    options: BatchOptions,
    events: Option<mpsc::Sender<BatchEvent>>,
    visited: Mutex<HashSet<PathBuf>>,
}

impl WalkContext {
    async fn emit(&self, event: BatchEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event).await;
        }
    }

    /// Record a path, returning false if it was seen before.
    fn first_visit(&self, path: &Path) -> bool {
        match self.visited.lock() {
            Ok(mut visited) => visited.insert(path.to_path_buf()),
            Err(poisoned) => poisoned.into_inner().insert(path.to_path_buf()),
        }
    }

    async fn skipped(&self, path: PathBuf, reason: SkipReason) -> EntryOutcome {
        tracing::debug!(path = %path.display(), %reason, "skipped");
        self.emit(BatchEvent::Skipped {
            path: path.clone(),
            reason: reason.clone(),
        })
        .await;
        EntryOutcome {
            path,
            status: OutcomeStatus::Skipped(reason),
        }
    }

    async fn failed(&self, path: PathBuf, error: HashzipError) -> EntryOutcome {
        if error.is_vanished() {
            return self.skipped(path, SkipReason::Vanished).await;
        }
        tracing::warn!(path = %path.display(), %error, "entry failed");
        let message = error.to_string();
        self.emit(BatchEvent::Failed(OperationError::new(path.clone(), &message)))
            .await;
        EntryOutcome {
            path,
            status: OutcomeStatus::Failed(message),
        }
    }
}

fn walk_paths(paths: Vec<PathBuf>, ctx: Arc<WalkContext>) -> BoxFuture<'static, Vec<EntryOutcome>> {
    async move {
        let branches = paths.into_iter().map(|path| walk_entry(path, ctx.clone()));
        join_all(branches).await.into_iter().flatten().collect()
    }
    .boxed()
}

async fn walk_entry(path: PathBuf, ctx: Arc<WalkContext>) -> Vec<EntryOutcome> {
    let path = trim_trailing_separator(&path);

    let metadata = match tokio::fs::symlink_metadata(&path).await {
        Ok(metadata) => metadata,
        Err(e) => {
            let error = HashzipError::io(&path, e);
            return vec![ctx.failed(path, error).await];
        }
    };

    if !ctx.first_visit(&path) {
        return vec![ctx.skipped(path, SkipReason::AlreadyVisited).await];
    }

    let file_type = metadata.file_type();
    if file_type.is_dir() {
        ctx.emit(BatchEvent::DirectoryEntered(path.clone())).await;
        match list_children(&path).await {
            Ok(children) => walk_paths(children, ctx).await,
            Err(error) => vec![ctx.failed(path, error).await],
        }
    } else if file_type.is_file() {
        vec![process_file(path, &ctx).await]
    } else {
        vec![ctx.skipped(path, SkipReason::SpecialFile).await]
    }
}

/// Immediate children of a directory, sorted by name.
async fn list_children(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| HashzipError::io(dir, e))?;
    let mut children = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| HashzipError::io(dir, e))?
    {
        children.push(entry.path());
    }
    children.sort();
    Ok(children)
}

async fn process_file(path: PathBuf, ctx: &WalkContext) -> EntryOutcome {
    if let Some(filter) = &ctx.options.filter {
        let classifier = filter.classifier.clone();
        let target = path.clone();
        let info = match blocking(&path, move || Ok(classifier.classify(&target))).await {
            Ok(info) => info,
            Err(error) => return ctx.failed(path, error).await,
        };
        if !filter.enabled.admits(&info) {
            return ctx
                .skipped(path, SkipReason::UnsupportedMedia { kind: info.kind })
                .await;
        }
    }

    match apply(&path, &ctx.options).await {
        Ok((before, after, changed)) => {
            tracing::debug!(path = %path.display(), changed, "processed");
            ctx.emit(BatchEvent::FileProcessed {
                path: path.clone(),
                before: before.clone(),
                after: after.clone(),
                changed,
            })
            .await;
            EntryOutcome {
                path,
                status: OutcomeStatus::Processed {
                    before,
                    after,
                    changed,
                },
            }
        }
        Err(error) => ctx.failed(path, error).await,
    }
}

type Applied = (
    Option<hashzip_core::FileDigest>,
    Option<hashzip_core::FileDigest>,
    bool,
);

async fn apply(path: &Path, options: &BatchOptions) -> Result<Applied> {
    if !options.action.mutates() {
        return Ok((None, None, false));
    }

    let digester = options.digester.as_ref();
    let before = match digester {
        Some(d) => Some(d.digest(path).await?),
        None => None,
    };

    let marker = options.marker.clone();
    let mode = options.removal_mode;
    let target = path.to_path_buf();
    let change = match options.action {
        FileAction::Modify => blocking(path, move || append_marker(&target, &marker)).await?,
        FileAction::Restore => {
            blocking(path, move || remove_marker(&target, &marker, mode)).await?
        }
        FileAction::Visit => MarkerChange::Unchanged,
    };

    let after = match digester {
        Some(d) => Some(d.digest(path).await?),
        None => None,
    };

    Ok((before, after, change == MarkerChange::Changed))
}

/// Run blocking filesystem work off the async worker.
async fn blocking<T, F>(path: &Path, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| HashzipError::task_failed(path, e))?
}

/// "dir/" and "dir" name the same entry.
fn trim_trailing_separator(path: &Path) -> PathBuf {
    path.components().collect()
}
