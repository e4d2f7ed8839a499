//! One entry point per user-facing command.
//!
//! Each command owns a [`ProgressLog`] for its whole run, turns every
//! failure into a report section plus a [`CommandStatus`], and never returns
//! an error to its caller.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;

use hashzip_core::{FileDigest, MediaClassifier, Settings};
use hashzip_ops::{
    ArchiveError, ArchiveTool, BatchComplete, BatchEvent, BatchOptions, FileAction, MediaFilter,
    OperationError, ZipCommand, compress, decompress, start_batch,
};

use crate::report::{Notice, ProgressLog, ReportSurface};
use crate::selection::Selection;

/// The user-facing commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandKind {
    ModifyHash,
    RestoreHash,
    ZipCompress,
    ZipDecompress,
}

impl CommandKind {
    pub fn title(&self) -> &'static str {
        match self {
            Self::ModifyHash => "Modify Hash",
            Self::RestoreHash => "Restore Hash",
            Self::ZipCompress => "Zip Compress",
            Self::ZipDecompress => "Zip Decompress",
        }
    }
}

/// How a command ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum CommandStatus {
    Completed,
    /// Finished, but some entries failed.
    CompletedWithErrors,
    SelectionEmpty,
    NoMediaTypeEnabled,
    NoArchiveSelected,
    Failed { diagnostic: String },
}

/// Machine-readable outcome of one command run.
#[derive(Debug, Clone, Serialize)]
pub struct CommandSummary {
    pub command: CommandKind,
    #[serde(flatten)]
    pub status: CommandStatus,
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub elapsed_ms: u64,
    /// Archive or extraction directory produced.
    pub output: Option<PathBuf>,
    pub errors: Vec<OperationError>,
    /// Final rendered report.
    #[serde(skip)]
    pub report: String,
}

impl CommandSummary {
    fn new(command: CommandKind) -> Self {
        Self {
            command,
            status: CommandStatus::Completed,
            processed: 0,
            skipped: 0,
            failed: 0,
            elapsed_ms: 0,
            output: None,
            errors: Vec::new(),
            report: String::new(),
        }
    }

    fn absorb(&mut self, batch: &BatchComplete) {
        self.processed = batch.processed();
        self.skipped = batch.skipped();
        self.failed = batch.failed();
        self.errors = batch.errors().collect();
        self.elapsed_ms = batch.elapsed_ms;
    }

    pub fn is_success(&self) -> bool {
        self.status == CommandStatus::Completed
    }
}

/// Runs commands with one set of settings.
pub struct Commands<T: ArchiveTool = ZipCommand> {
    settings: Settings,
    classifier: MediaClassifier,
    tool: T,
}

impl Commands<ZipCommand> {
    /// Commands using the configured zip/unzip programs.
    pub fn new(settings: Settings) -> Self {
        let tool = ZipCommand::new(
            settings.zip_program.clone(),
            settings.unzip_program.clone(),
        );
        Self::with_tool(settings, tool)
    }
}

impl<T: ArchiveTool> Commands<T> {
    pub fn with_tool(settings: Settings, tool: T) -> Self {
        Self {
            settings,
            classifier: MediaClassifier::default(),
            tool,
        }
    }

    pub fn with_classifier(mut self, classifier: MediaClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub async fn run<S: ReportSurface + ?Sized>(
        &self,
        kind: CommandKind,
        selection: &Selection,
        surface: &mut S,
    ) -> CommandSummary {
        tracing::info!(command = kind.title(), entries = selection.len(), "running command");
        let summary = match kind {
            CommandKind::ModifyHash | CommandKind::RestoreHash => {
                self.hash(kind, selection, surface).await
            }
            CommandKind::ZipCompress => self.zip_compress(selection, surface).await,
            CommandKind::ZipDecompress => self.zip_decompress(selection, surface).await,
        };
        tracing::info!(command = kind.title(), status = ?summary.status, "command finished");
        summary
    }

    pub async fn modify_hash<S: ReportSurface + ?Sized>(
        &self,
        selection: &Selection,
        surface: &mut S,
    ) -> CommandSummary {
        self.hash(CommandKind::ModifyHash, selection, surface).await
    }

    pub async fn restore_hash<S: ReportSurface + ?Sized>(
        &self,
        selection: &Selection,
        surface: &mut S,
    ) -> CommandSummary {
        self.hash(CommandKind::RestoreHash, selection, surface).await
    }

    async fn hash<S: ReportSurface + ?Sized>(
        &self,
        kind: CommandKind,
        selection: &Selection,
        surface: &mut S,
    ) -> CommandSummary {
        let mut log = ProgressLog::new(surface);
        let mut summary = CommandSummary::new(kind);
        log.push(title(kind));

        if selection.is_empty() {
            return refuse(log, summary, CommandStatus::SelectionEmpty, "No file selected");
        }
        let enabled = self.settings.enabled_types();
        if enabled.is_empty() {
            return refuse(
                log,
                summary,
                CommandStatus::NoMediaTypeEnabled,
                "No media type enabled",
            );
        }

        log.push(format!(
            "Enabled types: {enabled}\n\nMarker: `{}`\n\n",
            self.settings.marker
        ));

        let action = if kind == CommandKind::ModifyHash {
            FileAction::Modify
        } else {
            FileAction::Restore
        };
        let mut options = BatchOptions::new(action, self.settings.marker.clone())
            .with_filter(MediaFilter::new(self.classifier.clone(), enabled))
            .with_removal_mode(self.settings.removal_mode);
        if self.settings.show_digest_log {
            options = options.with_digester(self.settings.digester());
        }
        let label = self.settings.digest.to_string();

        let mut rx = start_batch(selection.paths().to_vec(), options);
        while let Some(event) = rx.recv().await {
            match event {
                BatchEvent::DirectoryEntered(dir) => {
                    log.push(format!("## Directory: {}\n\n", dir.display()));
                }
                BatchEvent::FileProcessed {
                    path,
                    before,
                    after,
                    changed,
                } => {
                    log.push(file_entry(action, &path, &label, before, after, changed));
                }
                BatchEvent::Skipped { path, reason } if reason.is_reportable() => {
                    log.push(format!("Skipped {}: {reason}\n\n", path.display()));
                }
                BatchEvent::Skipped { .. } => {}
                BatchEvent::Failed(error) => {
                    log.push(format!("**Error** {error}\n\n"));
                }
                BatchEvent::Complete(complete) => {
                    summary.absorb(&complete);
                    log.push(completion(kind, summary.elapsed_ms));
                    log.push(format!("{}\n\n", complete.summary()));
                }
            }
        }

        finish(&mut log, &mut summary);
        summary.report = log.into_document();
        summary
    }

    pub async fn zip_compress<S: ReportSurface + ?Sized>(
        &self,
        selection: &Selection,
        surface: &mut S,
    ) -> CommandSummary {
        let kind = CommandKind::ZipCompress;
        let mut log = ProgressLog::new(surface);
        let mut summary = CommandSummary::new(kind);
        log.push(title(kind));

        if selection.is_empty() {
            return refuse(log, summary, CommandStatus::SelectionEmpty, "No file selected");
        }

        let start = Instant::now();
        log.push(password_banner(self.settings.password()));

        let mut rx = start_batch(selection.paths().to_vec(), BatchOptions::visit());
        while let Some(event) = rx.recv().await {
            match event {
                BatchEvent::DirectoryEntered(dir) => {
                    log.push(format!("## Directory: {}\n\n", dir.display()));
                }
                BatchEvent::FileProcessed { path, .. } => {
                    log.push(format!("{}\n\n", file_name(&path)));
                }
                BatchEvent::Skipped { path, reason } if reason.is_reportable() => {
                    log.push(format!("Skipped {}: {reason}\n\n", path.display()));
                }
                BatchEvent::Skipped { .. } => {}
                BatchEvent::Failed(error) => {
                    log.push(format!("**Error** {error}\n\n"));
                }
                BatchEvent::Complete(complete) => summary.absorb(&complete),
            }
        }

        match compress(&self.tool, selection.paths(), self.settings.password()).await {
            Ok(archive) => {
                let size = std::fs::metadata(&archive)
                    .map(|m| humansize::format_size(m.len(), humansize::BINARY))
                    .unwrap_or_else(|_| "unknown size".to_string());
                log.push(format!("Archive: {} ({size})\n\n", archive.display()));
                summary.output = Some(archive);
                summary.elapsed_ms = elapsed_ms(start);
                log.push(completion(kind, summary.elapsed_ms));
                finish(&mut log, &mut summary);
            }
            Err(error) => {
                summary.elapsed_ms = elapsed_ms(start);
                fail(&mut log, &mut summary, &error);
            }
        }

        summary.report = log.into_document();
        summary
    }

    pub async fn zip_decompress<S: ReportSurface + ?Sized>(
        &self,
        selection: &Selection,
        surface: &mut S,
    ) -> CommandSummary {
        let kind = CommandKind::ZipDecompress;
        let mut log = ProgressLog::new(surface);
        let mut summary = CommandSummary::new(kind);
        log.push(title(kind));

        if selection.is_empty() {
            return refuse(log, summary, CommandStatus::SelectionEmpty, "No file selected");
        }

        let start = Instant::now();
        log.push(password_banner(self.settings.password()));
        match decompress(&self.tool, selection.paths(), self.settings.password()).await {
            Ok(extracted) => {
                for archive in &extracted.archives {
                    log.push(format!("{}\n\n", file_name(archive)));
                }
                log.push(format!("Extracted to: {}\n\n", extracted.target.display()));
                summary.processed = extracted.archives.len();
                summary.skipped = selection.len() - extracted.archives.len();
                summary.output = Some(extracted.target);
                summary.elapsed_ms = elapsed_ms(start);
                log.push(completion(kind, summary.elapsed_ms));
                log.notify(Notice::success(format!("{} completed", kind.title())));
            }
            Err(ArchiveError::NoArchiveSelected) => {
                return refuse(
                    log,
                    summary,
                    CommandStatus::NoArchiveSelected,
                    "No zip file selected",
                );
            }
            Err(error) => {
                summary.elapsed_ms = elapsed_ms(start);
                fail(&mut log, &mut summary, &error);
            }
        }

        summary.report = log.into_document();
        summary
    }
}

fn title(kind: CommandKind) -> String {
    format!("# {}\n\n---\n\n", kind.title())
}

fn completion(kind: CommandKind, elapsed_ms: u64) -> String {
    format!("## {} has been completed in {elapsed_ms} ms 🎉\n\n", kind.title())
}

fn password_banner(password: Option<&str>) -> String {
    match password {
        Some(p) => format!("Password: {}\n\n", "*".repeat(p.chars().count())),
        None => "Password: none\n\n".to_string(),
    }
}

fn file_entry(
    action: FileAction,
    path: &Path,
    label: &str,
    before: Option<FileDigest>,
    after: Option<FileDigest>,
    changed: bool,
) -> String {
    let name = file_name(path);
    match (before, after) {
        (Some(before), Some(after)) if changed => format!(
            "{name}, old {label}: {before}\n\n{name}, new {label}: {after}\n\n"
        ),
        (Some(before), _) => format!("{name}, no marker found, {label}: {before}\n\n"),
        (None, _) if !changed && action == FileAction::Restore => {
            format!("{name}, no marker found\n\n")
        }
        (None, _) => format!("{name}\n\n"),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Notify the outcome of a command that ran to the end.
fn finish<S: ReportSurface + ?Sized>(
    log: &mut ProgressLog<'_, S>,
    summary: &mut CommandSummary,
) {
    let title = summary.command.title();
    if summary.failed == 0 {
        log.notify(Notice::success(format!("{title} completed")));
    } else {
        summary.status = CommandStatus::CompletedWithErrors;
        log.notify(Notice::failure(
            format!("{title} finished with errors"),
            Some(format!("{} file(s) failed", summary.failed)),
        ));
    }
}

/// End a command before anything is touched.
fn refuse<S: ReportSurface + ?Sized>(
    mut log: ProgressLog<'_, S>,
    mut summary: CommandSummary,
    status: CommandStatus,
    message: &str,
) -> CommandSummary {
    tracing::warn!(command = summary.command.title(), "{message}");
    log.push(format!("{message}\n\n"));
    log.notify(Notice::failure(message, None));
    summary.status = status;
    summary.report = log.into_document();
    summary
}

fn fail<S: ReportSurface + ?Sized>(
    log: &mut ProgressLog<'_, S>,
    summary: &mut CommandSummary,
    error: &ArchiveError,
) {
    tracing::error!(command = summary.command.title(), %error, "command failed");
    let diagnostic = error
        .diagnostic()
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string());
    log.push(format!(
        "## {} failed\n\n{error}\n\n```\n{diagnostic}\n```\n\n",
        summary.command.title()
    ));
    log.notify(Notice::failure(
        format!("{} failed", summary.command.title()),
        Some(diagnostic.clone()),
    ));
    summary.status = CommandStatus::Failed { diagnostic };
}
