use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use hashzip_core::{
    ContentOracle, DigestMethod, Digester, EnabledTypes, HashzipError, MediaClassifier, MediaKind,
    RemovalMode, Sniffed,
};
use hashzip_ops::{
    ArchiveError, ArchiveTool, BatchEvent, BatchOptions, CompressJob, ExtractJob, FileAction,
    MediaFilter, OutcomeStatus, SkipReason, compress, decompress, start_batch, walk,
};
use tempfile::TempDir;

/// Maps extensions to MIME types without reading bytes.
struct ExtensionOracle;

impl ContentOracle for ExtensionOracle {
    fn sniff(&self, path: &Path) -> Option<Sniffed> {
        let ext = path.extension()?.to_str()?.to_string();
        let mime = match ext.as_str() {
            "mp4" => "video/mp4",
            "mp3" => "audio/mpeg",
            "png" => "image/png",
            _ => return None,
        };
        Some(Sniffed {
            extension: Some(ext),
            mime: mime.to_string(),
        })
    }
}

fn video_filter() -> MediaFilter {
    MediaFilter::new(
        MediaClassifier::new(Arc::new(ExtensionOracle)),
        EnabledTypes::new([MediaKind::Video]),
    )
}

/// root/
///   a.mp4
///   b.mp3
///   empty/
///   nested/
///     c.mp4
///     deeper/
///       d.mp4
///       e.txt
fn build_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("empty")).unwrap();
    fs::create_dir_all(root.join("nested/deeper")).unwrap();
    fs::write(root.join("a.mp4"), b"video a").unwrap();
    fs::write(root.join("b.mp3"), b"audio b").unwrap();
    fs::write(root.join("nested/c.mp4"), b"video c\n").unwrap();
    fs::write(root.join("nested/deeper/d.mp4"), b"").unwrap();
    fs::write(root.join("nested/deeper/e.txt"), b"text e").unwrap();
    dir
}

fn snapshot(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let content = fs::read(&path).unwrap();
                files.push((path, content));
            }
        }
    }
    files.sort();
    files
}

#[tokio::test]
async fn test_walk_visits_every_file_once() {
    let dir = build_tree();
    let complete = walk(vec![dir.path().to_path_buf()], BatchOptions::visit(), None).await;

    assert_eq!(complete.processed(), 5);
    assert_eq!(complete.skipped(), 0);
    assert!(complete.is_success());

    let mut seen: Vec<_> = complete.outcomes.iter().map(|o| o.path.clone()).collect();
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 5);
}

#[tokio::test]
async fn test_walk_empty_directory_processes_nothing() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("hollow")).unwrap();
    let options = BatchOptions::new(FileAction::Modify, "#1024");
    let complete = walk(vec![dir.path().join("hollow")], options, None).await;
    assert!(complete.outcomes.is_empty());
}

#[tokio::test]
async fn test_filter_only_touches_enabled_kinds() {
    let dir = build_tree();
    let root = dir.path();
    let options = BatchOptions::new(FileAction::Modify, "#1024").with_filter(video_filter());

    let complete = walk(vec![root.to_path_buf()], options, None).await;

    assert_eq!(complete.processed(), 3);
    assert_eq!(complete.skipped(), 2);
    assert_eq!(fs::read(root.join("a.mp4")).unwrap(), b"video a#1024");
    assert_eq!(fs::read(root.join("nested/deeper/d.mp4")).unwrap(), b"#1024");
    assert_eq!(fs::read(root.join("b.mp3")).unwrap(), b"audio b");
    assert_eq!(fs::read(root.join("nested/deeper/e.txt")).unwrap(), b"text e");

    let audio = complete
        .outcomes
        .iter()
        .find(|o| o.path.ends_with("b.mp3"))
        .unwrap();
    assert_eq!(
        audio.status,
        OutcomeStatus::Skipped(SkipReason::UnsupportedMedia {
            kind: Some(MediaKind::Audio)
        })
    );
}

#[tokio::test]
async fn test_modify_then_restore_restores_tree() {
    let dir = build_tree();
    let root = dir.path().to_path_buf();
    let original = snapshot(&root);

    let modify = BatchOptions::new(FileAction::Modify, "#1024").with_filter(video_filter());
    walk(vec![root.clone()], modify, None).await;
    assert_ne!(snapshot(&root), original);

    let restore = BatchOptions::new(FileAction::Restore, "#1024")
        .with_filter(video_filter())
        .with_removal_mode(RemovalMode::Trailing);
    walk(vec![root.clone()], restore.clone(), None).await;
    assert_eq!(snapshot(&root), original);

    // Restoring again changes nothing.
    let again = walk(vec![root.clone()], restore, None).await;
    assert_eq!(snapshot(&root), original);
    assert!(again.outcomes.iter().all(|o| !matches!(
        o.status,
        OutcomeStatus::Processed { changed: true, .. }
    )));
}

#[tokio::test]
async fn test_missing_entry_does_not_abort_siblings() {
    let dir = build_tree();
    let root = dir.path();
    let selection = vec![root.join("gone.mp4"), root.join("a.mp4/"), root.join("nested")];
    let options = BatchOptions::new(FileAction::Modify, "#1024");

    let complete = walk(selection, options, None).await;

    assert_eq!(complete.processed(), 4);
    let gone = complete
        .outcomes
        .iter()
        .find(|o| o.path.ends_with("gone.mp4"))
        .unwrap();
    assert_eq!(gone.status, OutcomeStatus::Skipped(SkipReason::Vanished));
    assert_eq!(fs::read(root.join("a.mp4")).unwrap(), b"video a#1024");
}

#[tokio::test]
async fn test_failed_entry_is_isolated_from_siblings() {
    let dir = build_tree();
    let root = dir.path();
    let selection = vec![root.join("a.mp4/inner"), root.join("nested/c.mp4")];
    let options = BatchOptions::new(FileAction::Modify, "#1024");

    let complete = walk(selection, options, None).await;

    assert_eq!(complete.failed(), 1);
    assert_eq!(complete.processed(), 1);
    assert!(!complete.is_success());
    let errors: Vec<_> = complete.errors().collect();
    assert!(errors[0].path.ends_with("a.mp4/inner"));
    assert_eq!(fs::read(root.join("nested/c.mp4")).unwrap(), b"video c\n#1024");
}

#[cfg(unix)]
#[tokio::test]
async fn test_failing_digest_program_fails_each_file() {
    let dir = build_tree();
    let root = dir.path();
    let options = BatchOptions::new(FileAction::Modify, "#1024")
        .with_filter(video_filter())
        .with_digester(Digester::external("/bin/false"));

    let complete = walk(vec![root.to_path_buf()], options, None).await;

    assert_eq!(complete.failed(), 3);
    assert_eq!(complete.processed(), 0);
    assert_eq!(complete.skipped(), 2);
    assert_eq!(fs::read(root.join("a.mp4")).unwrap(), b"video a");
}

#[tokio::test]
async fn test_overlapping_selection_visits_file_once() {
    let dir = build_tree();
    let root = dir.path();
    let selection = vec![root.join("nested"), root.join("nested/c.mp4")];
    let options = BatchOptions::new(FileAction::Modify, "#1024");

    let complete = walk(selection, options, None).await;

    assert_eq!(fs::read(root.join("nested/c.mp4")).unwrap(), b"video c\n#1024");
    assert_eq!(complete.processed(), 3);
    assert_eq!(complete.skipped(), 1);
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlinks_are_not_followed() {
    let dir = build_tree();
    let root = dir.path();
    std::os::unix::fs::symlink(root, root.join("nested/loop")).unwrap();

    let complete = walk(vec![root.to_path_buf()], BatchOptions::visit(), None).await;

    assert_eq!(complete.processed(), 5);
    let link = complete
        .outcomes
        .iter()
        .find(|o| o.path.ends_with("loop"))
        .unwrap();
    assert_eq!(link.status, OutcomeStatus::Skipped(SkipReason::SpecialFile));
}

#[tokio::test]
async fn test_start_batch_streams_events() {
    let dir = build_tree();
    let options = BatchOptions::new(FileAction::Modify, "#1024")
        .with_filter(video_filter())
        .with_digester(Digester::new(DigestMethod::Md5));

    let mut rx = start_batch(vec![dir.path().to_path_buf()], options);
    let mut dirs = 0;
    let mut files = 0;
    let mut complete = None;
    while let Some(event) = rx.recv().await {
        match event {
            BatchEvent::DirectoryEntered(_) => dirs += 1,
            BatchEvent::FileProcessed {
                before,
                after,
                changed,
                ..
            } => {
                files += 1;
                assert!(changed);
                assert_ne!(before.unwrap(), after.unwrap());
            }
            BatchEvent::Complete(c) => complete = Some(c),
            BatchEvent::Skipped { .. } | BatchEvent::Failed(_) => {}
        }
    }

    assert_eq!(dirs, 4);
    assert_eq!(files, 3);
    assert_eq!(complete.unwrap().processed(), 3);
}

/// Stands in for zip/unzip; fails on archives whose name contains `fail_on`.
#[derive(Default)]
struct FakeTool {
    fail_on: Option<&'static str>,
    compressed: Mutex<Vec<CompressJob>>,
}

impl ArchiveTool for FakeTool {
    async fn compress(&self, job: &CompressJob) -> hashzip_core::Result<()> {
        self.compressed.lock().unwrap().push(job.clone());
        if let Some(bad) = self.fail_on {
            if job.archive.to_string_lossy().contains(bad) {
                return Err(HashzipError::ExternalProcess {
                    program: "zip".into(),
                    code: "exit code 12".into(),
                    stderr: "zip error: Nothing to do!".into(),
                });
            }
        }
        fs::write(&job.archive, b"PK").map_err(|e| HashzipError::io(&job.archive, e))
    }

    async fn extract(&self, job: &ExtractJob) -> hashzip_core::Result<()> {
        if let Some(bad) = self.fail_on {
            if job.archive.to_string_lossy().contains(bad) {
                tokio::task::yield_now().await;
                return Err(HashzipError::ExternalProcess {
                    program: "unzip".into(),
                    code: "exit code 9".into(),
                    stderr: "cannot find zipfile directory".into(),
                });
            }
        }
        let name = job.archive.file_stem().unwrap();
        let out = job.target.join(name).with_extension("txt");
        fs::write(&out, b"extracted").map_err(|e| HashzipError::io(&out, e))
    }
}

#[tokio::test]
async fn test_compress_many_uses_count_name_and_relative_inputs() {
    let dir = build_tree();
    let root = dir.path();
    let tool = FakeTool::default();
    let paths = vec![root.join("a.mp4"), root.join("b.mp3"), root.join("nested")];

    let archive = compress(&tool, &paths, Some("pw")).await.unwrap();

    assert_eq!(archive, root.join("a (3 files).zip"));
    let jobs = tool.compressed.lock().unwrap();
    assert_eq!(jobs[0].working_dir, root);
    assert_eq!(
        jobs[0].inputs,
        ["a.mp4", "b.mp3", "nested"].map(PathBuf::from)
    );
    assert_eq!(jobs[0].password.as_deref(), Some("pw"));
}

#[tokio::test]
async fn test_compress_never_overwrites_existing_archive() {
    let dir = build_tree();
    let root = dir.path();
    fs::write(root.join("a.mp4.zip"), b"old").unwrap();
    let tool = FakeTool::default();

    let archive = compress(&tool, &[root.join("a.mp4")], None).await.unwrap();

    assert_eq!(archive, root.join("a.mp4 2.zip"));
    assert_eq!(fs::read(root.join("a.mp4.zip")).unwrap(), b"old");
}

#[tokio::test]
async fn test_compress_failure_surfaces_diagnostic() {
    let dir = build_tree();
    let tool = FakeTool {
        fail_on: Some("nested"),
        ..Default::default()
    };

    let err = compress(&tool, &[dir.path().join("nested")], None)
        .await
        .unwrap_err();

    assert_eq!(err.diagnostic(), Some("zip error: Nothing to do!"));
    assert!(!dir.path().join("nested.zip").exists());
}

#[tokio::test]
async fn test_decompress_without_zip_touches_nothing() {
    let dir = build_tree();
    let before = snapshot(dir.path());
    let tool = FakeTool::default();

    let err = decompress(&tool, &[dir.path().join("a.mp4")], None)
        .await
        .unwrap_err();

    assert!(matches!(err, ArchiveError::NoArchiveSelected));
    assert_eq!(snapshot(dir.path()), before);
}

#[tokio::test]
async fn test_decompress_into_unique_directory() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::write(root.join("photos.zip"), b"PK").unwrap();
    fs::write(root.join("more.ZIP"), b"PK").unwrap();
    fs::create_dir(root.join("photos")).unwrap();
    let tool = FakeTool::default();

    let paths = vec![root.join("photos.zip"), root.join("notes.txt"), root.join("more.ZIP")];
    let extracted = decompress(&tool, &paths, None).await.unwrap();

    assert_eq!(extracted.target, root.join("photos 2"));
    assert_eq!(extracted.archives.len(), 2);
    assert!(root.join("photos 2/photos.txt").exists());
    assert!(root.join("photos 2/more.txt").exists());
}

#[tokio::test]
async fn test_decompress_failure_rolls_back_directory() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::write(root.join("good.zip"), b"PK").unwrap();
    fs::write(root.join("broken.zip"), b"not a zip").unwrap();
    let tool = FakeTool {
        fail_on: Some("broken"),
        ..Default::default()
    };

    let paths = vec![root.join("good.zip"), root.join("broken.zip")];
    let err = decompress(&tool, &paths, None).await.unwrap_err();

    match &err {
        ArchiveError::RolledBack { target, .. } => assert_eq!(target, &root.join("good")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.diagnostic(), Some("cannot find zipfile directory"));
    assert!(!root.join("good").exists());
}
