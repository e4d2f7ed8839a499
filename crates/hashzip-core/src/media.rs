//! Media classification by content sniffing with an extension fallback.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Coarse media category used to decide which files hash commands touch.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
    Image,
}

impl MediaKind {
    /// Map a MIME type's top-level category.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let top = mime.split('/').next()?;
        match top {
            "video" => Some(Self::Video),
            "audio" => Some(Self::Audio),
            "image" => Some(Self::Image),
            _ => None,
        }
    }

    /// Map a file extension (case-insensitive, without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Video)
        } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Audio)
        } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Image)
        } else {
            None
        }
    }
}

const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "m4v", "mkv", "mov", "avi", "wmv", "flv", "webm", "mpg", "mpeg", "3gp", "ts", "rmvb",
];

const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "wav", "flac", "ogg", "m4a", "aac", "wma", "opus", "aiff",
];

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "tiff", "webp", "heic", "svg",
];

/// What a content oracle reports for a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sniffed {
    pub extension: Option<String>,
    pub mime: String,
}

/// Reports a MIME-like type for a file from its bytes.
pub trait ContentOracle: Send + Sync {
    fn sniff(&self, path: &Path) -> Option<Sniffed>;
}

/// Oracle backed by the shared-mime-info magic database.
#[derive(Debug, Default, Clone, Copy)]
pub struct TreeMagicOracle;

impl ContentOracle for TreeMagicOracle {
    fn sniff(&self, path: &Path) -> Option<Sniffed> {
        let mime = tree_magic_mini::from_filepath(path)?;
        Some(Sniffed {
            extension: extension_of(path),
            mime: mime.to_string(),
        })
    }
}

/// Classification result for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub extension: Option<String>,
    pub mime: Option<String>,
    pub kind: Option<MediaKind>,
}

/// Classifies files, asking the oracle first and the extension list second.
#[derive(Clone)]
pub struct MediaClassifier {
    oracle: Arc<dyn ContentOracle>,
}

impl std::fmt::Debug for MediaClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaClassifier").finish_non_exhaustive()
    }
}

impl Default for MediaClassifier {
    fn default() -> Self {
        Self::new(Arc::new(TreeMagicOracle))
    }
}

impl MediaClassifier {
    pub fn new(oracle: Arc<dyn ContentOracle>) -> Self {
        Self { oracle }
    }

    /// Classify a file. Never fails; unknown files get no kind.
    pub fn classify(&self, path: &Path) -> MediaInfo {
        let sniffed = self.oracle.sniff(path);

        if let Some(sniffed) = &sniffed {
            if let Some(kind) = MediaKind::from_mime(&sniffed.mime) {
                return MediaInfo {
                    extension: sniffed.extension.clone().or_else(|| extension_of(path)),
                    mime: Some(sniffed.mime.clone()),
                    kind: Some(kind),
                };
            }
        }

        // Text content is never media, whatever its suffix says (`.ts` sources).
        let extension = extension_of(path);
        let is_text = sniffed.as_ref().is_some_and(|s| s.mime.starts_with("text/"));
        let kind = if is_text {
            None
        } else {
            extension.as_deref().and_then(MediaKind::from_extension)
        };
        tracing::trace!(path = %path.display(), ?kind, "classified by extension");

        MediaInfo {
            extension,
            mime: sniffed.map(|s| s.mime),
            kind,
        }
    }
}

/// Set of media kinds hash commands may modify.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnabledTypes(BTreeSet<MediaKind>);

impl EnabledTypes {
    pub fn new(kinds: impl IntoIterator<Item = MediaKind>) -> Self {
        Self(kinds.into_iter().collect())
    }

    pub fn contains(&self, kind: MediaKind) -> bool {
        self.0.contains(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether a classified file may be touched.
    pub fn admits(&self, info: &MediaInfo) -> bool {
        info.kind.is_some_and(|k| self.contains(k))
    }

    pub fn iter(&self) -> impl Iterator<Item = MediaKind> + '_ {
        self.0.iter().copied()
    }
}

impl std::fmt::Display for EnabledTypes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.iter().map(|k| k.to_string()).collect();
        if names.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", names.join(", "))
        }
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}
