//! User settings for hashzip commands.

use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::digest::{DigestMethod, Digester};
use crate::error::{HashzipError, Result};
use crate::media::{EnabledTypes, MediaKind};

/// Marker appended by modify-hash and stripped by restore-hash.
pub const DEFAULT_MARKER: &str = "#1024";

/// How restore-hash strips the marker from a file's last line.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum RemovalMode {
    /// Strip exactly one trailing occurrence.
    #[default]
    Trailing,
    /// When the last line ends with the marker, strip every occurrence in that line.
    LastLine,
}

/// Settings recognized by every command.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
#[serde(default)]
pub struct Settings {
    /// Include before/after checksums in the report.
    #[builder(default = "true")]
    pub show_digest_log: bool,

    #[builder(default = "true")]
    pub enable_video: bool,

    #[builder(default = "false")]
    pub enable_audio: bool,

    #[builder(default = "false")]
    pub enable_image: bool,

    /// Password for zip/unzip; empty means none.
    #[builder(default)]
    pub archive_password: String,

    #[builder(default = "DEFAULT_MARKER.to_string()")]
    pub marker: String,

    #[builder(default)]
    pub removal_mode: RemovalMode,

    #[builder(default)]
    pub digest: DigestMethod,

    /// Program used when `digest = "external"`.
    #[builder(default)]
    pub digest_program: Option<PathBuf>,

    #[builder(default = "PathBuf::from(\"zip\")")]
    pub zip_program: PathBuf,

    #[builder(default = "PathBuf::from(\"unzip\")")]
    pub unzip_program: PathBuf,
}

impl SettingsBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref marker) = self.marker {
            if marker.is_empty() {
                return Err("Marker cannot be empty".to_string());
            }
            if marker.contains('\n') {
                return Err("Marker cannot contain a newline".to_string());
            }
        }
        if self.digest == Some(DigestMethod::External)
            && !matches!(self.digest_program, Some(Some(_)))
        {
            return Err("External digest requires digest_program".to_string());
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            show_digest_log: true,
            enable_video: true,
            enable_audio: false,
            enable_image: false,
            archive_password: String::new(),
            marker: DEFAULT_MARKER.to_string(),
            removal_mode: RemovalMode::default(),
            digest: DigestMethod::default(),
            digest_program: None,
            zip_program: PathBuf::from("zip"),
            unzip_program: PathBuf::from("unzip"),
        }
    }
}

impl Settings {
    /// Create a new settings builder.
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    /// Default location: `<config dir>/hashzip/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("hashzip").join("config.toml"))
    }

    /// Load settings from a TOML file. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no settings file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(HashzipError::io(path, e)),
        };
        let settings = Self::from_toml(&text)?;
        tracing::debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let settings: Self = toml::from_str(text).map_err(|e| HashzipError::InvalidConfig {
            message: e.to_string(),
        })?;
        settings.check()?;
        Ok(settings)
    }

    /// Re-run builder validation on an already constructed value.
    pub fn check(&self) -> Result<()> {
        let builder = SettingsBuilder {
            marker: Some(self.marker.clone()),
            digest: Some(self.digest),
            digest_program: Some(self.digest_program.clone()),
            ..Default::default()
        };
        builder
            .validate()
            .map_err(|message| HashzipError::InvalidConfig { message })
    }

    /// Media kinds hash commands may modify.
    pub fn enabled_types(&self) -> EnabledTypes {
        let mut kinds = Vec::new();
        if self.enable_video {
            kinds.push(MediaKind::Video);
        }
        if self.enable_audio {
            kinds.push(MediaKind::Audio);
        }
        if self.enable_image {
            kinds.push(MediaKind::Image);
        }
        EnabledTypes::new(kinds)
    }

    /// Password for archive tools, `None` when unset.
    pub fn password(&self) -> Option<&str> {
        Some(self.archive_password.as_str()).filter(|p| !p.is_empty())
    }

    pub fn digester(&self) -> Digester {
        match (&self.digest, &self.digest_program) {
            (DigestMethod::External, Some(program)) => Digester::external(program.clone()),
            (method, _) => Digester::new(*method),
        }
    }
}
