// Persisted user settings.
// A single JSON document read and written wholesale.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, ser::PrettyFormatter};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::Result;
use crate::paths;

/// Distinguishes temp files of saves running at the same time.
static SAVE_SEQ: AtomicU64 = AtomicU64::new(0);

/// User-facing playback and window settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Preferred stream quality tier.
    pub bit_rate: String,
    /// Whether the main window draws its own border.
    pub window_border: bool,
    /// Start playback on launch.
    pub auto_play: bool,
    /// Keys written by newer front-ends, kept so saves do not drop them.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bit_rate: "h".to_string(),
            window_border: true,
            auto_play: false,
            extra: Map::new(),
        }
    }
}

/// Reads and writes the settings document at a fixed path.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Platform config location, falling back to the working directory.
    pub fn default_path() -> PathBuf {
        paths::settings_path().unwrap_or_else(|| PathBuf::from("settings.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the current settings.
    ///
    /// On first use the defaults are written to disk and returned. A document
    /// that fails to parse is an error; it is never silently replaced.
    pub async fn load(&self) -> Result<Settings> {
        if !fs::try_exists(&self.path).await? {
            debug!(path = %self.path.display(), "settings file missing, writing defaults");
            return self.save(&Settings::default()).await;
        }

        let contents = fs::read_to_string(&self.path).await?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    /// Replace the stored document with `settings`.
    pub async fn save(&self, settings: &Settings) -> Result<Settings> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write atomically via temp file, so readers never see a partial document
        let temp_path = self.temp_path();
        let mut file = File::create(&temp_path).await?;
        file.write_all(&to_pretty_json(settings)?).await?;
        file.sync_all().await?;
        drop(file);
        if let Err(e) = fs::rename(&temp_path, &self.path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        info!(path = %self.path.display(), "settings saved");
        Ok(settings.clone())
    }

    /// Sibling temp path, unique per save within this process.
    fn temp_path(&self) -> PathBuf {
        let seq = SAVE_SEQ.fetch_add(1, Ordering::Relaxed);
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "settings".into());
        name.push(format!(".{}.{}.tmp", std::process::id(), seq));
        self.path.with_file_name(name)
    }
}

/// Serialize with four-space indentation.
fn to_pretty_json(settings: &Settings) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    settings.serialize(&mut serializer)?;
    Ok(buf)
}
