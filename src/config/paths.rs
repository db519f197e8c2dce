//! Default locations for the settings file and the medication store.
//!
//! Settings live under the platform config dir and records under the local
//! data dir, each in a `medication-assistant` subdirectory (for example
//! `~/.config/medication-assistant/settings.toml` and
//! `~/.local/share/medication-assistant/medications.jsonl` on Linux).

use std::path::{Path, PathBuf};

const APP_NAME: &str = "medication-assistant";

const SETTINGS_FILE: &str = "settings.toml";

const RECORDS_FILE: &str = "medications.jsonl";

/// Default `settings.toml` path.
pub fn settings_file() -> PathBuf {
    app_dir(dirs::config_dir()).join(SETTINGS_FILE)
}

/// Default JSON-lines record store path.
pub fn records_file() -> PathBuf {
    app_dir(dirs::data_local_dir()).join(RECORDS_FILE)
}

/// The application subdirectory of `base`, or of the working directory when
/// the platform has no such location.
fn app_dir(base: Option<PathBuf>) -> PathBuf {
    base.as_deref()
        .unwrap_or_else(|| Path::new("."))
        .join(APP_NAME)
}
