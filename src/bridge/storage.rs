//! Storage service: shared preferences and app files
//!
//! Preferences are a JSON object persisted in `preferences.json`. Files live in
//! `internal/` or `external/` under the storage root.

use super::{
    ensure_permission, DeviceBridge, PERMISSION_MANAGE_EXTERNAL_STORAGE,
    PERMISSION_READ_EXTERNAL_STORAGE, PERMISSION_WRITE_EXTERNAL_STORAGE,
};
use crate::error::{LalaError, LalaResult};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

const PREFERENCES_FILE: &str = "preferences.json";

pub struct StorageService {
    root: PathBuf,
    external_permitted: bool,
    preferences: Mutex<Map<String, Value>>,
}

impl StorageService {
    pub fn new(bridge: Arc<dyn DeviceBridge>, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let external_permitted = check_storage_permissions(bridge.as_ref());
        if !external_permitted {
            warn!("⚠️ External storage permission not granted");
        }

        let preferences = load_preferences(&root.join(PREFERENCES_FILE));

        Self {
            root,
            external_permitted,
            preferences: Mutex::new(preferences),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn save_preference(&self, key: &str, value: Value) -> LalaResult<()> {
        info!("💾 Saving preference: {}", key);
        let mut prefs = self.preferences.lock()?;
        let mut updated = prefs.clone();
        updated.insert(key.to_string(), value);

        // Memory only changes once the file is written
        std::fs::create_dir_all(&self.root)?;
        let content = serde_json::to_string_pretty(&updated)?;
        std::fs::write(self.root.join(PREFERENCES_FILE), content)?;
        *prefs = updated;
        Ok(())
    }

    /// Stored value for `key`, or `default` when missing
    pub fn get_preference(&self, key: &str, default: Value) -> LalaResult<Value> {
        debug!("Reading preference: {}", key);
        let prefs = self.preferences.lock()?;
        Ok(prefs.get(key).cloned().unwrap_or(default))
    }

    pub fn save_file(&self, name: &str, data: &[u8], external: bool) -> LalaResult<()> {
        let path = self.file_path(name, external)?;
        info!(
            "💾 Saving file '{}' to {} storage",
            name,
            location(external)
        );
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, data)?;
        Ok(())
    }

    /// Contents of the file, `None` when it does not exist
    pub fn read_file(&self, name: &str, external: bool) -> LalaResult<Option<Vec<u8>>> {
        let path = self.file_path(name, external)?;
        info!(
            "📂 Reading file '{}' from {} storage",
            name,
            location(external)
        );
        match std::fs::read(path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn file_path(&self, name: &str, external: bool) -> LalaResult<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(LalaError::Storage(format!("Invalid file name: '{}'", name)));
        }
        if external && !self.external_permitted {
            return Err(LalaError::Permission(
                "external storage access not granted".to_string(),
            ));
        }
        Ok(self.root.join(location(external)).join(name))
    }
}

fn location(external: bool) -> &'static str {
    if external {
        "external"
    } else {
        "internal"
    }
}

/// Storage permissions differ by platform generation
fn check_storage_permissions(bridge: &dyn DeviceBridge) -> bool {
    match bridge.device_info().sdk_level {
        30.. => ensure_permission(bridge, PERMISSION_MANAGE_EXTERNAL_STORAGE),
        29 => ensure_permission(bridge, PERMISSION_READ_EXTERNAL_STORAGE),
        _ => [
            PERMISSION_READ_EXTERNAL_STORAGE,
            PERMISSION_WRITE_EXTERNAL_STORAGE,
        ]
        .iter()
        .fold(true, |granted, p| ensure_permission(bridge, p) && granted),
    }
}

fn load_preferences(path: &Path) -> Map<String, Value> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Map::new();
    };

    match serde_json::from_str(&content) {
        Ok(prefs) => prefs,
        Err(e) => {
            warn!("⚠️ Preferences file invalid, starting empty: {}", e);
            Map::new()
        }
    }
}
