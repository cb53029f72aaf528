//! Tenant-scoped canvas storage.
//!
//! [`CanvasStorage`] is the synchronous half of the storage engine: save,
//! load and clear one tenant's [`CanvasState`] record. Deferred writes live
//! in [`crate::debounce`].

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::backend::{FileBackend, MemoryBackend, StorageBackend};
use crate::config::CanvasConfig;
use crate::error::StorageError;
use crate::schema::{CanvasState, SCHEMA_VERSION};
use crate::tenant::TenantKey;

/// Synchronous canvas storage over a shared backend.
///
/// Cloning is cheap; clones share the same backend.
///
/// # Example
///
/// ```
/// use canvas_workspace::{CanvasState, CanvasStorage, TenantKey, WidgetKind, WidgetState};
///
/// let storage = CanvasStorage::in_memory();
/// let tenant = TenantKey::new("suite-1", "office-1");
///
/// let widget = WidgetState::new(WidgetKind::Email, 40.0, 60.0, 320.0, 240.0);
/// storage
///     .save(&tenant, &CanvasState::new(vec![widget], Vec::new()))
///     .unwrap();
///
/// let loaded = storage.load(&tenant).unwrap();
/// assert_eq!(loaded.widgets.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct CanvasStorage {
    backend: Arc<dyn StorageBackend>,
}

impl CanvasStorage {
    /// Create storage over the given backend.
    #[must_use]
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// Create storage over a backend the caller keeps a handle to.
    #[must_use]
    pub fn from_shared(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Create storage over a fresh, unbounded [`MemoryBackend`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    /// Create storage for `config`: a [`FileBackend`] under
    /// [`CanvasConfig::data_dir`] when one is set, otherwise in memory.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the data directory cannot be created.
    pub fn from_config(config: &CanvasConfig) -> Result<Self, StorageError> {
        match &config.data_dir {
            Some(dir) => Ok(Self::new(FileBackend::new(dir)?)),
            None => Ok(Self::in_memory()),
        }
    }

    /// Write `state` to the tenant's slot, replacing any previous record.
    ///
    /// The stored copy is stamped with [`SCHEMA_VERSION`] and the current
    /// time. Exactly one backend write is issued.
    ///
    /// # Errors
    ///
    /// Returns an error if the state is invalid, cannot be serialized, or the
    /// backend rejects the write. The previously stored record is left intact
    /// in every case.
    pub fn save(&self, tenant: &TenantKey, state: &CanvasState) -> Result<(), StorageError> {
        let result = self.write_record(tenant, state);
        match &result {
            Ok(()) => tracing::debug!(
                tenant = %tenant,
                widgets = state.widgets.len(),
                "Saved canvas state"
            ),
            Err(e) => tracing::warn!(tenant = %tenant, error = %e, "Failed to save canvas state"),
        }
        result
    }

    fn write_record(&self, tenant: &TenantKey, state: &CanvasState) -> Result<(), StorageError> {
        state.validate()?;
        let mut record = state.clone();
        record.version = SCHEMA_VERSION;
        record.last_modified = current_timestamp_ms();
        let json = serde_json::to_string(&record)?;
        self.backend.write(&tenant.storage_key(), &json)
    }

    /// Load the tenant's canvas.
    ///
    /// Returns `None` when nothing is stored, when the record was written
    /// under a different schema version, or when it cannot be decoded.
    #[must_use]
    pub fn load(&self, tenant: &TenantKey) -> Option<CanvasState> {
        let raw = match self.backend.read(&tenant.storage_key()) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(tenant = %tenant, error = %e, "Failed to read canvas state");
                return None;
            }
        };

        let value: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(tenant = %tenant, error = %e, "Discarding undecodable canvas state");
                return None;
            }
        };

        let version = value.get("version").and_then(serde_json::Value::as_u64);
        if version != Some(u64::from(SCHEMA_VERSION)) {
            tracing::debug!(
                tenant = %tenant,
                stored = ?version,
                current = SCHEMA_VERSION,
                "Ignoring canvas state from another schema version"
            );
            return None;
        }

        let state: CanvasState = match serde_json::from_value(value) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(tenant = %tenant, error = %e, "Discarding malformed canvas state");
                return None;
            }
        };

        if let Err(e) = state.validate() {
            tracing::warn!(tenant = %tenant, error = %e, "Discarding invalid canvas state");
            return None;
        }
        Some(state)
    }

    /// Remove the tenant's record entirely.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot remove the record.
    pub fn clear(&self, tenant: &TenantKey) -> Result<(), StorageError> {
        self.backend.remove(&tenant.storage_key())?;
        tracing::info!(tenant = %tenant, "Cleared canvas state");
        Ok(())
    }

    /// Whether the tenant has a record that would load.
    #[must_use]
    pub fn exists(&self, tenant: &TenantKey) -> bool {
        self.load(tenant).is_some()
    }
}

/// Get the current Unix timestamp in milliseconds.
fn current_timestamp_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| {
        // Timestamp will not exceed u64 max for millennia
        #[allow(clippy::cast_possible_truncation)]
        {
            d.as_millis() as u64
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AvatarState, WidgetId, WidgetKind, WidgetState};

    fn widget(id: &str, x: f64, y: f64) -> WidgetState {
        WidgetState {
            id: WidgetId::from(id),
            kind: WidgetKind::Calendar,
            x,
            y,
            width: 280.0,
            height: 180.0,
            z_index: 1,
        }
    }

    fn shared_memory() -> (Arc<MemoryBackend>, CanvasStorage) {
        let backend = Arc::new(MemoryBackend::new());
        let storage = CanvasStorage::from_shared(backend.clone());
        (backend, storage)
    }

    #[test]
    fn test_load_missing_returns_none() {
        let storage = CanvasStorage::in_memory();
        assert!(storage.load(&TenantKey::new("s", "o")).is_none());
    }

    #[test]
    fn test_save_and_load_preserves_fields() {
        let storage = CanvasStorage::in_memory();
        let tenant = TenantKey::new("s", "o");
        let avatar = AvatarState(serde_json::json!({ "id": "a1", "x": 5.5 }));
        let state = CanvasState::new(
            vec![widget("w1", 12.25, -40.0), widget("w2", 0.1, 0.2)],
            vec![avatar],
        );

        storage.save(&tenant, &state).expect("save");
        let loaded = storage.load(&tenant).expect("load");

        assert_eq!(loaded.version, SCHEMA_VERSION);
        assert!(loaded.last_modified > 0);
        assert_eq!(loaded.widgets, state.widgets);
        assert_eq!(loaded.avatars, state.avatars);
    }

    #[test]
    fn test_empty_state_round_trips() {
        let storage = CanvasStorage::in_memory();
        let tenant = TenantKey::new("s", "o");
        storage.save(&tenant, &CanvasState::empty()).expect("save");

        let loaded = storage.load(&tenant).expect("empty state is still a state");
        assert!(loaded.widgets.is_empty());
        assert!(loaded.avatars.is_empty());
    }

    #[test]
    fn test_save_stamps_current_version() {
        let (backend, storage) = shared_memory();
        let tenant = TenantKey::new("s", "o");
        let mut state = CanvasState::empty();
        state.version = 0;

        storage.save(&tenant, &state).expect("save");
        let raw = backend
            .read(&tenant.storage_key())
            .expect("read")
            .expect("stored");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(value["version"], SCHEMA_VERSION);
    }

    #[test]
    fn test_version_mismatch_loads_as_none() {
        let (backend, storage) = shared_memory();
        let tenant = TenantKey::new("s", "o");
        let stale = format!(
            r#"{{"version":{},"widgets":[],"avatars":[],"lastModified":1}}"#,
            SCHEMA_VERSION + 1
        );
        backend.write(&tenant.storage_key(), &stale).expect("write");
        assert!(storage.load(&tenant).is_none());
    }

    #[test]
    fn test_missing_version_loads_as_none() {
        let (backend, storage) = shared_memory();
        let tenant = TenantKey::new("s", "o");
        backend
            .write(
                &tenant.storage_key(),
                r#"{"widgets":[],"avatars":[],"lastModified":1}"#,
            )
            .expect("write");
        assert!(storage.load(&tenant).is_none());
    }

    #[test]
    fn test_garbage_loads_as_none() {
        let (backend, storage) = shared_memory();
        let tenant = TenantKey::new("s", "o");
        backend.write(&tenant.storage_key(), "{not json").expect("write");
        assert!(storage.load(&tenant).is_none());

        // Right version, wrong shape: never partially hydrated.
        let partial = format!(r#"{{"version":{SCHEMA_VERSION},"widgets":[{{"id":"w1"}}]}}"#);
        backend.write(&tenant.storage_key(), &partial).expect("write");
        assert!(storage.load(&tenant).is_none());
    }

    #[test]
    fn test_duplicate_ids_load_as_none() {
        let (backend, storage) = shared_memory();
        let tenant = TenantKey::new("s", "o");
        let w = r#"{"id":"w1","type":"email","x":0,"y":0,"width":1,"height":1,"zIndex":0}"#;
        let raw = format!(
            r#"{{"version":{SCHEMA_VERSION},"widgets":[{w},{w}],"avatars":[],"lastModified":1}}"#
        );
        backend.write(&tenant.storage_key(), &raw).expect("write");

        assert!(storage.load(&tenant).is_none());
        assert!(!storage.exists(&tenant));

        // The tenant can still save over the bad record.
        storage.save(&tenant, &CanvasState::empty()).expect("save");
        assert!(storage.load(&tenant).expect("stored").widgets.is_empty());
    }

    #[test]
    fn test_from_config_picks_backend() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tenant = TenantKey::new("s", "o");

        let config = CanvasConfig::default().with_data_dir(dir.path().join("canvas"));
        let on_disk = CanvasStorage::from_config(&config).expect("file storage");
        on_disk.save(&tenant, &CanvasState::empty()).expect("save");
        let reopened = CanvasStorage::from_config(&config).expect("file storage");
        assert!(reopened.exists(&tenant));

        let in_memory = CanvasStorage::from_config(&CanvasConfig::default()).expect("memory");
        assert!(!in_memory.exists(&tenant));
    }

    #[test]
    fn test_one_write_per_save() {
        let (backend, storage) = shared_memory();
        let tenant = TenantKey::new("s", "o");
        storage.save(&tenant, &CanvasState::empty()).expect("save");
        storage.save(&tenant, &CanvasState::empty()).expect("save");
        assert_eq!(backend.write_count(), 2);
    }

    #[test]
    fn test_failed_save_keeps_previous_value() {
        let backend = Arc::new(MemoryBackend::with_quota(400));
        let storage = CanvasStorage::from_shared(backend.clone());
        let tenant = TenantKey::new("s", "o");

        let small = CanvasState::new(vec![widget("w1", 1.0, 2.0)], Vec::new());
        storage.save(&tenant, &small).expect("fits");

        let big = CanvasState::new(
            (0..20).map(|i| widget(&format!("w{i}"), 0.0, 0.0)).collect(),
            Vec::new(),
        );
        let result = storage.save(&tenant, &big);
        assert!(matches!(result, Err(StorageError::QuotaExceeded { .. })));

        let loaded = storage.load(&tenant).expect("previous value intact");
        assert_eq!(loaded.widgets, small.widgets);
    }

    #[test]
    fn test_invalid_state_is_rejected_without_write() {
        let (backend, storage) = shared_memory();
        let tenant = TenantKey::new("s", "o");
        let state = CanvasState::new(
            vec![widget("w1", 0.0, 0.0), widget("w1", 5.0, 5.0)],
            Vec::new(),
        );

        assert!(matches!(
            storage.save(&tenant, &state),
            Err(StorageError::DuplicateWidget(_))
        ));
        assert_eq!(backend.write_count(), 0);
    }

    #[test]
    fn test_clear_is_scoped() {
        let storage = CanvasStorage::in_memory();
        let a = TenantKey::new("suite", "office-a");
        let b = TenantKey::new("suite", "office-b");
        storage
            .save(&a, &CanvasState::new(vec![widget("w1", 1.0, 1.0)], Vec::new()))
            .expect("save a");
        storage
            .save(&b, &CanvasState::new(vec![widget("w2", 2.0, 2.0)], Vec::new()))
            .expect("save b");

        storage.clear(&a).expect("clear");

        assert!(storage.load(&a).is_none());
        assert!(!storage.exists(&a));
        let other = storage.load(&b).expect("b untouched");
        assert_eq!(other.widgets[0].id, WidgetId::from("w2"));
    }

    #[test]
    fn test_clear_missing_is_ok() {
        let storage = CanvasStorage::in_memory();
        storage.clear(&TenantKey::new("s", "o")).expect("clear");
    }
}
