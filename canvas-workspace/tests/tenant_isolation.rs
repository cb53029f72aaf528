//! Tenant Isolation Integration Tests
//!
//! Saves, clears and debounced writes under one tenant key must never be
//! visible under another, for both storage backends.

use std::sync::Arc;
use std::time::Duration;

use canvas_workspace::{
    CanvasState, CanvasStorage, DebouncedSaver, FileBackend, MemoryBackend, TenantKey, WidgetId,
    WidgetKind, WidgetState,
};

fn widget(id: &str, x: f64) -> WidgetState {
    WidgetState {
        id: WidgetId::from(id),
        kind: WidgetKind::Invoice,
        x,
        y: 0.0,
        width: 240.0,
        height: 160.0,
        z_index: 0,
    }
}

fn state(ids: &[&str]) -> CanvasState {
    CanvasState::new(ids.iter().map(|id| widget(id, 1.0)).collect(), Vec::new())
}

fn tenants() -> Vec<TenantKey> {
    vec![
        TenantKey::new("suite-a", "office-1"),
        TenantKey::new("suite-a", "office-2"),
        TenantKey::new("suite-b", "office-1"),
        // Separator inside a component must not alias another pair.
        TenantKey::new("suite-a:office-1", ""),
        TenantKey::new("suite-a", ":office-1"),
    ]
}

/// Run the same save/clear sequence against any storage.
fn check_save_and_clear_isolation(storage: &CanvasStorage) {
    let keys = tenants();
    for (i, key) in keys.iter().enumerate() {
        storage
            .save(key, &state(&[format!("w{i}").as_str()]))
            .expect("save");
    }

    for (i, key) in keys.iter().enumerate() {
        let loaded = storage.load(key).expect("each tenant has its own record");
        assert_eq!(loaded.widgets.len(), 1);
        assert_eq!(loaded.widgets[0].id, WidgetId::from(format!("w{i}")));
    }

    storage.clear(&keys[0]).expect("clear");
    assert!(storage.load(&keys[0]).is_none());
    for key in &keys[1..] {
        assert!(storage.load(key).is_some(), "{key} lost by clearing another");
    }

    // Overwrite one tenant; the others keep their records.
    storage.save(&keys[1], &CanvasState::empty()).expect("save");
    assert!(storage.load(&keys[1]).expect("stored").widgets.is_empty());
    assert_eq!(storage.load(&keys[2]).expect("stored").widgets.len(), 1);
}

#[test]
fn test_memory_backend_isolation() {
    check_save_and_clear_isolation(&CanvasStorage::in_memory());
}

#[test]
fn test_file_backend_isolation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let storage = CanvasStorage::new(FileBackend::new(dir.path()).expect("backend"));
    check_save_and_clear_isolation(&storage);
}

#[test]
fn test_file_backend_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let tenant = TenantKey::new("suite", "office");
    let saved = state(&["w1", "w2"]);

    {
        let storage = CanvasStorage::new(FileBackend::new(dir.path()).expect("backend"));
        storage.save(&tenant, &saved).expect("save");
    }

    let storage = CanvasStorage::new(FileBackend::new(dir.path()).expect("backend"));
    let loaded = storage.load(&tenant).expect("persisted");
    assert_eq!(loaded.widgets, saved.widgets);
}

#[tokio::test(start_paused = true)]
async fn test_debounce_on_one_tenant_does_not_touch_another() {
    let backend = Arc::new(MemoryBackend::new());
    let storage = CanvasStorage::from_shared(backend.clone());
    let saver = DebouncedSaver::new(storage.clone()).expect("runtime");
    let a = TenantKey::new("suite", "a");
    let b = TenantKey::new("suite", "b");

    storage.save(&b, &state(&["b-original"])).expect("save");

    for i in 0..10 {
        saver.schedule(&a, state(&[format!("a{i}").as_str()]), Duration::from_millis(500));
        tokio::time::sleep(Duration::from_millis(40)).await;
    }
    saver.schedule(&b, state(&["b-new"]), Duration::from_millis(100));
    tokio::time::sleep(Duration::from_millis(150)).await;

    // B's short timer fired on its own; A is still waiting.
    assert_eq!(
        storage.load(&b).expect("b").widgets[0].id,
        WidgetId::from("b-new")
    );
    assert!(storage.load(&a).is_none());

    storage.clear(&b).expect("clear");
    tokio::time::sleep(Duration::from_millis(500)).await;

    let a_state = storage.load(&a).expect("a written");
    assert_eq!(a_state.widgets[0].id, WidgetId::from("a9"));
    assert!(storage.load(&b).is_none());
    // b-original, b-new, a9
    assert_eq!(backend.write_count(), 3);
}
