//! Debounced canvas saves.
//!
//! Drag gestures produce position updates at frame rate. [`DebouncedSaver`]
//! coalesces them: each call for a tenant replaces that tenant's pending
//! payload and restarts its timer, so a burst of calls turns into one write
//! carrying the last payload.
//!
//! ```text
//! schedule(A) ─┬─ schedule(A) ─┬─ schedule(A) ──── delay ────▶ save(A, last)
//!              └ abort timer    └ abort timer
//! schedule(B) ──── delay ────▶ save(B)        (independent timer)
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::error::StorageError;
use crate::schema::CanvasState;
use crate::storage::CanvasStorage;
use crate::tenant::TenantKey;

/// Callback invoked when a deferred save fails.
pub type ErrorHook = Arc<dyn Fn(&TenantKey, &StorageError) + Send + Sync>;

/// A scheduled write waiting for its timer.
struct PendingSave {
    /// Identifies which `schedule` call armed this timer.
    generation: u64,
    state: CanvasState,
    timer: JoinHandle<()>,
}

struct SaverInner {
    pending: Mutex<HashMap<TenantKey, PendingSave>>,
    next_generation: AtomicU64,
    on_error: RwLock<Option<ErrorHook>>,
}

/// Per-tenant debounced writer on top of [`CanvasStorage`].
///
/// Timers run on the Tokio runtime captured at construction. Cloning shares
/// the pending map.
#[derive(Clone)]
pub struct DebouncedSaver {
    storage: CanvasStorage,
    runtime: Handle,
    inner: Arc<SaverInner>,
}

impl std::fmt::Debug for DebouncedSaver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebouncedSaver")
            .field("storage", &self.storage)
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}

impl DebouncedSaver {
    /// Create a saver bound to the current Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NoRuntime`] when called outside a runtime.
    pub fn new(storage: CanvasStorage) -> Result<Self, StorageError> {
        let runtime = Handle::try_current().map_err(|_| StorageError::NoRuntime)?;
        Ok(Self::with_handle(storage, runtime))
    }

    /// Create a saver whose timers run on `runtime`.
    #[must_use]
    pub fn with_handle(storage: CanvasStorage, runtime: Handle) -> Self {
        Self {
            storage,
            runtime,
            inner: Arc::new(SaverInner {
                pending: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
                on_error: RwLock::new(None),
            }),
        }
    }

    /// The storage deferred writes go to.
    #[must_use]
    pub fn storage(&self) -> &CanvasStorage {
        &self.storage
    }

    /// Set the callback for deferred saves that fail.
    ///
    /// Failures are always logged; the hook lets the UI surface them.
    pub fn set_on_error<F>(&self, hook: F)
    where
        F: Fn(&TenantKey, &StorageError) + Send + Sync + 'static,
    {
        let mut slot = self
            .inner
            .on_error
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::new(hook));
    }

    /// Save `state` for `tenant` once `delay` has passed without another call
    /// for the same tenant.
    ///
    /// A pending save for the tenant is replaced, and its timer restarted.
    /// Other tenants' timers are not touched.
    pub fn schedule(&self, tenant: &TenantKey, state: CanvasState, delay: Duration) {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::SeqCst);
        let mut pending = self.lock_pending();

        if let Some(previous) = pending.remove(tenant) {
            previous.timer.abort();
        }

        let saver = self.clone();
        let key = tenant.clone();
        let timer = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            saver.fire(&key, generation);
        });

        pending.insert(
            tenant.clone(),
            PendingSave {
                generation,
                state,
                timer,
            },
        );
        tracing::trace!(tenant = %tenant, ?delay, "Scheduled canvas save");
    }

    /// Cancel every pending save without writing.
    ///
    /// Returns the number of saves dropped.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<_> = self.lock_pending().drain().collect();
        for (_, save) in &drained {
            save.timer.abort();
        }
        if !drained.is_empty() {
            tracing::debug!(count = drained.len(), "Cancelled pending canvas saves");
        }
        drained.len()
    }

    /// Cancel the pending save for one tenant without writing.
    ///
    /// Returns whether a save was pending.
    pub fn cancel(&self, tenant: &TenantKey) -> bool {
        let removed = self.lock_pending().remove(tenant);
        match removed {
            Some(save) => {
                save.timer.abort();
                tracing::debug!(tenant = %tenant, "Cancelled pending canvas save");
                true
            }
            None => false,
        }
    }

    /// Save `state` now, then drop the tenant's pending payload, which
    /// `state` supersedes.
    ///
    /// The pending write is only dropped once `state` is stored; after a
    /// failed save it stays armed.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the write fails.
    pub fn save_superseding(
        &self,
        tenant: &TenantKey,
        state: &CanvasState,
    ) -> Result<(), StorageError> {
        self.storage.save(tenant, state)?;
        self.cancel(tenant);
        Ok(())
    }

    /// Write the tenant's pending payload now.
    ///
    /// Returns `Ok(false)` if nothing was pending.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the write fails.
    pub fn flush(&self, tenant: &TenantKey) -> Result<bool, StorageError> {
        let removed = self.lock_pending().remove(tenant);
        let Some(save) = removed else {
            return Ok(false);
        };
        save.timer.abort();
        self.storage.save(tenant, &save.state)?;
        Ok(true)
    }

    /// Write every pending payload now.
    ///
    /// Failures are reported through the error hook. Returns the number of
    /// successful writes.
    pub fn flush_all(&self) -> usize {
        let drained: Vec<_> = self.lock_pending().drain().collect();
        let mut written = 0;
        for (tenant, save) in drained {
            save.timer.abort();
            if self.save_now(&tenant, &save.state) {
                written += 1;
            }
        }
        written
    }

    /// Whether a save is pending for `tenant`.
    #[must_use]
    pub fn has_pending(&self, tenant: &TenantKey) -> bool {
        self.lock_pending().contains_key(tenant)
    }

    /// Number of tenants with a pending save.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.lock_pending().len()
    }

    /// Timer expiry. Writes only if this timer is still the tenant's latest.
    fn fire(&self, tenant: &TenantKey, generation: u64) {
        let state = {
            let mut pending = self.lock_pending();
            let is_latest = pending
                .get(tenant)
                .is_some_and(|save| save.generation == generation);
            if is_latest {
                pending.remove(tenant).map(|save| save.state)
            } else {
                None
            }
        };
        if let Some(state) = state {
            self.save_now(tenant, &state);
        }
    }

    /// Save immediately, routing a failure to the error hook.
    pub(crate) fn save_now(&self, tenant: &TenantKey, state: &CanvasState) -> bool {
        match self.storage.save(tenant, state) {
            Ok(()) => true,
            Err(e) => {
                let hook = self
                    .inner
                    .on_error
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();
                if let Some(hook) = hook {
                    hook(tenant, &e);
                }
                false
            }
        }
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, HashMap<TenantKey, PendingSave>> {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
