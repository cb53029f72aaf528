//! Widget lifecycle controller.
//!
//! [`WidgetCanvas`] owns the in-memory widget collection of one open canvas
//! and chains the engine's parts together:
//!
//! - position updates during a drag go through the [`DebouncedSaver`];
//! - discrete changes (spawn, restack) are saved immediately;
//! - deletions run the delete animation, and only its completion removes the
//!   widget and saves.
//!
//! Drag-to-trash and keyboard delete end in the same pipeline.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::animation::{animate_widget_delete, DeleteOptions, DeleteTargets};
use crate::config::CanvasConfig;
use crate::debounce::DebouncedSaver;
use crate::error::{CanvasError, CanvasResult, StorageError};
use crate::schema::{AvatarState, CanvasState, WidgetId, WidgetKind, WidgetState};
use crate::tenant::TenantKey;
use crate::trash::{ReleaseOutcome, TrashAffordance, TrashState, ZoneSignal};

/// Widgets and in-flight deletions, shared with delete completions.
#[derive(Debug, Default)]
struct CanvasModel {
    widgets: Vec<WidgetState>,
    avatars: Vec<AvatarState>,
    deleting: HashMap<WidgetId, DeleteTargets>,
}

impl CanvasModel {
    fn snapshot(&self) -> CanvasState {
        CanvasState::new(self.widgets.clone(), self.avatars.clone())
    }

    fn position(&self, id: &WidgetId) -> Option<usize> {
        self.widgets.iter().position(|w| &w.id == id)
    }

    /// A z-index above every widget.
    ///
    /// When the stack already reaches `i32::MAX` the z-orders are first
    /// compacted to `0..n`, keeping their relative order.
    fn next_z_index(&mut self) -> i32 {
        let Some(top) = self.widgets.iter().map(|w| w.z_index).max() else {
            return 0;
        };
        if let Some(next) = top.checked_add(1) {
            return next;
        }
        self.compact_z_indices();
        i32::try_from(self.widgets.len()).unwrap_or(i32::MAX)
    }

    fn compact_z_indices(&mut self) {
        let mut order: Vec<usize> = (0..self.widgets.len()).collect();
        order.sort_by_key(|&i| self.widgets[i].z_index);
        for (rank, index) in order.into_iter().enumerate() {
            self.widgets[index].z_index = i32::try_from(rank).unwrap_or(i32::MAX);
        }
        tracing::debug!(widgets = self.widgets.len(), "Compacted widget z-order");
    }

    /// Whether the widget at `index` is strictly above every other widget.
    fn is_on_top(&self, index: usize) -> bool {
        let z = self.widgets[index].z_index;
        self.widgets
            .iter()
            .enumerate()
            .all(|(i, w)| i == index || w.z_index < z)
    }
}

/// One tenant's open canvas.
#[derive(Debug)]
pub struct WidgetCanvas {
    tenant: TenantKey,
    saver: DebouncedSaver,
    config: CanvasConfig,
    model: Arc<Mutex<CanvasModel>>,
    trash: TrashAffordance,
    selected: Option<WidgetId>,
}

impl WidgetCanvas {
    /// Open the tenant's canvas, hydrating it from storage.
    ///
    /// Absent or incompatible stored state opens an empty canvas.
    #[must_use]
    pub fn open(tenant: TenantKey, saver: DebouncedSaver, config: CanvasConfig) -> Self {
        let model = match saver.storage().load(&tenant) {
            Some(state) => CanvasModel {
                widgets: state.widgets,
                avatars: state.avatars,
                deleting: HashMap::new(),
            },
            None => CanvasModel::default(),
        };
        tracing::info!(tenant = %tenant, widgets = model.widgets.len(), "Opened canvas");

        Self {
            tenant,
            saver,
            config,
            model: Arc::new(Mutex::new(model)),
            trash: TrashAffordance::new(),
            selected: None,
        }
    }

    /// The tenant this canvas belongs to.
    #[must_use]
    pub fn tenant(&self) -> &TenantKey {
        &self.tenant
    }

    /// Widgets currently on the canvas, including ones animating out.
    #[must_use]
    pub fn widgets(&self) -> Vec<WidgetState> {
        self.lock_model().widgets.clone()
    }

    /// Look up one widget.
    #[must_use]
    pub fn widget(&self, id: &WidgetId) -> Option<WidgetState> {
        let model = self.lock_model();
        model.position(id).map(|i| model.widgets[i].clone())
    }

    /// The in-memory canvas as it would be saved now.
    #[must_use]
    pub fn snapshot(&self) -> CanvasState {
        self.lock_model().snapshot()
    }

    /// Animation handles of a widget being deleted.
    #[must_use]
    pub fn delete_targets(&self, id: &WidgetId) -> Option<DeleteTargets> {
        self.lock_model().deleting.get(id).cloned()
    }

    /// Whether the widget is animating out.
    #[must_use]
    pub fn is_deleting(&self, id: &WidgetId) -> bool {
        self.lock_model().deleting.contains_key(id)
    }

    /// Current trash affordance state.
    #[must_use]
    pub fn trash_state(&self) -> TrashState {
        self.trash.state()
    }

    /// Update the reduced-motion preference.
    pub fn set_reduced_motion(&mut self, reduced_motion: bool) {
        self.config.reduced_motion = reduced_motion;
    }

    /// Place a new widget on top of the stack and save immediately.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::Storage`] if the save fails; the widget is
    /// not added in that case.
    pub fn spawn_widget(
        &mut self,
        kind: WidgetKind,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> CanvasResult<WidgetId> {
        let mut model = self.lock_model();
        let previous = model.widgets.clone();
        let z_index = model.next_z_index();
        let widget = WidgetState::new(kind, x, y, width, height).with_z_index(z_index);
        let id = widget.id.clone();
        model.widgets.push(widget);

        let snapshot = model.snapshot();
        if let Err(e) = self.saver.save_superseding(&self.tenant, &snapshot) {
            model.widgets = previous;
            return Err(e.into());
        }
        tracing::debug!(tenant = %self.tenant, widget = %id, "Spawned widget");
        Ok(id)
    }

    /// Move a widget. The write is debounced.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::WidgetNotFound`] for unknown ids,
    /// [`CanvasError::DeleteInProgress`] for widgets animating out, and
    /// [`StorageError::NonFiniteGeometry`] for NaN or infinite coordinates.
    pub fn move_widget(&mut self, id: &WidgetId, x: f64, y: f64) -> CanvasResult<()> {
        if !x.is_finite() || !y.is_finite() {
            return Err(StorageError::NonFiniteGeometry(id.clone()).into());
        }
        let snapshot = {
            let mut model = self.lock_model();
            let index = Self::movable(&model, id)?;
            let widget = &mut model.widgets[index];
            widget.x = x;
            widget.y = y;
            model.snapshot()
        };
        self.saver.schedule(&self.tenant, snapshot, self.config.debounce);
        Ok(())
    }

    /// Raise a widget above all others and save immediately.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::WidgetNotFound`] for unknown ids,
    /// [`CanvasError::DeleteInProgress`] for widgets animating out, or
    /// [`CanvasError::Storage`] if the save fails.
    pub fn bring_to_front(&mut self, id: &WidgetId) -> CanvasResult<()> {
        let mut model = self.lock_model();
        let index = Self::movable(&model, id)?;
        if model.is_on_top(index) {
            return Ok(());
        }
        let previous = model.widgets.clone();
        let top = model.next_z_index();
        model.widgets[index].z_index = top;

        let snapshot = model.snapshot();
        if let Err(e) = self.saver.save_superseding(&self.tenant, &snapshot) {
            model.widgets = previous;
            return Err(e.into());
        }
        Ok(())
    }

    /// Feed a drag position sample to the trash affordance.
    pub fn drag_over_trash(&mut self, signal: ZoneSignal) -> TrashState {
        self.trash.on_zone(signal)
    }

    /// The drag of `id` was released.
    ///
    /// Released over the drop zone, the widget enters the delete pipeline.
    /// Anywhere else nothing is deleted and the position update already
    /// scheduled by [`move_widget`](Self::move_widget) stands.
    ///
    /// # Errors
    ///
    /// Returns the error of [`delete_widget`](Self::delete_widget) when the
    /// release triggers a delete.
    pub fn release_drag(&mut self, id: &WidgetId) -> CanvasResult<ReleaseOutcome> {
        let outcome = self.trash.release();
        if outcome == ReleaseOutcome::Delete {
            self.delete_widget(id)?;
        }
        Ok(outcome)
    }

    /// Select a widget for keyboard actions.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::WidgetNotFound`] for unknown ids.
    pub fn select(&mut self, id: &WidgetId) -> CanvasResult<()> {
        if self.lock_model().position(id).is_none() {
            return Err(CanvasError::WidgetNotFound(id.clone()));
        }
        self.selected = Some(id.clone());
        Ok(())
    }

    /// The selected widget, if any.
    #[must_use]
    pub fn selected(&self) -> Option<&WidgetId> {
        self.selected.as_ref()
    }

    /// Keyboard delete: run the delete pipeline on the selected widget.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::NothingSelected`] without a selection,
    /// otherwise the error of [`delete_widget`](Self::delete_widget).
    pub fn delete_selected(&mut self) -> CanvasResult<WidgetId> {
        let id = self.selected.clone().ok_or(CanvasError::NothingSelected)?;
        self.delete_widget(&id)?;
        Ok(id)
    }

    /// Animate a widget out, then remove it and save.
    ///
    /// The widget stays in the collection until the animation completes;
    /// with reduced motion that happens before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::WidgetNotFound`] for unknown ids and
    /// [`CanvasError::DeleteInProgress`] if the widget is already animating
    /// out.
    pub fn delete_widget(&mut self, id: &WidgetId) -> CanvasResult<()> {
        let targets = {
            let mut model = self.lock_model();
            Self::movable(&model, id)?;
            let targets = DeleteTargets::new();
            model.deleting.insert(id.clone(), targets.clone());
            targets
        };
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        tracing::info!(
            tenant = %self.tenant,
            widget = %id,
            reduced_motion = self.config.reduced_motion,
            "Deleting widget"
        );

        let model = Arc::clone(&self.model);
        let saver = self.saver.clone();
        let tenant = self.tenant.clone();
        let widget = id.clone();
        animate_widget_delete(
            &targets,
            move || finish_delete(&model, &saver, &tenant, &widget),
            DeleteOptions::with_reduced_motion(self.config.reduced_motion),
        );
        Ok(())
    }

    /// Write any pending debounced update now.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::Storage`] if the write fails.
    pub fn flush(&self) -> CanvasResult<bool> {
        Ok(self.saver.flush(&self.tenant)?)
    }

    /// Tear down: drop this tenant's pending debounced write.
    ///
    /// Deletions already animating still complete and save.
    pub fn close(mut self) {
        self.trash.reset();
        if self.saver.cancel(&self.tenant) {
            tracing::debug!(tenant = %self.tenant, "Dropped pending save on close");
        }
    }

    fn movable(model: &CanvasModel, id: &WidgetId) -> CanvasResult<usize> {
        if model.deleting.contains_key(id) {
            return Err(CanvasError::DeleteInProgress(id.clone()));
        }
        model
            .position(id)
            .ok_or_else(|| CanvasError::WidgetNotFound(id.clone()))
    }

    fn lock_model(&self) -> MutexGuard<'_, CanvasModel> {
        self.model.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Delete completion: remove the widget and persist the smaller collection.
///
/// A debounced write still pending for the tenant carries the widget, so it
/// is cancelled before the save.
fn finish_delete(
    model: &Mutex<CanvasModel>,
    saver: &DebouncedSaver,
    tenant: &TenantKey,
    id: &WidgetId,
) {
    let snapshot = {
        let mut model = model.lock().unwrap_or_else(PoisonError::into_inner);
        model.deleting.remove(id);
        model.widgets.retain(|w| &w.id != id);
        model.snapshot()
    };
    saver.cancel(tenant);
    if saver.save_now(tenant, &snapshot) {
        tracing::info!(tenant = %tenant, widget = %id, "Deleted widget");
    }
}
