//! Trash affordance state machine.
//!
//! ```text
//!            proximity             drop zone
//! Inactive ────────────▶ Active ────────────▶ Hover
//!    ▲   ◀──────────────   │   ◀────────────    │
//!    │      left zone      │   back to proximity │ release
//!    │                     │ release             ▼
//!    └─────────────────────┴──────────────── Delete
//! ```
//!
//! Two nested zones keep the indicator from flickering when the pointer sits
//! on an edge: `Active` arms, `Hover` commits.

use serde::{Deserialize, Serialize};

/// Resting state of the trash target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrashState {
    /// No deletable drag nearby.
    #[default]
    Inactive,
    /// A deletable widget is inside the proximity zone.
    Active,
    /// A deletable widget is inside the drop zone.
    Hover,
}

/// Target of a single transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrashStep {
    /// Go to [`TrashState::Inactive`].
    Inactive,
    /// Go to [`TrashState::Active`].
    Active,
    /// Go to [`TrashState::Hover`].
    Hover,
    /// Emit a delete and return to [`TrashState::Inactive`].
    Delete,
}

impl TrashState {
    /// Whether `step` is a legal transition out of this state.
    #[must_use]
    pub const fn can_step(self, step: TrashStep) -> bool {
        matches!(
            (self, step),
            (Self::Inactive, TrashStep::Active)
                | (Self::Active, TrashStep::Inactive | TrashStep::Hover)
                | (Self::Hover, TrashStep::Active | TrashStep::Delete)
        )
    }

    const fn tier(self) -> u8 {
        match self {
            Self::Inactive => 0,
            Self::Active => 1,
            Self::Hover => 2,
        }
    }

    const fn step_toward(self, target: Self) -> TrashStep {
        match (self, target.tier() > self.tier()) {
            (Self::Inactive, _) | (Self::Hover, false) => TrashStep::Active,
            (Self::Active, true) => TrashStep::Hover,
            (Self::Active, false) | (Self::Hover, true) => TrashStep::Inactive,
        }
    }
}

/// Where the dragged widget is relative to the trash target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneSignal {
    /// Outside the proximity zone.
    Outside,
    /// Inside the proximity zone but not the drop zone.
    Proximity,
    /// Inside the drop zone.
    DropZone,
}

impl ZoneSignal {
    const fn resting_state(self) -> TrashState {
        match self {
            Self::Outside => TrashState::Inactive,
            Self::Proximity => TrashState::Active,
            Self::DropZone => TrashState::Hover,
        }
    }
}

/// What a drag release means for the dragged widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// Released over the drop zone: delete the widget.
    Delete,
    /// Released anywhere else: nothing to persist for the trash.
    Cancel,
}

/// The trash target's proximity machine.
#[derive(Debug, Clone, Default)]
pub struct TrashAffordance {
    state: TrashState,
}

impl TrashAffordance {
    /// Create a machine in [`TrashState::Inactive`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> TrashState {
        self.state
    }

    /// Apply one transition. Illegal transitions are ignored.
    ///
    /// Returns whether the transition was taken.
    pub fn step(&mut self, step: TrashStep) -> bool {
        if !self.state.can_step(step) {
            tracing::trace!(from = ?self.state, ?step, "Ignoring illegal trash transition");
            return false;
        }
        let next = match step {
            TrashStep::Inactive | TrashStep::Delete => TrashState::Inactive,
            TrashStep::Active => TrashState::Active,
            TrashStep::Hover => TrashState::Hover,
        };
        tracing::debug!(from = ?self.state, to = ?next, ?step, "Trash transition");
        self.state = next;
        true
    }

    /// Feed a position sample from the drag gesture.
    ///
    /// A sample that skips a zone (e.g. straight from the drop zone to
    /// outside) walks through the intermediate state, so every transition
    /// taken is a legal one.
    pub fn on_zone(&mut self, signal: ZoneSignal) -> TrashState {
        let target = signal.resting_state();
        while self.state != target {
            let step = self.state.step_toward(target);
            if !self.step(step) {
                break;
            }
        }
        self.state
    }

    /// The drag was released.
    ///
    /// In `Hover` this emits the delete; anywhere else it cancels. Either way
    /// the machine ends up `Inactive`.
    pub fn release(&mut self) -> ReleaseOutcome {
        if self.step(TrashStep::Delete) {
            return ReleaseOutcome::Delete;
        }
        self.on_zone(ZoneSignal::Outside);
        ReleaseOutcome::Cancel
    }

    /// Drop any approach state, e.g. when the drag is aborted by the system.
    pub fn reset(&mut self) {
        self.on_zone(ZoneSignal::Outside);
    }
}

/// Circular trash target with an outer proximity ring and an inner drop
/// zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrashZone {
    /// Centre X in canvas space.
    pub center_x: f64,
    /// Centre Y in canvas space.
    pub center_y: f64,
    /// Radius of the proximity zone.
    pub proximity_radius: f64,
    /// Radius of the drop zone. Never larger than the proximity radius.
    pub drop_radius: f64,
}

impl TrashZone {
    /// Default proximity radius in pixels.
    pub const DEFAULT_PROXIMITY_RADIUS: f64 = 160.0;
    /// Default drop radius in pixels.
    pub const DEFAULT_DROP_RADIUS: f64 = 56.0;

    /// Create a zone. The drop radius is clamped to the proximity radius.
    #[must_use]
    pub fn new(center_x: f64, center_y: f64, proximity_radius: f64, drop_radius: f64) -> Self {
        Self {
            center_x,
            center_y,
            proximity_radius,
            drop_radius: drop_radius.min(proximity_radius),
        }
    }

    /// Zone with default radii around the given centre.
    #[must_use]
    pub fn centered_at(center_x: f64, center_y: f64) -> Self {
        Self::new(
            center_x,
            center_y,
            Self::DEFAULT_PROXIMITY_RADIUS,
            Self::DEFAULT_DROP_RADIUS,
        )
    }

    /// Classify a point.
    #[must_use]
    pub fn classify(&self, x: f64, y: f64) -> ZoneSignal {
        let distance = (x - self.center_x).hypot(y - self.center_y);
        if distance <= self.drop_radius {
            ZoneSignal::DropZone
        } else if distance <= self.proximity_radius {
            ZoneSignal::Proximity
        } else {
            ZoneSignal::Outside
        }
    }
}
