//! # Delete Animation
//!
//! Drives a widget's scale, opacity, rotation and vertical offset through a
//! short "lift then drop" transition and fires a completion callback when it
//! is over.
//!
//! ```text
//!  0ms ── lift (120ms) ──▶ 120ms ──────── drop (280ms) ────────▶ 400ms
//!  scale 1 → 1.08                 scale 1.08 → 0
//!  rot   0 → -4°                  rot  -4° → 10°
//!  y     0 → -12px                y   -12px → 36px, opacity 1 → 0
//! ```
//!
//! The engine never touches storage. Callers chain persistence through the
//! completion callback. With reduced motion the final frame is applied and the
//! callback runs before [`animate_widget_delete`] returns.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::{Instant, MissedTickBehavior};

/// Total length of the delete transition.
///
/// Exported so callers can schedule work that depends on it.
pub const TOTAL_DURATION: Duration = Duration::from_millis(400);

/// Interval between animation frames.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Length of the initial lift phase.
const LIFT_DURATION: Duration = Duration::from_millis(120);

/// A shared numeric handle the renderer reads and the animation writes.
#[derive(Debug, Clone, Default)]
pub struct AnimatedValue(Arc<RwLock<f64>>);

impl AnimatedValue {
    /// Create a handle holding `value`.
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self(Arc::new(RwLock::new(value)))
    }

    /// Current value.
    #[must_use]
    pub fn get(&self) -> f64 {
        *self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the value.
    pub fn set(&self, value: f64) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = value;
    }
}

/// One sampled point of the transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeleteFrame {
    /// Uniform scale factor.
    pub scale: f64,
    /// Opacity in `0.0..=1.0`.
    pub opacity: f64,
    /// Rotation in degrees.
    pub rotation: f64,
    /// Vertical offset in pixels.
    pub translate_y: f64,
}

impl DeleteFrame {
    /// Untransformed widget.
    pub const IDENTITY: Self = Self {
        scale: 1.0,
        opacity: 1.0,
        rotation: 0.0,
        translate_y: 0.0,
    };

    /// End state of every delete, animated or not.
    pub const FINAL: Self = Self {
        scale: 0.0,
        opacity: 0.0,
        rotation: DeleteKeyframes::DROP_ROTATION,
        translate_y: DeleteKeyframes::DROP_TRANSLATE_Y,
    };
}

/// The four handles a delete animation drives.
#[derive(Debug, Clone)]
pub struct DeleteTargets {
    /// Scale handle.
    pub scale: AnimatedValue,
    /// Opacity handle.
    pub opacity: AnimatedValue,
    /// Rotation handle (degrees).
    pub rotation: AnimatedValue,
    /// Vertical offset handle (pixels).
    pub translate_y: AnimatedValue,
}

impl DeleteTargets {
    /// Handles initialised to [`DeleteFrame::IDENTITY`].
    #[must_use]
    pub fn new() -> Self {
        let identity = DeleteFrame::IDENTITY;
        Self {
            scale: AnimatedValue::new(identity.scale),
            opacity: AnimatedValue::new(identity.opacity),
            rotation: AnimatedValue::new(identity.rotation),
            translate_y: AnimatedValue::new(identity.translate_y),
        }
    }

    /// Write a frame to all four handles.
    pub fn apply(&self, frame: DeleteFrame) {
        self.scale.set(frame.scale);
        self.opacity.set(frame.opacity);
        self.rotation.set(frame.rotation);
        self.translate_y.set(frame.translate_y);
    }

    /// Read all four handles.
    #[must_use]
    pub fn snapshot(&self) -> DeleteFrame {
        DeleteFrame {
            scale: self.scale.get(),
            opacity: self.opacity.get(),
            rotation: self.rotation.get(),
            translate_y: self.translate_y.get(),
        }
    }
}

impl Default for DeleteTargets {
    fn default() -> Self {
        Self::new()
    }
}

/// Options for [`animate_widget_delete`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Skip the tween and finish synchronously.
    pub reduced_motion: bool,
}

impl DeleteOptions {
    /// Options honouring the given reduced-motion preference.
    #[must_use]
    pub const fn with_reduced_motion(reduced_motion: bool) -> Self {
        Self { reduced_motion }
    }
}

/// Keyframes of the delete transition.
#[derive(Debug, Clone, Copy)]
pub struct DeleteKeyframes;

impl DeleteKeyframes {
    /// Scale at the top of the lift.
    pub const LIFT_SCALE: f64 = 1.08;
    /// Rotation at the top of the lift.
    pub const LIFT_ROTATION: f64 = -4.0;
    /// Vertical offset at the top of the lift.
    pub const LIFT_TRANSLATE_Y: f64 = -12.0;
    /// Rotation at the end of the drop.
    pub const DROP_ROTATION: f64 = 10.0;
    /// Vertical offset at the end of the drop.
    pub const DROP_TRANSLATE_Y: f64 = 36.0;

    /// Sample the transition `elapsed` after it started.
    ///
    /// Returns [`DeleteFrame::FINAL`] at or after [`TOTAL_DURATION`].
    #[must_use]
    pub fn sample(elapsed: Duration) -> DeleteFrame {
        if elapsed >= TOTAL_DURATION {
            return DeleteFrame::FINAL;
        }
        if elapsed < LIFT_DURATION {
            let e = ease_out_cubic(progress(elapsed, LIFT_DURATION));
            return DeleteFrame {
                scale: lerp(1.0, Self::LIFT_SCALE, e),
                opacity: 1.0,
                rotation: lerp(0.0, Self::LIFT_ROTATION, e),
                translate_y: lerp(0.0, Self::LIFT_TRANSLATE_Y, e),
            };
        }
        let e = ease_in_cubic(progress(
            elapsed.saturating_sub(LIFT_DURATION),
            TOTAL_DURATION.saturating_sub(LIFT_DURATION),
        ));
        DeleteFrame {
            scale: lerp(Self::LIFT_SCALE, 0.0, e),
            opacity: lerp(1.0, 0.0, e),
            rotation: lerp(Self::LIFT_ROTATION, Self::DROP_ROTATION, e),
            translate_y: lerp(Self::LIFT_TRANSLATE_Y, Self::DROP_TRANSLATE_Y, e),
        }
    }
}

fn progress(elapsed: Duration, span: Duration) -> f64 {
    (elapsed.as_secs_f64() / span.as_secs_f64()).clamp(0.0, 1.0)
}

fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

fn ease_out_cubic(t: f64) -> f64 {
    1.0 - (1.0 - t).powi(3)
}

fn ease_in_cubic(t: f64) -> f64 {
    t * t * t
}

/// Pending completion of one delete animation.
///
/// Fires at most once. Dropping it unfired (for instance when the runtime
/// shuts down mid-tween) applies the final frame and fires the callback.
struct Completion {
    targets: DeleteTargets,
    on_complete: Option<Box<dyn FnOnce() + Send>>,
}

impl Completion {
    fn complete(&mut self) {
        if let Some(on_complete) = self.on_complete.take() {
            self.targets.apply(DeleteFrame::FINAL);
            on_complete();
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.complete();
    }
}

/// Animate a widget out and call `on_complete` once when done.
///
/// In normal mode the transition runs for [`TOTAL_DURATION`] on a Tokio
/// timer task and `on_complete` fires after the full duration. With
/// `reduced_motion` the final frame (scale and opacity 0) is applied and
/// `on_complete` fires before this function returns.
///
/// Each call is independent; animating the same targets twice yields two
/// completions. If no Tokio runtime is available the reduced-motion path is
/// taken.
pub fn animate_widget_delete<F>(targets: &DeleteTargets, on_complete: F, options: DeleteOptions)
where
    F: FnOnce() + Send + 'static,
{
    let mut completion = Completion {
        targets: targets.clone(),
        on_complete: Some(Box::new(on_complete)),
    };

    if options.reduced_motion {
        completion.complete();
        return;
    }

    match Handle::try_current() {
        Ok(runtime) => {
            runtime.spawn(run_tween(completion));
        }
        Err(_) => {
            tracing::warn!("No async runtime for delete animation, finishing instantly");
            completion.complete();
        }
    }
}

async fn run_tween(mut completion: Completion) {
    let start = Instant::now();
    let mut ticker = tokio::time::interval(FRAME_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let elapsed = start.elapsed();
        if elapsed >= TOTAL_DURATION {
            break;
        }
        completion.targets.apply(DeleteKeyframes::sample(elapsed));
    }

    completion.complete();
}
