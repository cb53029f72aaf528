//! Error types for canvas storage and widget lifecycle operations.

use thiserror::Error;

use crate::schema::WidgetId;

/// Result type for widget lifecycle operations.
pub type CanvasResult<T> = Result<T, CanvasError>;

/// Errors raised by the storage engine.
///
/// None of these are fatal. A failed save leaves the previously committed
/// value for the tenant untouched.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend refused the write because it would exceed its quota.
    #[error("Storage quota exceeded: need {needed} bytes, {available} available")]
    QuotaExceeded {
        /// Size of the rejected record in bytes.
        needed: usize,
        /// Bytes still available under the quota.
        available: usize,
    },

    /// The canvas state could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The state holds two widgets with the same id.
    #[error("Duplicate widget id: {0}")]
    DuplicateWidget(WidgetId),

    /// A widget position or size is NaN or infinite.
    #[error("Non-finite geometry on widget {0}")]
    NonFiniteGeometry(WidgetId),

    /// An I/O error occurred in a file-backed store.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A deferred save was requested outside a Tokio runtime.
    #[error("No async runtime available for deferred saves")]
    NoRuntime,
}

/// Errors raised by the widget lifecycle controller.
#[derive(Debug, Error)]
pub enum CanvasError {
    /// No widget with this id is on the canvas.
    #[error("Widget not found: {0}")]
    WidgetNotFound(WidgetId),

    /// The widget is already animating out.
    #[error("Widget is already being deleted: {0}")]
    DeleteInProgress(WidgetId),

    /// No widget is selected for a keyboard delete.
    #[error("No widget selected")]
    NothingSelected,

    /// The underlying save failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}
