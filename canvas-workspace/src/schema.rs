//! Versioned shape of the persisted canvas record.
//!
//! ```text
//! {
//!   "version": 1,
//!   "widgets": [{ "id", "type", "x", "y", "width", "height", "zIndex" }],
//!   "avatars": [ ...opaque... ],
//!   "lastModified": 1700000000000
//! }
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StorageError;

/// Schema version stamped on every save.
///
/// Stored records carrying any other version load as absent.
pub const SCHEMA_VERSION: u32 = 1;

/// Stable identity of a widget within one canvas.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WidgetId(String);

impl WidgetId {
    /// Mint a fresh random widget id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for WidgetId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for WidgetId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for WidgetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Payload discriminator for a widget.
///
/// Not interpreted by the engine. Kinds written by newer front ends survive a
/// load/save cycle through [`WidgetKind::Other`].
///
/// Kinds compare and hash by name, so `Other("email")` equals
/// [`WidgetKind::Email`]; conversions from a name always yield the named
/// variant when one exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WidgetKind {
    /// Email inbox widget.
    Email,
    /// Invoice widget.
    Invoice,
    /// Calendar widget.
    Calendar,
    /// Task list widget.
    Tasks,
    /// Contacts widget.
    Contacts,
    /// Free-form note widget.
    Notes,
    /// Any kind this engine does not know by name.
    Other(String),
}

impl WidgetKind {
    /// The serialized name of this kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Email => "email",
            Self::Invoice => "invoice",
            Self::Calendar => "calendar",
            Self::Tasks => "tasks",
            Self::Contacts => "contacts",
            Self::Notes => "notes",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for WidgetKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "email" => Self::Email,
            "invoice" => Self::Invoice,
            "calendar" => Self::Calendar,
            "tasks" => Self::Tasks,
            "contacts" => Self::Contacts,
            "notes" => Self::Notes,
            _ => Self::Other(name),
        }
    }
}

impl From<WidgetKind> for String {
    fn from(kind: WidgetKind) -> Self {
        match kind {
            WidgetKind::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl PartialEq for WidgetKind {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for WidgetKind {}

impl std::hash::Hash for WidgetKind {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl std::fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses known names case-insensitively; anything else is kept verbatim.
impl std::str::FromStr for WidgetKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match Self::from(s.to_ascii_lowercase()) {
            Self::Other(_) => Self::Other(s.to_string()),
            known => known,
        })
    }
}

/// One widget placed on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetState {
    /// Widget identifier, unique within its canvas.
    pub id: WidgetId,
    /// Widget payload kind.
    #[serde(rename = "type")]
    pub kind: WidgetKind,
    /// Canvas-space X position.
    pub x: f64,
    /// Canvas-space Y position.
    pub y: f64,
    /// Layout width.
    pub width: f64,
    /// Layout height.
    pub height: f64,
    /// Stacking order.
    pub z_index: i32,
}

impl WidgetState {
    /// Create a widget with a fresh id at the given position and size.
    #[must_use]
    pub fn new(kind: WidgetKind, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            id: WidgetId::generate(),
            kind,
            x,
            y,
            width,
            height,
            z_index: 0,
        }
    }

    /// Builder method to set the z-index.
    #[must_use]
    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    fn has_finite_geometry(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Avatar record. Opaque to the engine, stored verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AvatarState(pub serde_json::Value);

/// The persisted snapshot of one tenant's canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasState {
    /// Schema version this record was written with.
    pub version: u32,
    /// Widgets on the canvas.
    pub widgets: Vec<WidgetState>,
    /// Avatars on the canvas.
    #[serde(default)]
    pub avatars: Vec<AvatarState>,
    /// Unix milliseconds of the save that produced this snapshot.
    pub last_modified: u64,
}

impl CanvasState {
    /// Create a state at the current schema version.
    #[must_use]
    pub fn new(widgets: Vec<WidgetState>, avatars: Vec<AvatarState>) -> Self {
        Self {
            version: SCHEMA_VERSION,
            widgets,
            avatars,
            last_modified: 0,
        }
    }

    /// An empty canvas.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    /// Look up a widget by id.
    #[must_use]
    pub fn widget(&self, id: &WidgetId) -> Option<&WidgetState> {
        self.widgets.iter().find(|w| &w.id == id)
    }

    /// Check the invariants a record must satisfy before it is written.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::DuplicateWidget`] if two widgets share an id,
    /// or [`StorageError::NonFiniteGeometry`] if a widget has a NaN or
    /// infinite coordinate.
    pub fn validate(&self) -> Result<(), StorageError> {
        let mut seen = HashSet::with_capacity(self.widgets.len());
        for widget in &self.widgets {
            if !seen.insert(&widget.id) {
                return Err(StorageError::DuplicateWidget(widget.id.clone()));
            }
            if !widget.has_finite_geometry() {
                return Err(StorageError::NonFiniteGeometry(widget.id.clone()));
            }
        }
        Ok(())
    }
}

impl Default for CanvasState {
    fn default() -> Self {
        Self::empty()
    }
}
