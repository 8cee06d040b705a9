//! Card configuration and its validation.

use crate::debounce::DEFAULT_DEBOUNCE_MS;
use crate::gesture::{
    DEFAULT_DOUBLE_TAP_MS, DEFAULT_DRAG_THRESHOLD_MOUSE, DEFAULT_DRAG_THRESHOLD_TOUCH, DEFAULT_ICON_SIZE,
    DEFAULT_LONG_PRESS_MOUSE_MS, DEFAULT_LONG_PRESS_TOUCH_MS, GestureConfig,
};
use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::position::{EntityRef, Position, PositionMap};
use crate::snap::DEFAULT_GRID_SIZE;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors. Any of these blocks card setup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required `entities` list")]
    MissingEntities,
    #[error("`entities` must be a list, got {0}")]
    EntitiesNotSequence(&'static str),
    #[error("Empty entity reference at index {0}")]
    EmptyEntity(usize),
    #[error("Duplicate entity: {0}")]
    DuplicateEntity(EntityRef),
    #[error("Grid size must be a positive number, got {0}")]
    InvalidGridSize(f64),
    #[error("History limit must be at least 1")]
    InvalidHistoryLimit,
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

fn default_grid_size() -> f64 {
    DEFAULT_GRID_SIZE
}
fn default_true() -> bool {
    true
}
fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}
fn default_icon_size() -> f64 {
    DEFAULT_ICON_SIZE
}
fn default_drag_threshold_mouse() -> f64 {
    DEFAULT_DRAG_THRESHOLD_MOUSE
}
fn default_drag_threshold_touch() -> f64 {
    DEFAULT_DRAG_THRESHOLD_TOUCH
}
fn default_long_press_mouse_ms() -> u64 {
    DEFAULT_LONG_PRESS_MOUSE_MS
}
fn default_long_press_touch_ms() -> u64 {
    DEFAULT_LONG_PRESS_TOUCH_MS
}
fn default_double_tap_ms() -> u64 {
    DEFAULT_DOUBLE_TAP_MS
}
fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

/// User configuration for a light card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardConfig {
    /// Entities shown on the card, in display order.
    pub entities: Vec<EntityRef>,
    /// Stored positions. Missing entities are auto-placed.
    #[serde(default)]
    pub positions: PositionMap,
    /// Snap grid spacing in canvas pixels.
    #[serde(default = "default_grid_size")]
    pub grid_size: f64,
    /// Snap while dragging unless the modifier is held.
    #[serde(default = "default_true")]
    pub snap_to_grid: bool,
    /// Presses select and only drag past a threshold.
    #[serde(default)]
    pub lock_positions: bool,
    /// A double-tap toggles the entity.
    #[serde(default)]
    pub toggle_on_tap: bool,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "default_icon_size")]
    pub icon_size: f64,
    #[serde(default = "default_drag_threshold_mouse")]
    pub drag_threshold_mouse: f64,
    #[serde(default = "default_drag_threshold_touch")]
    pub drag_threshold_touch: f64,
    #[serde(default = "default_long_press_mouse_ms")]
    pub long_press_mouse_ms: u64,
    #[serde(default = "default_long_press_touch_ms")]
    pub long_press_touch_ms: u64,
    #[serde(default = "default_double_tap_ms")]
    pub double_tap_ms: u64,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Emit position changes for an external editor.
    #[serde(default)]
    pub edit_mode: bool,
}

impl CardConfig {
    /// Configuration with defaults for everything but the entity list.
    pub fn new(entities: Vec<EntityRef>) -> Self {
        Self {
            entities,
            positions: PositionMap::new(),
            grid_size: DEFAULT_GRID_SIZE,
            snap_to_grid: true,
            lock_positions: false,
            toggle_on_tap: false,
            history_limit: DEFAULT_HISTORY_LIMIT,
            icon_size: DEFAULT_ICON_SIZE,
            drag_threshold_mouse: DEFAULT_DRAG_THRESHOLD_MOUSE,
            drag_threshold_touch: DEFAULT_DRAG_THRESHOLD_TOUCH,
            long_press_mouse_ms: DEFAULT_LONG_PRESS_MOUSE_MS,
            long_press_touch_ms: DEFAULT_LONG_PRESS_TOUCH_MS,
            double_tap_ms: DEFAULT_DOUBLE_TAP_MS,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            edit_mode: false,
        }
    }

    /// Parse and validate a JSON configuration document.
    ///
    /// Position overrides are kept unparsed until the rest of the document
    /// is read, so a single unreadable override (`null`, a string, `1e400`)
    /// is dropped instead of failing the whole card.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut document: BTreeMap<String, Box<RawValue>> = serde_json::from_str(json)?;
        let overrides = match document.remove("positions") {
            Some(raw) => overrides_from_json(raw.get())?,
            None => PositionMap::new(),
        };
        let mut rest = Map::new();
        for (key, raw) in document {
            rest.insert(key, serde_json::from_str(raw.get())?);
        }
        Self::from_parts(Value::Object(rest), overrides)
    }

    /// Validate a parsed configuration document.
    pub fn from_value(mut value: Value) -> Result<Self, ConfigError> {
        let overrides = match value.as_object_mut().and_then(|doc| doc.remove("positions")) {
            Some(raw) => {
                let entries: Option<Map<String, Value>> = serde_json::from_value(raw)?;
                lenient_positions(
                    entries
                        .unwrap_or_default()
                        .into_iter()
                        .map(|(entity, value)| (EntityRef::from(entity), serde_json::from_value(value))),
                )
            }
            None => PositionMap::new(),
        };
        Self::from_parts(value, overrides)
    }

    fn from_parts(value: Value, overrides: PositionMap) -> Result<Self, ConfigError> {
        match value.get("entities") {
            None | Some(Value::Null) => return Err(ConfigError::MissingEntities),
            Some(Value::Array(_)) => {}
            Some(other) => return Err(ConfigError::EntitiesNotSequence(json_type_name(other))),
        }
        let mut config: CardConfig = serde_json::from_value(value)?;
        config.positions = overrides;
        config.validated()
    }

    /// Check structural rules and sanitize position overrides.
    ///
    /// Non-finite overrides and overrides for entities not in the list are
    /// dropped; the layout engine places those entities instead. Finite
    /// overrides are clamped to the canvas.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for (index, entity) in self.entities.iter().enumerate() {
            if entity.is_blank() {
                return Err(ConfigError::EmptyEntity(index));
            }
            if !seen.insert(entity) {
                return Err(ConfigError::DuplicateEntity(entity.clone()));
            }
        }
        if !(self.grid_size.is_finite() && self.grid_size > 0.0) {
            return Err(ConfigError::InvalidGridSize(self.grid_size));
        }
        if self.history_limit == 0 {
            return Err(ConfigError::InvalidHistoryLimit);
        }

        self.positions = sanitize_positions(std::mem::take(&mut self.positions), &seen);
        Ok(self)
    }

    /// Gesture recognition settings derived from this configuration.
    pub fn gesture_config(&self) -> GestureConfig {
        GestureConfig {
            lock_positions: self.lock_positions,
            toggle_on_tap: self.toggle_on_tap,
            drag_threshold_mouse: self.drag_threshold_mouse,
            drag_threshold_touch: self.drag_threshold_touch,
            long_press_mouse: Duration::from_millis(self.long_press_mouse_ms),
            long_press_touch: Duration::from_millis(self.long_press_touch_ms),
            double_tap: Duration::from_millis(self.double_tap_ms),
            snap_to_grid: self.snap_to_grid,
            grid_size: self.grid_size,
            icon_size: self.icon_size,
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Parse a JSON object of overrides entry by entry.
pub(crate) fn overrides_from_json(json: &str) -> Result<PositionMap, ConfigError> {
    let entries: Option<BTreeMap<EntityRef, Box<RawValue>>> = serde_json::from_str(json)?;
    Ok(lenient_positions(
        entries
            .unwrap_or_default()
            .into_iter()
            .map(|(entity, raw)| (entity, serde_json::from_str(raw.get()))),
    ))
}

fn lenient_positions(entries: impl IntoIterator<Item = (EntityRef, Result<Position, serde_json::Error>)>) -> PositionMap {
    entries
        .into_iter()
        .filter_map(|(entity, parsed)| match parsed {
            Ok(position) => Some((entity, position)),
            Err(err) => {
                log::warn!("Dropping malformed position for {}: {}", entity, err);
                None
            }
        })
        .collect()
}

/// Keep only finite overrides for known entities, clamped to [0, 100].
pub(crate) fn sanitize_positions(positions: PositionMap, known: &HashSet<&EntityRef>) -> PositionMap {
    positions
        .into_iter()
        .filter_map(|(entity, position)| {
            if !known.contains(&entity) {
                log::warn!("Dropping position for unknown entity {}", entity);
                return None;
            }
            if !position.is_finite() {
                log::warn!("Dropping non-finite position for {}", entity);
                return None;
            }
            Some((entity, position.clamped()))
        })
        .collect()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
