//! Pointer and keyboard events, and the source that delivers them.

use crate::position::EntityRef;
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

// Use web_time for WASM compatibility
#[cfg(target_arch = "wasm32")]
pub use web_time::Instant;
#[cfg(not(target_arch = "wasm32"))]
pub use std::time::Instant;

/// Kind of device behind a pointer stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerKind {
    #[default]
    Mouse,
    Touch,
    Pen,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    /// Shift, Ctrl or Cmd: extend the selection instead of replacing it.
    pub fn additive(&self) -> bool {
        self.shift || self.ctrl || self.meta
    }

    /// Alt inverts the snap-to-grid default while dragging.
    pub fn snap_toggle(&self) -> bool {
        self.alt
    }

    /// Ctrl on most platforms, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// Pointer events in canvas pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerEvent {
    Down {
        position: Point,
        /// Entity icon under the pointer, when the presentation layer knows it.
        /// `None` falls back to hit-testing against stored positions.
        target: Option<EntityRef>,
        kind: PointerKind,
        modifiers: Modifiers,
        time: Instant,
    },
    Move {
        position: Point,
        modifiers: Modifiers,
        time: Instant,
    },
    Up {
        position: Point,
        time: Instant,
    },
    /// The platform cancelled the pointer (e.g. scroll took over).
    Cancel,
    /// Pointer capture was lost to another element.
    LostCapture,
}

impl PointerEvent {
    /// Timestamp carried by the event, if any.
    pub fn time(&self) -> Option<Instant> {
        match self {
            PointerEvent::Down { time, .. }
            | PointerEvent::Move { time, .. }
            | PointerEvent::Up { time, .. } => Some(*time),
            PointerEvent::Cancel | PointerEvent::LostCapture => None,
        }
    }
}

/// A key press with the modifiers held at the time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key: String,
    #[serde(default)]
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            modifiers,
        }
    }

    /// Case-insensitive key name comparison.
    pub fn is(&self, key: &str) -> bool {
        self.key.eq_ignore_ascii_case(key)
    }
}

/// Any input delivered to the card.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Pointer(PointerEvent),
    Key(KeyEvent),
}

/// A subscribable stream of input events.
///
/// Stands in for document-level listeners: the card subscribes when attached
/// and unsubscribes on teardown, and only polls while subscribed.
pub trait InputSource {
    fn subscribe(&mut self);
    fn unsubscribe(&mut self);
    fn is_subscribed(&self) -> bool;
    /// Drain the events buffered since the last poll.
    fn poll_events(&mut self) -> Vec<InputEvent>;
}

/// Input source replaying a pre-recorded queue of events.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    queue: VecDeque<InputEvent>,
    subscribed: bool,
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event for the next poll.
    pub fn push(&mut self, event: InputEvent) {
        self.queue.push_back(event);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl FromIterator<InputEvent> for ScriptedInput {
    fn from_iter<I: IntoIterator<Item = InputEvent>>(iter: I) -> Self {
        Self {
            queue: iter.into_iter().collect(),
            subscribed: false,
        }
    }
}

impl InputSource for ScriptedInput {
    fn subscribe(&mut self) {
        self.subscribed = true;
    }

    fn unsubscribe(&mut self) {
        self.subscribed = false;
    }

    fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    fn poll_events(&mut self) -> Vec<InputEvent> {
        if !self.subscribed {
            return Vec::new();
        }
        self.queue.drain(..).collect()
    }
}
