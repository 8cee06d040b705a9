//! Lightpad Core Library
//!
//! Platform-agnostic layout, selection and gesture logic for a spatial
//! light control card. Rendering is left to the embedding UI, which feeds
//! pointer and keyboard input in and observes positions, selection and
//! service calls coming out.

pub mod card;
pub mod color;
pub mod config;
pub mod debounce;
pub mod gesture;
pub mod history;
pub mod host;
pub mod input;
pub mod layout;
pub mod persist;
pub mod position;
pub mod selection;
pub mod snap;
pub mod store;

pub use card::{CardEvent, LightCard};
pub use color::{ColorWheel, Rgb, kelvin_to_rgb, wheel_sample};
pub use config::{CardConfig, ConfigError};
pub use debounce::Debouncer;
pub use gesture::{GestureConfig, GestureMachine, GestureOutcome, GestureState};
pub use history::History;
pub use host::{EntityState, Host, LightAttributes, LightCommand, RecordingHost, SelectionSummary, ServiceCall};
pub use input::{InputEvent, InputSource, Instant, KeyEvent, Modifiers, PointerEvent, PointerKind, ScriptedInput};
pub use layout::{layout, rearrange};
pub use persist::{positions_from_json, positions_to_json};
pub use position::{EntityRef, Position, PositionMap};
pub use selection::Selection;
pub use snap::{snap, snap_to_grid};
pub use store::PositionStore;
