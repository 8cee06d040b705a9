//! Scripted card sessions.
//!
//! A script is a JSON document listing timestamped steps. Pointer and key
//! steps go through a [`ScriptedInput`] source; control steps call the card
//! directly. Before each step the card's timers are advanced to the step's
//! time, so long-presses and debounced slider values fire in script order.

use kurbo::{Point, Size};
use lightpad_core::persist::PERSIST_DECIMALS;
use lightpad_core::{
    CardConfig, CardEvent, ConfigError, EntityRef, EntityState, InputEvent, Instant, KeyEvent, LightCard, Modifiers,
    PointerEvent, PointerKind, RecordingHost, Rgb, ScriptedInput, ServiceCall,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that stop a simulation before it starts.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid card configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid script: {0}")]
    Script(#[from] serde_json::Error),
}

fn default_canvas() -> [f64; 2] {
    [400.0, 400.0]
}

/// A recorded session.
#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    /// Canvas size in pixels, `[width, height]`.
    #[serde(default = "default_canvas")]
    pub canvas: [f64; 2],
    /// Entity states served by the simulated host.
    #[serde(default)]
    pub states: HashMap<EntityRef, EntityState>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    /// Milliseconds since the start of the script.
    #[serde(default)]
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Down {
        x: f64,
        y: f64,
        #[serde(default)]
        target: Option<EntityRef>,
        #[serde(default)]
        kind: PointerKind,
        #[serde(default)]
        modifiers: Modifiers,
    },
    Move {
        x: f64,
        y: f64,
        #[serde(default)]
        modifiers: Modifiers,
    },
    Up {
        x: f64,
        y: f64,
    },
    Cancel,
    /// The pointer capture was taken away mid-gesture.
    LostCapture,
    Key {
        key: String,
        #[serde(default)]
        modifiers: Modifiers,
    },
    /// Only advance timers.
    Tick,
    Resize {
        width: f64,
        height: f64,
    },
    Brightness {
        percent: u8,
    },
    ColorTemp {
        kelvin: u32,
    },
    Rgb {
        color: Rgb,
    },
    Wheel {
        angle: f64,
        radius: f64,
    },
    CommitSliders,
    ToggleSelected,
    Undo,
    Redo,
    RearrangeAll,
}

/// Final entity placement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placement {
    pub entity: EntityRef,
    pub x: f64,
    pub y: f64,
}

/// What a session produced.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub session_id: String,
    /// Committed positions in entity order.
    pub positions: Vec<Placement>,
    pub selection: Vec<EntityRef>,
    pub calls: Vec<ServiceCall>,
    pub events: Vec<String>,
    pub history_len: usize,
}

/// Load both files and run the session.
pub fn simulate_files(config_path: &Path, script_path: &Path) -> Result<Report, SimError> {
    let config = CardConfig::from_json(&read(config_path)?)?;
    let script: Script = serde_json::from_str(&read(script_path)?)?;
    simulate(config, script)
}

fn read(path: &Path) -> Result<String, SimError> {
    std::fs::read_to_string(path).map_err(|source| SimError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Replay `script` against a card built from `config`.
///
/// The card is detached at the end, so slider values still waiting for
/// their debounce delay are dropped.
pub fn simulate(config: CardConfig, script: Script) -> Result<Report, SimError> {
    let mut host = RecordingHost::new();
    for (entity, state) in script.states {
        host.set_state(entity, state);
    }

    let mut card = LightCard::new(config, host)?;
    card.set_canvas_size(Size::new(script.canvas[0], script.canvas[1]));

    let mut input = ScriptedInput::new();
    card.attach(&mut input);

    let t0 = Instant::now();
    let mut events = Vec::new();
    log::info!("Replaying {} steps", script.steps.len());
    for step in script.steps {
        let now = t0 + Duration::from_millis(step.at_ms);
        card.tick(now);
        apply(&mut card, &mut input, step.action, now);
        card.pump(&mut input);
        events.extend(card.drain_events().iter().map(describe));
    }

    card.detach(&mut input);
    events.extend(card.drain_events().iter().map(describe));

    let positions = card
        .config()
        .entities
        .iter()
        .filter_map(|entity| {
            let position = card.positions().get(entity)?.rounded(PERSIST_DECIMALS);
            Some(Placement {
                entity: entity.clone(),
                x: position.x,
                y: position.y,
            })
        })
        .collect();

    Ok(Report {
        session_id: card.session_id().to_string(),
        positions,
        selection: card.selected_entities(),
        history_len: card.history_len(),
        calls: card.host_mut().take_calls(),
        events,
    })
}

fn apply(card: &mut LightCard<RecordingHost>, input: &mut ScriptedInput, action: Action, now: Instant) {
    match action {
        Action::Down {
            x,
            y,
            target,
            kind,
            modifiers,
        } => input.push(InputEvent::Pointer(PointerEvent::Down {
            position: Point::new(x, y),
            target,
            kind,
            modifiers,
            time: now,
        })),
        Action::Move { x, y, modifiers } => input.push(InputEvent::Pointer(PointerEvent::Move {
            position: Point::new(x, y),
            modifiers,
            time: now,
        })),
        Action::Up { x, y } => input.push(InputEvent::Pointer(PointerEvent::Up {
            position: Point::new(x, y),
            time: now,
        })),
        Action::Cancel => input.push(InputEvent::Pointer(PointerEvent::Cancel)),
        Action::LostCapture => input.push(InputEvent::Pointer(PointerEvent::LostCapture)),
        Action::Key { key, modifiers } => input.push(InputEvent::Key(KeyEvent::new(key, modifiers))),
        Action::Tick => {}
        Action::Resize { width, height } => card.set_canvas_size(Size::new(width, height)),
        Action::Brightness { percent } => {
            card.set_brightness(percent, now);
        }
        Action::ColorTemp { kelvin } => {
            card.set_color_temp(kelvin, now);
        }
        Action::Rgb { color } => {
            card.set_rgb(color, now);
        }
        Action::Wheel { angle, radius } => {
            card.set_wheel_color(angle, radius, now);
        }
        Action::CommitSliders => {
            card.commit_sliders();
        }
        Action::ToggleSelected => {
            card.toggle_selected();
        }
        Action::Undo => {
            card.undo();
        }
        Action::Redo => {
            card.redo();
        }
        Action::RearrangeAll => {
            card.rearrange_all();
        }
    }
}

fn describe(event: &CardEvent) -> String {
    match event {
        CardEvent::PositionsChanged { .. } => "positions_changed".to_string(),
        CardEvent::ConfigChanged { session_id, .. } => format!("config_changed {}", session_id),
        CardEvent::SelectionChanged { selected } => {
            let names: Vec<&str> = selected.iter().map(EntityRef::as_str).collect();
            format!("selection_changed [{}]", names.join(", "))
        }
        CardEvent::DragPreview { entity, position } => {
            format!("drag_preview {} ({:.2}, {:.2})", entity, position.x, position.y)
        }
        CardEvent::Toggled { entity } => format!("toggled {}", entity),
        CardEvent::LongPress { entity } => format!("long_press {}", entity),
        CardEvent::RubberBand { rect } => format!(
            "rubber_band ({:.0}, {:.0}) ({:.0}, {:.0})",
            rect.x0, rect.y0, rect.x1, rect.y1
        ),
        CardEvent::RubberBandCleared => "rubber_band_cleared".to_string(),
    }
}
