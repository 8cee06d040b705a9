//! Boundary to the home-automation host: entity state lookup and service calls.

use crate::color::Rgb;
use crate::position::EntityRef;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashMap;

/// Light attributes the card reads. All optional; switches and scenes carry none.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LightAttributes {
    /// 0-255
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_temp_kelvin: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rgb_color: Option<Rgb>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_color_temp_kelvin: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_color_temp_kelvin: Option<u32>,
}

/// Snapshot of an entity's state as reported by the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub is_on: bool,
    #[serde(default)]
    pub attributes: LightAttributes,
}

/// A fire-and-forget request to change device state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCall {
    pub domain: String,
    pub action: String,
    pub entity_ids: Vec<EntityRef>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
}

impl ServiceCall {
    pub fn new(domain: impl Into<String>, action: impl Into<String>, entity_ids: Vec<EntityRef>) -> Self {
        Self {
            domain: domain.into(),
            action: action.into(),
            entity_ids,
            params: Map::new(),
        }
    }

    /// Add a parameter.
    pub fn with_param(mut self, key: &str, value: Value) -> Self {
        self.params.insert(key.to_string(), value);
        self
    }
}

/// User-level light commands produced by the card's controls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightCommand {
    TurnOn,
    TurnOff,
    Toggle,
    /// Brightness in percent (0-100).
    Brightness(u8),
    ColorTemp(u32),
    Rgb(Rgb),
}

impl LightCommand {
    /// Build the service call applying this command to `entities`.
    ///
    /// On/off/toggle go through the generic `homeassistant` domain so they
    /// work for switches and scenes too; attribute changes use `light.turn_on`.
    pub fn to_service_call(self, entities: Vec<EntityRef>) -> ServiceCall {
        match self {
            LightCommand::TurnOn => ServiceCall::new("homeassistant", "turn_on", entities),
            LightCommand::TurnOff => ServiceCall::new("homeassistant", "turn_off", entities),
            LightCommand::Toggle => ServiceCall::new("homeassistant", "toggle", entities),
            LightCommand::Brightness(pct) => ServiceCall::new("light", "turn_on", entities)
                .with_param("brightness_pct", json!(pct.min(100))),
            LightCommand::ColorTemp(kelvin) => ServiceCall::new("light", "turn_on", entities)
                .with_param("color_temp_kelvin", json!(kelvin)),
            LightCommand::Rgb(color) => ServiceCall::new("light", "turn_on", entities)
                .with_param("rgb_color", json!(color.to_array())),
        }
    }
}

/// The host platform.
pub trait Host {
    /// Current state of an entity, if the host knows it.
    fn state(&self, entity: &EntityRef) -> Option<EntityState>;

    /// Request a state change. No acknowledgement is returned.
    fn invoke(&mut self, call: ServiceCall);
}

/// In-memory host that serves fixed states and records every call.
#[derive(Debug, Clone, Default)]
pub struct RecordingHost {
    states: HashMap<EntityRef, EntityState>,
    calls: Vec<ServiceCall>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_state(&mut self, entity: EntityRef, state: EntityState) {
        self.states.insert(entity, state);
    }

    pub fn calls(&self) -> &[ServiceCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<ServiceCall> {
        std::mem::take(&mut self.calls)
    }
}

impl Host for RecordingHost {
    fn state(&self, entity: &EntityRef) -> Option<EntityState> {
        self.states.get(entity).cloned()
    }

    fn invoke(&mut self, call: ServiceCall) {
        log::debug!(
            "Service call {}.{} for {} entities",
            call.domain,
            call.action,
            call.entity_ids.len()
        );
        self.calls.push(call);
    }
}

/// Aggregate state of a group of entities, used to position the sliders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionSummary {
    /// At least one entity is on.
    pub any_on: bool,
    /// Mean brightness in percent over entities that report one.
    pub brightness_pct: Option<u8>,
    /// Mean color temperature over entities that report one.
    pub color_temp_kelvin: Option<u32>,
    /// Color of the first entity reporting one.
    pub rgb_color: Option<Rgb>,
}

/// Summarize host state for `entities`. Unknown entities are skipped.
pub fn summarize<'a, H: Host + ?Sized>(host: &H, entities: impl IntoIterator<Item = &'a EntityRef>) -> SelectionSummary {
    let mut summary = SelectionSummary::default();
    let mut brightness = Vec::new();
    let mut temps = Vec::new();

    for entity in entities {
        let Some(state) = host.state(entity) else {
            continue;
        };
        summary.any_on |= state.is_on;
        if let Some(b) = state.attributes.brightness {
            brightness.push(b as f64);
        }
        if let Some(k) = state.attributes.color_temp_kelvin {
            temps.push(k as f64);
        }
        if summary.rgb_color.is_none() {
            summary.rgb_color = state.attributes.rgb_color;
        }
    }

    if !brightness.is_empty() {
        let mean = brightness.iter().sum::<f64>() / brightness.len() as f64;
        summary.brightness_pct = Some((mean / 255.0 * 100.0).round() as u8);
    }
    if !temps.is_empty() {
        summary.color_temp_kelvin = Some((temps.iter().sum::<f64>() / temps.len() as f64).round() as u32);
    }
    summary
}
