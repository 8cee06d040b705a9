//! The light card controller.
//!
//! [`LightCard`] owns every piece of interaction state for one card: the
//! position store, the selection, the gesture machine and the slider
//! debouncers. Input goes in through [`LightCard::handle_pointer`],
//! [`LightCard::handle_key`] and [`LightCard::tick`]; the presentation layer
//! learns about changes by draining [`CardEvent`]s.

use crate::color::{MAX_KELVIN, MIN_KELVIN, Rgb, wheel_sample};
use crate::config::{CardConfig, ConfigError};
use crate::debounce::Debouncer;
use crate::gesture::{GestureContext, GestureMachine, GestureOutcome, GestureState};
use crate::host::{Host, LightCommand, SelectionSummary, ServiceCall, summarize};
use crate::input::{InputEvent, InputSource, Instant, KeyEvent, PointerEvent};
use crate::layout::{layout, rearrange};
use crate::persist::positions_to_json;
use crate::position::{EntityRef, Position, PositionMap};
use crate::selection::Selection;
use crate::store::PositionStore;
use kurbo::{Rect, Size};
use std::collections::HashSet;
use std::time::Duration;
use uuid::Uuid;

/// Notifications for the presentation layer and, in edit mode, the editor.
#[derive(Debug, Clone, PartialEq)]
pub enum CardEvent {
    /// The committed position map changed (drag, undo, redo, rearrange).
    PositionsChanged { positions: PositionMap },
    /// Edit mode only: the position map for the external editor.
    ConfigChanged { positions: PositionMap, session_id: Uuid },
    /// Selected entities, in entity list order.
    SelectionChanged { selected: Vec<EntityRef> },
    /// Displayed position of an entity while dragging, or its committed
    /// position again after a cancelled drag.
    DragPreview { entity: EntityRef, position: Position },
    Toggled { entity: EntityRef },
    LongPress { entity: EntityRef },
    /// Rubber band rectangle in canvas pixels.
    RubberBand { rect: Rect },
    RubberBandCleared,
}

/// One debouncer per slider.
#[derive(Debug, Clone)]
struct Sliders {
    brightness: Debouncer<ServiceCall>,
    color_temp: Debouncer<ServiceCall>,
    rgb: Debouncer<ServiceCall>,
}

impl Sliders {
    fn new(delay: Duration) -> Self {
        Self {
            brightness: Debouncer::new(delay),
            color_temp: Debouncer::new(delay),
            rgb: Debouncer::new(delay),
        }
    }

    fn all_mut(&mut self) -> [&mut Debouncer<ServiceCall>; 3] {
        [&mut self.brightness, &mut self.color_temp, &mut self.rgb]
    }

    fn set_delay(&mut self, delay: Duration) {
        for slider in self.all_mut() {
            slider.set_delay(delay);
        }
    }

    fn poll(&mut self, now: Instant) -> Vec<ServiceCall> {
        self.all_mut().into_iter().filter_map(|s| s.poll(now)).collect()
    }

    fn flush(&mut self) -> Vec<ServiceCall> {
        self.all_mut().into_iter().filter_map(|s| s.flush()).collect()
    }

    fn cancel(&mut self) -> usize {
        self.all_mut().into_iter().map(|s| s.cancel()).filter(|dropped| *dropped).count()
    }

    fn next_deadline(&self) -> Option<Instant> {
        [&self.brightness, &self.color_temp, &self.rgb]
            .into_iter()
            .filter_map(|s| s.deadline())
            .min()
    }
}

/// A spatial light card bound to a host.
pub struct LightCard<H: Host> {
    config: CardConfig,
    host: H,
    store: PositionStore,
    selection: Selection,
    gesture: GestureMachine,
    sliders: Sliders,
    canvas: Size,
    session_id: Uuid,
    events: Vec<CardEvent>,
}

impl<H: Host> LightCard<H> {
    /// Validate `config` and lay out every entity without a stored position.
    pub fn new(config: CardConfig, host: H) -> Result<Self, ConfigError> {
        let config = config.validated()?;
        let positions = layout(&config.entities, &config.positions);
        let session_id = Uuid::new_v4();
        log::debug!(
            "Card created with {} entities (session {})",
            config.entities.len(),
            session_id
        );
        Ok(Self {
            store: PositionStore::new(positions, config.history_limit),
            gesture: GestureMachine::new(config.gesture_config()),
            sliders: Sliders::new(config.debounce()),
            selection: Selection::new(),
            canvas: Size::ZERO,
            events: Vec::new(),
            session_id,
            config,
            host,
        })
    }

    /// Apply a new configuration.
    ///
    /// Surviving entities keep their live position unless the new config
    /// overrides it, newcomers are laid out, and the selection is pruned to
    /// the new entity list. History restarts from the resulting map.
    pub fn reconfigure(&mut self, config: CardConfig) -> Result<(), ConfigError> {
        let config = config.validated()?;
        self.cancel_gesture();

        let mut existing = self.store.positions().clone();
        existing.extend(config.positions.iter().map(|(e, p)| (e.clone(), *p)));
        let positions = layout(&config.entities, &existing);

        let pruned = {
            let known: HashSet<&EntityRef> = config.entities.iter().collect();
            self.selection.retain(|entity| known.contains(entity))
        };

        self.gesture.set_config(config.gesture_config());
        self.sliders.set_delay(config.debounce());
        self.config = config;

        let changed = positions != *self.store.positions();
        self.store.reset(positions);
        log::debug!("Card reconfigured with {} entities", self.config.entities.len());
        if changed {
            self.positions_changed();
        }
        if pruned {
            self.selection_changed();
        }
        Ok(())
    }

    pub fn config(&self) -> &CardConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Identifier attached to editor notifications.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Committed positions.
    pub fn positions(&self) -> &PositionMap {
        self.store.positions()
    }

    /// Position to draw for `entity`, including an in-flight drag.
    pub fn displayed_position(&self, entity: &EntityRef) -> Option<Position> {
        match self.gesture.drag_preview() {
            Some((dragged, position)) if dragged == entity => Some(position),
            _ => self.store.get(entity),
        }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Selected entities in entity list order.
    pub fn selected_entities(&self) -> Vec<EntityRef> {
        self.selection
            .ordered(&self.config.entities)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn gesture_state(&self) -> &GestureState {
        self.gesture.state()
    }

    pub fn rubber_band_rect(&self) -> Option<Rect> {
        self.gesture.rubber_band_rect()
    }

    pub fn canvas_size(&self) -> Size {
        self.canvas
    }

    /// Set the canvas pixel size. An in-flight gesture is cancelled when the
    /// size actually changes.
    pub fn set_canvas_size(&mut self, size: Size) {
        if size == self.canvas {
            return;
        }
        log::debug!("Canvas resized to {}x{}", size.width, size.height);
        self.cancel_gesture();
        self.canvas = size;
    }

    pub fn can_undo(&self) -> bool {
        self.store.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.store.can_redo()
    }

    pub fn history_len(&self) -> usize {
        self.store.history_len()
    }

    /// Take all pending notifications.
    pub fn drain_events(&mut self) -> Vec<CardEvent> {
        std::mem::take(&mut self.events)
    }

    /// Committed positions as JSON, in entity order.
    pub fn positions_json(&self) -> Result<String, serde_json::Error> {
        positions_to_json(&self.config.entities, self.store.positions())
    }

    // --- Input ---

    /// Start receiving input from `source`.
    pub fn attach(&mut self, source: &mut impl InputSource) {
        source.subscribe();
        log::debug!("Card {} attached to input source", self.session_id);
    }

    /// Stop receiving input and tear down timers.
    ///
    /// The in-flight gesture is cancelled and buffered slider values are
    /// dropped without being sent.
    pub fn detach(&mut self, source: &mut impl InputSource) {
        source.unsubscribe();
        let outcomes = self.gesture.reset();
        self.apply(outcomes);
        let dropped = self.sliders.cancel();
        log::debug!(
            "Card {} detached, {} pending slider values dropped",
            self.session_id,
            dropped
        );
    }

    /// Dispatch everything `source` has buffered. Returns the number of events.
    pub fn pump(&mut self, source: &mut impl InputSource) -> usize {
        let events = source.poll_events();
        let count = events.len();
        for event in events {
            match event {
                InputEvent::Pointer(event) => self.handle_pointer(&event),
                InputEvent::Key(key) => {
                    self.handle_key(&key);
                }
            }
        }
        count
    }

    pub fn handle_pointer(&mut self, event: &PointerEvent) {
        let ctx = GestureContext {
            positions: self.store.positions(),
            order: &self.config.entities,
            selection: &self.selection,
            canvas: self.canvas,
        };
        let outcomes = self.gesture.handle(event, &ctx);
        self.apply(outcomes);
    }

    /// Keyboard shortcuts. Returns true if the key was handled and changed something.
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        if key.is("Escape") {
            let active = self.cancel_gesture();
            let cleared = self.clear_selection();
            return active || cleared;
        }
        if !key.modifiers.command() {
            return false;
        }
        if key.is("a") {
            self.select_all()
        } else if key.is("z") {
            if key.modifiers.shift { self.redo() } else { self.undo() }
        } else if key.is("y") {
            self.redo()
        } else {
            false
        }
    }

    /// Advance timers: the long-press and the slider debouncers.
    pub fn tick(&mut self, now: Instant) {
        if let Some(outcome) = self.gesture.tick(now) {
            self.apply_outcome(outcome);
        }
        for call in self.sliders.poll(now) {
            self.host.invoke(call);
        }
    }

    /// Earliest instant at which [`LightCard::tick`] has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.gesture.long_press_deadline(), self.sliders.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    // --- Positions ---

    pub fn undo(&mut self) -> bool {
        self.cancel_gesture();
        if !self.store.undo() {
            return false;
        }
        self.positions_changed();
        true
    }

    pub fn redo(&mut self) -> bool {
        self.cancel_gesture();
        if !self.store.redo() {
            return false;
        }
        self.positions_changed();
        true
    }

    /// Reposition every entity on a fresh grid.
    pub fn rearrange_all(&mut self) -> bool {
        self.cancel_gesture();
        if !self.store.commit(Some(rearrange(&self.config.entities))) {
            return false;
        }
        self.positions_changed();
        true
    }

    // --- Selection ---

    pub fn select_all(&mut self) -> bool {
        if !self.selection.select_all(&self.config.entities) {
            return false;
        }
        self.selection_changed();
        true
    }

    pub fn clear_selection(&mut self) -> bool {
        if !self.selection.clear() {
            return false;
        }
        self.selection_changed();
        true
    }

    /// Aggregate host state of the selection.
    pub fn selection_summary(&self) -> SelectionSummary {
        summarize(&self.host, self.selection.ordered(&self.config.entities))
    }

    // --- Controls ---

    /// Buffer a brightness change (percent) for the selection.
    pub fn set_brightness(&mut self, percent: u8, now: Instant) -> bool {
        let Some(call) = self.selection_call(LightCommand::Brightness(percent.min(100))) else {
            return false;
        };
        self.buffer(|sliders| &mut sliders.brightness, call, now);
        true
    }

    /// Buffer a color temperature change for the selection.
    pub fn set_color_temp(&mut self, kelvin: u32, now: Instant) -> bool {
        let kelvin = kelvin.clamp(MIN_KELVIN, MAX_KELVIN);
        let Some(call) = self.selection_call(LightCommand::ColorTemp(kelvin)) else {
            return false;
        };
        self.buffer(|sliders| &mut sliders.color_temp, call, now);
        true
    }

    /// Buffer a color change for the selection.
    pub fn set_rgb(&mut self, color: Rgb, now: Instant) -> bool {
        let Some(call) = self.selection_call(LightCommand::Rgb(color)) else {
            return false;
        };
        self.buffer(|sliders| &mut sliders.rgb, call, now);
        true
    }

    /// Buffer `call` on one slider. A value still pending for a different
    /// set of entities is sent first so it is not lost.
    fn buffer(&mut self, slider: fn(&mut Sliders) -> &mut Debouncer<ServiceCall>, call: ServiceCall, now: Instant) {
        let debouncer = slider(&mut self.sliders);
        let displaced = debouncer.take_if(|pending| pending.entity_ids != call.entity_ids);
        debouncer.push(call, now);
        if let Some(previous) = displaced {
            log::debug!("Selection changed, sending pending {}.{} early", previous.domain, previous.action);
            self.host.invoke(previous);
        }
    }

    /// Pick a color from the wheel at polar coordinates.
    pub fn set_wheel_color(&mut self, angle_degrees: f64, radius_fraction: f64, now: Instant) -> bool {
        self.set_rgb(wheel_sample(angle_degrees, radius_fraction.clamp(0.0, 1.0)), now)
    }

    /// Send every buffered slider value now (slider released).
    pub fn commit_sliders(&mut self) -> usize {
        let calls = self.sliders.flush();
        let count = calls.len();
        for call in calls {
            self.host.invoke(call);
        }
        count
    }

    /// Toggle every selected entity immediately.
    pub fn toggle_selected(&mut self) -> bool {
        let Some(call) = self.selection_call(LightCommand::Toggle) else {
            return false;
        };
        self.host.invoke(call);
        true
    }

    fn selection_call(&self, command: LightCommand) -> Option<ServiceCall> {
        let entities = self.selected_entities();
        if entities.is_empty() {
            return None;
        }
        Some(command.to_service_call(entities))
    }

    // --- Gesture outcomes ---

    /// Cancel the in-flight gesture. Returns true if one was active.
    fn cancel_gesture(&mut self) -> bool {
        let active = !self.gesture.is_idle();
        let outcomes = self.gesture.cancel();
        self.apply(outcomes);
        active
    }

    fn apply(&mut self, outcomes: Vec<GestureOutcome>) {
        for outcome in outcomes {
            self.apply_outcome(outcome);
        }
    }

    fn apply_outcome(&mut self, outcome: GestureOutcome) {
        match outcome {
            GestureOutcome::Tap { entity, additive } => {
                if self.selection.tap(&entity, additive) {
                    self.selection_changed();
                }
            }
            GestureOutcome::Toggle { entity } => {
                self.host
                    .invoke(LightCommand::Toggle.to_service_call(vec![entity.clone()]));
                self.events.push(CardEvent::Toggled { entity });
            }
            GestureOutcome::LongPress { entity } => {
                self.events.push(CardEvent::LongPress { entity });
            }
            GestureOutcome::DragStarted { .. } => {}
            GestureOutcome::DragMoved { entity, position } => {
                self.events.push(CardEvent::DragPreview { entity, position });
            }
            GestureOutcome::DragCommitted { entity, position } => {
                if self.store.set(&entity, position) {
                    self.positions_changed();
                }
            }
            GestureOutcome::DragCancelled { entity } => {
                if let Some(position) = self.store.get(&entity) {
                    self.events.push(CardEvent::DragPreview { entity, position });
                }
            }
            GestureOutcome::RubberBandUpdated {
                rect,
                enclosed,
                additive,
                base,
            } => {
                self.events.push(CardEvent::RubberBand { rect });
                if self.selection.rubber_band_commit(&enclosed, additive, Some(&base)) {
                    self.selection_changed();
                }
            }
            GestureOutcome::RubberBandFinished => {
                self.events.push(CardEvent::RubberBandCleared);
            }
            GestureOutcome::RubberBandCancelled { base } => {
                if self.selection != base {
                    self.selection = base;
                    self.selection_changed();
                }
                self.events.push(CardEvent::RubberBandCleared);
            }
        }
    }

    fn positions_changed(&mut self) {
        let positions = self.store.positions().clone();
        if self.config.edit_mode {
            self.events.push(CardEvent::ConfigChanged {
                positions: positions.clone(),
                session_id: self.session_id,
            });
        }
        self.events.push(CardEvent::PositionsChanged { positions });
    }

    fn selection_changed(&mut self) {
        let selected = self.selected_entities();
        self.events.push(CardEvent::SelectionChanged { selected });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{EntityState, LightAttributes, RecordingHost};
    use crate::input::{Modifiers, PointerKind, ScriptedInput};
    use kurbo::Point;
    use serde_json::json;

    const CANVAS: Size = Size::new(400.0, 400.0);

    fn e(name: &str) -> EntityRef {
        EntityRef::new(name)
    }

    /// light.a at the centre (200, 200 px), light.b at (40, 40 px).
    fn config() -> CardConfig {
        let mut config = CardConfig::new(vec![e("light.a"), e("light.b")]);
        config.positions.insert(e("light.a"), Position::new(50.0, 50.0));
        config.positions.insert(e("light.b"), Position::new(10.0, 10.0));
        config.snap_to_grid = false;
        config
    }

    fn card_with(config: CardConfig) -> LightCard<RecordingHost> {
        let mut card = LightCard::new(config, RecordingHost::new()).unwrap();
        card.set_canvas_size(CANVAS);
        card
    }

    fn card() -> LightCard<RecordingHost> {
        card_with(config())
    }

    fn down_with(x: f64, y: f64, time: Instant, modifiers: Modifiers) -> PointerEvent {
        PointerEvent::Down {
            position: Point::new(x, y),
            target: None,
            kind: PointerKind::Mouse,
            modifiers,
            time,
        }
    }

    fn down(x: f64, y: f64, time: Instant) -> PointerEvent {
        down_with(x, y, time, Modifiers::NONE)
    }

    fn mv(x: f64, y: f64, time: Instant) -> PointerEvent {
        PointerEvent::Move {
            position: Point::new(x, y),
            modifiers: Modifiers::NONE,
            time,
        }
    }

    fn up(x: f64, y: f64, time: Instant) -> PointerEvent {
        PointerEvent::Up {
            position: Point::new(x, y),
            time,
        }
    }

    fn ms(t0: Instant, millis: u64) -> Instant {
        t0 + Duration::from_millis(millis)
    }

    fn ctrl() -> Modifiers {
        Modifiers {
            ctrl: true,
            ..Modifiers::NONE
        }
    }

    fn drag_a_to_60(card: &mut LightCard<RecordingHost>, t0: Instant) {
        card.handle_pointer(&down(200.0, 200.0, t0));
        card.handle_pointer(&mv(240.0, 200.0, ms(t0, 20)));
        card.handle_pointer(&up(240.0, 200.0, ms(t0, 40)));
    }

    #[test]
    fn test_missing_positions_are_laid_out() {
        let mut config = CardConfig::new(vec![e("light.a"), e("light.b"), e("light.c")]);
        config.positions.insert(e("light.b"), Position::new(5.0, 5.0));
        let card = card_with(config);
        assert_eq!(card.positions().len(), 3);
        assert_eq!(card.positions()[&e("light.b")], Position::new(5.0, 5.0));
        assert_eq!(card.history_len(), 1);
    }

    #[test]
    fn test_unreadable_override_is_laid_out() {
        let config = CardConfig::from_json(
            r#"{
                "entities": ["light.a", "light.b"],
                "positions": {"light.a": {"x": 1e400, "y": 5}, "light.b": {"x": 10, "y": 20}}
            }"#,
        )
        .unwrap();
        let card = card_with(config);
        let placed = card.positions()[&e("light.a")];
        assert!(placed.is_finite());
        assert!((0.0..=100.0).contains(&placed.x) && (0.0..=100.0).contains(&placed.y));
        assert_eq!(card.positions()[&e("light.b")], Position::new(10.0, 20.0));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = CardConfig::new(vec![e("light.a"), e("light.a")]);
        assert!(LightCard::new(config, RecordingHost::new()).is_err());
    }

    #[test]
    fn test_drag_commit_records_history() {
        let t0 = Instant::now();
        let mut card = card();
        card.handle_pointer(&down(200.0, 200.0, t0));
        card.handle_pointer(&mv(240.0, 200.0, ms(t0, 20)));
        assert_eq!(card.displayed_position(&e("light.a")), Some(Position::new(60.0, 50.0)));
        // Not committed until release.
        assert_eq!(card.positions()[&e("light.a")], Position::new(50.0, 50.0));

        card.handle_pointer(&up(240.0, 200.0, ms(t0, 40)));
        assert_eq!(card.positions()[&e("light.a")], Position::new(60.0, 50.0));
        assert_eq!(card.history_len(), 2);
        assert!(card.can_undo());

        let events = card.drain_events();
        assert!(events.contains(&CardEvent::DragPreview {
            entity: e("light.a"),
            position: Position::new(60.0, 50.0)
        }));
        assert!(matches!(events.last(), Some(CardEvent::PositionsChanged { .. })));
        assert!(!events.iter().any(|ev| matches!(ev, CardEvent::ConfigChanged { .. })));
    }

    #[test]
    fn test_edit_mode_notifies_editor() {
        let t0 = Instant::now();
        let mut config = config();
        config.edit_mode = true;
        let mut card = card_with(config);
        drag_a_to_60(&mut card, t0);

        let session = card.session_id();
        let events = card.drain_events();
        let Some(CardEvent::ConfigChanged { positions, session_id }) =
            events.iter().find(|ev| matches!(ev, CardEvent::ConfigChanged { .. }))
        else {
            panic!("expected editor notification");
        };
        assert_eq!(*session_id, session);
        assert_eq!(positions[&e("light.a")], Position::new(60.0, 50.0));
    }

    #[test]
    fn test_cancelled_drag_restores_display() {
        let t0 = Instant::now();
        let mut card = card();
        card.handle_pointer(&down(200.0, 200.0, t0));
        card.handle_pointer(&mv(300.0, 300.0, ms(t0, 10)));
        card.handle_pointer(&PointerEvent::Cancel);

        assert_eq!(card.displayed_position(&e("light.a")), Some(Position::new(50.0, 50.0)));
        assert_eq!(card.history_len(), 1);
        assert_eq!(
            card.drain_events().last(),
            Some(&CardEvent::DragPreview {
                entity: e("light.a"),
                position: Position::new(50.0, 50.0)
            })
        );
    }

    #[test]
    fn test_tap_and_additive_tap() {
        let t0 = Instant::now();
        let mut card = card();
        card.handle_pointer(&down(200.0, 200.0, t0));
        card.handle_pointer(&up(200.0, 200.0, ms(t0, 30)));
        assert_eq!(card.selected_entities(), vec![e("light.a")]);

        let shift = Modifiers {
            shift: true,
            ..Modifiers::NONE
        };
        card.handle_pointer(&down_with(40.0, 40.0, ms(t0, 100), shift));
        card.handle_pointer(&up(40.0, 40.0, ms(t0, 130)));
        assert_eq!(card.selected_entities(), vec![e("light.a"), e("light.b")]);

        card.handle_pointer(&down_with(40.0, 40.0, ms(t0, 200), shift));
        card.handle_pointer(&up(40.0, 40.0, ms(t0, 230)));
        assert_eq!(card.selected_entities(), vec![e("light.a")]);

        // Taps never move anything.
        assert_eq!(card.history_len(), 1);
    }

    #[test]
    fn test_rubber_band_then_cancel_restores_selection() {
        let t0 = Instant::now();
        let mut card = card();
        card.handle_pointer(&down(200.0, 200.0, t0));
        card.handle_pointer(&up(200.0, 200.0, ms(t0, 10)));
        card.drain_events();

        card.handle_pointer(&down(0.0, 0.0, ms(t0, 100)));
        card.handle_pointer(&mv(100.0, 100.0, ms(t0, 120)));
        assert_eq!(card.selected_entities(), vec![e("light.b")]);
        assert_eq!(card.rubber_band_rect(), Some(Rect::new(0.0, 0.0, 100.0, 100.0)));

        card.handle_pointer(&PointerEvent::LostCapture);
        assert_eq!(card.selected_entities(), vec![e("light.a")]);
        assert!(card.rubber_band_rect().is_none());

        let events = card.drain_events();
        assert_eq!(events.last(), Some(&CardEvent::RubberBandCleared));
        assert!(events.contains(&CardEvent::RubberBand {
            rect: Rect::new(0.0, 0.0, 100.0, 100.0)
        }));
    }

    #[test]
    fn test_background_click_clears_selection() {
        let t0 = Instant::now();
        let mut card = card();
        card.select_all();
        card.handle_pointer(&down(390.0, 10.0, t0));
        card.handle_pointer(&up(390.0, 10.0, ms(t0, 10)));
        assert!(card.selection().is_empty());
    }

    #[test]
    fn test_keyboard_undo_redo() {
        let t0 = Instant::now();
        let mut card = card();
        drag_a_to_60(&mut card, t0);

        assert!(card.handle_key(&KeyEvent::new("z", ctrl())));
        assert_eq!(card.positions()[&e("light.a")], Position::new(50.0, 50.0));
        assert!(!card.handle_key(&KeyEvent::new("z", ctrl())));

        let redo = Modifiers {
            shift: true,
            ..ctrl()
        };
        assert!(card.handle_key(&KeyEvent::new("Z", redo)));
        assert_eq!(card.positions()[&e("light.a")], Position::new(60.0, 50.0));

        card.undo();
        let meta = Modifiers {
            meta: true,
            ..Modifiers::NONE
        };
        assert!(card.handle_key(&KeyEvent::new("y", meta)));
        assert_eq!(card.positions()[&e("light.a")], Position::new(60.0, 50.0));

        // Without a command modifier these are plain keys.
        assert!(!card.handle_key(&KeyEvent::new("z", Modifiers::NONE)));
    }

    #[test]
    fn test_select_all_and_escape() {
        let mut card = card();
        assert!(card.handle_key(&KeyEvent::new("a", ctrl())));
        assert_eq!(card.selection().len(), 2);
        assert!(card.handle_key(&KeyEvent::new("Escape", Modifiers::NONE)));
        assert!(card.selection().is_empty());
        assert!(!card.handle_key(&KeyEvent::new("Escape", Modifiers::NONE)));
    }

    #[test]
    fn test_escape_cancels_drag() {
        let t0 = Instant::now();
        let mut card = card();
        card.handle_pointer(&down(200.0, 200.0, t0));
        card.handle_pointer(&mv(260.0, 200.0, ms(t0, 10)));
        assert!(card.handle_key(&KeyEvent::new("Escape", Modifiers::NONE)));
        assert!(matches!(card.gesture_state(), GestureState::Idle));
        card.handle_pointer(&up(260.0, 200.0, ms(t0, 20)));
        assert_eq!(card.positions()[&e("light.a")], Position::new(50.0, 50.0));
    }

    #[test]
    fn test_rearrange_all() {
        let mut card = card();
        assert!(card.rearrange_all());
        assert_eq!(card.positions(), &rearrange(&card.config().entities));
        assert_eq!(card.history_len(), 2);
        assert!(!card.rearrange_all());
    }

    #[test]
    fn test_brightness_is_debounced() {
        let t0 = Instant::now();
        let mut card = card();
        card.select_all();
        assert!(card.set_brightness(20, t0));
        assert!(card.set_brightness(40, ms(t0, 100)));
        assert!(card.set_brightness(60, ms(t0, 200)));

        card.tick(ms(t0, 400));
        assert!(card.host().calls().is_empty());
        assert_eq!(card.next_deadline(), Some(ms(t0, 500)));

        card.tick(ms(t0, 500));
        let calls = card.host_mut().take_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].params["brightness_pct"], json!(60));
        assert_eq!(calls[0].entity_ids, vec![e("light.a"), e("light.b")]);

        card.tick(ms(t0, 2000));
        assert!(card.host().calls().is_empty());
    }

    #[test]
    fn test_sliders_need_a_selection() {
        let t0 = Instant::now();
        let mut card = card();
        assert!(!card.set_brightness(50, t0));
        assert!(!card.set_wheel_color(120.0, 1.0, t0));
        assert!(!card.toggle_selected());
        assert_eq!(card.commit_sliders(), 0);
        assert!(card.host().calls().is_empty());
    }

    #[test]
    fn test_commit_sliders_flushes_each_once() {
        let t0 = Instant::now();
        let mut card = card();
        card.select_all();
        card.set_color_temp(20000, t0);
        card.set_wheel_color(0.0, 1.0, t0);
        assert_eq!(card.commit_sliders(), 2);

        let calls = card.host_mut().take_calls();
        assert_eq!(calls[0].params["color_temp_kelvin"], json!(MAX_KELVIN));
        assert_eq!(calls[1].params["rgb_color"], json!(wheel_sample(0.0, 1.0).to_array()));
        card.tick(ms(t0, 5000));
        assert!(card.host().calls().is_empty());
    }

    #[test]
    fn test_pending_slider_value_survives_selection_change() {
        let t0 = Instant::now();
        let mut card = card();
        card.handle_pointer(&down(200.0, 200.0, t0));
        card.handle_pointer(&up(200.0, 200.0, ms(t0, 20)));
        assert!(card.set_brightness(20, ms(t0, 30)));

        card.handle_pointer(&down(40.0, 40.0, ms(t0, 400)));
        card.handle_pointer(&up(40.0, 40.0, ms(t0, 420)));
        assert_eq!(card.selected_entities(), vec![e("light.b")]);
        assert!(card.set_brightness(70, ms(t0, 430)));
        assert!(card.set_brightness(80, ms(t0, 440)));
        card.tick(ms(t0, 2000));

        let calls = card.host_mut().take_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].entity_ids, vec![e("light.a")]);
        assert_eq!(calls[0].params["brightness_pct"], json!(20));
        assert_eq!(calls[1].entity_ids, vec![e("light.b")]);
        assert_eq!(calls[1].params["brightness_pct"], json!(80));
    }

    #[test]
    fn test_toggle_selected() {
        let mut card = card();
        card.select_all();
        assert!(card.toggle_selected());
        let call = &card.host().calls()[0];
        assert_eq!(call.domain, "homeassistant");
        assert_eq!(call.action, "toggle");
    }

    #[test]
    fn test_long_press_event() {
        let t0 = Instant::now();
        let mut config = config();
        config.lock_positions = true;
        let mut card = card_with(config);
        card.handle_pointer(&down(200.0, 200.0, t0));
        assert_eq!(card.next_deadline(), Some(ms(t0, 500)));
        card.tick(ms(t0, 499));
        assert!(card.drain_events().is_empty());

        card.tick(ms(t0, 500));
        assert_eq!(card.drain_events(), vec![CardEvent::LongPress { entity: e("light.a") }]);

        card.handle_pointer(&up(200.0, 200.0, ms(t0, 700)));
        assert!(card.selection().is_empty());
    }

    #[test]
    fn test_double_tap_toggles_entity() {
        let t0 = Instant::now();
        let mut config = config();
        config.lock_positions = true;
        config.toggle_on_tap = true;
        let mut card = card_with(config);
        card.handle_pointer(&down(200.0, 200.0, t0));
        card.handle_pointer(&up(200.0, 200.0, ms(t0, 40)));
        card.handle_pointer(&down(200.0, 200.0, ms(t0, 150)));
        card.handle_pointer(&up(200.0, 200.0, ms(t0, 190)));

        let calls = card.host().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].entity_ids, vec![e("light.a")]);
        assert!(card.drain_events().contains(&CardEvent::Toggled { entity: e("light.a") }));
    }

    #[test]
    fn test_detach_drops_pending_work() {
        let t0 = Instant::now();
        let mut card = card();
        let mut input = ScriptedInput::new();
        card.attach(&mut input);
        assert!(input.is_subscribed());

        card.select_all();
        card.set_brightness(10, t0);
        card.handle_pointer(&down(200.0, 200.0, t0));
        card.handle_pointer(&mv(260.0, 200.0, ms(t0, 10)));

        card.detach(&mut input);
        assert!(!input.is_subscribed());
        assert!(matches!(card.gesture_state(), GestureState::Idle));
        card.tick(ms(t0, 5000));
        assert!(card.host().calls().is_empty());
        assert_eq!(card.positions()[&e("light.a")], Position::new(50.0, 50.0));
    }

    #[test]
    fn test_pump_dispatches_only_while_attached() {
        let t0 = Instant::now();
        let mut card = card();
        let mut input: ScriptedInput = [
            InputEvent::Pointer(down(200.0, 200.0, t0)),
            InputEvent::Pointer(up(200.0, 200.0, ms(t0, 10))),
            InputEvent::Key(KeyEvent::new("a", ctrl())),
        ]
        .into_iter()
        .collect();

        assert_eq!(card.pump(&mut input), 0);
        card.attach(&mut input);
        assert_eq!(card.pump(&mut input), 3);
        assert_eq!(card.selection().len(), 2);
    }

    #[test]
    fn test_reconfigure_keeps_survivors() {
        let mut card = card();
        card.select_all();
        card.drain_events();

        card.reconfigure(CardConfig::new(vec![e("light.a"), e("light.c")])).unwrap();
        assert_eq!(card.positions().len(), 2);
        assert_eq!(card.positions()[&e("light.a")], Position::new(50.0, 50.0));
        assert!(card.positions().contains_key(&e("light.c")));
        assert_eq!(card.selected_entities(), vec![e("light.a")]);
        assert_eq!(card.history_len(), 1);

        let events = card.drain_events();
        assert!(events.iter().any(|ev| matches!(ev, CardEvent::PositionsChanged { .. })));
        assert!(events.contains(&CardEvent::SelectionChanged {
            selected: vec![e("light.a")]
        }));
    }

    #[test]
    fn test_reconfigure_rejects_invalid() {
        let mut card = card();
        let mut bad = config();
        bad.grid_size = -1.0;
        assert!(card.reconfigure(bad).is_err());
        assert_eq!(card.positions().len(), 2);
    }

    #[test]
    fn test_selection_summary() {
        let mut card = card();
        card.host_mut().set_state(
            e("light.a"),
            EntityState {
                is_on: true,
                attributes: LightAttributes {
                    brightness: Some(128),
                    ..Default::default()
                },
            },
        );
        assert_eq!(card.selection_summary(), SelectionSummary::default());
        card.select_all();
        let summary = card.selection_summary();
        assert!(summary.any_on);
        assert_eq!(summary.brightness_pct, Some(50));
    }

    #[test]
    fn test_positions_json() {
        let card = card();
        let value: serde_json::Value = serde_json::from_str(&card.positions_json().unwrap()).unwrap();
        assert_eq!(value["light.b"], json!({"x": 10.0, "y": 10.0}));
    }
}
