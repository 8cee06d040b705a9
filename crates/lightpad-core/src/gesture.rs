//! Pointer gesture state machine.
//!
//! Turns a raw pointer stream into exactly one of tap, long-press, drag or
//! rubber-band selection per gesture. The machine never touches the position
//! store or selection directly; it reports [`GestureOutcome`]s and the card
//! applies them.
//!
//! Time is taken from event timestamps and [`GestureMachine::tick`], so a
//! long-press and a drag starting from the same pointer-down are resolved by
//! whichever threshold is crossed first in event time.

use crate::input::{Instant, Modifiers, PointerEvent, PointerKind};
use crate::position::{EntityRef, Position, PositionMap, pixel_delta_to_percent};
use crate::selection::Selection;
use crate::snap::{DEFAULT_GRID_SIZE, should_snap, snap};
use kurbo::{Point, Rect, Size};
use std::collections::HashSet;
use std::time::Duration;

/// Pointer travel (px) that turns a mouse press into a drag.
pub const DEFAULT_DRAG_THRESHOLD_MOUSE: f64 = 3.0;
/// Pointer travel (px) that turns a touch press into a drag.
pub const DEFAULT_DRAG_THRESHOLD_TOUCH: f64 = 12.0;
/// Hold time before a mouse press becomes a long-press.
pub const DEFAULT_LONG_PRESS_MOUSE_MS: u64 = 500;
/// Hold time before a touch press becomes a long-press.
pub const DEFAULT_LONG_PRESS_TOUCH_MS: u64 = 650;
/// Window in which a second tap on the same entity counts as a double-tap.
pub const DEFAULT_DOUBLE_TAP_MS: u64 = 350;
/// Diameter (px) of the hit area around an entity centre.
pub const DEFAULT_ICON_SIZE: f64 = 56.0;

/// Tunables for gesture recognition.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureConfig {
    /// Positions are locked: presses select/tap and only move past the drag threshold.
    pub lock_positions: bool,
    /// A double-tap toggles the entity instead of selecting it.
    pub toggle_on_tap: bool,
    pub drag_threshold_mouse: f64,
    pub drag_threshold_touch: f64,
    pub long_press_mouse: Duration,
    pub long_press_touch: Duration,
    pub double_tap: Duration,
    /// Snap while dragging unless the snap modifier is held.
    pub snap_to_grid: bool,
    pub grid_size: f64,
    pub icon_size: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            lock_positions: false,
            toggle_on_tap: false,
            drag_threshold_mouse: DEFAULT_DRAG_THRESHOLD_MOUSE,
            drag_threshold_touch: DEFAULT_DRAG_THRESHOLD_TOUCH,
            long_press_mouse: Duration::from_millis(DEFAULT_LONG_PRESS_MOUSE_MS),
            long_press_touch: Duration::from_millis(DEFAULT_LONG_PRESS_TOUCH_MS),
            double_tap: Duration::from_millis(DEFAULT_DOUBLE_TAP_MS),
            snap_to_grid: true,
            grid_size: DEFAULT_GRID_SIZE,
            icon_size: DEFAULT_ICON_SIZE,
        }
    }
}

impl GestureConfig {
    pub fn drag_threshold(&self, kind: PointerKind) -> f64 {
        match kind {
            PointerKind::Mouse => self.drag_threshold_mouse,
            PointerKind::Touch | PointerKind::Pen => self.drag_threshold_touch,
        }
    }

    pub fn long_press_delay(&self, kind: PointerKind) -> Duration {
        match kind {
            PointerKind::Mouse => self.long_press_mouse,
            PointerKind::Touch | PointerKind::Pen => self.long_press_touch,
        }
    }
}

/// Read-only view of the card the machine needs to interpret events.
#[derive(Debug, Clone, Copy)]
pub struct GestureContext<'a> {
    pub positions: &'a PositionMap,
    /// Entity order, used to break hit-test ties deterministically.
    pub order: &'a [EntityRef],
    pub selection: &'a Selection,
    pub canvas: Size,
}

/// Current gesture.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    /// Pressed on an entity; waiting to see if this is a tap, drag or long-press.
    PendingTap {
        entity: EntityRef,
        origin: Point,
        started: Instant,
        kind: PointerKind,
        additive: bool,
    },
    /// Long-press fired; the rest of the gesture is swallowed.
    LongPressed { entity: EntityRef },
    Dragging {
        entity: EntityRef,
        origin: Point,
        /// Entity position when the drag began, frozen for the whole drag.
        initial: Position,
        /// Displayed, not yet committed, position.
        current: Position,
        kind: PointerKind,
        additive: bool,
        /// Pointer travelled past the drag threshold.
        moved: bool,
    },
    RubberBandSelecting {
        origin: Point,
        current: Point,
        additive: bool,
        /// Selection at the time the band started.
        base: Selection,
    },
}

/// Something the card must act on.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureOutcome {
    Tap {
        entity: EntityRef,
        additive: bool,
    },
    /// Double-tap in toggle-on-tap mode.
    Toggle { entity: EntityRef },
    /// Secondary action, e.g. open the detail view.
    LongPress { entity: EntityRef },
    DragStarted { entity: EntityRef },
    DragMoved {
        entity: EntityRef,
        position: Position,
    },
    DragCommitted {
        entity: EntityRef,
        position: Position,
    },
    DragCancelled { entity: EntityRef },
    RubberBandUpdated {
        rect: Rect,
        enclosed: HashSet<EntityRef>,
        additive: bool,
        base: Selection,
    },
    RubberBandFinished,
    RubberBandCancelled { base: Selection },
}

/// Interprets pointer events into gestures.
#[derive(Debug, Clone, Default)]
pub struct GestureMachine {
    config: GestureConfig,
    state: GestureState,
    /// Last completed tap, for double-tap detection.
    last_tap: Option<(EntityRef, Instant)>,
}

impl GestureMachine {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            state: GestureState::Idle,
            last_tap: None,
        }
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// Replace the configuration. Any in-flight gesture is cancelled.
    pub fn set_config(&mut self, config: GestureConfig) -> Vec<GestureOutcome> {
        let outcomes = self.cancel();
        self.config = config;
        self.last_tap = None;
        outcomes
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == GestureState::Idle
    }

    /// Entity being dragged and its displayed position.
    pub fn drag_preview(&self) -> Option<(&EntityRef, Position)> {
        match &self.state {
            GestureState::Dragging {
                entity, current, ..
            } => Some((entity, *current)),
            _ => None,
        }
    }

    /// The rubber band rectangle in canvas pixels.
    pub fn rubber_band_rect(&self) -> Option<Rect> {
        match &self.state {
            GestureState::RubberBandSelecting {
                origin, current, ..
            } => Some(Rect::from_points(*origin, *current)),
            _ => None,
        }
    }

    /// When the pending long-press will fire.
    pub fn long_press_deadline(&self) -> Option<Instant> {
        match &self.state {
            GestureState::PendingTap { started, kind, .. } => {
                Some(*started + self.config.long_press_delay(*kind))
            }
            _ => None,
        }
    }

    /// Feed one pointer event.
    pub fn handle(&mut self, event: &PointerEvent, ctx: &GestureContext<'_>) -> Vec<GestureOutcome> {
        match event {
            PointerEvent::Down {
                position,
                target,
                kind,
                modifiers,
                time,
            } => {
                let mut outcomes = self.cancel();
                outcomes.extend(self.pointer_down(*position, target.as_ref(), *kind, *modifiers, *time, ctx));
                outcomes
            }
            PointerEvent::Move {
                position,
                modifiers,
                time,
            } => {
                let mut outcomes: Vec<_> = self.tick(*time).into_iter().collect();
                outcomes.extend(self.pointer_move(*position, *modifiers, ctx));
                outcomes
            }
            PointerEvent::Up { position, time } => {
                let mut outcomes: Vec<_> = self.tick(*time).into_iter().collect();
                outcomes.extend(self.pointer_up(*position, *time, ctx));
                outcomes
            }
            PointerEvent::Cancel | PointerEvent::LostCapture => self.cancel(),
        }
    }

    /// Advance time. Fires the long-press if its delay has elapsed.
    pub fn tick(&mut self, now: Instant) -> Option<GestureOutcome> {
        let deadline = self.long_press_deadline()?;
        if now < deadline {
            return None;
        }
        let GestureState::PendingTap { entity, .. } = std::mem::take(&mut self.state) else {
            return None;
        };
        log::debug!("Long-press on {}", entity);
        self.state = GestureState::LongPressed {
            entity: entity.clone(),
        };
        Some(GestureOutcome::LongPress { entity })
    }

    /// Abort the current gesture and return to idle.
    ///
    /// A drag's uncommitted position is discarded; a rubber band reports the
    /// selection it started from.
    pub fn cancel(&mut self) -> Vec<GestureOutcome> {
        match std::mem::take(&mut self.state) {
            GestureState::Dragging { entity, .. } => {
                log::debug!("Drag of {} cancelled", entity);
                vec![GestureOutcome::DragCancelled { entity }]
            }
            GestureState::RubberBandSelecting { base, .. } => {
                log::debug!("Rubber band cancelled");
                vec![GestureOutcome::RubberBandCancelled { base }]
            }
            GestureState::PendingTap { .. } | GestureState::LongPressed { .. } | GestureState::Idle => {
                Vec::new()
            }
        }
    }

    /// Cancel and forget double-tap history (component teardown).
    pub fn reset(&mut self) -> Vec<GestureOutcome> {
        self.last_tap = None;
        self.cancel()
    }

    fn pointer_down(
        &mut self,
        position: Point,
        target: Option<&EntityRef>,
        kind: PointerKind,
        modifiers: Modifiers,
        time: Instant,
        ctx: &GestureContext<'_>,
    ) -> Vec<GestureOutcome> {
        let entity = match target {
            Some(entity) if ctx.positions.contains_key(entity) => Some(entity.clone()),
            Some(entity) => {
                log::debug!("Ignoring pointer-down on unknown entity {}", entity);
                return Vec::new();
            }
            None => self.hit_test(position, ctx),
        };

        let additive = modifiers.additive();
        let Some(entity) = entity else {
            log::debug!("Rubber band started at ({:.1}, {:.1})", position.x, position.y);
            self.state = GestureState::RubberBandSelecting {
                origin: position,
                current: position,
                additive,
                base: ctx.selection.clone(),
            };
            return Vec::new();
        };

        if self.config.lock_positions {
            self.state = GestureState::PendingTap {
                entity,
                origin: position,
                started: time,
                kind,
                additive,
            };
            return Vec::new();
        }

        // Unlocked: the press starts the drag immediately.
        let Some(initial) = ctx.positions.get(&entity).copied() else {
            return Vec::new();
        };
        log::debug!("Drag of {} started", entity);
        self.state = GestureState::Dragging {
            entity: entity.clone(),
            origin: position,
            initial,
            current: initial,
            kind,
            additive,
            moved: false,
        };
        vec![GestureOutcome::DragStarted { entity }]
    }

    fn pointer_move(&mut self, position: Point, modifiers: Modifiers, ctx: &GestureContext<'_>) -> Vec<GestureOutcome> {
        let mut outcomes = Vec::new();

        if let GestureState::PendingTap {
            entity,
            origin,
            kind,
            additive,
            ..
        } = &self.state
        {
            if origin.distance(position) <= self.config.drag_threshold(*kind) {
                return outcomes;
            }
            let Some(initial) = ctx.positions.get(entity).copied() else {
                self.state = GestureState::Idle;
                return outcomes;
            };
            log::debug!("Drag of {} started", entity);
            outcomes.push(GestureOutcome::DragStarted {
                entity: entity.clone(),
            });
            self.state = GestureState::Dragging {
                entity: entity.clone(),
                origin: *origin,
                initial,
                current: initial,
                kind: *kind,
                additive: *additive,
                moved: true,
            };
        }

        let config = &self.config;
        match &mut self.state {
            GestureState::Dragging {
                entity,
                origin,
                initial,
                current,
                kind,
                moved,
                ..
            } => {
                // Jitter inside the threshold may still end as a tap.
                if !*moved && origin.distance(position) <= config.drag_threshold(*kind) {
                    return outcomes;
                }
                *moved = true;
                *current = drag_position(config, *initial, position - *origin, modifiers, ctx.canvas);
                log::trace!("Drag of {} at ({:.2}, {:.2})", entity, current.x, current.y);
                outcomes.push(GestureOutcome::DragMoved {
                    entity: entity.clone(),
                    position: *current,
                });
            }
            GestureState::RubberBandSelecting {
                origin,
                current,
                additive,
                base,
            } => {
                *current = position;
                let rect = Rect::from_points(*origin, *current);
                outcomes.push(GestureOutcome::RubberBandUpdated {
                    rect,
                    enclosed: enclosed_entities(rect, ctx),
                    additive: *additive,
                    base: base.clone(),
                });
            }
            _ => {}
        }
        outcomes
    }

    fn pointer_up(&mut self, position: Point, time: Instant, ctx: &GestureContext<'_>) -> Vec<GestureOutcome> {
        match std::mem::take(&mut self.state) {
            GestureState::PendingTap {
                entity, additive, ..
            } => vec![self.complete_tap(entity, additive, time)],
            GestureState::Dragging {
                entity,
                current,
                additive,
                moved,
                ..
            } => {
                if moved {
                    log::debug!("Drag of {} committed at ({:.2}, {:.2})", entity, current.x, current.y);
                    vec![GestureOutcome::DragCommitted {
                        entity,
                        position: current,
                    }]
                } else {
                    // Never left the threshold: an unlocked press that is really a tap.
                    vec![
                        GestureOutcome::DragCancelled {
                            entity: entity.clone(),
                        },
                        self.complete_tap(entity, additive, time),
                    ]
                }
            }
            GestureState::RubberBandSelecting {
                origin,
                additive,
                base,
                ..
            } => {
                let rect = Rect::from_points(origin, position);
                vec![
                    GestureOutcome::RubberBandUpdated {
                        rect,
                        enclosed: enclosed_entities(rect, ctx),
                        additive,
                        base,
                    },
                    GestureOutcome::RubberBandFinished,
                ]
            }
            GestureState::LongPressed { .. } | GestureState::Idle => Vec::new(),
        }
    }

    fn complete_tap(&mut self, entity: EntityRef, additive: bool, time: Instant) -> GestureOutcome {
        if self.config.toggle_on_tap {
            if let Some((last, at)) = &self.last_tap {
                if *last == entity && time.saturating_duration_since(*at) <= self.config.double_tap {
                    self.last_tap = None;
                    log::debug!("Double-tap on {}", entity);
                    return GestureOutcome::Toggle { entity };
                }
            }
        }
        self.last_tap = Some((entity.clone(), time));
        GestureOutcome::Tap { entity, additive }
    }

    /// Nearest entity whose icon contains `point`.
    fn hit_test(&self, point: Point, ctx: &GestureContext<'_>) -> Option<EntityRef> {
        let radius = self.config.icon_size / 2.0;
        let mut best: Option<(&EntityRef, f64)> = None;
        for entity in ctx.order {
            let Some(position) = ctx.positions.get(entity) else {
                continue;
            };
            let distance = position.to_pixels(ctx.canvas).distance(point);
            if distance > radius {
                continue;
            }
            if best.is_none_or(|(_, d)| distance < d) {
                best = Some((entity, distance));
            }
        }
        best.map(|(entity, _)| entity.clone())
    }
}

/// Candidate position for a drag: offset by the pointer delta, snapped, then clamped.
fn drag_position(
    config: &GestureConfig,
    initial: Position,
    pointer_delta: kurbo::Vec2,
    modifiers: Modifiers,
    canvas: Size,
) -> Position {
    let candidate = initial.offset(pixel_delta_to_percent(pointer_delta, canvas));
    let snapping = should_snap(modifiers.snap_toggle(), config.snap_to_grid);
    snap(candidate, snapping, config.grid_size, canvas).clamped()
}

/// Entities whose centre lies inside `rect` (edges inclusive).
fn enclosed_entities(rect: Rect, ctx: &GestureContext<'_>) -> HashSet<EntityRef> {
    ctx.positions
        .iter()
        .filter(|(_, position)| {
            let p = position.to_pixels(ctx.canvas);
            p.x >= rect.x0 && p.x <= rect.x1 && p.y >= rect.y0 && p.y <= rect.y1
        })
        .map(|(entity, _)| entity.clone())
        .collect()
}
