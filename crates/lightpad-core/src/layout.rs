//! Automatic placement of entities that have no stored position.
//!
//! Entities are spread over a centered grid whose column count grows with
//! `sqrt(n * 1.5)`, so the scatter stays roughly square for any count.

use crate::position::{EntityRef, Position, PositionMap};

/// Compute `(cols, rows)` for `count` slots. Returns `(0, 0)` for no slots.
pub fn grid_dimensions(count: usize) -> (usize, usize) {
    if count == 0 {
        return (0, 0);
    }
    let cols = ((count as f64 * 1.5).sqrt().ceil() as usize).max(1);
    let rows = count.div_ceil(cols);
    (cols, rows)
}

/// Positions for `count` slots in row-major order.
pub fn scatter(count: usize) -> Vec<Position> {
    let (cols, rows) = grid_dimensions(count);
    if count == 0 {
        return Vec::new();
    }
    let spacing_x = 100.0 / (cols + 1) as f64;
    let spacing_y = 100.0 / (rows + 1) as f64;

    (0..count)
        .map(|i| {
            let col = i % cols;
            let row = i / cols;
            Position::new(spacing_x * (col + 1) as f64, spacing_y * (row + 1) as f64)
        })
        .collect()
}

/// Produce a complete position map for `entities`.
///
/// Entities already present in `existing` keep their position. The rest are
/// placed with [`scatter`] in list order. Entries in `existing` for entities
/// outside the list are not carried over.
pub fn layout(entities: &[EntityRef], existing: &PositionMap) -> PositionMap {
    let missing: Vec<&EntityRef> = entities
        .iter()
        .filter(|entity| !existing.contains_key(*entity))
        .collect();

    let mut result: PositionMap = entities
        .iter()
        .filter_map(|entity| existing.get(entity).map(|p| (entity.clone(), *p)))
        .collect();

    if !missing.is_empty() {
        log::debug!("Placing {} unpositioned entities", missing.len());
    }
    let slots = scatter(missing.len());
    for (entity, position) in missing.into_iter().zip(slots) {
        result.insert(entity.clone(), position);
    }
    result
}

/// Reposition every entity, ignoring any stored positions.
pub fn rearrange(entities: &[EntityRef]) -> PositionMap {
    entities.iter().cloned().zip(scatter(entities.len())).collect()
}
