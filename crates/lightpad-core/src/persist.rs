//! Position map persistence as human-readable JSON.

use crate::config::{ConfigError, overrides_from_json, sanitize_positions};
use crate::position::{EntityRef, PositionMap};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashSet;

/// Decimal places kept when positions are written out.
pub const PERSIST_DECIMALS: i32 = 2;

/// Serializes positions as a map keyed in entity list order.
struct OrderedPositions<'a> {
    entities: &'a [EntityRef],
    positions: &'a PositionMap,
}

impl Serialize for OrderedPositions<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let present = self.entities.iter().filter(|e| self.positions.contains_key(*e));
        let mut map = serializer.serialize_map(Some(present.clone().count()))?;
        for entity in present {
            if let Some(position) = self.positions.get(entity) {
                map.serialize_entry(entity, &position.rounded(PERSIST_DECIMALS))?;
            }
        }
        map.end()
    }
}

/// Write `positions` as pretty JSON, keys in `entities` order.
///
/// Entities without a position are skipped.
pub fn positions_to_json(entities: &[EntityRef], positions: &PositionMap) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&OrderedPositions { entities, positions })
}

/// Read a position map, keeping only well-formed entries for known entities.
///
/// Only a document that is not a JSON object is an error; unreadable
/// entries are dropped.
pub fn positions_from_json(json: &str, entities: &[EntityRef]) -> Result<PositionMap, ConfigError> {
    let parsed = overrides_from_json(json)?;
    let known: HashSet<&EntityRef> = entities.iter().collect();
    Ok(sanitize_positions(parsed, &known))
}
