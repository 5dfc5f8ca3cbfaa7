//! Sub-object discovery over an engine object's reference properties

use std::collections::HashSet;

use crate::engine::Engine;
use tether_api::{BridgeResult, EngineId};

/// Property names in traversal order: every group in order, each group's
/// properties in order, then properties that belong to no group. A name is
/// listed once even if several groups carry it.
pub fn ordered_property_names(
    engine: &dyn Engine,
    object: &EngineId,
) -> BridgeResult<Vec<String>> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();

    for group in 0..engine.property_group_count(object)? {
        for name in engine.group_property_names(object, group)? {
            if seen.insert(name.clone()) {
                names.push(name);
            }
        }
    }
    for name in engine.property_names(object)? {
        if seen.insert(name.clone()) {
            names.push(name);
        }
    }
    Ok(names)
}

/// Objects referenced by `object`, one entry per non-empty reference slot.
///
/// Duplicates are kept; the resolver's memo takes care of them.
pub fn sub_objects(engine: &dyn Engine, object: &EngineId) -> BridgeResult<Vec<EngineId>> {
    let mut subs = Vec::new();
    for name in ordered_property_names(engine, object)? {
        let Some(info) = engine.property(object, &name)? else {
            continue;
        };
        if !info.is_reference {
            continue;
        }
        for index in 0..engine.reference_count(object, &name)? {
            if let Some(target) = engine.reference_at(object, &name, index)? {
                subs.push(target);
            }
        }
    }
    Ok(subs)
}
