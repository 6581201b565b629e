//! Maps a sketch's entities onto a flat parameter vector the numeric solver
//! optimizes over. Mirrors each entity's own-DOF count from `Entity::dof`:
//! points get 2 params (x, y); circles get 1 (radius); arcs get 3 (radius,
//! start angle, end angle); ellipses get 3 (major radius, minor radius,
//! rotation); lines get none (they're defined entirely by their endpoints).

use std::collections::HashMap;

use sketch_store::{EntityId, EntityShape, Sketch};

#[derive(Debug, Clone)]
pub(crate) struct Layout {
    pub(crate) point_offset: HashMap<EntityId, usize>,
    pub(crate) circle_offset: HashMap<EntityId, usize>,
    pub(crate) arc_offset: HashMap<EntityId, usize>,
    pub(crate) ellipse_offset: HashMap<EntityId, usize>,
    pub(crate) len: usize,
}

pub(crate) fn build(sketch: &Sketch) -> (Layout, Vec<f64>) {
    let mut layout = Layout {
        point_offset: HashMap::new(),
        circle_offset: HashMap::new(),
        arc_offset: HashMap::new(),
        ellipse_offset: HashMap::new(),
        len: 0,
    };
    let mut params = Vec::new();

    for entity in sketch.entities() {
        match &entity.shape {
            EntityShape::Point { x, y, .. } => {
                layout.point_offset.insert(entity.id, params.len());
                params.push(*x);
                params.push(*y);
            }
            EntityShape::Circle { radius, .. } => {
                layout.circle_offset.insert(entity.id, params.len());
                params.push(*radius);
            }
            EntityShape::Arc {
                radius,
                start_angle,
                end_angle,
                ..
            } => {
                layout.arc_offset.insert(entity.id, params.len());
                params.push(*radius);
                params.push(*start_angle);
                params.push(*end_angle);
            }
            EntityShape::Ellipse {
                major_radius,
                minor_radius,
                rotation,
                ..
            } => {
                layout.ellipse_offset.insert(entity.id, params.len());
                params.push(*major_radius);
                params.push(*minor_radius);
                params.push(*rotation);
            }
            EntityShape::Line { .. } => {}
        }
    }

    layout.len = params.len();
    (layout, params)
}

/// Writes solved parameter values back into the sketch's entities.
pub(crate) fn write_back(sketch: &mut Sketch, layout: &Layout, params: &[f64]) {
    let point_ids: Vec<EntityId> = layout.point_offset.keys().copied().collect();
    for id in point_ids {
        let idx = layout.point_offset[&id];
        if let Some(entity) = sketch.get_entity_mut(id) {
            if let EntityShape::Point { x, y, .. } = &mut entity.shape {
                *x = params[idx];
                *y = params[idx + 1];
            }
        }
    }
    let circle_ids: Vec<EntityId> = layout.circle_offset.keys().copied().collect();
    for id in circle_ids {
        let idx = layout.circle_offset[&id];
        if let Some(entity) = sketch.get_entity_mut(id) {
            if let EntityShape::Circle { radius, .. } = &mut entity.shape {
                *radius = params[idx].max(0.0);
            }
        }
    }
    let arc_ids: Vec<EntityId> = layout.arc_offset.keys().copied().collect();
    for id in arc_ids {
        let idx = layout.arc_offset[&id];
        if let Some(entity) = sketch.get_entity_mut(id) {
            if let EntityShape::Arc {
                radius,
                start_angle,
                end_angle,
                ..
            } = &mut entity.shape
            {
                *radius = params[idx].max(0.0);
                *start_angle = params[idx + 1];
                *end_angle = params[idx + 2];
            }
        }
    }
    let ellipse_ids: Vec<EntityId> = layout.ellipse_offset.keys().copied().collect();
    for id in ellipse_ids {
        let idx = layout.ellipse_offset[&id];
        if let Some(entity) = sketch.get_entity_mut(id) {
            if let EntityShape::Ellipse {
                major_radius,
                minor_radius,
                rotation,
                ..
            } = &mut entity.shape
            {
                *major_radius = params[idx].max(0.0);
                *minor_radius = params[idx + 1].max(0.0);
                *rotation = params[idx + 2];
            }
            entity.enforce_ellipse_ordering();
        }
    }
}

pub(crate) fn point_xy(layout: &Layout, params: &[f64], id: EntityId) -> Option<(f64, f64)> {
    let idx = *layout.point_offset.get(&id)?;
    Some((params[idx], params[idx + 1]))
}

pub(crate) fn radius_index(sketch: &Sketch, layout: &Layout, id: EntityId) -> Option<usize> {
    match &sketch.get_entity(id)?.shape {
        EntityShape::Circle { .. } => layout.circle_offset.get(&id).copied(),
        EntityShape::Arc { .. } => layout.arc_offset.get(&id).copied(),
        _ => None,
    }
}

pub(crate) fn center_point_id(sketch: &Sketch, id: EntityId) -> Option<EntityId> {
    match &sketch.get_entity(id)?.shape {
        EntityShape::Circle { center, .. } => Some(*center),
        EntityShape::Arc { center, .. } => Some(*center),
        EntityShape::Ellipse { center, .. } => Some(*center),
        _ => None,
    }
}

pub(crate) fn line_endpoints(sketch: &Sketch, id: EntityId) -> Option<(EntityId, EntityId)> {
    match &sketch.get_entity(id)?.shape {
        EntityShape::Line { start, end } => Some((*start, *end)),
        _ => None,
    }
}
