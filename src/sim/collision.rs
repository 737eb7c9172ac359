//! Swept collision detection and response
//!
//! Every moving circle is swept from its current position along this tick's
//! velocity against all other physical entities. The earliest contact wins;
//! the mover stops there, trades momentum with the obstacle along the contact
//! normal and slides on with whatever displacement is left, so several
//! obstacles in one tick's path are each met in order.

use glam::Vec2;

use super::ai;
use super::entity::{Entity, Prop, Shape};
use super::state::World;
use crate::heading;
use crate::tuning::Tuning;

/// Squared lengths below this are treated as zero
const EPSILON: f32 = 1e-8;

/// A projectile is spent once its weight is within this fraction of one
/// tick's decay of zero, which absorbs rounding on exact multiples
pub const SPENT_FRACTION: f32 = 1e-3;

/// First point of contact along a sweep
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Fraction of the displacement travelled before contact, in [0, 1]
    pub t: f32,
    /// Mover's centre at contact
    pub position: Vec2,
    /// Unit surface normal, pointing from the obstacle toward the mover
    pub normal: Vec2,
    /// Overlap already present at the start of the sweep
    pub penetration: f32,
}

impl Contact {
    /// Position that just touches the obstacle
    pub fn resolved_position(&self) -> Vec2 {
        self.position + self.normal * self.penetration
    }
}

/// Sweep a circle centred at `start` along `disp` against a static circle.
///
/// `radius` is the sum of both radii. A start position already inside the
/// obstacle reports a contact at `t = 0` with the depth to push out by.
/// Grazing (tangent) paths are not contacts.
pub fn sweep_circle_circle(start: Vec2, disp: Vec2, radius: f32, center: Vec2) -> Option<Contact> {
    let s = start - center;
    let c = s.length_squared() - radius * radius;

    if c < 0.0 {
        let dist = s.length();
        let normal = if dist * dist > EPSILON {
            s / dist
        } else {
            // Centres coincide: push back against the motion
            (-disp).try_normalize().unwrap_or(Vec2::Y)
        };
        return Some(Contact {
            t: 0.0,
            position: start,
            normal,
            penetration: radius - dist,
        });
    }

    let a = disp.length_squared();
    if a <= EPSILON {
        return None;
    }
    // Half-b form of |s + d t|^2 = r^2
    let b = s.dot(disp);
    if b >= 0.0 {
        return None;
    }
    let disc = b * b - a * c;
    if disc <= 0.0 {
        return None;
    }

    let t = (-b - disc.sqrt()) / a;
    if !(0.0..=1.0).contains(&t) {
        return None;
    }
    let position = start + disp * t;
    Some(Contact {
        t,
        position,
        normal: (position - center).normalize_or(Vec2::Y),
        penetration: 0.0,
    })
}

/// Endpoints of a line collider centred on `pos`, running along its facing
pub fn segment_endpoints(pos: Vec2, angle: f32, half_length: f32) -> (Vec2, Vec2) {
    let along = heading(angle) * half_length;
    (pos - along, pos + along)
}

/// Closest point to `p` on the segment `a`..`b`
pub fn closest_on_segment(p: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let ab = b - a;
    let len2 = ab.length_squared();
    if len2 <= EPSILON {
        return a;
    }
    let h = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    a + ab * h
}

/// Sweep a circle of `radius` against the segment `a`..`b`.
///
/// Tests the segment's face offset by `radius` toward the mover, then the
/// circles around both endpoints, and keeps the earliest hit. A zero-length
/// segment is treated as a point.
pub fn sweep_circle_segment(
    start: Vec2,
    disp: Vec2,
    radius: f32,
    a: Vec2,
    b: Vec2,
) -> Option<Contact> {
    let ab = b - a;
    let len2 = ab.length_squared();
    if len2 <= EPSILON {
        return sweep_circle_circle(start, disp, radius, a);
    }

    // Already overlapping
    let closest = closest_on_segment(start, a, b);
    let offset = start - closest;
    let dist2 = offset.length_squared();
    if dist2 < radius * radius {
        let dist = dist2.sqrt();
        let dir = ab / len2.sqrt();
        let face = Vec2::new(-dir.y, dir.x);
        let normal = if dist2 > EPSILON {
            offset / dist
        } else if face.dot(disp) > 0.0 {
            -face
        } else {
            face
        };
        return Some(Contact {
            t: 0.0,
            position: start,
            normal,
            penetration: radius - dist,
        });
    }

    let len = len2.sqrt();
    let dir = ab / len;
    let mut normal = Vec2::new(-dir.y, dir.x);
    let mut side = (start - a).dot(normal);
    if side < 0.0 {
        normal = -normal;
        side = -side;
    }

    let mut best: Option<Contact> = None;

    let approach = disp.dot(normal);
    if approach < 0.0 {
        let t = (side - radius) / -approach;
        if (0.0..=1.0).contains(&t) {
            let position = start + disp * t;
            let along = (position - a).dot(dir);
            if (0.0..=len).contains(&along) {
                best = Some(Contact {
                    t,
                    position,
                    normal,
                    penetration: 0.0,
                });
            }
        }
    }

    for end in [a, b] {
        if let Some(hit) = sweep_circle_circle(start, disp, radius, end) {
            if best.is_none_or(|b| hit.t < b.t) {
                best = Some(hit);
            }
        }
    }
    best
}

/// Sweep a circle against whatever shape `other` has
pub fn sweep_against(start: Vec2, disp: Vec2, radius: f32, other: &Entity) -> Option<Contact> {
    match other.collider.shape {
        Shape::Circle => {
            sweep_circle_circle(start, disp, radius + other.collider.size, other.pos)
        }
        Shape::Line => {
            let (a, b) = segment_endpoints(other.pos, other.angle, other.collider.size);
            sweep_circle_segment(start, disp, radius, a, b)
        }
    }
}

/// Velocity changes for two bodies meeting along `normal` (pointing toward A).
///
/// The closing speed is shared out by weight: each body takes the share of
/// the other's weight, so the lighter one is deflected more. A weight of zero
/// is immovable; two immovables exchange nothing.
pub fn exchange_impulse(va: Vec2, wa: f32, vb: Vec2, wb: f32, normal: Vec2) -> (Vec2, Vec2) {
    let closing = (vb - va).dot(normal);
    if closing <= 0.0 {
        return (Vec2::ZERO, Vec2::ZERO);
    }
    let a_fixed = wa == 0.0;
    let b_fixed = wb == 0.0;
    match (a_fixed, b_fixed) {
        (true, true) => (Vec2::ZERO, Vec2::ZERO),
        (true, false) => (Vec2::ZERO, -normal * closing),
        (false, true) => (normal * closing, Vec2::ZERO),
        (false, false) => {
            let sum = wa + wb;
            (normal * (closing * wb / sum), -normal * (closing * wa / sum))
        }
    }
}

/// Per-tick decay: projectiles lose weight, everything else slows down.
///
/// Returns `false` once a projectile is spent and must be removed.
pub fn apply_drag(e: &mut Entity, tuning: &Tuning) -> bool {
    if e.has(Prop::Projectile) {
        e.collider.weight -= tuning.projectile_weight_decay;
        e.collider.weight > tuning.projectile_weight_decay * SPENT_FRACTION
    } else {
        e.vel *= tuning.drag;
        true
    }
}

/// Whether the resolver sweeps this entity; everything else moves kinematically
pub fn sweeps(e: &Entity) -> bool {
    e.is_active()
        && e.collider.is_physical()
        && !e.collider.is_immovable()
        && e.collider.shape == Shape::Circle
}

/// A projectile never collides with the entity that fired it
fn related(a: &Entity, b: &Entity) -> bool {
    a.parent == Some(b.handle()) || b.parent == Some(a.handle())
}

/// Earliest contact along a sweep, ties going to the lowest slot
fn earliest_contact(
    world: &World,
    slot: usize,
    start: Vec2,
    disp: Vec2,
    skip: &[usize],
) -> Option<(usize, Contact)> {
    let me = &world.entities[slot];
    let radius = me.collider.size;
    let mut best: Option<(usize, Contact)> = None;

    for other in world.entities.iter() {
        let i = other.slot as usize;
        if i == slot || !other.collider.is_physical() || skip.contains(&i) || related(me, other) {
            continue;
        }
        if let Some(hit) = sweep_against(start, disp, radius, other) {
            if best.is_none_or(|(_, b)| hit.t < b.t) {
                best = Some((i, hit));
            }
        }
    }
    best
}

/// Projectile lands on a destructible: damage, attribution, removal
fn land_hit(world: &mut World, projectile: usize, victim: usize) {
    let damage = world.entities[projectile].damage;
    let attacker = world.entities[projectile].parent;
    let tick = world.tick;

    let v = &mut world.entities[victim];
    v.health -= damage;
    v.last_hit = tick;
    let has_ai = v.has(Prop::HasAi);
    log::debug!(
        "slot {projectile} hits slot {victim} for {damage} ({} left)",
        v.health
    );

    world.entities.release(projectile);
    if has_ai {
        ai::on_damaged(world, victim, attacker);
    }
}

/// Apply the consequences of `slot` meeting `other`.
///
/// Returns `false` if `slot` was consumed.
fn on_contact(world: &mut World, slot: usize, other: usize, contact: &Contact) -> bool {
    let tick = world.tick;
    let (va, wa) = (world.entities[slot].vel, world.entities[slot].collider.weight);
    let (vb, wb) = (world.entities[other].vel, world.entities[other].collider.weight);
    let (dva, dvb) = exchange_impulse(va, wa, vb, wb, contact.normal);

    let a = &mut world.entities[slot];
    a.vel += dva;
    a.last_collision = tick;
    let a_projectile = a.has(Prop::Projectile);
    let a_destructible = a.has(Prop::Destructible);

    let b = &mut world.entities[other];
    b.vel += dvb;
    b.last_collision = tick;
    let b_projectile = b.has(Prop::Projectile);
    let b_destructible = b.has(Prop::Destructible);

    if a_projectile && b_destructible {
        land_hit(world, slot, other);
        return false;
    }
    if b_projectile && a_destructible {
        land_hit(world, other, slot);
    }
    true
}

/// Move one entity through this tick, resolving every contact on the way
pub fn resolve_entity(world: &mut World, slot: usize) {
    if !sweeps(&world.entities[slot]) {
        return;
    }
    let alive = {
        let World {
            entities, tuning, ..
        } = world;
        apply_drag(&mut entities[slot], tuning)
    };
    if !alive {
        log::trace!("slot {slot}: projectile spent");
        world.entities.release(slot);
        return;
    }

    let is_projectile = world.entities[slot].has(Prop::Projectile);
    let max_contacts = world.tuning.max_contacts_per_tick as usize;
    let mut pos = world.entities[slot].pos;
    let mut remaining = world.entities[slot].vel;
    let mut met: Vec<usize> = Vec::new();

    loop {
        if met.len() >= max_contacts {
            break;
        }
        let Some((other, contact)) = earliest_contact(world, slot, pos, remaining, &met) else {
            pos += remaining;
            break;
        };
        met.push(other);

        let rest = remaining * (1.0 - contact.t);
        pos = contact.resolved_position();

        if !on_contact(world, slot, other, &contact) {
            return;
        }
        if is_projectile {
            break;
        }

        // Slide: drop the part of the leftover motion that points into the obstacle
        let into = rest.dot(contact.normal);
        remaining = if into < 0.0 {
            rest - contact.normal * into
        } else {
            rest
        };
    }

    world.entities[slot].pos = pos;
}

/// Resolve every sweeping entity in ascending slot order
pub fn resolve_all(world: &mut World) {
    let mut cursor = None;
    while let Some(slot) = world.entities.next_live(cursor) {
        resolve_entity(world, slot);
        cursor = Some(slot);
    }
}
