//! Tick-driven AI state machine
//!
//! Every AI kind owns a run of states in the static [`AI_STATES`] table. A
//! state names the action to run while it is current, the state that follows
//! once its tick budget elapses, and the budget itself (0 = reactive: re-enter
//! and re-decide every tick).
//!
//! Actions are generic. They find the concrete state for a role (idle, chase,
//! windup, fire, death) through the entity kind's [`AiProfile`], so kinds that
//! only differ in timing share all of their behaviour.

use serde::{Deserialize, Serialize};

use super::entity::{Handle, Prop};
use super::state::World;
use crate::{angle_of, lerp_angle};

/// Deepest chain of state entries one call may trigger
const MAX_ENTRY_DEPTH: u8 = 8;

/// Stable index into [`AI_STATES`]; persisted in save states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateId(u8);

impl StateId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Checked conversion from a persisted index
    pub fn from_index(index: usize) -> Option<Self> {
        (index < AI_STATES.len()).then_some(Self(index as u8))
    }

    pub fn state(self) -> &'static AiState {
        &AI_STATES[self.index()]
    }
}

/// What part a state plays in the canonical behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AiRole {
    Idle,
    Move,
    Windup,
    Fire,
    Death,
}

/// Closed set of actions a state can run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiAction {
    /// Look for the player in front of us
    Scan,
    /// Turn toward and accelerate at the target
    Chase,
    /// Hold, face the target and brake before firing
    Windup,
    /// Shoot once along our facing
    Fire,
    /// Leave the world (splitting if the entity does)
    Die,
}

/// One node of the static state table
#[derive(Debug)]
pub struct AiState {
    pub name: &'static str,
    pub role: AiRole,
    pub action: Option<AiAction>,
    pub next: StateId,
    pub ticks: u64,
}

const fn st(
    name: &'static str,
    role: AiRole,
    action: AiAction,
    next: u8,
    ticks: u64,
) -> AiState {
    AiState {
        name,
        role,
        action: Some(action),
        next: StateId(next),
        ticks,
    }
}

/// All AI states of all kinds. Built at compile time, never mutated.
pub static AI_STATES: [AiState; 10] = [
    // Fighter
    st("fighter.idle", AiRole::Idle, AiAction::Scan, 0, 0),
    st("fighter.chase", AiRole::Move, AiAction::Chase, 1, 0),
    st("fighter.windup", AiRole::Windup, AiAction::Windup, 3, 30),
    st("fighter.fire", AiRole::Fire, AiAction::Fire, 2, 0),
    st("fighter.death", AiRole::Death, AiAction::Die, 4, 0),
    // Gunship: same behaviour, slower and heavier guns
    st("gunship.idle", AiRole::Idle, AiAction::Scan, 5, 0),
    st("gunship.chase", AiRole::Move, AiAction::Chase, 6, 0),
    st("gunship.windup", AiRole::Windup, AiAction::Windup, 8, 60),
    st("gunship.fire", AiRole::Fire, AiAction::Fire, 7, 0),
    st("gunship.death", AiRole::Death, AiAction::Die, 9, 0),
];

/// Which concrete state plays each role for one AI kind
#[derive(Debug, Clone, Copy)]
pub struct AiProfile {
    pub idle: StateId,
    pub chase: StateId,
    pub windup: StateId,
    pub fire: StateId,
    pub death: StateId,
}

impl AiProfile {
    pub fn for_role(&self, role: AiRole) -> StateId {
        match role {
            AiRole::Idle => self.idle,
            AiRole::Move => self.chase,
            AiRole::Windup => self.windup,
            AiRole::Fire => self.fire,
            AiRole::Death => self.death,
        }
    }
}

const FIGHTER: AiProfile = AiProfile {
    idle: StateId(0),
    chase: StateId(1),
    windup: StateId(2),
    fire: StateId(3),
    death: StateId(4),
};

const GUNSHIP: AiProfile = AiProfile {
    idle: StateId(5),
    chase: StateId(6),
    windup: StateId(7),
    fire: StateId(8),
    death: StateId(9),
};

/// AI-bearing entity kinds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum AiKind {
    #[default]
    Fighter = 0,
    Gunship = 1,
}

impl AiKind {
    pub const fn profile(self) -> &'static AiProfile {
        match self {
            AiKind::Fighter => &FIGHTER,
            AiKind::Gunship => &GUNSHIP,
        }
    }

    pub fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(AiKind::Fighter),
            1 => Some(AiKind::Gunship),
            _ => None,
        }
    }
}

/// Per-entity AI record
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Brain {
    pub kind: AiKind,
    /// `None` until the entity is put under AI control
    pub state: Option<StateId>,
    /// Tick at which the current state hands over to its `next`
    pub tick_end: u64,
    pub target: Option<Handle>,
}

impl Brain {
    /// Role of the current state
    pub fn role(&self) -> Option<AiRole> {
        self.state.map(|s| s.state().role)
    }
}

/// Put an entity under AI control in its idle state without running it
pub fn init(world: &mut World, slot: usize, kind: AiKind) {
    let idle = kind.profile().idle;
    let tick = world.tick;
    let brain = &mut world.entities[slot].ai;
    brain.kind = kind;
    brain.state = Some(idle);
    brain.tick_end = tick + idle.state().ticks;
    brain.target = None;
}

/// Install `next` as the current state and run its action once, right away
pub fn set_state(world: &mut World, slot: usize, next: StateId) {
    let tick = world.tick;
    let brain = &mut world.entities[slot].ai;
    let previous = brain.state;
    brain.state = Some(next);
    brain.tick_end = tick + next.state().ticks;

    if previous != Some(next) {
        log::trace!(
            "slot {slot}: {} -> {}",
            previous.map_or("none", |s| s.state().name),
            next.state().name
        );
    }

    if world.ai_depth >= MAX_ENTRY_DEPTH {
        log::warn!("slot {slot}: AI transition chain too deep, holding in {}", next.state().name);
        return;
    }
    world.ai_depth += 1;
    run_state(world, slot);
    world.ai_depth -= 1;
}

/// Run the current state's action without changing state
pub fn run_state(world: &mut World, slot: usize) {
    let Some(action) = world.entities[slot].ai.state.and_then(|s| s.state().action) else {
        return;
    };
    match action {
        AiAction::Scan => scan(world, slot),
        AiAction::Chase => chase(world, slot),
        AiAction::Windup => windup(world, slot),
        AiAction::Fire => fire(world, slot),
        AiAction::Die => world.kill(slot),
    }
}

/// Once-per-tick update for an AI-bearing entity
pub fn advance(world: &mut World, slot: usize) {
    let e = &world.entities[slot];
    if !e.is_active() {
        return;
    }
    let Some(current) = e.ai.state else {
        return;
    };
    if world.tick >= e.ai.tick_end {
        set_state(world, slot, current.state().next);
    } else {
        run_state(world, slot);
    }
}

/// Send an entity into its death state
pub fn enter_death(world: &mut World, slot: usize) {
    let death = world.entities[slot].ai.kind.profile().death;
    set_state(world, slot, death);
}

/// Being hit makes a passive entity go after its attacker
pub fn on_damaged(world: &mut World, slot: usize, attacker: Option<Handle>) {
    let e = &world.entities[slot];
    if !e.has(Prop::Destructible) || !e.has(Prop::HasAi) || e.ai.state.is_none() {
        return;
    }
    if world.entities.resolve_opt(e.ai.target).is_some() {
        return;
    }
    let Some(attacker) = attacker else {
        return;
    };
    if attacker.index() == slot || world.entities.resolve(attacker).is_none() {
        return;
    }

    let chase_state = e.ai.kind.profile().chase;
    world.entities[slot].ai.target = Some(attacker);
    set_state(world, slot, chase_state);
}

/// Position of the current target, or `None` if it is gone
fn target_pos(world: &World, slot: usize) -> Option<glam::Vec2> {
    world
        .entities
        .resolve_opt(world.entities[slot].ai.target)
        .map(|t| t.pos)
}

/// Drop the target and go back to idling
fn give_up(world: &mut World, slot: usize) {
    let idle = world.entities[slot].ai.kind.profile().idle;
    world.entities[slot].ai.target = None;
    set_state(world, slot, idle);
}

fn role_state(world: &World, slot: usize, role: AiRole) -> StateId {
    world.entities[slot].ai.kind.profile().for_role(role)
}

fn scan(world: &mut World, slot: usize) {
    let Some(player) = world.player_entity() else {
        return;
    };
    if player.slot as usize == slot {
        return;
    }
    let (player_pos, player_handle) = (player.pos, player.handle());

    let t = &world.tuning;
    let e = &world.entities[slot];
    let to_player = player_pos - e.pos;
    let in_range = to_player.length_squared() < t.ai_detect_radius * t.ai_detect_radius;
    let in_view = e.facing().dot(to_player.normalize_or_zero()) > t.ai_detect_cone;

    if in_range && in_view {
        world.entities[slot].ai.target = Some(player_handle);
        let next = role_state(world, slot, AiRole::Move);
        set_state(world, slot, next);
    }
}

fn chase(world: &mut World, slot: usize) {
    let Some(target) = target_pos(world, slot) else {
        give_up(world, slot);
        return;
    };

    let t = &world.tuning;
    let (turn, accel, max_speed) = (t.ai_turn_rate, t.ai_accel, t.ai_max_speed);
    let strike2 = t.ai_strike_range * t.ai_strike_range;
    let lose2 = t.ai_lose_interest_range * t.ai_lose_interest_range;

    let e = &mut world.entities[slot];
    e.angle = lerp_angle(e.angle, angle_of(target - e.pos), turn);
    e.vel += e.facing() * accel;
    if e.vel.length_squared() > max_speed * max_speed {
        e.vel = e.vel.normalize() * max_speed;
    }

    let dist2 = (e.pos - target).length_squared();
    if dist2 <= strike2 {
        let next = role_state(world, slot, AiRole::Windup);
        set_state(world, slot, next);
    } else if dist2 >= lose2 {
        give_up(world, slot);
    }
}

fn windup(world: &mut World, slot: usize) {
    let Some(target) = target_pos(world, slot) else {
        give_up(world, slot);
        return;
    };

    let t = &world.tuning;
    let (turn, brake) = (t.ai_turn_rate, t.ai_windup_brake);
    let disengage2 = t.ai_disengage_range * t.ai_disengage_range;

    let e = &mut world.entities[slot];
    e.angle = lerp_angle(e.angle, angle_of(target - e.pos), turn);
    e.vel *= brake;

    if (e.pos - target).length_squared() > disengage2 {
        let next = role_state(world, slot, AiRole::Move);
        set_state(world, slot, next);
    }
}

fn fire(world: &mut World, slot: usize) {
    if target_pos(world, slot).is_none() {
        give_up(world, slot);
        return;
    }
    world.fire_laser(slot);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::{Collider, Entity, Props};
    use crate::tuning::Tuning;
    use glam::Vec2;

    fn world_with_player(player_pos: Vec2) -> World {
        let mut world = World::with_capacity(32, Tuning::default());
        world.player = world.spawn(Entity {
            props: Props::empty().with(Prop::Destructible),
            pos: player_pos,
            collider: Collider::circle(2.0, 0.4),
            health: 10,
            max_health: 10,
            ..Default::default()
        });
        world
    }

    fn fighter(world: &mut World, pos: Vec2) -> usize {
        let h = world
            .spawn_ai(
                Entity {
                    props: Props::empty().with(Prop::Destructible),
                    pos,
                    collider: Collider::circle(2.0, 0.4),
                    health: 3,
                    max_health: 3,
                    damage: 1,
                    ..Default::default()
                },
                AiKind::Fighter,
            )
            .unwrap();
        h.index()
    }

    #[test]
    fn test_table_links_stay_inside_kind() {
        for kind in [AiKind::Fighter, AiKind::Gunship] {
            let p = kind.profile();
            for role in [
                AiRole::Idle,
                AiRole::Move,
                AiRole::Windup,
                AiRole::Fire,
                AiRole::Death,
            ] {
                let id = p.for_role(role);
                assert_eq!(id.state().role, role);
            }
            assert_eq!(p.windup.state().next, p.fire);
            assert_eq!(p.fire.state().next, p.windup);
            assert!(p.windup.state().ticks > 0);
            assert_eq!(p.idle.state().ticks, 0);
        }
        assert!(StateId::from_index(AI_STATES.len()).is_none());
    }

    #[test]
    fn test_idle_ignores_player_behind() {
        // Facing +y (angle 0); player is straight behind
        let mut world = world_with_player(Vec2::new(0.0, -30.0));
        let slot = fighter(&mut world, Vec2::ZERO);
        world.tick += 1;
        advance(&mut world, slot);
        assert_eq!(world.entities[slot].ai.role(), Some(AiRole::Idle));
        assert!(world.entities[slot].ai.target.is_none());
    }

    #[test]
    fn test_idle_ignores_player_out_of_range() {
        let mut world = world_with_player(Vec2::new(0.0, 60.0));
        let slot = fighter(&mut world, Vec2::ZERO);
        world.tick += 1;
        advance(&mut world, slot);
        assert_eq!(world.entities[slot].ai.role(), Some(AiRole::Idle));
    }

    #[test]
    fn test_idle_move_attack_and_lost_target() {
        let mut world = world_with_player(Vec2::new(0.0, 30.0));
        let player = world.player.unwrap();
        let slot = fighter(&mut world, Vec2::ZERO);

        world.tick += 1;
        advance(&mut world, slot);
        assert_eq!(world.entities[slot].ai.role(), Some(AiRole::Move));
        assert_eq!(world.entities[slot].ai.target, Some(player));

        // Close in without the rest of the tick: integrate position by hand
        let mut reached = false;
        for _ in 0..600 {
            world.tick += 1;
            advance(&mut world, slot);
            let e = &mut world.entities[slot];
            e.pos += e.vel;
            if e.ai.role() == Some(AiRole::Windup) {
                reached = true;
                break;
            }
        }
        assert!(reached, "fighter never started its attack");
        let dist = (world.entities[slot].pos - Vec2::new(0.0, 30.0)).length();
        assert!(dist <= world.tuning.ai_strike_range + world.tuning.ai_max_speed);

        world.entities.release(player.index());
        world.tick += 1;
        advance(&mut world, slot);
        assert_eq!(world.entities[slot].ai.role(), Some(AiRole::Idle));
        assert!(world.entities[slot].ai.target.is_none());
    }

    #[test]
    fn test_windup_fires_when_budget_elapses() {
        let mut world = world_with_player(Vec2::new(0.0, 5.0));
        let slot = fighter(&mut world, Vec2::ZERO);

        world.tick += 1;
        advance(&mut world, slot);
        // Within strike range straight away: idle -> chase -> windup in one tick
        assert_eq!(world.entities[slot].ai.role(), Some(AiRole::Windup));
        let fire_at = world.entities[slot].ai.tick_end;

        while world.tick < fire_at - 1 {
            world.tick += 1;
            advance(&mut world, slot);
        }
        let shots = |w: &World| w.entities.iter().filter(|e| e.has(Prop::Projectile)).count();
        assert_eq!(shots(&world), 0);

        world.tick += 1;
        advance(&mut world, slot);
        assert_eq!(world.entities[slot].ai.role(), Some(AiRole::Fire));
        assert_eq!(shots(&world), 1);
        let laser = world
            .entities
            .iter()
            .find(|e| e.has(Prop::Projectile))
            .unwrap();
        assert_eq!(laser.parent, world.entities.handle_of(slot));

        // Fire has a zero budget: next tick loops back to windup
        world.tick += 1;
        advance(&mut world, slot);
        assert_eq!(world.entities[slot].ai.role(), Some(AiRole::Windup));
    }

    #[test]
    fn test_windup_falls_back_to_chase_when_target_drifts() {
        let mut world = world_with_player(Vec2::new(0.0, 5.0));
        let slot = fighter(&mut world, Vec2::ZERO);
        world.tick += 1;
        advance(&mut world, slot);
        assert_eq!(world.entities[slot].ai.role(), Some(AiRole::Windup));

        let player = world.player.unwrap();
        world.entities.resolve_mut(player).unwrap().pos = Vec2::new(0.0, 40.0);
        world.tick += 1;
        advance(&mut world, slot);
        assert_eq!(world.entities[slot].ai.role(), Some(AiRole::Move));
    }

    #[test]
    fn test_chase_loses_interest_far_away() {
        let mut world = world_with_player(Vec2::new(0.0, 30.0));
        let slot = fighter(&mut world, Vec2::ZERO);
        world.tick += 1;
        advance(&mut world, slot);
        assert_eq!(world.entities[slot].ai.role(), Some(AiRole::Move));

        let player = world.player.unwrap();
        world.entities.resolve_mut(player).unwrap().pos = Vec2::new(0.0, 500.0);
        world.tick += 1;
        advance(&mut world, slot);
        assert_eq!(world.entities[slot].ai.role(), Some(AiRole::Idle));
        assert!(world.entities[slot].ai.target.is_none());
    }

    #[test]
    fn test_damage_makes_idle_entity_retaliate() {
        // Player far out of sight; a third party shoots the fighter
        let mut world = world_with_player(Vec2::new(0.0, -500.0));
        let slot = fighter(&mut world, Vec2::ZERO);
        let attacker = world
            .spawn(Entity {
                pos: Vec2::new(40.0, 0.0),
                ..Default::default()
            })
            .unwrap();

        on_damaged(&mut world, slot, Some(attacker));
        assert_eq!(world.entities[slot].ai.target, Some(attacker));
        assert_eq!(world.entities[slot].ai.role(), Some(AiRole::Move));
    }

    #[test]
    fn test_damage_from_vanished_attacker_is_ignored() {
        let mut world = world_with_player(Vec2::new(0.0, -500.0));
        let slot = fighter(&mut world, Vec2::ZERO);
        let attacker = world.spawn(Entity::default()).unwrap();
        world.entities.release(attacker.index());

        on_damaged(&mut world, slot, Some(attacker));
        on_damaged(&mut world, slot, None);
        assert!(world.entities[slot].ai.target.is_none());
        assert_eq!(world.entities[slot].ai.role(), Some(AiRole::Idle));
    }

    #[test]
    fn test_damage_keeps_existing_target() {
        let mut world = world_with_player(Vec2::new(0.0, 30.0));
        let player = world.player.unwrap();
        let slot = fighter(&mut world, Vec2::ZERO);
        world.tick += 1;
        advance(&mut world, slot);

        let other = world.spawn(Entity::default()).unwrap();
        on_damaged(&mut world, slot, Some(other));
        assert_eq!(world.entities[slot].ai.target, Some(player));
    }

    #[test]
    fn test_death_state_removes_entity() {
        let mut world = world_with_player(Vec2::new(0.0, -500.0));
        let slot = fighter(&mut world, Vec2::ZERO);
        let handle = world.entities.handle_of(slot).unwrap();
        enter_death(&mut world, slot);
        assert!(world.resolve(handle).is_none());
    }

    #[test]
    fn test_gunship_winds_up_longer() {
        assert!(
            AiKind::Gunship.profile().windup.state().ticks
                > AiKind::Fighter.profile().windup.state().ticks
        );
    }
}
