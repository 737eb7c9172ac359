//! Fixed-tick world update
//!
//! One call to [`tick`] runs every per-tick pass in a fixed order. The
//! [`FixedTimestep`] clock turns wall-clock frame times into a whole number of
//! ticks, so rendering can run at any rate without changing the simulation.

use super::ai;
use super::collision;
use super::entity::Prop;
use super::state::World;
use super::waves;
use crate::consts::{MAX_FRAME_TIME, MAX_SUBSTEPS, SIM_DT};
use crate::normalize_angle;

/// Player controls the tick reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    TurnLeft,
    TurnRight,
    Thrust,
    Reverse,
    Fire,
    /// Toggles [`World::paused`]
    Pause,
}

impl Control {
    pub const ALL: [Control; 6] = [
        Control::TurnLeft,
        Control::TurnRight,
        Control::Thrust,
        Control::Reverse,
        Control::Fire,
        Control::Pause,
    ];
}

/// Input as seen by the simulation: level-triggered `held` plus edges
pub trait Controls {
    fn held(&self, control: Control) -> bool;
    /// Went down since the previous tick
    fn pressed(&self, control: Control) -> bool;
    /// Went up since the previous tick
    fn released(&self, control: Control) -> bool;
}

/// Input state for one tick
///
/// The platform layer calls [`TickInput::set`] as events arrive; the driver
/// calls [`TickInput::end_tick`] after each tick so edges fire exactly once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickInput {
    current: [bool; Control::ALL.len()],
    previous: [bool; Control::ALL.len()],
}

impl TickInput {
    pub fn set(&mut self, control: Control, down: bool) {
        self.current[control as usize] = down;
    }

    /// Latch the current state as the baseline for the next tick's edges
    pub fn end_tick(&mut self) {
        self.previous = self.current;
    }
}

impl Controls for TickInput {
    fn held(&self, control: Control) -> bool {
        self.current[control as usize]
    }

    fn pressed(&self, control: Control) -> bool {
        self.current[control as usize] && !self.previous[control as usize]
    }

    fn released(&self, control: Control) -> bool {
        !self.current[control as usize] && self.previous[control as usize]
    }
}

/// Advance the world by one fixed timestep. A paused world only watches
/// for the pause toggle.
pub fn tick(world: &mut World, input: &impl Controls) {
    if input.pressed(Control::Pause) {
        world.paused = !world.paused;
        log::info!("{} at tick {}", if world.paused { "paused" } else { "resumed" }, world.tick);
    }
    if world.paused {
        return;
    }
    world.tick += 1;

    update_player(world, input);
    advance_ai(world);
    remove_dead(world);
    collision::resolve_all(world);
    integrate_movement(world);
    update_pickups(world);

    if world.waves.enabled {
        waves::update(world);
    }
}

fn update_player(world: &mut World, input: &impl Controls) {
    let Some(slot) = world.player_slot() else {
        return;
    };
    let t = &world.tuning;
    let (turn, accel, max_speed) = (t.player_turn_rate, t.player_accel, t.player_max_speed);

    let p = &mut world.entities[slot];
    if input.held(Control::TurnLeft) {
        p.angle -= turn;
    }
    if input.held(Control::TurnRight) {
        p.angle += turn;
    }
    p.angle = normalize_angle(p.angle);

    let thrust = if input.held(Control::Thrust) {
        accel
    } else if input.held(Control::Reverse) {
        -accel
    } else {
        0.0
    };
    if thrust != 0.0 {
        p.vel += p.facing() * thrust;
        if p.vel.length_squared() > max_speed * max_speed {
            p.vel = p.vel.normalize() * max_speed;
        }
    }

    if input.pressed(Control::Fire) {
        world.fire_laser(slot);
    }
}

fn advance_ai(world: &mut World) {
    let mut cursor = None;
    while let Some(slot) = world.entities.next_live(cursor) {
        if world.entities[slot].has(Prop::HasAi) {
            world.ai_depth = 0;
            ai::advance(world, slot);
        }
        cursor = Some(slot);
    }
}

/// Destructibles at zero health die: AI entities through their death state
fn remove_dead(world: &mut World) {
    let mut cursor = None;
    while let Some(slot) = world.entities.next_live(cursor) {
        let e = &world.entities[slot];
        if e.has(Prop::Destructible) && e.health <= 0 {
            log::debug!("slot {slot} destroyed at tick {}", world.tick);
            if e.has(Prop::HasAi) && e.ai.state.is_some() {
                world.ai_depth = 0;
                ai::enter_death(world, slot);
            } else {
                world.kill(slot);
            }
        }
        cursor = Some(slot);
    }
}

/// Drag and position update for everything the resolver does not sweep
fn integrate_movement(world: &mut World) {
    let World {
        entities, tuning, ..
    } = world;
    let mut cursor = None;
    while let Some(slot) = entities.next_live(cursor) {
        cursor = Some(slot);
        let e = &mut entities[slot];
        if collision::sweeps(e) {
            continue;
        }
        if collision::apply_drag(e, tuning) {
            e.pos += e.vel;
        } else {
            entities.release(slot);
        }
    }
}

/// Bob pickups and pull them in once they can be collected
fn update_pickups(world: &mut World) {
    let player_pos = world.player_entity().map(|p| p.pos);
    let tick = world.tick;
    let t = &world.tuning;
    let (amplitude, capture, collect) = (
        t.pickup_bob_amplitude,
        t.pickup_capture_radius,
        t.pickup_collect_distance,
    );

    let mut cursor = None;
    while let Some(slot) = world.entities.next_live(cursor) {
        cursor = Some(slot);
        let e = &mut world.entities[slot];
        if !e.has(Prop::Pickup) {
            continue;
        }
        e.height = (e.pos.x + e.pos.y + tick as f32 / 14.0).sin() * amplitude;

        let Some(target) = player_pos else {
            continue;
        };
        if tick < e.pick_up_after_tick {
            continue;
        }
        let delta = target - e.pos;
        let dist = delta.length();
        if dist < collect {
            world.gem_count += 1;
            world.entities.release(slot);
            log::debug!("pickup collected ({} total)", world.gem_count);
        } else if dist < capture {
            e.pos += delta.normalize_or_zero() * ((capture - dist) / 20.0);
        }
    }
}

/// Fixed-timestep accumulator
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    accumulator: f64,
    dt: f64,
    max_substeps: u32,
}

impl Default for FixedTimestep {
    fn default() -> Self {
        Self::new(SIM_DT, MAX_SUBSTEPS)
    }
}

impl FixedTimestep {
    pub fn new(dt: f64, max_substeps: u32) -> Self {
        Self {
            accumulator: 0.0,
            dt,
            max_substeps,
        }
    }

    /// Add a frame's elapsed time, returning how many ticks to run.
    ///
    /// Time beyond `max_substeps` ticks is dropped rather than carried over.
    pub fn advance(&mut self, elapsed: f64) -> u32 {
        self.accumulator += elapsed.clamp(0.0, MAX_FRAME_TIME);

        let mut steps = 0;
        while self.accumulator >= self.dt && steps < self.max_substeps {
            self.accumulator -= self.dt;
            steps += 1;
        }
        if self.accumulator >= self.dt {
            log::warn!(
                "simulation falling behind, dropping {:.1} ms",
                (self.accumulator - self.accumulator % self.dt) * 1000.0
            );
            self.accumulator %= self.dt;
        }
        steps
    }

    /// Fraction of the next tick already accumulated, for render interpolation
    pub fn alpha(&self) -> f32 {
        (self.accumulator / self.dt) as f32
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

/// Run however many ticks one rendered frame is worth
pub fn run_frame(
    world: &mut World,
    clock: &mut FixedTimestep,
    elapsed: f64,
    input: &mut TickInput,
) -> u32 {
    let steps = clock.advance(elapsed);
    for _ in 0..steps {
        tick(world, &*input);
        input.end_tick();
    }
    steps
}
