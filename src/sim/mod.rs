//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (ascending slot index)
//! - No rendering or platform dependencies

pub mod ai;
pub mod collision;
pub mod entity;
pub mod rng;
pub mod scenario;
pub mod state;
pub mod store;
pub mod tick;
pub mod waves;

pub use ai::{AI_STATES, AiKind, AiRole, Brain, StateId};
pub use collision::{Contact, exchange_impulse, resolve_all, sweep_against};
pub use entity::{Art, Collider, Entity, Handle, Prop, Props, Shape};
pub use rng::Xoshiro128Plus;
pub use state::World;
pub use store::EntityStore;
pub use tick::{Control, Controls, FixedTimestep, TickInput, run_frame, tick};
pub use waves::WaveDirector;
