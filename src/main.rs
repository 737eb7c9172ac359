//! Astro Skirmish headless runner
//!
//! Builds the starting arena and drives it through the fixed-timestep clock
//! with a simulated frame rate. Rendering, audio and real input live outside
//! this crate; `--autopilot` stands in for a player.

#[cfg(not(target_arch = "wasm32"))]
use astro_skirmish::{
    Tuning, angle_of, normalize_angle, persistence,
    sim::{Control, FixedTimestep, Prop, TickInput, World, run_frame, scenario},
};
#[cfg(not(target_arch = "wasm32"))]
use clap::Parser;

/// Headless Astro Skirmish simulation
#[cfg(not(target_arch = "wasm32"))]
#[derive(Parser, Debug)]
#[command(name = "astro-skirmish")]
#[command(about = "Run the arcade simulation without a window")]
struct Args {
    /// Simulated seconds to run
    #[arg(long, default_value_t = 30.0)]
    seconds: f64,

    /// Simulated render frame rate
    #[arg(long, default_value_t = 144.0)]
    fps: f64,

    /// World RNG seed (default: the built-in seed)
    #[arg(long)]
    seed: Option<u64>,

    /// Balance overrides (JSON)
    #[arg(long)]
    tuning: Option<std::path::PathBuf>,

    /// Resume from a save state instead of a fresh arena
    #[arg(long)]
    load: Option<std::path::PathBuf>,

    /// Write a save state when done
    #[arg(long)]
    save: Option<std::path::PathBuf>,

    /// Let a simple pilot fly and shoot
    #[arg(long)]
    autopilot: bool,

    /// Do not send enemy waves
    #[arg(long)]
    no_waves: bool,
}

/// Turn toward the nearest destructible, close in and shoot
#[cfg(not(target_arch = "wasm32"))]
fn autopilot(world: &World, input: &mut TickInput) {
    for control in Control::ALL {
        input.set(control, false);
    }
    let Some(player) = world.player_entity() else {
        return;
    };
    let nearest = world
        .entities
        .iter()
        .filter(|e| e.has(Prop::Destructible) && e.slot != player.slot)
        .min_by(|a, b| {
            let da = (a.pos - player.pos).length_squared();
            let db = (b.pos - player.pos).length_squared();
            da.total_cmp(&db)
        });
    let Some(target) = nearest else {
        return;
    };

    let delta = target.pos - player.pos;
    let off = normalize_angle(angle_of(delta) - player.angle);
    input.set(Control::TurnLeft, off < -0.05);
    input.set(Control::TurnRight, off > 0.05);
    input.set(Control::Thrust, delta.length() > 15.0);
    input.set(Control::Fire, off.abs() < 0.2 && world.tick % 12 == 0);
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    log::info!("Astro Skirmish (headless) starting...");

    let tuning = match &args.tuning {
        Some(path) => Tuning::load(path)?,
        None => Tuning::default(),
    };
    let mut world = World::new(tuning);
    if let Some(seed) = args.seed {
        world = world.seeded(seed);
    }
    match &args.load {
        Some(path) => persistence::load(&mut world, path)?,
        None => scenario::populate_arena(&mut world),
    }
    world.waves.enabled = !args.no_waves;

    let frame_time = 1.0 / args.fps.max(1.0);
    let frames = (args.seconds * args.fps.max(1.0)).ceil() as u64;
    let mut clock = FixedTimestep::default();
    let mut input = TickInput::default();

    for _ in 0..frames {
        if args.autopilot {
            autopilot(&world, &mut input);
        }
        run_frame(&mut world, &mut clock, frame_time, &mut input);
    }

    let player_health = world.player_entity().map(|p| p.health);
    log::info!(
        "Ran {} ticks: {} entities live, {} gems, wave {}, player health {:?}",
        world.tick,
        world.entities.live_count(),
        world.gem_count,
        world.waves.wave,
        player_health
    );

    if let Some(path) = &args.save {
        persistence::save(&world, path)?;
    }
    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The simulation core is a library on the web; there is no headless runner
}
