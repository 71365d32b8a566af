use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use parking_sim::simulation::{SimConfig, SimWorld};

#[derive(Parser)]
#[command(name = "parking_sim")]
#[command(about = "Headless parking and charging traffic simulation")]
struct Cli {
    /// Number of simulation ticks to run
    #[arg(long, default_value = "1000")]
    ticks: u32,

    /// Time delta per tick in seconds
    #[arg(long, default_value = "0.1")]
    delta: f32,

    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Maximum number of cars in the world at once
    #[arg(long, default_value = "12")]
    max_cars: usize,

    /// Seconds between automatic spawns
    #[arg(long, default_value = "2.0")]
    spawn_interval: f32,

    /// Share of electric cars, between 0 and 1
    #[arg(long, default_value = "0.5")]
    electric_ratio: f64,

    /// Generate a random layout instead of the demo layout
    #[arg(long)]
    random_layout: bool,

    /// Follow one car with the camera from the start
    #[arg(long)]
    track: bool,

    /// Print the summary and map once per simulated second
    #[arg(long)]
    map: bool,
}

impl Cli {
    fn to_config(&self) -> SimConfig {
        let mut config = SimConfig {
            seed: self.seed,
            ..SimConfig::default()
        };
        config.world.random_layout = self.random_layout;
        config.spawn.max_cars = self.max_cars;
        config.spawn.interval_secs = self.spawn_interval;
        config.spawn.electric_ratio = self.electric_ratio;
        config
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if !(cli.delta.is_finite() && cli.delta > 0.0) {
        anyhow::bail!("Time delta must be a positive number of seconds");
    }

    let world = SimWorld::from_config(cli.to_config()).context("Invalid simulation settings")?;
    run_headless(world, &cli);
    Ok(())
}

/// Run the simulation in headless mode (no graphics)
fn run_headless(mut world: SimWorld, cli: &Cli) {
    info!("Running parking simulation in headless mode...");
    info!("Ticks: {}, Delta: {}s", cli.ticks, cli.delta);

    // Calculate how many ticks equal 1 second of simulation time
    let ticks_per_second = (1.0 / cli.delta).ceil().max(1.0) as u32;

    if cli.map {
        println!("Initial state:");
        world.print_summary();
        world.draw_map();
        println!();
    }

    if cli.track {
        world.start_tracking();
    }

    let mut tick = 0;
    while tick < cli.ticks {
        // Run ticks_per_second ticks (or remaining ticks if fewer)
        let ticks_to_run = ticks_per_second.min(cli.ticks - tick);

        for _ in 0..ticks_to_run {
            tick += 1;
            world.tick(cli.delta);
        }

        if cli.map {
            println!(
                "--- After tick {} ({:.1}s simulated time) ---",
                tick,
                tick as f32 * cli.delta
            );
            world.print_summary();
            world.draw_map();
            println!();
        }
    }

    if cli.map {
        println!("=== Final State ===");
        world.print_summary();
        world.draw_map();
    }

    world.log_final_stats();
}
