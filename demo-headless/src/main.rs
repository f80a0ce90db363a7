use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use std::process::ExitCode;
use surface_sim_core::{ComputeDevice, SimulationConfig, SimulationEngine, SimulationMode};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Surface simulation demo without rendering
#[derive(Parser, Debug)]
#[command(name = "surface-sim-demo")]
#[command(about = "Height-field surface simulation, reports height statistics", long_about = None)]
struct Args {
    /// Points per row
    #[arg(long, default_value_t = 256)]
    width: usize,

    /// Number of rows
    #[arg(long, default_value_t = 256)]
    height: usize,

    /// Lattice spacing
    #[arg(long, default_value_t = 0.006)]
    spacing: f32,

    /// Mode: index 0-5 or name (procedural, procedural-device, heightfield,
    /// heightfield-device, heightfield-obstacle, heightfield-obstacle-device)
    #[arg(short, long, default_value = "heightfield", value_parser = parse_mode)]
    mode: SimulationMode,

    /// Number of steps to run
    #[arg(short, long, default_value_t = 600)]
    steps: u32,

    /// Simulated milliseconds between steps
    #[arg(long, default_value_t = 16.0)]
    interval_ms: f32,

    /// Initial disturbance column
    #[arg(long)]
    disturb_x: Option<i64>,

    /// Initial disturbance row
    #[arg(long)]
    disturb_y: Option<i64>,

    /// Probability per step of a random drop
    #[arg(long, default_value_t = 0.0)]
    rain: f64,

    /// Seed for random drops
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// JSON config file; replaces width, height and spacing
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the effective config as JSON and continue
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// Steps between reports
    #[arg(short, long, default_value_t = 60)]
    report_interval: u32,
}

fn parse_mode(value: &str) -> Result<SimulationMode, String> {
    if let Ok(index) = value.parse::<u32>() {
        return SimulationMode::from_index(index).ok_or_else(|| format!("mode index {index} outside 0..=5"));
    }
    SimulationMode::ALL
        .into_iter()
        .find(|mode| mode.name() == value)
        .ok_or_else(|| format!("unknown mode '{value}'"))
}

/// Height statistics over the whole surface
struct HeightStats {
    min: f32,
    max: f32,
    mean: f32,
    rms: f32,
}

impl HeightStats {
    fn collect(engine: &SimulationEngine) -> Self {
        let points = engine.points();
        let (min, max, sum, sum_sq) = points.iter().fold(
            (f32::INFINITY, f32::NEG_INFINITY, 0.0_f64, 0.0_f64),
            |(min, max, sum, sum_sq), p| {
                let y = f64::from(p.y);
                (min.min(p.y), max.max(p.y), sum + y, sum_sq + y * y)
            },
        );
        let n = points.len() as f64;
        Self {
            min,
            max,
            mean: (sum / n) as f32,
            rms: (sum_sq / n).sqrt() as f32,
        }
    }
}

fn build_config(args: &Args) -> Result<SimulationConfig, String> {
    let config = match &args.config {
        Some(path) => SimulationConfig::load(path).map_err(|e| e.to_string())?,
        None => SimulationConfig {
            spacing: args.spacing,
            ..SimulationConfig::with_size(args.width, args.height)
        },
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn run(args: &Args) -> Result<(), String> {
    let config = build_config(args)?;
    if let Some(path) = &args.save_config {
        config.save(path).map_err(|e| e.to_string())?;
        info!("Wrote config to {}", path.display());
    }

    let mut engine = if args.mode.runs_on_device() {
        SimulationEngine::with_device(&config, ComputeDevice::new())
    } else {
        SimulationEngine::new(&config)
    }
    .map_err(|e| e.to_string())?;
    engine.set_mode(args.mode);

    println!("=== Surface Simulation Demo ===\n");
    println!(
        "Grid: {}x{} (spacing {}), mode: {}",
        config.width, config.height, config.spacing, args.mode
    );
    if let Some(name) = engine.device_name() {
        println!("Compute device: {name}");
    }

    let center = (config.width as i64 / 2, config.height as i64 / 2);
    let (x, y) = (args.disturb_x.unwrap_or(center.0), args.disturb_y.unwrap_or(center.1));
    engine.add_disturbance(x, y).map_err(|e| e.to_string())?;

    let mut rng = StdRng::seed_from_u64(args.seed);
    let report_interval = args.report_interval.max(1);

    println!("\n  Step |   Time(ms) |    Min h |    Max h |   Mean h |    RMS h");
    println!("-------|------------|----------|----------|----------|---------");
    for step in 1..=args.steps {
        if args.rain > 0.0 && rng.random_bool(args.rain.min(1.0)) {
            let x = rng.random_range(0..config.width) as i64;
            let y = rng.random_range(0..config.height) as i64;
            engine.add_disturbance(x, y).map_err(|e| e.to_string())?;
        }

        let elapsed_ms = step as f32 * args.interval_ms;
        engine.advance(elapsed_ms);

        if step % report_interval == 0 || step == args.steps {
            let stats = HeightStats::collect(&engine);
            println!(
                "{:6} | {:10.1} | {:8.4} | {:8.4} | {:8.4} | {:8.4}",
                step, elapsed_ms, stats.min, stats.max, stats.mean, stats.rms
            );
        }
    }

    println!("\n=== Simulation Complete ===");
    println!("Steps: {}", engine.steps());
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
