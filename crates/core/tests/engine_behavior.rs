//! Engine Behaviour Suite
//!
//! Host-side properties of the surface simulation: lifecycle, diffusion
//! spreading, obstacle handling, mode switching and the fatal policy. None of
//! these tests need a GPU.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use surface_sim_core::grid::RIPPLE_STRENGTH;
use surface_sim_core::solver::DECAY;
use surface_sim_core::{
    ConfigError, GridError, MaskStrategy, ObstacleLayout, PanicOnFatal, SimulationConfig,
    SimulationEngine, SimulationMode,
};

#[ctor::ctor]
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn engine(width: usize, height: usize, mode: SimulationMode) -> SimulationEngine {
    let mut engine = SimulationEngine::new(&SimulationConfig::with_size(width, height)).unwrap();
    engine.set_mode(mode);
    engine
}

fn nonzero_heights(engine: &SimulationEngine) -> Vec<(usize, usize)> {
    let grid = engine.grid();
    let mut cells = Vec::new();
    for j in 0..grid.height() {
        for i in 0..grid.width() {
            if grid.height_at(i, j) != 0.0 {
                cells.push((i, j));
            }
        }
    }
    cells
}

#[test]
fn test_reset_zeroes_heights_and_accumulator() {
    let mut engine = engine(32, 20, SimulationMode::DiffusionHost);
    for (x, y) in [(3, 3), (20, 10), (31, 19)] {
        engine.add_disturbance(x, y).unwrap();
    }
    for _ in 0..5 {
        engine.advance(0.0);
    }
    engine.reset();

    assert!(engine.points().iter().all(|p| p.y == 0.0));
    assert!(engine.grid().accumulator().iter().all(|&a| a == 0.0));
    assert!(engine.points().iter().all(|p| p.w == 1.0));
}

#[test]
fn test_procedural_is_pure() {
    let mut a = engine(40, 30, SimulationMode::ProceduralHost);
    let mut b = engine(40, 30, SimulationMode::ProceduralHost);

    a.advance(1234.0);
    b.advance(50.0);
    b.advance(9999.0);
    b.advance(1234.0);
    assert_eq!(a.points(), b.points());
}

#[test]
fn test_flat_field_is_fixed_point() {
    for mode in [SimulationMode::DiffusionHost, SimulationMode::ObstacleHost] {
        let mut engine = engine(17, 23, mode);
        for _ in 0..10 {
            engine.advance(0.0);
        }
        assert!(engine.points().iter().all(|p| p.y == 0.0), "{mode}");
        assert!(engine.grid().accumulator().iter().all(|&a| a == 0.0), "{mode}");
    }
}

#[test]
fn test_ripple_changes_only_one_accumulator() {
    let mut engine = engine(9, 9, SimulationMode::DiffusionHost);
    engine.add_disturbance(4, 6).unwrap();

    let grid = engine.grid();
    for j in 0..9 {
        for i in 0..9 {
            let expected = if (i, j) == (4, 6) { RIPPLE_STRENGTH } else { 0.0 };
            assert_eq!(grid.accumulator_at(i, j), expected);
        }
    }
    assert!(engine.points().iter().all(|p| p.y == 0.0));
}

#[test]
fn test_ripple_spreads_to_orthogonal_neighbours() {
    let mut engine = engine(9, 9, SimulationMode::DiffusionHost);
    engine.add_disturbance(4, 4).unwrap();

    engine.advance(0.0);
    assert_eq!(nonzero_heights(&engine), vec![(4, 4)]);
    approx::assert_relative_eq!(engine.grid().height_at(4, 4), RIPPLE_STRENGTH * DECAY);

    engine.advance(0.0);
    let mut spread = nonzero_heights(&engine);
    spread.sort_unstable();
    assert_eq!(spread, vec![(3, 4), (4, 3), (4, 4), (4, 5), (5, 4)]);
}

#[test]
fn test_obstacle_heights_never_change() {
    let mut engine = engine(36, 30, SimulationMode::ObstacleHost);
    let mut rng = StdRng::seed_from_u64(7);

    let obstacles: Vec<(usize, usize)> = (0..30)
        .flat_map(|j| (0..36).map(move |i| (i, j)))
        .filter(|&(i, j)| engine.grid().obstacles().is_obstacle(i, j))
        .collect();
    assert!(!obstacles.is_empty());

    for _ in 0..40 {
        let x = rng.random_range(0..36);
        let y = rng.random_range(0..30);
        engine.add_disturbance(x, y).unwrap();
        engine.advance(0.0);
        for &(i, j) in &obstacles {
            assert_eq!(engine.grid().height_at(i, j), 0.0);
        }
    }
    assert!(engine.points().iter().any(|p| p.y != 0.0));
}

#[test]
fn test_mode_switch_across_families_resets() {
    let mut engine = engine(16, 16, SimulationMode::ObstacleHost);
    engine.add_disturbance(2, 2).unwrap();
    engine.advance(0.0);
    engine.advance(0.0);

    engine.set_mode(SimulationMode::ProceduralHost);
    assert!(engine.points().iter().all(|p| p.y == 0.0));
    assert!(engine.grid().accumulator().iter().all(|&a| a == 0.0));

    engine.advance(2000.0);
    assert!(engine.points().iter().any(|p| p.y != 0.0));
    engine.set_mode(SimulationMode::DiffusionHost);
    assert!(engine.points().iter().all(|p| p.y == 0.0));
}

#[test]
fn test_border_only_end_to_end() {
    let config = SimulationConfig {
        spacing: 1.0,
        obstacle_layout: ObstacleLayout::BorderOnly,
        ..SimulationConfig::with_size(4, 4)
    };
    let mut engine = SimulationEngine::new(&config).unwrap();
    engine.set_mode(SimulationMode::ObstacleHost);
    engine.add_disturbance(1, 1).unwrap();
    engine.advance(0.0);

    let grid = engine.grid();
    assert!(grid.accumulator_at(1, 1) < RIPPLE_STRENGTH);
    for j in 0..4 {
        for i in 0..4 {
            if i == 0 || j == 0 || i == 3 || j == 3 {
                assert_eq!(grid.height_at(i, j), 0.0, "edge ({i}, {j})");
            }
        }
    }
}

#[test]
fn test_branchless_matches_branching_on_random_fields() {
    for seed in 0..8_u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let width = rng.random_range(12..48);
        let height = rng.random_range(12..48);

        let make = |strategy| {
            let config = SimulationConfig {
                mask_strategy: strategy,
                ..SimulationConfig::with_size(width, height)
            };
            let mut engine = SimulationEngine::new(&config).unwrap();
            engine.set_mode(SimulationMode::ObstacleHost);
            engine
        };
        let mut branching = make(MaskStrategy::Branching);
        let mut branchless = make(MaskStrategy::Branchless);

        for _ in 0..30 {
            if rng.random_bool(0.5) {
                let x = rng.random_range(0..width) as i64;
                let y = rng.random_range(0..height) as i64;
                branching.add_disturbance(x, y).unwrap();
                branchless.add_disturbance(x, y).unwrap();
            }
            branching.advance(0.0);
            branchless.advance(0.0);
        }

        let bits = |e: &SimulationEngine| -> Vec<u32> {
            e.points()
                .iter()
                .map(|p| p.y.to_bits())
                .chain(e.grid().accumulator().iter().map(|a| a.to_bits()))
                .collect()
        };
        assert_eq!(bits(&branching), bits(&branchless), "seed {seed}");
    }
}

#[test]
fn test_out_of_range_disturbance_fails() {
    let mut engine = engine(8, 6, SimulationMode::DiffusionHost);
    let err = engine.add_disturbance(8, 0).unwrap_err();
    assert_eq!(
        err,
        GridError::OutOfBounds {
            x: 8,
            y: 0,
            width: 8,
            height: 6
        }
    );
    assert!(engine.add_disturbance(-1, 3).is_err());
    assert!(engine.grid().accumulator().iter().all(|&a| a == 0.0));
}

#[test]
fn test_invalid_config_rejected() {
    assert!(SimulationEngine::new(&SimulationConfig::with_size(0, 10)).is_err());
    let config = SimulationConfig {
        spacing: f32::INFINITY,
        ..SimulationConfig::with_size(10, 10)
    };
    assert!(matches!(
        SimulationEngine::new(&config),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
#[should_panic(expected = "requires a compute device")]
fn test_device_mode_without_device_reaches_fatal_handler() {
    let mut engine = engine(8, 8, SimulationMode::ProceduralHost)
        .with_fatal_handler(Arc::new(PanicOnFatal));
    engine.set_mode(SimulationMode::ObstacleDevice);
    engine.advance(16.0);
}
