// Distributed runs against the sequential torus reference.

use mesh_life::evolve::step_torus;
use mesh_life::patterns::{find, place, random_grid};
use mesh_life::topology::isqrt;
use mesh_life::{Grid, Outcome, RunConfig, RunReport, Seed, Simulation};
use proptest::prelude::*;

async fn run(grid: &Grid, processes: usize, generations: usize, threads: usize) -> RunReport {
    let config = RunConfig {
        grid_side: grid.side(),
        generations,
        processes,
        threads,
        ..RunConfig::default()
    };
    Simulation::new(config)
        .unwrap()
        .run(Seed::Grid(grid.clone()), None)
        .await
        .unwrap()
}

fn reference(grid: &Grid, evolutions: usize) -> Grid {
    let mut grid = grid.clone();
    for _ in 0..evolutions {
        grid = step_torus(&grid);
    }
    grid
}

fn with_pattern(side: usize, name: &str, origin: (usize, usize)) -> Grid {
    let mut grid = Grid::new(side);
    place(&mut grid, find(name).unwrap(), origin);
    grid
}

#[tokio::test]
async fn every_mesh_matches_the_reference() {
    let seed = random_grid(12, 42, 0.35);
    let expected = reference(&seed, 5);
    for processes in [1, 4, 9, 16] {
        let report = run(&seed, processes, 6, 1).await;
        assert_eq!(report.outcome, Outcome::Completed);
        assert_eq!(report.evolutions, 5);
        assert_eq!(report.grid, expected, "P = {processes}");
    }
}

#[tokio::test]
async fn glider_crosses_block_and_torus_edges() {
    let seed = with_pattern(12, "glider", (4, 4));
    let report = run(&seed, 16, 49, 1).await;
    assert_eq!(report.grid, reference(&seed, 48));
    // A glider repeats itself shifted by one cell diagonally every 4 updates,
    // so 48 updates on a 12-torus bring it home.
    assert_eq!(report.grid, seed);
}

#[tokio::test]
async fn still_life_inside_one_block() {
    let seed = with_pattern(12, "block", (1, 1));
    assert_eq!(run(&seed, 4, 5, 1).await.grid, seed);
}

#[tokio::test]
async fn still_life_split_across_blocks() {
    // Centred on the point where four blocks meet.
    let seed = with_pattern(12, "block", (5, 5));
    assert_eq!(run(&seed, 4, 5, 1).await.grid, seed);

    // Split across the torus seam, one cell in each corner block.
    let seed = with_pattern(12, "block", (11, 11));
    assert_eq!(seed.live_count(), 4);
    assert_eq!(run(&seed, 9, 5, 1).await.grid, seed);
}

#[tokio::test]
async fn blinker_has_period_two() {
    let seed = with_pattern(12, "blinker", (5, 4));
    for processes in [1, 4, 9, 16] {
        let once = run(&seed, processes, 2, 1).await.grid;
        assert_ne!(once, seed, "P = {processes}");
        assert_eq!(once.live_count(), 3);
        assert_eq!(run(&seed, processes, 3, 1).await.grid, seed, "P = {processes}");
    }
}

#[tokio::test]
async fn interior_threads_do_not_change_the_result() {
    let seed = random_grid(24, 9, 0.4);
    let sequential = run(&seed, 4, 8, 1).await;
    let threaded = run(&seed, 4, 8, 3).await;
    assert_eq!(threaded.grid, sequential.grid);
    assert_eq!(threaded.grid, reference(&seed, 7));
}

fn mesh_and_grid() -> impl Strategy<Value = (usize, Grid)> {
    (prop_oneof![Just(1usize), Just(4), Just(9), Just(16)], 3usize..=5).prop_flat_map(|(processes, block)| {
        let side = block * isqrt(processes);
        proptest::collection::vec(prop_oneof![Just(0u8), Just(1u8)], side * side)
            .prop_map(move |cells| (processes, Grid::from_cells(side, cells).unwrap()))
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn distributed_equals_sequential((processes, seed) in mesh_and_grid(), generations in 1usize..6) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let report = runtime.block_on(run(&seed, processes, generations, 1));
        prop_assert_eq!(report.evolutions, generations - 1);
        prop_assert_eq!(report.grid, reference(&seed, generations - 1));
    }
}
