//! Reference tectonic generation steps.
//!
//! Deliberately small versions of the plate and elevation passes: enough to
//! populate every tile's plate, elevation and biome fields through the
//! scheduler contract. The full simulation (stress propagation, heat and
//! moisture whorls, rivers) builds on the same step shape outside this
//! crate.

use std::f64::consts::PI;

use crate::geometry::random_unit_vector;
use crate::graph::{Biome, PlanetGraph, PlateId, TileId};
use crate::pipeline::PlanetContext;
use crate::plates::Plate;
use crate::random::XorShift128;
use crate::task::SteppedTask;

/// Frontier picks processed per work-function invocation.
const FLOOD_CHUNK: usize = 32;

/// Tiles touched per work-function invocation of the elevation pass.
const TILE_CHUNK: usize = 64;

/// Generation step: grow `plate_count` tectonic plates over the tiles by
/// random flood fill, then extract plate boundaries.
///
/// Each plate gets a random drift axis and rate, a spin rate around its root
/// tile, and a desired elevation (below sea level with probability
/// `oceanic_rate`).
pub fn plate_assignment_step(
    plate_count: u32,
    oceanic_rate: f64,
) -> impl FnMut(&mut PlanetContext, &mut SteppedTask<PlanetContext>) {
    let mut plates: Vec<Plate> = Vec::new();
    let mut frontier: Vec<(PlateId, TileId)> = Vec::new();
    let mut assigned = 0usize;
    let mut started = false;

    move |ctx, task| {
        let PlanetContext { random, graph } = ctx;
        let Some(graph) = graph.as_mut() else {
            task.provide_result(());
            return;
        };

        if !started {
            started = true;
            seed_plates(
                graph,
                random,
                plate_count,
                oceanic_rate,
                &mut plates,
                &mut frontier,
            );
            assigned = plates.len();
        }

        let mut processed = 0;
        while processed < FLOOD_CHUNK && !frontier.is_empty() {
            let pick = random.integer_exclusive(0, frontier.len() as i64) as usize;
            let (plate, tile) = frontier.swap_remove(pick);
            processed += 1;
            if graph.tile(tile).plate.is_some() {
                continue;
            }
            graph.tile_mut(tile).plate = Some(plate);
            plates[plate.0 as usize].tiles.push(tile);
            assigned += 1;
            for index in 0..graph.tile(tile).tiles().len() {
                let neighbor = graph.tile(tile).tiles()[index];
                if graph.tile(neighbor).plate.is_none() {
                    frontier.push((plate, neighbor));
                }
            }
        }
        task.report_progress(assigned as f64 / graph.tile_count() as f64);

        if frontier.is_empty() {
            extract_boundaries(graph, &mut plates);
            graph.plates = std::mem::take(&mut plates);
            task.provide_result(());
        }
    }
}

fn seed_plates(
    graph: &mut PlanetGraph,
    random: &mut XorShift128,
    plate_count: u32,
    oceanic_rate: f64,
    plates: &mut Vec<Plate>,
    frontier: &mut Vec<(PlateId, TileId)>,
) {
    let count = (plate_count as usize).clamp(1, graph.tile_count());
    while plates.len() < count {
        let root = TileId(random.integer_exclusive(0, graph.tile_count() as i64) as u32);
        if graph.tile(root).plate.is_some() {
            continue;
        }
        let id = PlateId(plates.len() as u32);
        let oceanic = random.unit() < oceanic_rate;
        let desired_elevation = if oceanic {
            random.real(-0.8, -0.3)
        } else {
            random.real(0.1, 0.5)
        } as f32;
        plates.push(Plate {
            root,
            color: [
                random.unit() as f32,
                random.unit() as f32,
                random.unit() as f32,
            ],
            drift_axis: random_unit_vector(random),
            drift_rate: random.real(-PI / 30.0, PI / 30.0) as f32,
            spin_rate: random.real(-PI / 60.0, PI / 60.0) as f32,
            desired_elevation,
            oceanic,
            tiles: vec![root],
            boundary_corners: Vec::new(),
            boundary_borders: Vec::new(),
        });
        graph.tile_mut(root).plate = Some(id);
        for index in 0..graph.tile(root).tiles().len() {
            frontier.push((id, graph.tile(root).tiles()[index]));
        }
    }
}

/// Record, on each plate, the borders and corners where it meets another
/// plate.
fn extract_boundaries(graph: &PlanetGraph, plates: &mut [Plate]) {
    for border in graph.borders() {
        let [a, b] = border.tiles();
        let plate_a = graph.tile(a).plate;
        let plate_b = graph.tile(b).plate;
        if plate_a == plate_b {
            continue;
        }
        for plate_id in [plate_a, plate_b].into_iter().flatten() {
            let plate = &mut plates[plate_id.0 as usize];
            plate.boundary_borders.push(border.id);
            for corner in border.corners() {
                if !plate.boundary_corners.contains(&corner) {
                    plate.boundary_corners.push(corner);
                }
            }
        }
    }
}

/// Generation step: settle every tile's elevation toward its plate's
/// desired elevation, derive temperature and moisture, then classify
/// biomes in a second pass once all elevations are known.
pub fn elevation_step() -> impl FnMut(&mut PlanetContext, &mut SteppedTask<PlanetContext>) {
    let mut cursor = 0usize;
    let mut classifying = false;

    move |ctx, task| {
        let PlanetContext { random, graph } = ctx;
        let Some(graph) = graph.as_mut() else {
            task.provide_result(());
            return;
        };
        let total = graph.tile_count();
        let end = (cursor + TILE_CHUNK).min(total);

        if !classifying {
            for index in cursor..end {
                let id = TileId(index as u32);
                let plate_elevation = graph
                    .tile(id)
                    .plate
                    .map(|p| graph.plate(p).desired_elevation)
                    .unwrap_or(0.0);
                let latitude_factor = 1.0 - (graph.tile(id).position.z / graph.radius).abs();
                let jitter = random.real(-0.05, 0.05) as f32;
                let moisture = random.unit() as f32;
                let tile = graph.tile_mut(id);
                tile.elevation = plate_elevation + jitter;
                tile.temperature = latitude_factor - tile.elevation.max(0.0) * 0.4;
                tile.moisture = moisture;
            }
            cursor = end;
            task.report_progress(0.5 * cursor as f64 / total as f64);
            if cursor == total {
                classifying = true;
                cursor = 0;
            }
            return;
        }

        for index in cursor..end {
            let id = TileId(index as u32);
            let tile = graph.tile(id);
            let biome = if !tile.is_land() {
                Biome::Ocean
            } else if tile.borders().iter().any(|&b| graph.is_land_boundary(b)) {
                Biome::Coast
            } else if tile.elevation > 0.4 {
                Biome::Mountains
            } else {
                Biome::Plains
            };
            graph.tile_mut(id).biome = Some(biome);
        }
        cursor = end;
        task.report_progress(0.5 + 0.5 * cursor as f64 / total as f64);
        if cursor == total {
            task.provide_result(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Scheduler, StepStatus, SteppedTask};
    use crate::topology::build_base_topology;
    use std::time::Duration;

    fn context(seed: u64) -> PlanetContext {
        PlanetContext {
            random: XorShift128::from_master(seed),
            graph: Some(build_base_topology(1000.0).expect("base topology builds")),
        }
    }

    fn run_step(
        ctx: &mut PlanetContext,
        step: impl FnMut(&mut PlanetContext, &mut SteppedTask<PlanetContext>) + 'static,
    ) {
        let mut scheduler = Scheduler::new(
            SteppedTask::with_intervals(Duration::ZERO, Duration::ZERO),
            |_: &SteppedTask<PlanetContext>| {},
        );
        scheduler.task_mut().execute_subaction(1.0, step);
        assert_eq!(scheduler.run_to_completion(ctx, |_| {}), StepStatus::Completed);
    }

    #[test]
    fn test_flood_fill_assigns_every_tile() {
        let mut ctx = context(7);
        run_step(&mut ctx, plate_assignment_step(4, 0.7));

        let graph = ctx.graph.as_ref().unwrap();
        assert_eq!(graph.plates.len(), 4);
        for tile in graph.tiles() {
            assert!(tile.plate.is_some(), "{tile} left unassigned");
        }
        // The plate tile lists partition the tile set.
        let total: usize = graph.plates.iter().map(|p| p.tiles.len()).sum();
        assert_eq!(total, graph.tile_count());
    }

    #[test]
    fn test_boundary_borders_separate_plates() {
        let mut ctx = context(11);
        run_step(&mut ctx, plate_assignment_step(3, 0.5));

        let graph = ctx.graph.as_ref().unwrap();
        for plate in &graph.plates {
            assert!(!plate.boundary_borders.is_empty());
            for &border in &plate.boundary_borders {
                let [a, b] = graph.border(border).tiles();
                assert_ne!(graph.tile(a).plate, graph.tile(b).plate);
            }
        }
    }

    #[test]
    fn test_plate_count_clamps_to_tile_count() {
        let mut ctx = context(13);
        run_step(&mut ctx, plate_assignment_step(100, 0.7));
        assert_eq!(ctx.graph.as_ref().unwrap().plates.len(), 12);
    }

    #[test]
    fn test_elevation_follows_the_plate() {
        let mut ctx = context(19);
        run_step(&mut ctx, plate_assignment_step(4, 0.5));
        run_step(&mut ctx, elevation_step());

        let graph = ctx.graph.as_ref().unwrap();
        for tile in graph.tiles() {
            let plate = graph.plate(tile.plate.unwrap());
            assert!((tile.elevation - plate.desired_elevation).abs() <= 0.05 + 1e-6);
            // Oceanic plates stay underwater, continental ones above.
            assert_eq!(tile.is_land(), !plate.oceanic);
        }
    }

    #[test]
    fn test_every_tile_gets_a_biome() {
        let mut ctx = context(23);
        run_step(&mut ctx, plate_assignment_step(4, 0.5));
        run_step(&mut ctx, elevation_step());

        let graph = ctx.graph.as_ref().unwrap();
        for tile in graph.tiles() {
            let biome = tile.biome.expect("biome assigned");
            match biome {
                Biome::Ocean => assert!(!tile.is_land()),
                Biome::Coast => {
                    assert!(tile.is_land());
                    assert!(tile.borders().iter().any(|&b| graph.is_land_boundary(b)));
                }
                Biome::Plains | Biome::Mountains => assert!(tile.is_land()),
            }
        }
    }

    #[test]
    fn test_steps_are_deterministic_per_seed() {
        let run = |seed| {
            let mut ctx = context(seed);
            run_step(&mut ctx, plate_assignment_step(4, 0.7));
            run_step(&mut ctx, elevation_step());
            let graph = ctx.graph.unwrap();
            graph
                .tiles()
                .iter()
                .map(|t| (t.plate, t.elevation.to_bits()))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(31), run(31));
        assert_ne!(run(31), run(32));
    }
}
