use std::error::Error;
use std::time::Duration;

use clap::Parser;

use planet_mesh::geometry::Ray;
use planet_mesh::graph::Biome;
use planet_mesh::pipeline::{
    queue_generation, GenerationError, GenerationSettings, Planet, PlanetContext,
};
use planet_mesh::seeds::hash_seed;
use planet_mesh::task::{Scheduler, StepStatus, SteppedTask};

#[derive(Parser, Debug)]
#[command(name = "planet_mesh")]
#[command(about = "Generate a procedural planet surface mesh with tectonic plates")]
struct Args {
    /// Random seed (uses a random seed if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Free-form seed text, hashed into a numeric seed (overrides --seed)
    #[arg(long)]
    seed_text: Option<String>,

    /// Number of tectonic plates
    #[arg(short = 'p', long, default_value = "4")]
    plates: u32,

    /// Planet radius
    #[arg(short, long, default_value = "1000")]
    radius: f32,

    /// Probability that a plate is oceanic
    #[arg(long, default_value = "0.7")]
    oceanic_rate: f64,

    /// Unbroken scheduler execution budget per time slice, in milliseconds
    #[arg(long, default_value = "20")]
    slice_ms: u64,

    /// Host sleep between time slices, in milliseconds
    #[arg(long, default_value = "1")]
    sleep_ms: u64,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let seed = match &args.seed_text {
        Some(text) => hash_seed(text),
        None => args.seed.unwrap_or_else(rand::random),
    };
    println!("Generating planet with seed: {}", seed);

    let mut settings = GenerationSettings::new(seed);
    settings.plate_count = args.plates;
    settings.oceanic_rate = args.oceanic_rate;
    settings.radius = args.radius;

    // Progress sink: print whenever the stage name or whole percent changes.
    let mut last_line = String::new();
    let sink = move |task: &SteppedTask<PlanetContext>| {
        let percent = (task.progress() * 100.0) as u32;
        let name = task.current_action_name().unwrap_or("Working");
        let line = format!("[{:3}%] {}", percent, name);
        if line != last_line {
            println!("{}", line);
            last_line = line;
        }
    };

    let task = SteppedTask::with_intervals(
        Duration::from_millis(args.slice_ms),
        Duration::from_millis(args.sleep_ms),
    );
    let mut scheduler = Scheduler::new(task, sink);
    queue_generation(scheduler.task_mut(), settings);

    // Host loop: run a slice, collect finished root results, sleep, repeat.
    let mut ctx = PlanetContext::new();
    let mut planet: Option<Planet> = None;
    loop {
        let status = scheduler.step(&mut ctx);
        while let Some(result) = scheduler.task_mut().get_result() {
            if let Ok(result) = result.downcast::<Result<Planet, GenerationError>>() {
                planet = Some((*result)?);
            }
        }
        match status {
            StepStatus::Continue => std::thread::sleep(scheduler.task().sleep_interval()),
            StepStatus::Completed => break,
            StepStatus::Canceled => return Ok(()),
        }
    }

    let Some(planet) = planet else {
        return Err("generation completed without producing a planet".into());
    };
    print_summary(&planet);
    Ok(())
}

fn print_summary(planet: &Planet) {
    let graph = &planet.graph;
    println!(
        "Surface mesh: {} tiles, {} borders, {} corners",
        graph.tiles().len(),
        graph.borders().len(),
        graph.corners().len()
    );

    let oceanic = graph.plates.iter().filter(|p| p.oceanic).count();
    println!(
        "Created {} plates ({} continental, {} oceanic)",
        graph.plates.len(),
        graph.plates.len() - oceanic,
        oceanic
    );

    let land = graph.tiles().iter().filter(|t| t.is_land()).count();
    println!(
        "Land tiles: {} of {} ({:.1}%)",
        land,
        graph.tile_count(),
        100.0 * land as f64 / graph.tile_count() as f64
    );

    let mut biomes = [0usize; 4];
    for tile in graph.tiles() {
        match tile.biome {
            Some(Biome::Ocean) => biomes[0] += 1,
            Some(Biome::Coast) => biomes[1] += 1,
            Some(Biome::Plains) => biomes[2] += 1,
            Some(Biome::Mountains) => biomes[3] += 1,
            None => {}
        }
    }
    println!(
        "Biomes: {} ocean, {} coast, {} plains, {} mountains",
        biomes[0], biomes[1], biomes[2], biomes[3]
    );

    // Sample pick: drop a ray onto the first tile from above its surface.
    let tile = &graph.tiles()[0];
    let ray = Ray::new(tile.average_position + tile.normal * 500.0, -tile.normal);
    match planet.partition.intersect_ray(graph, &ray) {
        Some(hit) => println!(
            "Sample ray query: {} at distance {:.1}",
            graph.tile(hit.tile),
            hit.distance
        ),
        None => println!("Sample ray query: no hit"),
    }

    for plate in &graph.plates {
        let root = graph.tile(plate.root);
        let movement = plate.calculate_movement(root.position, root.position);
        println!(
            "Plate at {}: {} tiles, {} boundary borders, {}, drift rate {:.4}, root movement {:.2}",
            root,
            plate.tiles.len(),
            plate.boundary_borders.len(),
            if plate.oceanic { "oceanic" } else { "continental" },
            plate.drift_rate,
            movement.length()
        );
    }
}
