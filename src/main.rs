//! terrain-erosion CLI.
//!
//! Generates fractal heightfields, erodes them with simulated water droplets,
//! and writes the result as PNG or RAW heightmaps.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use simple_logger::SimpleLogger;

use terrain_erosion::erosion::{
    brush_cell_count_capped, AccumulationStrategy, DropletParams, Eroder, ErosionBrush, ErosionConfig, ErosionStats,
    MAX_BRUSH_CELLS,
};
use terrain_erosion::export::{
    export_heightfield_png, export_heightfield_raw, load_heightfield, PngExportOptions, RawFormat,
};
use terrain_erosion::noise::FractalNoiseConfig;
use terrain_erosion::pipeline::{ErosionStage, HeightmapStage, Pipeline, SmoothingStage, StageConfig};
use terrain_erosion::terrain::{Heightfield, Terrain};

/// Fractal terrain generator with droplet-based hydraulic erosion.
#[derive(Parser)]
#[command(name = "terrain-erosion")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log debug detail from the library.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new heightmap and optionally erode it.
    Generate(GenerateArgs),
    /// Erode an existing grayscale heightmap image.
    Erode(ErodeArgs),
    /// Show the size of an erosion brush.
    Brush {
        /// Brush radius in cells.
        #[arg(short, long, default_value = "3")]
        radius: u32,
    },
}

#[derive(Args)]
struct GenerateArgs {
    /// Interior size of the map in cells.
    #[arg(short, long, default_value = "255")]
    map_size: u32,

    /// Random seed for reproducible generation.
    #[arg(short, long)]
    seed: Option<u64>,

    /// Output directory for generated files.
    #[arg(short, long, default_value = "./output")]
    output: PathBuf,

    /// Base name for output files.
    #[arg(short, long, default_value = "terrain")]
    name: String,

    /// Export format.
    #[arg(short, long, default_value = "png")]
    format: ExportFormat,

    /// Number of noise octaves.
    #[arg(long, default_value = "7")]
    octaves: u32,

    /// Sampling scale of the first octave.
    #[arg(long, default_value = "2.0")]
    initial_scale: f32,

    /// Scale multiplier per octave (lacunarity).
    #[arg(long, default_value = "2.0")]
    lacunarity: f32,

    /// Amplitude decay per octave (persistence).
    #[arg(long, default_value = "0.5")]
    persistence: f32,

    /// Keep raw noise values instead of rescaling to [0, 1].
    #[arg(long)]
    no_normalize: bool,

    /// Box blur radius applied before erosion (0 disables).
    #[arg(long, default_value = "0")]
    smooth: u32,

    /// Skip hydraulic erosion.
    #[arg(long)]
    skip_erosion: bool,

    #[command(flatten)]
    erosion: ErosionArgs,
}

#[derive(Args)]
struct ErodeArgs {
    /// Grayscale heightmap to erode.
    input: PathBuf,

    /// Output PNG path.
    #[arg(short, long, default_value = "./output/eroded.png")]
    output: PathBuf,

    /// Random seed for droplet placement.
    #[arg(short, long, default_value = "0")]
    seed: u64,

    #[command(flatten)]
    erosion: ErosionArgs,
}

#[derive(Args)]
struct ErosionArgs {
    /// Number of droplets to simulate.
    #[arg(long, default_value = "50000")]
    iterations: u32,

    /// Erosion brush radius; also the width of the border margin.
    #[arg(long, default_value = "3")]
    brush_radius: u32,

    /// How concurrent droplets write into the grid.
    #[arg(long, default_value = "deferred")]
    strategy: StrategyArg,

    /// Droplets per snapshot for the deferred strategy.
    #[arg(long, default_value = "1024")]
    batch_size: u32,

    /// Maximum steps per droplet.
    #[arg(long, default_value = "30")]
    max_lifetime: u32,

    /// Blend between previous direction and downhill gradient (0-1).
    #[arg(long, default_value = "0.3")]
    inertia: f32,

    /// Multiplier on the sediment capacity.
    #[arg(long, default_value = "3.0")]
    sediment_capacity_factor: f32,

    /// Capacity floor on flat ground.
    #[arg(long, default_value = "0.01")]
    min_sediment_capacity: f32,

    /// Fraction of excess sediment dropped per step (0-1).
    #[arg(long, default_value = "0.3")]
    deposit_speed: f32,

    /// Fraction of free capacity filled per step (0-1).
    #[arg(long, default_value = "0.3")]
    erode_speed: f32,

    /// Fraction of water lost per step (0-1).
    #[arg(long, default_value = "0.01")]
    evaporate_speed: f32,

    #[arg(long, default_value = "4.0")]
    gravity: f32,

    #[arg(long, default_value = "1.0")]
    start_speed: f32,

    #[arg(long, default_value = "1.0")]
    start_water: f32,
}

impl ErosionArgs {
    fn to_config(&self, seed: u64) -> ErosionConfig {
        ErosionConfig {
            brush_radius: self.brush_radius,
            iterations: self.iterations,
            seed,
            strategy: self.strategy.into(),
            batch_size: self.batch_size,
            droplet: DropletParams {
                max_lifetime: self.max_lifetime,
                inertia: self.inertia,
                sediment_capacity_factor: self.sediment_capacity_factor,
                min_sediment_capacity: self.min_sediment_capacity,
                deposit_speed: self.deposit_speed,
                erode_speed: self.erode_speed,
                evaporate_speed: self.evaporate_speed,
                gravity: self.gravity,
                start_speed: self.start_speed,
                start_water: self.start_water,
            },
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    /// Shared atomic grid, fastest, timing-dependent results.
    Atomic,
    /// Batched snapshots, reproducible for a given seed.
    Deferred,
}

impl From<StrategyArg> for AccumulationStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Atomic => AccumulationStrategy::Atomic,
            StrategyArg::Deferred => AccumulationStrategy::Deferred,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    /// 16-bit PNG (universal compatibility).
    Png,
    /// 16-bit RAW little-endian.
    Raw,
    /// 32-bit float RAW (high precision).
    RawFloat,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Warn };
    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("Warning: logger unavailable: {}", e);
    }

    match cli.command {
        Commands::Generate(args) => run_generate(args),
        Commands::Erode(args) => run_erode(args),
        Commands::Brush { radius } => run_brush(radius),
    }
}

/// Prints `context: err` and exits with status 1.
fn exit_with(context: &str, err: impl Display) -> ! {
    eprintln!("Error {}: {}", context, err);
    std::process::exit(1);
}

fn run_generate(args: GenerateArgs) {
    let seed = args.seed.unwrap_or_else(|| {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
    });

    println!("terrain-erosion - Fractal Terrain Generator");
    println!("===========================================");
    println!("Map size: {}x{} (border {})", args.map_size, args.map_size, args.erosion.brush_radius);
    println!("Seed: {}", seed);
    println!("Output: {}", args.output.display());

    let start = Instant::now();

    let noise = FractalNoiseConfig {
        octaves: args.octaves,
        initial_scale: args.initial_scale,
        lacunarity: args.lacunarity,
        persistence: args.persistence,
        seed,
    };
    let stage_config = StageConfig {
        noise,
        normalize: !args.no_normalize,
    };

    let mut terrain = Terrain::new(args.map_size, args.erosion.brush_radius)
        .unwrap_or_else(|e| exit_with("creating terrain", e));

    println!("\nRunning generation pipeline...");
    let mut pipeline = Pipeline::new(stage_config);
    pipeline.add_stage(HeightmapStage);

    if args.smooth > 0 {
        pipeline.add_stage(SmoothingStage::new(args.smooth, 1));
        println!("Smoothing enabled: radius={}", args.smooth);
    }

    if !args.skip_erosion {
        let config = args.erosion.to_config(seed);
        let stage = ErosionStage::new(config).unwrap_or_else(|e| exit_with("configuring erosion", e));
        pipeline.add_stage(stage);
        println!(
            "Erosion enabled: {} droplets, brush radius {}",
            args.erosion.iterations, args.erosion.brush_radius
        );
    } else {
        println!("Erosion: SKIPPED");
    }

    pipeline
        .run_with_callbacks(
            &mut terrain,
            |name, i, total| {
                println!("  [{}/{}] Starting: {}", i + 1, total, name);
            },
            |name, i, total| {
                println!("  [{}/{}] Completed: {}", i + 1, total, name);
            },
        )
        .unwrap_or_else(|e| exit_with("during generation", e));

    println!("Generation completed in {:.2?}", start.elapsed());
    if let Some((min, max)) = terrain.noise_range {
        println!("Raw noise range: [{:.4}, {:.4}]", min, max);
    }
    if let Some(stats) = &terrain.erosion {
        print_stats(stats);
    }

    let (min_h, max_h) = terrain.height_range();
    println!("Height range: [{:.4}, {:.4}]", min_h, max_h);

    println!("\nExporting heightmap...");
    let export_start = Instant::now();
    std::fs::create_dir_all(&args.output).unwrap_or_else(|e| exit_with("creating output directory", e));
    export(&terrain.heightfield, &args.output, &args.name, args.format);
    println!("Export completed in {:.2?}", export_start.elapsed());
    println!("\nTotal time: {:.2?}", start.elapsed());
}

fn export(field: &Heightfield, dir: &Path, name: &str, format: ExportFormat) {
    let options = PngExportOptions::auto_range(field);
    let (min, max) = (options.min_height, options.max_height);
    match format {
        ExportFormat::Png => {
            let path = dir.join(format!("{}.png", name));
            export_heightfield_png(field, &path, &options).unwrap_or_else(|e| exit_with("exporting PNG", e));
            println!("  Exported PNG: {}", path.display());
        }
        ExportFormat::Raw => {
            let path = dir.join(format!("{}.raw", name));
            export_heightfield_raw(field, &path, RawFormat::R16LittleEndian, min, max)
                .unwrap_or_else(|e| exit_with("exporting RAW", e));
            println!("  Exported RAW (R16): {}", path.display());
        }
        ExportFormat::RawFloat => {
            let path = dir.join(format!("{}.raw", name));
            export_heightfield_raw(field, &path, RawFormat::R32Float, min, max)
                .unwrap_or_else(|e| exit_with("exporting RAW", e));
            println!("  Exported RAW (R32 float): {}", path.display());
        }
    }
}

fn run_erode(args: ErodeArgs) {
    let start = Instant::now();
    let config = args.erosion.to_config(args.seed);

    let mut field = load_heightfield(&args.input, config.brush_radius)
        .unwrap_or_else(|e| exit_with("loading heightmap", e));
    println!(
        "Loaded {}: {}x{}",
        args.input.display(),
        field.map_size(),
        field.map_size()
    );

    let mut eroder = Eroder::new(config).unwrap_or_else(|e| exit_with("configuring erosion", e));
    let stats = eroder.erode(&mut field).unwrap_or_else(|e| exit_with("during erosion", e));
    print_stats(&stats);

    if let Some(parent) = args.output.parent() {
        std::fs::create_dir_all(parent).unwrap_or_else(|e| exit_with("creating output directory", e));
    }
    // Input was read as [0, 1], so keep that scale rather than stretching.
    export_heightfield_png(&field, &args.output, &PngExportOptions::default())
        .unwrap_or_else(|e| exit_with("exporting PNG", e));
    println!("Wrote {} in {:.2?}", args.output.display(), start.elapsed());
}

fn run_brush(radius: u32) {
    println!("Erosion brush radius {}", radius);
    let cells = brush_cell_count_capped(radius, MAX_BRUSH_CELLS);
    if cells > MAX_BRUSH_CELLS {
        println!("  Cells: more than {} (limit {})", MAX_BRUSH_CELLS, MAX_BRUSH_CELLS);
    } else {
        println!("  Cells: {} (limit {})", cells, MAX_BRUSH_CELLS);
    }

    let stride = 2 * radius as usize + 1;
    match ErosionBrush::build(radius, stride) {
        Ok(brush) => {
            let center = brush
                .cells()
                .iter()
                .find(|c| c.dx == 0 && c.dy == 0)
                .map_or(0.0, |c| c.weight);
            println!("  Weight sum: {:.6}", brush.weight_sum());
            println!("  Center weight: {:.6}", center);
        }
        Err(e) => exit_with("building brush", e),
    }
}

fn print_stats(stats: &ErosionStats) {
    println!("Erosion: {} droplets in {:.2?}", stats.droplets, stats.elapsed);
    println!("  Steps:     {}", stats.steps);
    println!("  Eroded:    {:.4}", stats.eroded);
    println!("  Deposited: {:.4}", stats.deposited);
    println!(
        "  Stopped:   {} left map, {} evaporated, {} out of lifetime",
        stats.left_interior, stats.evaporated, stats.lifetime_exhausted
    );
}
