//! Generation stage trait and pipeline orchestration.

use std::sync::Mutex;

use log::info;
use thiserror::Error;

use crate::erosion::{Eroder, ErosionConfig};
use crate::error::ConfigError;
use crate::noise::FractalNoiseConfig;
use crate::terrain::{box_blur, generate_heightmap, Heightfield, Terrain};

/// Unique identifier for generation stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageId {
    /// Initial heightmap generation from noise.
    Heightmap,
    /// Box blur applied before erosion.
    Smoothing,
    /// Droplet-based hydraulic erosion.
    Erosion,
}

impl StageId {
    /// Returns the name of the stage.
    pub fn name(&self) -> &'static str {
        match self {
            StageId::Heightmap => "heightmap",
            StageId::Smoothing => "smoothing",
            StageId::Erosion => "erosion",
        }
    }
}

/// Configuration passed to each generation stage.
#[derive(Debug, Clone)]
pub struct StageConfig {
    /// Noise configuration for terrain generation.
    pub noise: FractalNoiseConfig,
    /// Rescale raw noise to [0, 1] before later stages see it.
    pub normalize: bool,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            noise: FractalNoiseConfig::default(),
            normalize: true,
        }
    }
}

impl StageConfig {
    /// Creates a new configuration with the given noise settings.
    pub fn with_noise(noise: FractalNoiseConfig) -> Self {
        Self {
            noise,
            ..Default::default()
        }
    }
}

/// Errors that can occur during pipeline execution.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Stage '{0}' failed: {1}")]
    StageFailed(String, String),
    #[error("Missing dependency: stage '{0}' requires '{1}'")]
    MissingDependency(String, String),
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Trait for implementing generation stages.
///
/// Each stage transforms the terrain in some way, building upon
/// previous stages.
pub trait GenerationStage: Send + Sync {
    /// Returns the unique identifier for this stage.
    fn id(&self) -> StageId;

    /// Returns a human-readable name for the stage.
    fn name(&self) -> &str;

    /// Returns the stage IDs that must be executed before this stage.
    fn dependencies(&self) -> &[StageId] {
        &[]
    }

    /// Executes the generation stage, modifying the terrain in place.
    ///
    /// # Arguments
    /// * `terrain` - The terrain to modify
    /// * `config` - Stage configuration parameters
    ///
    /// # Returns
    /// `Ok(())` on success, or an error describing what went wrong
    fn execute(&self, terrain: &mut Terrain, config: &StageConfig) -> Result<(), PipelineError>;

    fn fail(&self, err: impl std::fmt::Display) -> PipelineError
    where
        Self: Sized,
    {
        PipelineError::StageFailed(self.name().to_string(), err.to_string())
    }
}

/// Orchestrates multiple generation stages into a complete pipeline.
pub struct Pipeline {
    stages: Vec<Box<dyn GenerationStage>>,
    config: StageConfig,
}

impl Pipeline {
    /// Creates a new empty pipeline with the given configuration.
    pub fn new(config: StageConfig) -> Self {
        Self {
            stages: Vec::new(),
            config,
        }
    }

    /// Adds a stage to the pipeline.
    pub fn add_stage<S: GenerationStage + 'static>(&mut self, stage: S) -> &mut Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Returns the number of stages in the pipeline.
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Executes all stages in order on the given terrain.
    pub fn run(&self, terrain: &mut Terrain) -> Result<(), PipelineError> {
        self.run_with_callbacks(terrain, |_, _, _| {}, |_, _, _| {})
    }

    /// Executes all stages with progress callbacks.
    ///
    /// # Arguments
    /// * `terrain` - The terrain to generate
    /// * `on_stage_start` - Called when each stage begins
    /// * `on_stage_complete` - Called when each stage finishes
    pub fn run_with_callbacks<F1, F2>(
        &self,
        terrain: &mut Terrain,
        mut on_stage_start: F1,
        mut on_stage_complete: F2,
    ) -> Result<(), PipelineError>
    where
        F1: FnMut(&str, usize, usize),
        F2: FnMut(&str, usize, usize),
    {
        let total = self.stages.len();
        let mut completed: Vec<StageId> = Vec::new();

        for (i, stage) in self.stages.iter().enumerate() {
            on_stage_start(stage.name(), i, total);

            for dep in stage.dependencies() {
                if !completed.contains(dep) {
                    return Err(PipelineError::MissingDependency(
                        stage.name().to_string(),
                        dep.name().to_string(),
                    ));
                }
            }

            stage.execute(terrain, &self.config)?;
            completed.push(stage.id());

            on_stage_complete(stage.name(), i, total);
        }

        Ok(())
    }
}

/// Heightmap generation stage using fractal noise.
///
/// Fills the interior with noise and pads the border by repeating the edge
/// cells.
pub struct HeightmapStage;

impl GenerationStage for HeightmapStage {
    fn id(&self) -> StageId {
        StageId::Heightmap
    }

    fn name(&self) -> &str {
        "Heightmap Generation"
    }

    fn execute(&self, terrain: &mut Terrain, config: &StageConfig) -> Result<(), PipelineError> {
        let mut noise = generate_heightmap(terrain.map_size(), &config.noise).map_err(|e| self.fail(e))?;
        terrain.noise_range = Some((noise.min, noise.max));
        if config.normalize {
            noise.normalize();
        }
        terrain.normalized = config.normalize;
        terrain.heightfield = Heightfield::from_interior(terrain.map_size(), terrain.border(), &noise.heights)
            .map_err(|e| self.fail(e))?;
        Ok(())
    }
}

/// Separable box blur over the whole grid.
pub struct SmoothingStage {
    pub radius: u32,
    pub passes: u32,
}

impl SmoothingStage {
    pub fn new(radius: u32, passes: u32) -> Self {
        Self { radius, passes }
    }
}

impl GenerationStage for SmoothingStage {
    fn id(&self) -> StageId {
        StageId::Smoothing
    }

    fn name(&self) -> &str {
        "Smoothing"
    }

    fn dependencies(&self) -> &[StageId] {
        &[StageId::Heightmap]
    }

    fn execute(&self, terrain: &mut Terrain, _config: &StageConfig) -> Result<(), PipelineError> {
        box_blur(&mut terrain.heightfield, self.radius, self.passes);
        Ok(())
    }
}

/// Hydraulic erosion stage.
///
/// Holds one [`Eroder`] so brushes and working buffers survive across runs of
/// the same pipeline.
pub struct ErosionStage {
    eroder: Mutex<Eroder>,
}

impl ErosionStage {
    pub fn new(config: ErosionConfig) -> Result<Self, PipelineError> {
        Ok(Self {
            eroder: Mutex::new(Eroder::new(config)?),
        })
    }
}

impl GenerationStage for ErosionStage {
    fn id(&self) -> StageId {
        StageId::Erosion
    }

    fn name(&self) -> &str {
        "Hydraulic Erosion"
    }

    fn dependencies(&self) -> &[StageId] {
        &[StageId::Heightmap]
    }

    fn execute(&self, terrain: &mut Terrain, _config: &StageConfig) -> Result<(), PipelineError> {
        let mut eroder = self
            .eroder
            .lock()
            .map_err(|_| self.fail("eroder lock poisoned"))?;
        let stats = eroder.erode(&mut terrain.heightfield).map_err(|e| self.fail(e))?;
        info!(
            "Erosion stage: {} droplets, range now {:?}",
            stats.droplets,
            terrain.height_range()
        );
        terrain.erosion = Some(stats);
        Ok(())
    }
}
