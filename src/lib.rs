use godot::init::InitLevel;
use godot::prelude::*;

pub mod config;
pub mod crater;
pub mod deformer;
pub mod edit_worker;
pub mod error;
mod godot_log;
pub mod grid_source;
pub mod height_grid;
pub mod holes;
pub mod map_data;
pub mod noise_field;
pub mod rate_limiter;
pub mod snapshot;
pub mod stamp_log;
pub mod sync_scheduler;
mod terrain;

pub use config::DeformerConfig;
pub use crater::CraterRequest;
pub use deformer::{DeformerStats, TerrainDeformer};
pub use error::DeformerError;
pub use grid_source::{HeightGridSource, InMemoryTerrain};

struct PixyCraterExtension;

#[gdextension]
unsafe impl ExtensionLibrary for PixyCraterExtension {
    fn on_level_init(level: InitLevel) {
        if level == InitLevel::Scene {
            godot_log::init_godot_logger(log::LevelFilter::Info);
        }
    }
}
