//! Terrain storage capability the deformer edits through.
//!
//! The deformer never touches a concrete terrain type. Anything that can hand
//! out and accept rectangular height and hole blocks, and rebuild its derived
//! structures on `sync`, can be cratered.

use crate::error::{DeformerError, Result};
use crate::height_grid::{Grid2, GridRegion, HeightPatch, HolesPatch, TerrainGeometry};

pub trait HeightGridSource {
    /// World placement and grid resolutions.
    fn geometry(&self) -> Result<TerrainGeometry>;

    fn get_heights(&self, region: GridRegion) -> Result<HeightPatch>;

    fn set_heights(&mut self, x: usize, z: usize, heights: &HeightPatch) -> Result<()>;

    fn get_holes(&self, region: GridRegion) -> Result<HolesPatch>;

    fn set_holes(&mut self, x: usize, z: usize, holes: &HolesPatch) -> Result<()>;

    /// Rebuild whatever is derived from the heights (render/collision data).
    /// Expensive; the deformer decides how often to call it.
    fn sync(&mut self);
}

/// Plain in-memory terrain. Counts syncs so callers can observe coalescing.
#[derive(Clone, Debug)]
pub struct InMemoryTerrain {
    geometry: TerrainGeometry,
    heights: HeightPatch,
    holes: HolesPatch,
    sync_count: usize,
}

impl InMemoryTerrain {
    /// Flat terrain at a uniform normalized height with no holes.
    pub fn flat(
        origin: [f32; 3],
        size: [f32; 3],
        resolution: usize,
        holes_resolution: usize,
        height: f32,
    ) -> Self {
        Self {
            geometry: TerrainGeometry {
                origin,
                size,
                heightmap_resolution: resolution,
                holes_resolution,
            },
            heights: Grid2::filled(resolution, resolution, height.clamp(0.0, 1.0)),
            holes: Grid2::filled(holes_resolution, holes_resolution, true),
            sync_count: 0,
        }
    }

    /// Terrain from existing row-major normalized heights (`resolution²`
    /// samples). The holes mask starts fully solid.
    pub fn from_heights(
        origin: [f32; 3],
        size: [f32; 3],
        resolution: usize,
        holes_resolution: usize,
        heights: Vec<f32>,
    ) -> Result<Self> {
        let heights = Grid2::from_vec(resolution, resolution, heights)?;
        Ok(Self {
            geometry: TerrainGeometry {
                origin,
                size,
                heightmap_resolution: resolution,
                holes_resolution,
            },
            heights,
            holes: Grid2::filled(holes_resolution, holes_resolution, true),
            sync_count: 0,
        })
    }

    pub fn heights(&self) -> &HeightPatch {
        &self.heights
    }

    pub fn holes(&self) -> &HolesPatch {
        &self.holes
    }

    pub fn height_at(&self, x: usize, z: usize) -> Option<f32> {
        self.heights.get(x, z).copied()
    }

    pub fn is_solid(&self, x: usize, z: usize) -> Option<bool> {
        self.holes.get(x, z).copied()
    }

    pub fn sync_count(&self) -> usize {
        self.sync_count
    }

    fn check_region(region: GridRegion, resolution: usize) -> Result<()> {
        if region.fits(resolution) {
            Ok(())
        } else {
            Err(DeformerError::RegionOutOfBounds { region, resolution })
        }
    }
}

impl HeightGridSource for InMemoryTerrain {
    fn geometry(&self) -> Result<TerrainGeometry> {
        Ok(self.geometry)
    }

    fn get_heights(&self, region: GridRegion) -> Result<HeightPatch> {
        Self::check_region(region, self.geometry.heightmap_resolution)?;
        Ok(self.heights.sub_grid(region))
    }

    fn set_heights(&mut self, x: usize, z: usize, heights: &HeightPatch) -> Result<()> {
        let region = GridRegion::new(x, z, heights.width(), heights.height());
        Self::check_region(region, self.geometry.heightmap_resolution)?;
        self.heights.write_sub_grid(x, z, heights);
        Ok(())
    }

    fn get_holes(&self, region: GridRegion) -> Result<HolesPatch> {
        Self::check_region(region, self.geometry.holes_resolution)?;
        Ok(self.holes.sub_grid(region))
    }

    fn set_holes(&mut self, x: usize, z: usize, holes: &HolesPatch) -> Result<()> {
        let region = GridRegion::new(x, z, holes.width(), holes.height());
        Self::check_region(region, self.geometry.holes_resolution)?;
        self.holes.write_sub_grid(x, z, holes);
        Ok(())
    }

    fn sync(&mut self) {
        self.sync_count += 1;
    }
}
