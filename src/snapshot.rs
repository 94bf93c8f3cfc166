//! Baseline capture and restore for a deformable terrain.
//!
//! The baseline is taken once, when the deformer binds to a terrain, and is
//! never written afterwards. Blocks are held behind `Arc` so the edit worker
//! and diagnostics can share them without copying a full heightmap.

use std::sync::Arc;

use crate::error::Result;
use crate::grid_source::HeightGridSource;
use crate::height_grid::{GridRegion, HeightPatch, HolesPatch, TerrainGeometry};

#[derive(Clone, Debug)]
pub struct TerrainBaseline {
    heights: Arc<HeightPatch>,
    holes: Arc<HolesPatch>,
}

impl TerrainBaseline {
    /// Read the full heights and holes grids.
    pub fn capture<S: HeightGridSource>(source: &S, geometry: &TerrainGeometry) -> Result<Self> {
        let heights = source.get_heights(GridRegion::full(geometry.heightmap_resolution))?;
        let holes = source.get_holes(GridRegion::full(geometry.holes_resolution))?;
        Ok(Self {
            heights: Arc::new(heights),
            holes: Arc::new(holes),
        })
    }

    /// Write the baseline back: heights, an unconditional sync, then holes.
    /// Safe to repeat; every call lands on the same state.
    pub fn restore<S: HeightGridSource>(&self, source: &mut S) -> Result<()> {
        source.set_heights(0, 0, &self.heights)?;
        source.sync();
        source.set_holes(0, 0, &self.holes)?;
        Ok(())
    }

    pub fn heights(&self) -> &Arc<HeightPatch> {
        &self.heights
    }

    pub fn holes(&self) -> &Arc<HolesPatch> {
        &self.holes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid_source::InMemoryTerrain;
    use crate::height_grid::Grid2;

    fn terrain() -> InMemoryTerrain {
        let heights = (0..25).map(|v| v as f32 / 25.0).collect();
        InMemoryTerrain::from_heights([0.0; 3], [4.0, 1.0, 4.0], 5, 3, heights).unwrap()
    }

    #[test]
    fn test_capture_copies_full_grids() {
        let t = terrain();
        let geometry = t.geometry().unwrap();
        let baseline = TerrainBaseline::capture(&t, &geometry).unwrap();
        assert_eq!(baseline.heights().as_ref(), t.heights());
        assert_eq!(baseline.holes().width(), 3);
    }

    #[test]
    fn test_restore_reverts_edits_and_syncs() {
        let mut t = terrain();
        let geometry = t.geometry().unwrap();
        let baseline = TerrainBaseline::capture(&t, &geometry).unwrap();
        let original = t.clone();

        t.set_heights(1, 1, &Grid2::filled(3, 3, 0.0)).unwrap();
        t.set_holes(0, 0, &Grid2::filled(2, 2, false)).unwrap();

        baseline.restore(&mut t).unwrap();
        assert_eq!(t.heights(), original.heights());
        assert_eq!(t.holes(), original.holes());
        assert_eq!(t.sync_count(), 1);

        baseline.restore(&mut t).unwrap();
        assert_eq!(t.heights(), original.heights());
        assert_eq!(t.sync_count(), 2);
    }

    #[test]
    fn test_baseline_is_shared_not_copied() {
        let t = terrain();
        let geometry = t.geometry().unwrap();
        let baseline = TerrainBaseline::capture(&t, &geometry).unwrap();
        let copy = baseline.clone();
        assert!(Arc::ptr_eq(baseline.heights(), copy.heights()));
    }
}
