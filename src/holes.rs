//! Hole carving for craters that reach maximum depth.
//!
//! Holes live on their own grid (possibly a different resolution from the
//! heights) and are cut inside an inner radius so the void never outgrows the
//! visible depression. Carving only ever clears cells; the baseline restore is
//! the one way to heal them.

use crate::crater::{CraterFootprint, ResolvedCrater};
use crate::error::Result;
use crate::grid_source::HeightGridSource;
use crate::height_grid::{HolesPatch, TerrainGeometry};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HoleCarver {
    inner_radius_ratio: f32,
}

impl HoleCarver {
    pub fn new(inner_radius_ratio: f32) -> Self {
        Self { inner_radius_ratio }
    }

    pub fn inner_radius(&self, crater_radius: f32) -> f32 {
        crater_radius * self.inner_radius_ratio
    }

    /// Block of the holes grid around the crater center.
    pub fn plan(
        &self,
        geometry: &TerrainGeometry,
        crater: &ResolvedCrater,
    ) -> Option<CraterFootprint> {
        let mapping = geometry.holes();
        let (nx, nz) =
            geometry.world_to_normalized(crater.world_position[0], crater.world_position[2]);
        let center = mapping.normalized_to_cell(nx, nz);
        let (half_width, half_height) =
            mapping.radius_to_samples(self.inner_radius(crater.radius));

        let region = mapping.clipped_region(center, half_width, half_height);
        if region.is_empty() {
            return None;
        }
        Some(CraterFootprint {
            region,
            center,
            mapping,
        })
    }

    /// Mark every cell within `inner_radius` of the footprint center as void.
    /// Returns the number of cells that were solid before.
    pub fn carve_patch(
        holes: &mut HolesPatch,
        footprint: &CraterFootprint,
        inner_radius: f32,
    ) -> usize {
        let region = footprint.region;
        let mut carved = 0;
        for z in 0..holes.height() {
            for x in 0..holes.width() {
                if !footprint.covers((region.x + x, region.z + z), inner_radius) {
                    continue;
                }
                if holes.get(x, z).copied().unwrap_or(false) {
                    carved += 1;
                }
                holes.set(x, z, false);
            }
        }
        carved
    }

    /// Read, carve, and write back the holes block for one crater.
    pub fn carve<S: HeightGridSource>(
        &self,
        source: &mut S,
        geometry: &TerrainGeometry,
        crater: &ResolvedCrater,
    ) -> Result<usize> {
        let Some(footprint) = self.plan(geometry, crater) else {
            log::trace!("hole footprint empty at {:?}", crater.world_position);
            return Ok(0);
        };

        let mut holes = source.get_holes(footprint.region)?;
        let carved = Self::carve_patch(&mut holes, &footprint, self.inner_radius(crater.radius));
        source.set_holes(footprint.region.x, footprint.region.z, &holes)?;
        Ok(carved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeformerConfig;
    use crate::crater::CraterRequest;
    use crate::grid_source::InMemoryTerrain;
    use crate::height_grid::GridRegion;

    fn terrain() -> InMemoryTerrain {
        // Heights every 2 m, holes every 1 m.
        InMemoryTerrain::flat([0.0; 3], [32.0, 10.0, 32.0], 17, 33, 0.5)
    }

    fn crater_at(x: f32, z: f32, radius: f32) -> ResolvedCrater {
        ResolvedCrater::resolve(
            &CraterRequest::at([x, 0.0, z]).with_radius(radius),
            &DeformerConfig::default(),
        )
    }

    #[test]
    fn test_plan_uses_holes_resolution() {
        let t = terrain();
        let geometry = t.geometry().unwrap();
        let carver = HoleCarver::new(0.5);
        let footprint = carver.plan(&geometry, &crater_at(16.0, 16.0, 8.0)).unwrap();
        assert_eq!(footprint.center, (16, 16));
        assert_eq!(footprint.region, GridRegion::new(12, 12, 9, 9));
    }

    #[test]
    fn test_carve_marks_inner_radius_only() {
        let mut t = terrain();
        let geometry = t.geometry().unwrap();
        let carver = HoleCarver::new(0.5);
        let carved = carver.carve(&mut t, &geometry, &crater_at(16.0, 16.0, 8.0)).unwrap();
        assert!(carved > 0);

        assert_eq!(t.is_solid(16, 16), Some(false));
        assert_eq!(t.is_solid(20, 16), Some(false));
        assert_eq!(t.is_solid(21, 16), Some(true));
        // Corner of the block is beyond 4 m.
        assert_eq!(t.is_solid(19, 19), Some(true));
    }

    #[test]
    fn test_carving_twice_reports_nothing_new() {
        let mut t = terrain();
        let geometry = t.geometry().unwrap();
        let carver = HoleCarver::new(0.5);
        let crater = crater_at(16.0, 16.0, 4.0);
        let first = carver.carve(&mut t, &geometry, &crater).unwrap();
        let second = carver.carve(&mut t, &geometry, &crater).unwrap();
        assert!(first > 0);
        assert_eq!(second, 0);
    }

    #[test]
    fn test_carve_on_microscopic_terrain_clears_whole_grid() {
        // Sample spacing this small pushes the inner radius past usize::MAX samples.
        let mut t = InMemoryTerrain::flat([0.0; 3], [1e-30, 10.0, 1e-30], 17, 33, 0.5);
        let geometry = t.geometry().unwrap();
        let carver = HoleCarver::new(0.5);
        let footprint = carver.plan(&geometry, &crater_at(0.0, 0.0, 8.0)).unwrap();
        assert_eq!(footprint.region, GridRegion::full(33));

        let carved = carver.carve(&mut t, &geometry, &crater_at(0.0, 0.0, 8.0)).unwrap();
        assert_eq!(carved, 33 * 33);
        assert_eq!(t.is_solid(32, 32), Some(false));
    }
}
