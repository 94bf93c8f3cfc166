//! Dense grid storage and world-to-grid mapping shared by heights and holes.
//!
//! Heights and the holes mask live on independent square grids that cover the
//! same world rectangle, so every conversion goes through a [`GridMapping`]
//! built for one resolution.

use crate::error::{DeformerError, Result};

/// Rectangular block of grid cells: `x`/`z` is the lower corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridRegion {
    pub x: usize,
    pub z: usize,
    pub width: usize,
    pub height: usize,
}

impl GridRegion {
    pub fn new(x: usize, z: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            z,
            width,
            height,
        }
    }

    /// Region covering a whole `resolution x resolution` grid.
    pub fn full(resolution: usize) -> Self {
        Self::new(0, 0, resolution, resolution)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// Check the region fits in a square grid of the given resolution.
    pub fn fits(&self, resolution: usize) -> bool {
        self.x + self.width <= resolution && self.z + self.height <= resolution
    }
}

/// Row-major 2D array (`z` rows of `x` samples).
#[derive(Clone, Debug, PartialEq)]
pub struct Grid2<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

/// Normalized elevation samples in `[0, 1]`.
pub type HeightPatch = Grid2<f32>;

/// Holes mask: `true` is solid ground, `false` is a void.
pub type HolesPatch = Grid2<bool>;

impl<T: Clone> Grid2<T> {
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Copy out a sub-block. The region must fit inside this grid.
    pub fn sub_grid(&self, region: GridRegion) -> Grid2<T> {
        let mut data = Vec::with_capacity(region.len());
        for z in region.z..region.z + region.height {
            let start = z * self.width + region.x;
            data.extend_from_slice(&self.data[start..start + region.width]);
        }
        Grid2 {
            width: region.width,
            height: region.height,
            data,
        }
    }

    /// Paste `patch` with its lower corner at (`x`, `z`).
    pub fn write_sub_grid(&mut self, x: usize, z: usize, patch: &Grid2<T>) {
        for row in 0..patch.height {
            let dst = (z + row) * self.width + x;
            let src = row * patch.width;
            self.data[dst..dst + patch.width]
                .clone_from_slice(&patch.data[src..src + patch.width]);
        }
    }
}

impl<T> Grid2<T> {
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Result<Self> {
        if data.len() != width * height {
            return Err(DeformerError::PatchSizeMismatch {
                expected: width * height,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, z: usize) -> Option<&T> {
        if x < self.width && z < self.height {
            self.data.get(z * self.width + x)
        } else {
            None
        }
    }

    pub fn set(&mut self, x: usize, z: usize, value: T) {
        if x < self.width && z < self.height {
            self.data[z * self.width + x] = value;
        }
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

/// World placement of a terrain: origin of cell `[0, 0]`, extents, and the
/// resolutions of its height and holes grids.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TerrainGeometry {
    pub origin: [f32; 3],
    /// (width, vertical extent, depth) in meters.
    pub size: [f32; 3],
    pub heightmap_resolution: usize,
    pub holes_resolution: usize,
}

impl TerrainGeometry {
    pub fn validate(&self) -> Result<()> {
        if self.heightmap_resolution < 2 {
            return Err(DeformerError::InvalidResolution {
                what: "heightmap",
                resolution: self.heightmap_resolution,
            });
        }
        if self.holes_resolution < 2 {
            return Err(DeformerError::InvalidResolution {
                what: "holes",
                resolution: self.holes_resolution,
            });
        }
        if self.size.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(DeformerError::InvalidTerrainSize(self.size));
        }
        Ok(())
    }

    pub fn heights(&self) -> GridMapping {
        GridMapping::new(self, self.heightmap_resolution)
    }

    pub fn holes(&self) -> GridMapping {
        GridMapping::new(self, self.holes_resolution)
    }

    /// Convert a world XZ position to normalized terrain coordinates.
    /// Positions off the terrain clamp to the nearest edge.
    pub fn world_to_normalized(&self, world_x: f32, world_z: f32) -> (f32, f32) {
        let local_x = world_x - self.origin[0];
        let local_z = world_z - self.origin[2];
        (
            clamp01(local_x / self.size[0]),
            clamp01(local_z / self.size[2]),
        )
    }

    pub fn vertical_extent(&self) -> f32 {
        self.size[1]
    }
}

/// Mapping between normalized terrain space and one square grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridMapping {
    pub resolution: usize,
    pub meters_per_sample_x: f32,
    pub meters_per_sample_z: f32,
}

impl GridMapping {
    fn new(geometry: &TerrainGeometry, resolution: usize) -> Self {
        let steps = (resolution.max(2) - 1) as f32;
        Self {
            resolution,
            meters_per_sample_x: geometry.size[0] / steps,
            meters_per_sample_z: geometry.size[2] / steps,
        }
    }

    pub fn last_index(&self) -> usize {
        self.resolution.saturating_sub(1)
    }

    /// Nearest cell for a normalized position.
    pub fn normalized_to_cell(&self, nx: f32, nz: f32) -> (usize, usize) {
        let last = self.last_index() as f32;
        (
            (clamp01(nx) * last).round() as usize,
            (clamp01(nz) * last).round() as usize,
        )
    }

    /// Half extents in samples covering `radius` meters on each axis.
    pub fn radius_to_samples(&self, radius: f32) -> (usize, usize) {
        (
            (radius / self.meters_per_sample_x).ceil().max(0.0) as usize,
            (radius / self.meters_per_sample_z).ceil().max(0.0) as usize,
        )
    }

    /// Block of cells `center ± half`, clipped to the grid.
    pub fn clipped_region(
        &self,
        center: (usize, usize),
        half_width: usize,
        half_height: usize,
    ) -> GridRegion {
        let last = self.last_index();
        let x_start = center.0.saturating_sub(half_width).min(last);
        let z_start = center.1.saturating_sub(half_height).min(last);
        let x_end = center.0.saturating_add(half_width).min(last);
        let z_end = center.1.saturating_add(half_height).min(last);
        GridRegion::new(
            x_start,
            z_start,
            (x_end + 1).saturating_sub(x_start),
            (z_end + 1).saturating_sub(z_start),
        )
    }

    /// Metric distance between two cells.
    pub fn cell_distance(&self, a: (usize, usize), b: (usize, usize)) -> f32 {
        let dx = (a.0 as f32 - b.0 as f32) * self.meters_per_sample_x;
        let dz = (a.1 as f32 - b.1 as f32) * self.meters_per_sample_z;
        (dx * dx + dz * dz).sqrt()
    }
}

fn clamp01(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> TerrainGeometry {
        TerrainGeometry {
            origin: [10.0, 0.0, -20.0],
            size: [64.0, 32.0, 128.0],
            heightmap_resolution: 65,
            holes_resolution: 33,
        }
    }

    #[test]
    fn test_grid_region_fits() {
        assert!(GridRegion::new(0, 0, 4, 4).fits(4));
        assert!(!GridRegion::new(1, 0, 4, 4).fits(4));
        assert!(GridRegion::new(2, 3, 0, 1).is_empty());
        assert_eq!(GridRegion::full(5).len(), 25);
    }

    #[test]
    fn test_sub_grid_round_trip_preserves_neighbors() {
        let mut grid = Grid2::from_vec(4, 3, (0..12).map(|v| v as f32).collect()).unwrap();
        let region = GridRegion::new(1, 1, 2, 2);
        let mut patch = grid.sub_grid(region);
        assert_eq!(patch.as_slice(), &[5.0, 6.0, 9.0, 10.0]);

        patch.set(0, 0, -1.0);
        grid.write_sub_grid(region.x, region.z, &patch);
        assert_eq!(*grid.get(1, 1).unwrap(), -1.0);
        assert_eq!(*grid.get(0, 1).unwrap(), 4.0);
        assert_eq!(*grid.get(3, 2).unwrap(), 11.0);
    }

    #[test]
    fn test_from_vec_rejects_wrong_length() {
        let err = Grid2::from_vec(3, 3, vec![0.0f32; 8]).unwrap_err();
        assert!(matches!(
            err,
            DeformerError::PatchSizeMismatch {
                expected: 9,
                actual: 8
            }
        ));
    }

    #[test]
    fn test_validate_geometry() {
        assert!(geometry().validate().is_ok());

        let mut tiny = geometry();
        tiny.heightmap_resolution = 1;
        assert!(matches!(
            tiny.validate(),
            Err(DeformerError::InvalidResolution { what: "heightmap", .. })
        ));

        let mut flat = geometry();
        flat.size[1] = 0.0;
        assert!(matches!(
            flat.validate(),
            Err(DeformerError::InvalidTerrainSize(_))
        ));
    }

    #[test]
    fn test_world_to_normalized_clamps_off_terrain() {
        let geo = geometry();
        assert_eq!(geo.world_to_normalized(42.0, 44.0), (0.5, 0.5));
        assert_eq!(geo.world_to_normalized(-1000.0, 5000.0), (0.0, 1.0));
    }

    #[test]
    fn test_mapping_per_axis_scale() {
        let heights = geometry().heights();
        assert_eq!(heights.meters_per_sample_x, 1.0);
        assert_eq!(heights.meters_per_sample_z, 2.0);
        assert_eq!(heights.radius_to_samples(3.0), (3, 2));
        assert_eq!(heights.normalized_to_cell(0.5, 1.0), (32, 64));

        let holes = geometry().holes();
        assert_eq!(holes.meters_per_sample_x, 2.0);
    }

    #[test]
    fn test_clipped_region_at_corner() {
        let heights = geometry().heights();
        let region = heights.clipped_region((0, 64), 4, 4);
        assert_eq!(region, GridRegion::new(0, 60, 5, 5));
        assert!(region.fits(65));
    }

    #[test]
    fn test_clipped_region_with_unbounded_half_extent() {
        let heights = geometry().heights();
        let region = heights.clipped_region((40, 3), usize::MAX, usize::MAX);
        assert_eq!(region, GridRegion::full(65));
    }
}
