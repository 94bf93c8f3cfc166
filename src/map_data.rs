//! Conversion between collision height map samples and normalized heights.
//!
//! A height map stores raw heights in the shape's local units, one unit
//! apart on X/Z and centered on the owning shape node. The deformer works on
//! `[0, 1]` heights over a world-space box. `MapDataFrame` fixes that box
//! once at capture: the highest sample maps to 1.0 and the vertical extent
//! below it is room for craters.

use crate::error::{DeformerError, Result};
use crate::height_grid::TerrainGeometry;

/// Global position and scale of the node that owns a height map shape.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapePlacement {
    pub center: [f32; 3],
    pub scale: [f32; 3],
}

impl Default for ShapePlacement {
    fn default() -> Self {
        Self {
            center: [0.0; 3],
            scale: [1.0; 3],
        }
    }
}

/// Vertical frame of one captured height map.
#[derive(Clone, Debug)]
pub struct MapDataFrame {
    /// Local height mapped to 0.0
    offset: f32,
    /// Local units spanned by `[0, 1]`
    extent: f32,
    original: Vec<f32>,
    captured: Vec<f32>,
}

impl MapDataFrame {
    /// Fit `map_data` under `extent` local units, topmost sample at 1.0.
    ///
    /// Fails when the samples are not finite or span more than `extent`.
    pub fn capture(map_data: Vec<f32>, extent: f32) -> Result<Self> {
        if map_data.is_empty() {
            return Err(DeformerError::SourceUnavailable(
                "height map has no samples".into(),
            ));
        }

        let (min, max) = map_data
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), h| {
                (lo.min(*h), hi.max(*h))
            });
        let fits = extent.is_finite()
            && extent > 0.0
            && min.is_finite()
            && max.is_finite()
            && map_data.iter().all(|h| h.is_finite())
            && max - min <= extent;
        if !fits {
            return Err(DeformerError::HeightRangeExceeded { min, max, extent });
        }

        let offset = max - extent;
        let captured = map_data
            .iter()
            .map(|h| ((h - offset) / extent).clamp(0.0, 1.0))
            .collect();

        Ok(Self {
            offset,
            extent,
            original: map_data,
            captured,
        })
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub fn extent(&self) -> f32 {
        self.extent
    }

    /// Normalized heights as captured.
    pub fn normalized(&self) -> &[f32] {
        &self.captured
    }

    /// Raw samples for `map_data`. Cells still at their captured height get
    /// the original sample back unchanged.
    pub fn encode(&self, heights: &[f32]) -> Vec<f32> {
        heights
            .iter()
            .zip(&self.captured)
            .zip(&self.original)
            .map(|((h, captured), original)| {
                if h == captured {
                    *original
                } else {
                    self.offset + h * self.extent
                }
            })
            .collect()
    }

    /// World-space box of a square `resolution²` map placed at `placement`.
    pub fn geometry(
        &self,
        placement: &ShapePlacement,
        resolution: usize,
        holes_resolution: usize,
    ) -> TerrainGeometry {
        let span = resolution.saturating_sub(1) as f32;
        let [cx, cy, cz] = placement.center;
        let [sx, sy, sz] = placement.scale.map(f32::abs);

        TerrainGeometry {
            origin: [
                cx - span * 0.5 * sx,
                cy + self.offset * sy,
                cz - span * 0.5 * sz,
            ],
            size: [span * sx, self.extent * sy, span * sz],
            heightmap_resolution: resolution,
            holes_resolution,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> Vec<f32> {
        vec![-3.0, 0.0, 1.5, 7.25]
    }

    #[test]
    fn test_capture_keeps_negative_samples() {
        let frame = MapDataFrame::capture(ramp(), 32.0).unwrap();
        assert_eq!(frame.offset(), 7.25 - 32.0);
        assert!(frame.normalized().iter().all(|h| (0.0..=1.0).contains(h)));
        assert_eq!(frame.normalized()[3], 1.0);
        assert!(frame.normalized()[0] > 0.0);
    }

    #[test]
    fn test_untouched_cells_encode_bit_exact() {
        let samples = vec![-3.0, 0.1, 1.7, 7.3];
        let frame = MapDataFrame::capture(samples.clone(), 32.0).unwrap();
        let encoded = frame.encode(frame.normalized());
        assert_eq!(encoded, samples);
    }

    #[test]
    fn test_encode_lowers_only_edited_cells() {
        let frame = MapDataFrame::capture(ramp(), 32.0).unwrap();
        let mut heights = frame.normalized().to_vec();
        heights[2] -= 2.0 / 32.0;

        let encoded = frame.encode(&heights);
        assert_eq!(encoded[0], -3.0);
        assert_eq!(encoded[1], 0.0);
        assert!((encoded[2] - (1.5 - 2.0)).abs() < 1e-4);
        assert_eq!(encoded[3], 7.25);
    }

    #[test]
    fn test_capture_rejects_range_past_extent() {
        let err = MapDataFrame::capture(vec![-20.0, 20.0], 32.0).unwrap_err();
        assert!(matches!(err, DeformerError::HeightRangeExceeded { .. }));

        assert!(MapDataFrame::capture(vec![0.0, f32::NAN], 32.0).is_err());
        assert!(MapDataFrame::capture(vec![0.0, 1.0], 0.0).is_err());
        assert!(matches!(
            MapDataFrame::capture(Vec::new(), 32.0),
            Err(DeformerError::SourceUnavailable(_))
        ));
    }

    #[test]
    fn test_geometry_is_centered_on_shape() {
        let frame = MapDataFrame::capture(ramp(), 32.0).unwrap();
        let placement = ShapePlacement {
            center: [10.0, 5.0, -4.0],
            scale: [2.0, 1.0, 2.0],
        };
        let geometry = frame.geometry(&placement, 65, 33);

        assert_eq!(geometry.origin, [10.0 - 64.0, 5.0 + frame.offset(), -4.0 - 64.0]);
        assert_eq!(geometry.size, [128.0, 32.0, 128.0]);
        assert!(geometry.validate().is_ok());
        assert_eq!(geometry.world_to_normalized(10.0, -4.0), (0.5, 0.5));
    }

    #[test]
    fn test_geometry_scales_vertical_extent() {
        let frame = MapDataFrame::capture(ramp(), 16.0).unwrap();
        let placement = ShapePlacement {
            scale: [1.0, 0.5, 1.0],
            ..ShapePlacement::default()
        };
        let geometry = frame.geometry(&placement, 9, 9);
        assert_eq!(geometry.origin[1], frame.offset() * 0.5);
        assert_eq!(geometry.vertical_extent(), 8.0);
        assert_eq!(geometry.size[0], 8.0);
    }

    #[test]
    fn test_stamp_and_reset_leave_far_samples_untouched() {
        use crate::config::DeformerConfig;
        use crate::crater::CraterRequest;
        use crate::deformer::TerrainDeformer;
        use crate::grid_source::InMemoryTerrain;

        let mut samples = vec![4.0f32; 65 * 65];
        samples[0] = -3.0;
        samples[65 * 65 - 1] = 9.5;
        let frame = MapDataFrame::capture(samples.clone(), 32.0).unwrap();
        let geometry = frame.geometry(&ShapePlacement::default(), 65, 65);
        let terrain = InMemoryTerrain::from_heights(
            geometry.origin,
            geometry.size,
            65,
            65,
            frame.normalized().to_vec(),
        )
        .unwrap();

        let mut deformer = TerrainDeformer::new(terrain, &DeformerConfig::precise()).unwrap();
        deformer.apply_crater(CraterRequest::at([0.0, 0.0, 0.0]));

        let stamped = frame.encode(deformer.source().heights().as_slice());
        assert_eq!(stamped[0], -3.0);
        assert_eq!(stamped[65 * 65 - 1], 9.5);
        let center = 32 * 65 + 32;
        assert!(stamped[center] < 4.0);

        deformer.reset_terrain();
        assert_eq!(frame.encode(deformer.source().heights().as_slice()), samples);
    }
}
