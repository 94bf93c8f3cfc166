use godot::classes::{CollisionShape3D, HeightMapShape3D, INode3D, Node3D};
use godot::prelude::*;

use crate::config::DeformerConfig;
use crate::crater::CraterRequest;
use crate::deformer::TerrainDeformer;
use crate::error::{self, DeformerError};
use crate::grid_source::{HeightGridSource, InMemoryTerrain};
use crate::height_grid::{GridRegion, HeightPatch, HolesPatch, TerrainGeometry};
use crate::map_data::{MapDataFrame, ShapePlacement};
use crate::stamp_log::init_stamp_log;

/// Terrain storage backed by a `HeightMapShape3D`.
///
/// Edits go to an in-memory copy; `sync` pushes the heights back into the
/// shape's `map_data`, which rebuilds collision. Holes stay in memory and
/// are queried through `CraterTerrain::is_hole_at`.
pub struct HeightMapShapeSource {
    terrain: InMemoryTerrain,
    frame: MapDataFrame,
    shape: Gd<HeightMapShape3D>,
}

impl HeightMapShapeSource {
    pub fn from_shape(
        shape: Gd<HeightMapShape3D>,
        placement: &ShapePlacement,
        vertical_extent: f32,
        holes_resolution: usize,
    ) -> error::Result<Self> {
        let width = shape.get_map_width();
        let depth = shape.get_map_depth();
        if width != depth {
            return Err(DeformerError::SourceUnavailable(format!(
                "height map must be square, got {width}x{depth}"
            )));
        }
        if width < 2 {
            return Err(DeformerError::InvalidResolution {
                what: "heightmap",
                resolution: width.max(0) as usize,
            });
        }

        let resolution = width as usize;
        let frame = MapDataFrame::capture(shape.get_map_data().to_vec(), vertical_extent)?;
        let geometry = frame.geometry(placement, resolution, holes_resolution);
        let terrain = InMemoryTerrain::from_heights(
            geometry.origin,
            geometry.size,
            resolution,
            holes_resolution,
            frame.normalized().to_vec(),
        )?;

        Ok(Self {
            terrain,
            frame,
            shape,
        })
    }
}

impl HeightGridSource for HeightMapShapeSource {
    fn geometry(&self) -> error::Result<TerrainGeometry> {
        self.terrain.geometry()
    }

    fn get_heights(&self, region: GridRegion) -> error::Result<HeightPatch> {
        self.terrain.get_heights(region)
    }

    fn set_heights(&mut self, x: usize, z: usize, heights: &HeightPatch) -> error::Result<()> {
        self.terrain.set_heights(x, z, heights)
    }

    fn get_holes(&self, region: GridRegion) -> error::Result<HolesPatch> {
        self.terrain.get_holes(region)
    }

    fn set_holes(&mut self, x: usize, z: usize, holes: &HolesPatch) -> error::Result<()> {
        self.terrain.set_holes(x, z, holes)
    }

    fn sync(&mut self) {
        let samples = self.frame.encode(self.terrain.heights().as_slice());
        self.shape.set_map_data(&PackedFloat32Array::from(samples.as_slice()));
        self.terrain.sync();
    }
}

/// Runtime crater deformer node. Explosion and impact scripts call
/// `apply_crater`; `reset_terrain` puts the ground back.
#[derive(GodotClass)]
#[class(base=Node3D, init)]
pub struct CraterTerrain {
    base: Base<Node3D>,

    /// Collision shape holding the `HeightMapShape3D` to deform. Its map data
    /// is the restorable baseline. The node's rotation is ignored.
    #[export]
    collision_shape: Option<Gd<CollisionShape3D>>,

    /// Local units of crater room, measured down from the highest sample.
    #[export]
    #[init(val = 32.0)]
    vertical_extent: f32,

    #[export]
    #[init(val = 257)]
    holes_resolution: i32,

    #[export]
    #[init(val = 2.5)]
    default_radius: f32,

    #[export]
    #[init(val = 0.8)]
    default_depth: f32,

    #[export]
    #[init(val = 4.0)]
    default_falloff: f32,

    #[export]
    #[init(val = 15.0)]
    max_depth: f32,

    #[export]
    #[init(val = true)]
    allow_holes_at_max_depth: bool,

    #[export]
    #[init(val = 0.55)]
    hole_inner_radius_ratio: f32,

    #[export]
    #[init(val = 0.3)]
    noise_amount: f32,

    #[export]
    #[init(val = 10.0)]
    noise_scale: f32,

    #[export]
    #[init(val = 0)]
    noise_seed: i32,

    /// 0 = unlimited.
    #[export]
    #[init(val = 0.0)]
    max_crater_per_second: f32,

    #[export]
    #[init(val = 256)]
    max_edit_samples: i32,

    #[export]
    #[init(val = true)]
    coalesce_sync: bool,

    #[export]
    #[init(val = 3)]
    sync_every_n_frames: i32,

    #[export]
    #[init(val = true)]
    reset_on_teardown: bool,

    /// Optional OS path for a per-stamp trace log.
    #[export]
    stamp_log_path: GString,

    deformer: Option<TerrainDeformer<HeightMapShapeSource>>,
}

#[godot_api]
impl INode3D for CraterTerrain {
    fn ready(&mut self) {
        match self.bind_terrain() {
            Ok(deformer) => {
                let geometry = *deformer.geometry();
                godot_print!(
                    "CraterTerrain ready: {}x{} heights, {}x{} holes",
                    geometry.heightmap_resolution,
                    geometry.heightmap_resolution,
                    geometry.holes_resolution,
                    geometry.holes_resolution
                );
                self.deformer = Some(deformer);
            }
            Err(err) => {
                godot_error!("CraterTerrain: failed to capture terrain, disabled: {err}");
                self.deformer = None;
            }
        }

        if !self.stamp_log_path.is_empty() {
            let path = self.stamp_log_path.to_string();
            if let Err(err) = init_stamp_log(&path) {
                godot_warn!("CraterTerrain: could not open stamp log {path}: {err}");
            }
        }
    }

    fn exit_tree(&mut self) {
        if let Some(deformer) = self.deformer.take() {
            deformer.teardown();
        }
    }
}

#[godot_api]
impl CraterTerrain {
    /// Stamp a crater. Non-positive radius/depth/falloff use the defaults.
    #[func]
    fn apply_crater(&mut self, world_position: Vector3, radius: f32, depth: f32, falloff: f32) {
        let Some(deformer) = self.deformer.as_mut() else {
            return;
        };
        deformer.apply_crater(CraterRequest {
            world_position: to_array(world_position),
            radius: Some(radius),
            depth: Some(depth),
            falloff: Some(falloff),
        });
    }

    /// Stamp a crater with the default radius, depth and falloff.
    #[func]
    fn apply_crater_at(&mut self, world_position: Vector3) {
        if let Some(deformer) = self.deformer.as_mut() {
            deformer.apply_crater(CraterRequest::at(to_array(world_position)));
        }
    }

    #[func]
    fn reset_terrain(&mut self) {
        if let Some(deformer) = self.deformer.as_mut() {
            deformer.reset_terrain();
        }
    }

    /// Push a sync that coalescing is still holding back.
    #[func]
    fn flush_sync(&mut self) {
        if let Some(deformer) = self.deformer.as_mut() {
            deformer.flush_pending_sync();
        }
    }

    /// World-space ground height under a position.
    #[func]
    fn sample_height(&self, world_position: Vector3) -> f32 {
        self.deformer
            .as_ref()
            .and_then(|d| d.sample_height(world_position.x, world_position.z))
            .unwrap_or(world_position.y)
    }

    #[func]
    fn is_hole_at(&self, world_position: Vector3) -> bool {
        self.deformer
            .as_ref()
            .map(|d| d.is_hole_at(world_position.x, world_position.z))
            .unwrap_or(false)
    }

    #[func]
    fn get_stamp_count(&self) -> i64 {
        self.deformer
            .as_ref()
            .map(|d| d.stats().accepted as i64)
            .unwrap_or(0)
    }

    #[func]
    fn is_enabled(&self) -> bool {
        self.deformer.is_some()
    }
}

impl CraterTerrain {
    fn config(&self) -> DeformerConfig {
        DeformerConfig {
            default_radius: self.default_radius,
            default_depth: self.default_depth,
            default_falloff: self.default_falloff,
            max_depth: self.max_depth,
            allow_holes_at_max_depth: self.allow_holes_at_max_depth,
            hole_inner_radius_ratio: self.hole_inner_radius_ratio,
            noise_amount: self.noise_amount,
            noise_scale: self.noise_scale,
            noise_seed: self.noise_seed.max(0) as u32,
            max_crater_per_second: self.max_crater_per_second,
            max_edit_samples: self.max_edit_samples.max(0) as usize,
            coalesce_sync: self.coalesce_sync,
            sync_every_n_frames: self.sync_every_n_frames.max(0) as u32,
            reset_on_teardown: self.reset_on_teardown,
        }
    }

    fn bind_terrain(&self) -> error::Result<TerrainDeformer<HeightMapShapeSource>> {
        let node = self.collision_shape.clone().ok_or_else(|| {
            DeformerError::SourceUnavailable("no CollisionShape3D assigned".into())
        })?;
        let shape = node
            .get_shape()
            .and_then(|shape| shape.try_cast::<HeightMapShape3D>().ok())
            .ok_or_else(|| {
                DeformerError::SourceUnavailable(
                    "collision shape is not a HeightMapShape3D".into(),
                )
            })?;

        let transform = node.get_global_transform();
        let placement = ShapePlacement {
            center: to_array(transform.origin),
            scale: [
                transform.basis.col_a().length(),
                transform.basis.col_b().length(),
                transform.basis.col_c().length(),
            ],
        };
        let source = HeightMapShapeSource::from_shape(
            shape,
            &placement,
            self.vertical_extent,
            self.holes_resolution.max(0) as usize,
        )?;
        TerrainDeformer::new(source, &self.config())
    }
}

fn to_array(v: Vector3) -> [f32; 3] {
    [v.x, v.y, v.z]
}
