//! Runtime crater deformer bound to one terrain.
//!
//! Owns the terrain source and its baseline for its whole lifetime. Every
//! operation runs to completion before returning; `&mut self` keeps stamps on
//! one terrain from interleaving.

use crate::config::DeformerConfig;
use crate::crater::{stamp_depression, CraterFootprint, CraterRequest, ResolvedCrater};
use crate::error::Result;
use crate::grid_source::HeightGridSource;
use crate::height_grid::{GridRegion, TerrainGeometry};
use crate::holes::HoleCarver;
use crate::noise_field::CraterNoise;
use crate::rate_limiter::{RateLimiter, StampClock, SystemClock};
use crate::snapshot::TerrainBaseline;
use crate::stamp_log::{compute_depression_stats, stamp_log, stamp_log_enabled};
use crate::sync_scheduler::SyncScheduler;

/// Running counters, for diagnostics only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeformerStats {
    pub accepted: usize,
    pub rate_limited: usize,
    pub degenerate: usize,
    pub syncs: usize,
    pub holes_carved: usize,
}

pub struct TerrainDeformer<S: HeightGridSource> {
    source: S,
    config: DeformerConfig,
    geometry: TerrainGeometry,
    baseline: TerrainBaseline,
    noise: CraterNoise,
    carver: HoleCarver,
    scheduler: SyncScheduler,
    limiter: RateLimiter,
    clock: Box<dyn StampClock>,
    stats: DeformerStats,
}

impl<S: HeightGridSource> TerrainDeformer<S> {
    /// Bind to a terrain and capture its baseline. Fails if the terrain
    /// cannot be read; there is no half-initialized deformer.
    pub fn new(source: S, config: &DeformerConfig) -> Result<Self> {
        Self::with_clock(source, config, SystemClock::default())
    }

    pub fn with_clock(
        source: S,
        config: &DeformerConfig,
        clock: impl StampClock + 'static,
    ) -> Result<Self> {
        let config = config.sanitized();
        let geometry = source.geometry()?;
        geometry.validate()?;
        let baseline = TerrainBaseline::capture(&source, &geometry)?;

        log::debug!(
            "crater deformer bound: {}x{} heights, {}x{} holes, size {:?}",
            geometry.heightmap_resolution,
            geometry.heightmap_resolution,
            geometry.holes_resolution,
            geometry.holes_resolution,
            geometry.size
        );

        Ok(Self {
            noise: CraterNoise::new(
                config.noise_seed,
                config.noise_scale,
                config.noise_amount,
                geometry.heightmap_resolution,
            ),
            carver: HoleCarver::new(config.hole_inner_radius_ratio),
            scheduler: SyncScheduler::new(config.coalesce_sync, config.sync_every_n_frames),
            limiter: RateLimiter::new(config.max_crater_per_second),
            clock: Box::new(clock),
            stats: DeformerStats::default(),
            source,
            config,
            geometry,
            baseline,
        })
    }

    /// Stamp a crater. Out-of-range input is clamped; rate-limited or
    /// degenerate requests do nothing.
    pub fn apply_crater(&mut self, request: CraterRequest) {
        if !self.limiter.try_acquire(self.clock.now_seconds()) {
            self.stats.rate_limited += 1;
            log::trace!("crater at {:?} dropped by rate limit", request.world_position);
            return;
        }

        let crater = ResolvedCrater::resolve(&request, &self.config);
        if let Err(err) = self.stamp(&crater) {
            log::warn!("crater at {:?} abandoned: {err}", crater.world_position);
        }
    }

    fn stamp(&mut self, crater: &ResolvedCrater) -> Result<()> {
        let Some(footprint) =
            CraterFootprint::plan(&self.geometry, crater, self.config.max_edit_samples)
        else {
            self.stats.degenerate += 1;
            log::trace!("empty crater footprint at {:?}", crater.world_position);
            return Ok(());
        };

        let region = footprint.region;
        let mut heights = self.source.get_heights(region)?;
        let before = stamp_log_enabled().then(|| heights.clone());

        let touched = stamp_depression(
            &mut heights,
            &footprint,
            crater,
            &self.noise,
            self.geometry.vertical_extent(),
        );
        self.source.set_heights(region.x, region.z, &heights)?;
        self.stats.accepted += 1;

        log::debug!(
            "crater stamp @ {:?}, r={:.2}, d={:.2}, {} cells",
            crater.world_position,
            crater.radius,
            crater.depth,
            touched
        );
        if let Some(before) = before {
            let stats = compute_depression_stats(before.as_slice(), heights.as_slice());
            let crater_part = format!(
                "stamp #{} @ {:?} r={:.2} d={:.2} f={:.2} region={:?}",
                self.stats.accepted,
                crater.world_position,
                crater.radius,
                crater.depth,
                crater.falloff,
                region,
            );
            stamp_log(&format!(
                "{crater_part} lowered={} max_drop={:.5} mean_drop={:.5} floored={}",
                stats.lowered_cells, stats.max_drop, stats.mean_drop, stats.floored_cells
            ));
        }

        if self.scheduler.on_stamp() {
            self.sync();
        }

        if crater.reaches_hole_depth(&self.config) {
            let carved = self.carver.carve(&mut self.source, &self.geometry, crater)?;
            self.stats.holes_carved += carved;
        }
        Ok(())
    }

    /// Restore the captured baseline (heights, forced sync, holes).
    pub fn reset_terrain(&mut self) {
        match self.baseline.restore(&mut self.source) {
            Ok(()) => {
                self.stats.syncs += 1;
                self.scheduler.mark_synced();
                log::debug!("terrain restored to baseline");
            }
            Err(err) => log::warn!("terrain restore failed: {err}"),
        }
    }

    /// Run a sync that coalescing is still holding back, if there is one.
    pub fn flush_pending_sync(&mut self) {
        if self.scheduler.take_pending() {
            self.sync();
        }
    }

    fn sync(&mut self) {
        self.source.sync();
        self.stats.syncs += 1;
    }

    /// World-space surface height at a world XZ, bilinear between samples.
    /// Positions off the terrain read the nearest edge. `None` if the source
    /// refuses the read.
    pub fn sample_height(&self, world_x: f32, world_z: f32) -> Option<f32> {
        let mapping = self.geometry.heights();
        let last = mapping.last_index();
        let (nx, nz) = self.geometry.world_to_normalized(world_x, world_z);
        let fx = nx * last as f32;
        let fz = nz * last as f32;
        let x0 = (fx.floor() as usize).min(last);
        let z0 = (fz.floor() as usize).min(last);
        let x1 = (x0 + 1).min(last);
        let z1 = (z0 + 1).min(last);

        let block = self
            .source
            .get_heights(GridRegion::new(x0, z0, x1 - x0 + 1, z1 - z0 + 1))
            .ok()?;
        let at = |x: usize, z: usize| block.get(x - x0, z - z0).copied().unwrap_or(0.0);

        let tx = fx - x0 as f32;
        let tz = fz - z0 as f32;
        let near = at(x0, z0) + (at(x1, z0) - at(x0, z0)) * tx;
        let far = at(x0, z1) + (at(x1, z1) - at(x0, z1)) * tx;
        let normalized = near + (far - near) * tz;

        Some(self.geometry.origin[1] + normalized * self.geometry.vertical_extent())
    }

    /// Whether the holes cell nearest a world XZ is carved out.
    pub fn is_hole_at(&self, world_x: f32, world_z: f32) -> bool {
        let mapping = self.geometry.holes();
        let (nx, nz) = self.geometry.world_to_normalized(world_x, world_z);
        let (x, z) = mapping.normalized_to_cell(nx, nz);
        self.source
            .get_holes(GridRegion::new(x, z, 1, 1))
            .ok()
            .and_then(|cell| cell.get(0, 0).copied())
            .map(|solid| !solid)
            .unwrap_or(false)
    }

    /// Hand the terrain back, restoring it first when configured to.
    pub fn teardown(mut self) -> S {
        if self.config.reset_on_teardown {
            self.reset_terrain();
        }
        self.source
    }

    pub fn has_pending_sync(&self) -> bool {
        self.scheduler.has_pending()
    }

    pub fn stats(&self) -> DeformerStats {
        self.stats
    }

    pub fn config(&self) -> &DeformerConfig {
        &self.config
    }

    pub fn geometry(&self) -> &TerrainGeometry {
        &self.geometry
    }

    pub fn baseline(&self) -> &TerrainBaseline {
        &self.baseline
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Give up the terrain without touching it.
    pub fn into_source(self) -> S {
        self.source
    }
}
