use noise::{NoiseFn, Perlin, Seedable};

/// Perlin irregularity for crater floors, sampled in heightmap cell space.
///
/// Samples are centered on zero and stay within roughly `[-0.5, 0.5]`, so the
/// caller scales them directly by its depression unit.
#[derive(Clone, Debug)]
pub struct CraterNoise {
    perlin: Perlin,
    /// Pattern scale relative to grid resolution; larger = bigger rock shapes.
    scale: f32,
    amount: f32,
    resolution: f32,
}

impl CraterNoise {
    pub fn new(seed: u32, scale: f32, amount: f32, resolution: usize) -> Self {
        Self {
            perlin: Perlin::new(seed),
            scale,
            amount,
            resolution: resolution.max(1) as f32,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.amount > 0.0
    }

    pub fn seed(&self) -> u32 {
        self.perlin.seed()
    }

    /// Centered noise at an absolute grid cell.
    pub fn sample(&self, grid_x: usize, grid_z: usize) -> f32 {
        let nx = grid_x as f64 * self.scale as f64 / self.resolution as f64;
        let nz = grid_z as f64 * self.scale as f64 / self.resolution as f64;
        (self.perlin.get([nx, nz]) as f32 * 0.5).clamp(-0.5, 0.5)
    }

    /// Extra depression at a cell, in the same units as `unit`.
    pub fn perturbation(&self, grid_x: usize, grid_z: usize, unit: f32) -> f32 {
        if !self.is_enabled() {
            return 0.0;
        }
        self.sample(grid_x, grid_z) * unit * self.amount
    }
}
