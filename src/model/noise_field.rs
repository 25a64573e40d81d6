use noise::{NoiseFn, Perlin};

use crate::config::NoiseConfig;

/// Anything that maps a world-space (x, z) column to a height in `[0, 1]`.
/// Implementations must be pure: equal inputs always give equal outputs,
/// otherwise neighbouring chunks would not line up.
pub trait HeightSource {
    fn height(&self, world_x: f64, world_z: f64) -> f64;
}

/// Seeded coherent noise, summed over octaves and normalised into `[0, 1]`
pub struct NoiseField {
    perlin: Perlin,
    config: NoiseConfig,
}

impl NoiseField {
    pub fn new(config: NoiseConfig) -> Self {
        Self {
            perlin: Perlin::new(config.seed),
            config,
        }
    }

    pub fn with_seed(seed: u32) -> Self {
        Self::new(NoiseConfig { seed, ..NoiseConfig::default() })
    }

    pub fn seed(&self) -> u32 {
        self.config.seed
    }

    /// Layered noise in `[-1, 1]`
    fn fbm(&self, x: f64, z: f64) -> f64 {
        let mut result = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = self.config.frequency;
        let mut max_amplitude = 0.0;

        for _ in 0..self.config.octaves {
            result += self.perlin.get([x * frequency, z * frequency]) * amplitude;
            max_amplitude += amplitude;
            amplitude *= self.config.persistence;
            frequency *= self.config.lacunarity;
        }

        if max_amplitude > 0.0 { result / max_amplitude } else { 0.0 }
    }
}

impl HeightSource for NoiseField {
    fn height(&self, world_x: f64, world_z: f64) -> f64 {
        (self.fbm(world_x, world_z) * 0.5 + 0.5).clamp(0.0, 1.0)
    }
}

/// Same height everywhere; handy for flat worlds and tests
#[derive(Clone, Copy, Debug)]
pub struct ConstantHeight(pub f64);

impl HeightSource for ConstantHeight {
    fn height(&self, _world_x: f64, _world_z: f64) -> f64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn height_is_deterministic() {
        let field = NoiseField::with_seed(42);
        for &(x, z) in &[(0.0, 0.0), (13.5, -7.25), (-1000.0, 250.0), (5.0, 5.0)] {
            let a = field.height(x, z);
            let b = field.height(x, z);
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn same_seed_gives_same_field() {
        let a = NoiseField::with_seed(7);
        let b = NoiseField::with_seed(7);
        for i in 0..64 {
            let x = i as f64 * 3.7 - 100.0;
            let z = i as f64 * -1.3 + 40.0;
            assert_eq!(a.height(x, z).to_bits(), b.height(x, z).to_bits());
        }
    }

    #[test]
    fn different_seeds_differ_somewhere() {
        let a = NoiseField::with_seed(1);
        let b = NoiseField::with_seed(2);
        let differs = (0..64).any(|i| {
            let x = i as f64 * 5.3 + 0.5;
            a.height(x, x * 0.7) != b.height(x, x * 0.7)
        });
        assert!(differs, "two seeds produced an identical field");
    }

    #[test]
    fn heights_stay_in_unit_range() {
        let field = NoiseField::new(NoiseConfig::default());
        for ix in -40..40 {
            for iz in -40..40 {
                let h = field.height(ix as f64 * 1.7, iz as f64 * 2.3);
                assert!((0.0..=1.0).contains(&h), "height {h} out of range");
            }
        }
    }

    #[test]
    fn constant_height_ignores_position() {
        let field = ConstantHeight(0.5);
        assert_eq!(field.height(0.0, 0.0), 0.5);
        assert_eq!(field.height(-99.0, 1234.5), 0.5);
    }
}
