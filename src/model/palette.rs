use super::modes::ColourMode;

/// Height bands, lowest first. A voxel falls into the first band whose upper
/// bound (as a fraction of the column range) it does not exceed.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Band {
    Water = 0,
    Sand = 1,
    Grass = 2,
    Rock = 3,
    Snow = 4,
}

const BAND_LIMITS: [(f32, Band); 5] = [
    (0.15, Band::Water),
    (0.3, Band::Sand),
    (0.65, Band::Grass),
    (0.85, Band::Rock),
    (1.0, Band::Snow),
];

impl Band {
    /// Band for a local height `h` within `[min, max]`
    pub fn for_height(h: i32, min: i32, max: i32) -> Self {
        if max <= min {
            return Band::Water;
        }
        let t = ((h - min) as f32 / (max - min) as f32).clamp(0.0, 1.0);
        BAND_LIMITS
            .iter()
            .find(|(limit, _)| t <= *limit)
            .map(|(_, band)| *band)
            .unwrap_or(Band::Snow)
    }

    pub fn color(self, mode: ColourMode) -> [f32; 4] {
        match mode {
            ColourMode::Natural => match self {
                Band::Water => [0.15, 0.35, 0.75, 1.0],
                Band::Sand => [0.9, 0.85, 0.55, 1.0],
                Band::Grass => [0.3, 0.7, 0.2, 1.0],
                Band::Rock => [0.5, 0.5, 0.5, 1.0],
                Band::Snow => [0.95, 0.97, 1.0, 1.0],
            },
            // cold-to-hot contour shading
            ColourMode::Contour => match self {
                Band::Water => [0.1, 0.1, 0.55, 1.0],
                Band::Sand => [0.1, 0.6, 0.7, 1.0],
                Band::Grass => [0.85, 0.85, 0.2, 1.0],
                Band::Rock => [0.9, 0.5, 0.1, 1.0],
                Band::Snow => [0.85, 0.15, 0.1, 1.0],
            },
        }
    }
}

/// Colour of a voxel at local height `h`, given the clamping range of the chunk
pub fn voxel_color(h: i32, min: i32, max: i32, mode: ColourMode) -> [f32; 4] {
    Band::for_height(h, min, max).color(mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0, Band::Water)]
    #[test_case(4, Band::Sand)]
    #[test_case(5, Band::Grass)]
    #[test_case(12, Band::Rock)]
    #[test_case(15, Band::Snow)]
    fn bands_follow_height(h: i32, expected: Band) {
        assert_eq!(Band::for_height(h, 0, 15), expected);
    }

    #[test]
    fn palettes_differ_per_band() {
        for band in [Band::Water, Band::Sand, Band::Grass, Band::Rock, Band::Snow] {
            assert_ne!(band.color(ColourMode::Natural), band.color(ColourMode::Contour));
        }
    }

    #[test]
    fn degenerate_range_does_not_divide_by_zero() {
        assert_eq!(Band::for_height(3, 3, 3), Band::Water);
    }
}
