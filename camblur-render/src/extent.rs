use crate::settings::MAX_RADIUS;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Each dimension divided by `divisor`, rounded up, never below 1.
    pub fn div_round_up(self, divisor: u32) -> Self {
        Self {
            width: div_round_up(self.width, divisor).max(1),
            height: div_round_up(self.height, divisor).max(1),
        }
    }
}

/// Integer ceiling division. A zero divisor is treated as 1.
pub fn div_round_up(value: u32, divisor: u32) -> u32 {
    value.div_ceil(divisor.max(1))
}

/// Resolutions of the per-invocation buffers, derived from the source image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferLayout {
    pub source: Extent,
    pub velocity: Extent,
    /// Tile-max and neighbour-max buffers share this extent.
    pub tile: Extent,
}

impl BufferLayout {
    pub fn new(source: Extent, velocity_downsample: u32) -> Self {
        let velocity = source.div_round_up(velocity_downsample);
        let tile = velocity.div_round_up(MAX_RADIUS);
        Self { source, velocity, tile }
    }
}
