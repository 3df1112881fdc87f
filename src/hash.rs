//!
//! 64-bit bit-mixing fingerprint used for key container names.
//!
//! Not a cryptographic hash. The constants and the order of operations are shared with the
//! MSBuild `ResolveKeySource` task; any change breaks agreement on container names.

const INITIAL_HIGH: u32 = 17339221;
const INITIAL_LOW: u32 = 19619429;
const POSITION_MULTIPLIER: u32 = 10803503;
const HIGH_MULTIPLIER: u32 = 15816943;
const HIGH_INCREMENT: u32 = 17368321;
const LOW_MULTIPLIER: u32 = 14984549;
const LOW_MASK: u32 = 11746499;

/// Incremental state of the fingerprint: two accumulators and a position multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashState {
    high: u32,
    low: u32,
    position: u32,
}

impl Default for HashState {
    fn default() -> Self {
        Self::new()
    }
}

impl HashState {
    pub const fn new() -> Self {
        Self {
            high: INITIAL_HIGH,
            low: INITIAL_LOW,
            position: POSITION_MULTIPLIER,
        }
    }

    /// Mix `data` into the state. Feeding a blob in chunks gives the same result as feeding it at once.
    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            let value = u32::from(byte) ^ self.position;
            self.position = self.position.wrapping_mul(POSITION_MULTIPLIER);
            self.high = self
                .high
                .wrapping_add((value ^ self.low).wrapping_mul(HIGH_MULTIPLIER))
                .wrapping_add(HIGH_INCREMENT);
            self.low ^= value.wrapping_add(self.high).wrapping_mul(LOW_MULTIPLIER) ^ LOW_MASK;
        }
    }

    /// High accumulator in the upper 32 bits, low accumulator in the lower 32 bits.
    pub const fn finish(&self) -> u64 {
        ((self.high as u64) << 32) | self.low as u64
    }
}

/// Fingerprint of a byte blob.
pub fn hash64(data: &[u8]) -> u64 {
    let mut state = HashState::new();
    state.update(data);
    state.finish()
}
