//! Background traffic that hides the vehicle messages.
//! Noise frames are syntactically valid but carry no meaning, a single random
//! "interesting" byte inside an otherwise zeroed payload.

use crate::frame::{standard_id, Frame};
use embedded_can::StandardId;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use rand::Rng;

/// Identifier range of generated noise, inclusive
pub const NOISE_ID_RANGE: (u16, u16) = (50, 999);
/// Payload length range of generated noise, inclusive
pub const NOISE_LENGTH_RANGE: (u8, u8) = (1, 7);
/// Value range of the marker byte, inclusive
pub const MARKER_VALUE_RANGE: (u8, u8) = (1, 150);

/// Amount of distinct noise sources on the bus
#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum NoiseVolume {
    /// 20 sources
    Easy = 1,
    /// 50 sources
    Medium = 2,
    /// 100 sources
    Hard = 3,
}

impl NoiseVolume {
    /// Number of descriptors generated for this volume
    pub fn count(self) -> usize {
        match self {
            NoiseVolume::Easy => 20,
            NoiseVolume::Medium => 50,
            NoiseVolume::Hard => 100,
        }
    }
}

/// Shape of one noise source
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct NoiseDescriptor {
    id: StandardId,
    length: u8,
    marker: u8,
}

impl NoiseDescriptor {
    /// Creates a descriptor. `marker` may equal `length`, the frame then has no marker byte
    pub fn new(id: StandardId, length: u8, marker: u8) -> Self {
        Self { id, length, marker }
    }

    /// Frame that is sent after shutdown to release a blocked receiver
    pub fn wake() -> Self {
        Self::new(standard_id(1), 3, 2)
    }

    /// Returns the raw identifier
    pub fn raw_id(&self) -> u16 {
        self.id.as_raw()
    }
    /// Returns the payload length
    pub fn length(&self) -> u8 {
        self.length
    }
    /// Returns the position of the marker byte
    pub fn marker(&self) -> u8 {
        self.marker
    }

    /// Materializes a frame with a fresh random marker value
    pub fn to_frame<R: Rng + ?Sized>(&self, rng: &mut R) -> Frame {
        let junk = rng.gen_range(MARKER_VALUE_RANGE.0..=MARKER_VALUE_RANGE.1);
        let mut data = [0u8; 8];
        // length is at most 7, the marker may point just behind the payload
        if self.marker < self.length {
            data[self.marker as usize] = junk;
        }
        let length = (self.length as usize).min(data.len());
        Frame::from_parts(self.id, &data[..length]).expect("noise payload fits a classic frame")
    }
}

/// Generates the noise pool for one session.
/// Identifiers never collide with `reserved`, duplicates among noise identifiers are kept.
pub fn generate<R: Rng + ?Sized>(
    volume: NoiseVolume,
    reserved: &[u16],
    rng: &mut R,
) -> Vec<NoiseDescriptor> {
    let mut pool = Vec::with_capacity(volume.count());
    while pool.len() < volume.count() {
        let id = rng.gen_range(NOISE_ID_RANGE.0..=NOISE_ID_RANGE.1);
        if reserved.contains(&id) {
            continue;
        }
        let length = rng.gen_range(NOISE_LENGTH_RANGE.0..=NOISE_LENGTH_RANGE.1);
        let marker = rng.gen_range(0..=length);
        pool.push(NoiseDescriptor::new(standard_id(id), length, marker));
    }
    pool
}

/// Picks one descriptor of the pool uniformly
pub fn pick<'a, R: Rng + ?Sized>(
    pool: &'a [NoiseDescriptor],
    rng: &mut R,
) -> Option<&'a NoiseDescriptor> {
    if pool.is_empty() {
        None
    } else {
        Some(&pool[rng.gen_range(0..pool.len())])
    }
}
