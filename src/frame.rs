use embedded_can::{Id, StandardId};
use smallvec::SmallVec;

/// Maximum payload of a classic CAN data frame
pub const MAX_PAYLOAD: usize = 8;

/// Identifier for constants and generated values known to be 11 bit
pub(crate) fn standard_id(raw: u16) -> StandardId {
    StandardId::new(raw).expect("identifier exceeds 11 bit")
}

/// A classic CAN data frame with a standard (11 bit) identifier.
/// This is the only frame shape the simulator puts on the bus.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Frame {
    id: StandardId,
    data: SmallVec<[u8; MAX_PAYLOAD]>,
}

impl Frame {
    /// Creates a new frame, the data is copied.
    /// Returns None if the payload is longer than 8 bytes
    pub fn from_parts(id: StandardId, data: &[u8]) -> Option<Self> {
        if data.len() > MAX_PAYLOAD {
            return None;
        }
        Some(Self {
            id,
            data: SmallVec::from_slice(data),
        })
    }
    /// Returns the raw 11 bit identifier
    pub fn raw_id(&self) -> u16 {
        self.id.as_raw()
    }
    /// Returns a view of the payload
    pub fn payload(&self) -> &[u8] {
        &self.data
    }

    /// Converts into the frame type of a can driver
    pub fn to_can<CanFrame: embedded_can::Frame>(&self) -> Option<CanFrame> {
        CanFrame::new(self.id, &self.data)
    }

    /// Converts a driver frame, remote and extended frames are not representable
    pub fn from_can<CanFrame: embedded_can::Frame>(frame: &CanFrame) -> Option<Self> {
        if frame.is_remote_frame() {
            return None;
        }
        match frame.id() {
            Id::Standard(id) => Self::from_parts(id, frame.data()),
            Id::Extended(_) => None,
        }
    }
}

impl embedded_can::Frame for Frame {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        match id.into() {
            Id::Standard(id) => Self::from_parts(id, data),
            Id::Extended(_) => None,
        }
    }

    fn new_remote(_id: impl Into<Id>, _dlc: usize) -> Option<Self> {
        None
    }

    fn is_extended(&self) -> bool {
        false
    }

    fn is_remote_frame(&self) -> bool {
        false
    }

    fn id(&self) -> Id {
        Id::Standard(self.id)
    }

    fn dlc(&self) -> usize {
        self.data.len()
    }

    fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Formats a frame the way candump prints it
impl core::fmt::Display for Frame {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:03X}   [{}]", self.raw_id(), self.data.len())?;
        for byte in self.data.iter() {
            write!(f, " {:02X}", byte)?;
        }
        Ok(())
    }
}
