//! Bus channel access.
//! Every transport implements [embedded_can::blocking::Can]: a [socketcan::CanSocket]
//! bound to a (virtual) can interface, or a [LoopbackEndpoint] of an in process [LoopbackBus].
//! Sender and receiver always own separate handles bound to the same channel.

use crate::error::BusError;
use crate::frame::Frame;
use crossbeam_queue::ArrayQueue;
use log::debug;
use std::sync::{Arc, Condvar, Mutex, Weak};

/// Interval in which a blocked loopback receiver checks if its peers are still alive
const PEER_POLL: std::time::Duration = std::time::Duration::from_millis(100);

/// Frames buffered per loopback endpoint, a full mailbox drops its oldest frame
pub const MAILBOX_DEPTH: usize = 256;

/// Name and bitrate of the channel both handles bind to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusBinding {
    /// interface name, e.g. vcan0
    pub interface: String,
    /// nominal bitrate, informational for virtual interfaces
    pub bitrate: u32,
}

impl Default for BusBinding {
    fn default() -> Self {
        Self {
            interface: "vcan0".into(),
            bitrate: 500_000,
        }
    }
}

impl BusBinding {
    /// Opens one socketcan handle on the interface
    pub fn open(&self) -> Result<socketcan::CanSocket, BusError> {
        use socketcan::Socket;
        debug!("opening {} ({} bit/s)", self.interface, self.bitrate);
        socketcan::CanSocket::open(&self.interface).map_err(|e| BusError::Open {
            interface: self.interface.clone(),
            reason: e.to_string(),
        })
    }
}

/// Sends a frame, fire and forget
pub fn transmit<CanDriver: embedded_can::blocking::Can>(
    can: &mut CanDriver,
    frame: &Frame,
) -> Result<(), BusError> {
    let can_frame: CanDriver::Frame = frame
        .to_can()
        .ok_or_else(|| BusError::Transmit(format!("driver rejected frame {}", frame)))?;
    can.transmit(&can_frame)
        .map_err(|e| BusError::Transmit(format!("{:?}", e)))?;
    debug!("tx {}", frame);
    Ok(())
}

/// Blocks until a frame arrives
pub fn receive<CanDriver: embedded_can::blocking::Can>(
    can: &mut CanDriver,
) -> Result<Frame, BusError> {
    let can_frame = can
        .receive()
        .map_err(|e| BusError::Receive(format!("{:?}", e)))?;
    Frame::from_can(&can_frame).ok_or(BusError::UnsupportedFrame)
}

struct Mailbox {
    frames: ArrayQueue<Frame>,
    // only guards the condvar, frames are never touched under it
    wait: Mutex<()>,
    ready: Condvar,
}

impl Mailbox {
    fn deliver(&self, frame: Frame) -> Result<(), BusError> {
        if self.frames.force_push(frame).is_some() {
            debug!("loopback mailbox full, oldest frame dropped");
        }
        let _guard = self.wait.lock().map_err(|_| BusError::Disconnected)?;
        self.ready.notify_all();
        Ok(())
    }
}

type Peers = Arc<Mutex<Vec<Weak<Mailbox>>>>;

/// In process broadcast channel.
/// A frame transmitted on one endpoint is delivered to all other endpoints,
/// like sockets bound to the same can interface. Like a socket receive buffer,
/// every endpoint holds at most [MAILBOX_DEPTH] frames.
#[derive(Clone, Default)]
pub struct LoopbackBus {
    peers: Peers,
}

impl LoopbackBus {
    /// Creates an empty channel
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a new handle to the channel
    pub fn endpoint(&self) -> LoopbackEndpoint {
        let mailbox = Arc::new(Mailbox {
            frames: ArrayQueue::new(MAILBOX_DEPTH),
            wait: Mutex::new(()),
            ready: Condvar::new(),
        });
        if let Ok(mut peers) = self.peers.lock() {
            peers.retain(|peer| peer.strong_count() > 0);
            peers.push(Arc::downgrade(&mailbox));
        }
        LoopbackEndpoint {
            mailbox,
            peers: self.peers.clone(),
        }
    }
}

/// One handle of a [LoopbackBus]
pub struct LoopbackEndpoint {
    mailbox: Arc<Mailbox>,
    peers: Peers,
}

impl LoopbackEndpoint {
    fn others(&self) -> Result<Vec<Arc<Mailbox>>, BusError> {
        let peers = self.peers.lock().map_err(|_| BusError::Disconnected)?;
        Ok(peers
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|peer| !Arc::ptr_eq(peer, &self.mailbox))
            .collect())
    }
}

impl embedded_can::blocking::Can for LoopbackEndpoint {
    type Frame = Frame;
    type Error = BusError;

    fn transmit(&mut self, frame: &Self::Frame) -> Result<(), Self::Error> {
        for peer in self.others()? {
            peer.deliver(frame.clone())?;
        }
        Ok(())
    }

    /// Blocks until a frame arrives, fails once no other endpoint is left
    fn receive(&mut self) -> Result<Self::Frame, Self::Error> {
        loop {
            if let Some(frame) = self.mailbox.frames.pop() {
                return Ok(frame);
            }
            {
                let guard = self
                    .mailbox
                    .wait
                    .lock()
                    .map_err(|_| BusError::Disconnected)?;
                // deliver pushes before taking the lock, a frame is either seen here or notified
                if self.mailbox.frames.is_empty() {
                    let _ = self
                        .mailbox
                        .ready
                        .wait_timeout(guard, PEER_POLL)
                        .map_err(|_| BusError::Disconnected)?;
                }
            }
            if let Some(frame) = self.mailbox.frames.pop() {
                return Ok(frame);
            }
            if self.others()?.is_empty() {
                return Err(BusError::Disconnected);
            }
        }
    }
}

impl Drop for LoopbackEndpoint {
    fn drop(&mut self) {
        // wake receivers so they notice a vanished peer early
        if let Ok(others) = self.others() {
            for peer in others {
                if let Ok(_guard) = peer.wait.lock() {
                    peer.ready.notify_all();
                }
            }
        }
    }
}
