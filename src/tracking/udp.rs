//! JSON-over-UDP tracking receiver
//!
//! An external face tracker sends one JSON packet per inferred frame:
//!
//! ```json
//! {"detected": true, "rotation": [0.1, -0.2, 0.0], "expressions": [0.0, ...]}
//! ```

use serde::Deserialize;
use std::net::{SocketAddr, UdpSocket};

use super::{InitStatus, TrackingSample, TrackingSource};
use crate::error::{CompositorError, TrackingError};

/// A single packet from the external tracker
#[derive(Debug, Clone, Deserialize)]
pub struct TrackingPacket {
    /// Whether a face was found this frame
    #[serde(default = "default_detected")]
    pub detected: bool,
    /// Head rotation vector (radians)
    pub rotation: [f32; 3],
    /// Expression weights
    #[serde(default)]
    pub expressions: Vec<f32>,
}

fn default_detected() -> bool { true }

impl TrackingPacket {
    pub fn parse(bytes: &[u8]) -> Result<Self, CompositorError> {
        serde_json::from_slice(bytes)
            .map_err(|e| TrackingError::Parse(format!("JSON parse error: {}", e)).into())
    }

    /// Convert to a sample, `None` when no face was detected
    pub fn into_sample(self) -> Option<TrackingSample> {
        self.detected
            .then(|| TrackingSample::new(self.rotation, self.expressions))
    }
}

/// Receives [`TrackingPacket`]s on a non-blocking UDP socket
pub struct UdpTracker {
    bind_addr: String,
    socket: Option<UdpSocket>,
}

impl UdpTracker {
    /// Create a receiver (does not bind yet)
    pub fn new(listen_address: &str, port: u16) -> Self {
        Self {
            bind_addr: format!("{}:{}", listen_address, port),
            socket: None,
        }
    }

    /// Bound address, once initialized
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    fn bind(&self) -> std::io::Result<UdpSocket> {
        let socket = UdpSocket::bind(&self.bind_addr)?;
        socket.set_nonblocking(true)?;
        Ok(socket)
    }

    /// Read one datagram. `Ok(None)` when nothing is queued.
    fn recv_packet(socket: &UdpSocket, buf: &mut [u8]) -> Result<Option<TrackingPacket>, CompositorError> {
        match socket.recv(buf) {
            Ok(size) if size > 0 => TrackingPacket::parse(&buf[..size]).map(Some),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(TrackingError::Receiver(format!("Receive error: {}", e)).into()),
        }
    }
}

impl TrackingSource for UdpTracker {
    fn name(&self) -> &str {
        "udp"
    }

    fn poll_init(&mut self) -> InitStatus {
        if self.socket.is_some() {
            return InitStatus::Ready;
        }
        match self.bind() {
            Ok(socket) => {
                tracing::info!("Tracking receiver listening on {}", self.bind_addr);
                self.socket = Some(socket);
                InitStatus::Ready
            }
            Err(e) => {
                tracing::error!("Failed to bind tracking receiver to {}: {}", self.bind_addr, e);
                InitStatus::Failed(e.raw_os_error().unwrap_or(-1))
            }
        }
    }

    fn poll_sample(&mut self) -> Option<TrackingSample> {
        let socket = self.socket.as_ref()?;
        let mut buf = [0u8; 65536];
        let mut newest = None;

        // Drain the queue, keeping only the newest detected face
        loop {
            match Self::recv_packet(socket, &mut buf) {
                Ok(Some(packet)) => {
                    if let Some(sample) = packet.into_sample() {
                        newest = Some(sample);
                    }
                }
                Ok(None) => break,
                Err(CompositorError::Tracking(TrackingError::Parse(e))) => {
                    tracing::debug!("Skipping malformed tracking packet: {}", e);
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    break;
                }
            }
        }

        newest
    }
}
