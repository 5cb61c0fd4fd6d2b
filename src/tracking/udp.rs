//! opentrack "UDP over network" receiver
//!
//! Each datagram carries six little-endian f64 values:
//! `x, y, z, yaw, pitch, roll` (centimetres and degrees).

use std::io::ErrorKind;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tracing::{debug, info};

use super::{PoseSample, PoseSource, TrackerError};

/// Datagram length of one pose
pub const POSE_DATAGRAM_LEN: usize = 6 * 8;

/// Datagrams read per poll before yielding to the caller
pub const MAX_DATAGRAMS_PER_POLL: usize = 64;

pub struct UdpPoseSource {
    socket: UdpSocket,
    counter: u32,
    buf: [u8; 512],
}

impl UdpPoseSource {
    pub async fn bind(address: &str) -> Result<Self, TrackerError> {
        let socket = UdpSocket::bind(address)
            .await
            .map_err(|e| TrackerError::Bind {
                address: address.to_string(),
                reason: e.to_string(),
            })?;
        info!("Listening for poses on {}", address);

        Ok(Self {
            socket,
            counter: 0,
            buf: [0u8; 512],
        })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.local_addr().ok()
    }

    /// Decode one datagram, `None` if it is not a pose
    pub fn decode(datagram: &[u8]) -> Option<PoseSample> {
        if datagram.len() != POSE_DATAGRAM_LEN {
            return None;
        }

        let mut values = [0f32; 6];
        for (value, chunk) in values.iter_mut().zip(datagram.chunks_exact(8)) {
            let bytes: [u8; 8] = chunk.try_into().ok()?;
            *value = f64::from_le_bytes(bytes) as f32;
        }
        let [x, y, z, yaw, pitch, roll] = values;

        Some(PoseSample {
            heading: yaw,
            pitch,
            roll,
            x,
            y,
            z,
            counter: 0,
        })
    }
}

#[async_trait]
impl PoseSource for UdpPoseSource {
    async fn poll(&mut self) -> Result<Option<PoseSample>, TrackerError> {
        let mut latest = None;
        for _ in 0..MAX_DATAGRAMS_PER_POLL {
            match self.socket.try_recv_from(&mut self.buf) {
                Ok((len, peer)) => match Self::decode(&self.buf[..len]) {
                    Some(mut sample) => {
                        self.counter = self.counter.wrapping_add(1);
                        sample.counter = self.counter;
                        latest = Some(sample);
                    }
                    None => debug!("Ignoring {}-byte datagram from {}", len, peer),
                },
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => return Err(TrackerError::Receive(e.to_string())),
            }
        }
        Ok(latest)
    }

    async fn wait_ready(&mut self, timeout: Duration) -> Result<(), TrackerError> {
        match tokio::time::timeout(timeout, self.socket.readable()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(TrackerError::Receive(e.to_string())),
            Err(_) => Err(TrackerError::NotReady(timeout.as_millis() as u64)),
        }
    }
}
