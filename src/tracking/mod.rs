//! Head tracking pose sources

pub mod udp;

pub use udp::UdpPoseSource;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Tracker errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    #[error("Failed to bind tracker socket {address}: {reason}")]
    Bind { address: String, reason: String },

    #[error("Failed to receive pose: {0}")]
    Receive(String),

    #[error("Tracker produced no data within {0} ms")]
    NotReady(u64),
}

/// One 6-DOF pose sample
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PoseSample {
    /// Yaw in degrees
    pub heading: f32,
    pub pitch: f32,
    pub roll: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Increases with every sample the source accepts
    pub counter: u32,
}

/// A source of pose samples
#[async_trait]
pub trait PoseSource: Send {
    /// Newest sample since the last poll, `None` if nothing new arrived
    async fn poll(&mut self) -> Result<Option<PoseSample>, TrackerError>;

    /// Wait until the tracker starts producing data
    async fn wait_ready(&mut self, timeout: Duration) -> Result<(), TrackerError>;
}
