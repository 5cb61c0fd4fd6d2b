//! Pose to HID report bridge loop

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::AxisLimits;
use crate::device::VirtualDevice;
use crate::report::DeviceReport;
use crate::tracking::PoseSource;
use crate::utils::LogThrottler;

const SEND_FAILED: &str = "send_failed";
const POLL_FAILED: &str = "poll_failed";

/// Counters reported when the loop stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    /// New samples received
    pub samples: u64,
    /// Reports delivered
    pub sent: u64,
    /// Reports the device refused
    pub send_failures: u64,
    /// Counter of the last sample seen
    pub last_counter: Option<u32>,
}

/// Forwards pose samples to a virtual device at a fixed cadence
pub struct TrackBridge<D, S> {
    device: D,
    source: S,
    limits: AxisLimits,
    interval: Duration,
    throttler: LogThrottler,
}

impl<D: VirtualDevice, S: PoseSource> TrackBridge<D, S> {
    pub fn new(device: D, source: S, limits: AxisLimits, interval: Duration) -> Self {
        Self {
            device,
            source,
            limits,
            interval,
            throttler: LogThrottler::with_secs(1),
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn into_parts(self) -> (D, S) {
        (self.device, self.source)
    }

    /// Run until `shutdown` is cancelled
    pub async fn run(&mut self, shutdown: CancellationToken) -> BridgeStats {
        let mut stats = BridgeStats::default();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Forwarding poses to {} device every {:?}",
            self.device.name(),
            self.interval
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            self.step(&mut stats).await;
        }

        info!(
            "Bridge stopped: {} samples, {} reports sent, {} send failures",
            stats.samples, stats.sent, stats.send_failures
        );
        stats
    }

    /// Poll once and forward a new sample
    pub async fn step(&mut self, stats: &mut BridgeStats) {
        let sample = match self.source.poll().await {
            Ok(Some(sample)) => sample,
            Ok(None) => return,
            Err(e) => {
                if let Some(suppressed) = self.throttler.check(POLL_FAILED) {
                    warn!("Failed to poll tracker: {} (suppressed {})", e, suppressed);
                }
                return;
            }
        };
        self.throttler.clear(POLL_FAILED);

        if stats.last_counter == Some(sample.counter) {
            return;
        }
        stats.last_counter = Some(sample.counter);
        stats.samples += 1;

        let report = DeviceReport::from_pose(&sample, &self.limits);
        match self.device.send(&report).await {
            Ok(()) => {
                stats.sent += 1;
                self.throttler.clear(SEND_FAILED);
                debug!(
                    "h: {:7.2}  p: {:7.2}  r: {:7.2}",
                    sample.heading, sample.pitch, sample.roll
                );
            }
            Err(e) if e.is_retryable() => {
                stats.send_failures += 1;
                debug!("Report dropped, device busy: {}", e);
            }
            Err(e) => {
                stats.send_failures += 1;
                if let Some(suppressed) = self.throttler.check(SEND_FAILED) {
                    warn!("Failed to send data: {} (suppressed {})", e, suppressed);
                }
            }
        }
    }
}
