use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_derive::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::behavior::Behavior;
use crate::frame::Frame;
use crate::Monitoring;

/// Supplies one subject's frames; `None` ends sampling.
#[async_trait]
pub trait FrameSource: Send {
    async fn next_frame(&mut self) -> Option<Frame>;
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SamplerConfig {
    pub interval_ms: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self { interval_ms: 5_000 }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplerStats {
    pub ticks: u64,
    /// Ticks that took longer than the sampling interval.
    pub overruns: u64,
    /// Ticks whose result the monitor refused.
    pub discarded: u64,
    /// Ticks dropped mid-flight by `stop`.
    pub abandoned: u64,
    pub last_status: Option<Behavior>,
}

/// Periodic sampling loop of one subject. Ticks never overlap: each one runs
/// to completion before the next is scheduled.
pub struct Sampler {
    subject: String,
    stop: watch::Sender<bool>,
    handle: JoinHandle<SamplerStats>,
}

impl Sampler {
    pub fn spawn<M, S>(
        monitor: Arc<M>,
        subject: impl Into<String>,
        source: S,
        config: &SamplerConfig,
    ) -> Self
    where
        M: Monitoring + 'static,
        S: FrameSource + 'static,
    {
        let subject = subject.into();
        let (stop, stop_rx) = watch::channel(false);
        let period = Duration::from_millis(config.interval_ms.max(1));

        let handle = tokio::spawn(run(monitor, subject.clone(), source, period, stop_rx));

        Self {
            subject,
            stop,
            handle,
        }
    }

    #[inline]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stops scheduling, abandons an in-flight tick and ends the session.
    pub async fn stop(self) -> SamplerStats {
        // the loop may already be gone if the source ran dry
        let _ = self.stop.send(true);

        self.join().await
    }

    /// Waits for the loop to end on its own.
    pub async fn join(self) -> SamplerStats {
        match self.handle.await {
            Ok(stats) => stats,
            Err(err) => {
                warn!(subject = %self.subject, %err, "sampler task failed");
                SamplerStats::default()
            }
        }
    }
}

async fn run<M, S>(
    monitor: Arc<M>,
    subject: String,
    mut source: S,
    period: Duration,
    mut stop: watch::Receiver<bool>,
) -> SamplerStats
where
    M: Monitoring,
    S: FrameSource,
{
    let mut stats = SamplerStats::default();
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = stop.changed() => break,
            _ = interval.tick() => {}
        }

        let frame = tokio::select! {
            _ = stop.changed() => break,
            frame = source.next_frame() => match frame {
                Some(frame) => frame,
                None => {
                    debug!(%subject, "frame source exhausted");
                    break;
                }
            },
        };

        let started = Instant::now();

        tokio::select! {
            _ = stop.changed() => {
                stats.abandoned += 1;
                break;
            }
            result = monitor.resolve_status(&subject, frame) => match result {
                Ok(status) => stats.last_status = Some(status),
                Err(err) => {
                    warn!(%subject, %err, "tick discarded");
                    stats.discarded += 1;
                }
            },
        }

        stats.ticks += 1;
        if started.elapsed() > period {
            stats.overruns += 1;
        }
    }

    monitor.end_session(&subject);

    stats
}
