//! Live-stream driver with cooperative cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use crate::analysis::AnalysisSummary;
use crate::session::{FrameInput, Session};

use super::AlertSink;

/// Shared stop flag. Clone it into whatever issues the stop command.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Feed `frames` through `session` until the stream ends or `stop` is raised.
///
/// The stop flag is checked between frames, so the in-flight frame always
/// completes and its events reach the sink. Per-track histories are released
/// before returning, on every exit path.
pub fn run_live<I, S>(
    session: &mut Session,
    frames: I,
    sink: &mut S,
    stop: &StopHandle,
) -> Result<AnalysisSummary, S::Error>
where
    I: IntoIterator<Item = FrameInput>,
    S: AlertSink,
{
    let result = drive(session, frames, sink, stop);
    session.reset_histories();
    if result.is_err() {
        warn!("live session aborted by sink error");
    }
    result
}

fn drive<I, S>(
    session: &mut Session,
    frames: I,
    sink: &mut S,
    stop: &StopHandle,
) -> Result<AnalysisSummary, S::Error>
where
    I: IntoIterator<Item = FrameInput>,
    S: AlertSink,
{
    let mut summary = AnalysisSummary::default();
    for input in frames {
        if stop.is_stopped() {
            info!("stop requested after {} frame(s)", summary.total_frames);
            break;
        }
        let report = session.process_frame(input.detections, &input.poses, input.timestamp);
        summary.record_frame(&report.events);
        for event in report.events {
            sink.emit(event)?;
        }
    }
    sink.flush()?;
    Ok(summary)
}
