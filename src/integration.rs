//! Adapters between the pipeline and the outside world.
//!
//! Detector and pose models plug in through [`DetectionSource`] and
//! [`PoseSource`]; alerts leave through an [`AlertSink`].

mod builder;
mod detector;
mod live;
mod pipeline;
mod sink;

pub use builder::DetectionBuilder;
pub use detector::{DetectionSource, NoPoses, PoseSource};
pub use live::{StopHandle, run_live};
pub use pipeline::Pipeline;
pub use sink::{AlertSink, JsonLinesSink};
