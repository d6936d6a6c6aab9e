//! End-to-end pipeline: detector, tracker, pose estimator, analyzers.

use std::fmt::Display;

use tracing::warn;

use crate::analysis::PoseMap;
use crate::config::SessionConfig;
use crate::error::ConfigError;
use crate::session::{FrameReport, Session};

use super::{DetectionSource, NoPoses, PoseSource};

/// Bundles a [`DetectionSource`] and a [`PoseSource`] with a [`Session`].
///
/// Poses are estimated only for tracks the tracker has already confirmed for
/// the frame.
pub struct Pipeline<D: DetectionSource, P: PoseSource = NoPoses> {
    detector: D,
    pose_estimator: P,
    session: Session,
}

impl<D: DetectionSource> Pipeline<D, NoPoses> {
    /// A pipeline without pose estimation; suspicious-activity alerts never fire.
    pub fn without_poses(detector: D, config: SessionConfig) -> Result<Self, ConfigError> {
        Self::new(detector, NoPoses, config)
    }
}

impl<D: DetectionSource, P: PoseSource> Pipeline<D, P>
where
    P::Error: Display,
{
    pub fn new(detector: D, pose_estimator: P, config: SessionConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            detector,
            pose_estimator,
            session: Session::new(config)?,
        })
    }

    /// Process a single frame.
    ///
    /// # Arguments
    /// * `input` - Raw image bytes
    /// * `width` - Image width in pixels
    /// * `height` - Image height in pixels
    /// * `timestamp` - Stream time of the frame in seconds
    ///
    /// # Returns
    /// The frame's events and confirmed tracks, or a detection error. A pose
    /// estimation failure is logged and the frame is analyzed without poses.
    pub fn process_frame(
        &mut self,
        input: &[u8],
        width: u32,
        height: u32,
        timestamp: f64,
    ) -> Result<FrameReport, D::Error> {
        let detections = self.detector.detect(input, width, height)?;
        let frame = self.session.track(detections, timestamp);

        let poses = if frame.tracks().is_empty() {
            PoseMap::new()
        } else {
            self.pose_estimator
                .estimate(input, width, height, frame.tracks())
                .unwrap_or_else(|e| {
                    warn!("pose estimation failed on frame {}: {}", frame.frame_number(), e);
                    PoseMap::new()
                })
        };
        Ok(self.session.analyze(frame, &poses))
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn detector_mut(&mut self) -> &mut D {
        &mut self.detector
    }

    pub fn pose_estimator_mut(&mut self) -> &mut P {
        &mut self.pose_estimator
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }
}
