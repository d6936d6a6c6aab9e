//! Traits for the external detector and pose estimator.

use crate::analysis::PoseMap;
use crate::tracker::{Detection, TrackSnapshot};

/// Person detector running on raw frames.
///
/// # Example
///
/// ```ignore
/// use crowdwatch_rs::{Detection, DetectionSource};
///
/// struct MyDetector;
///
/// impl DetectionSource for MyDetector {
///     type Error = std::io::Error;
///
///     fn detect(&mut self, input: &[u8], width: u32, height: u32) -> Result<Vec<Detection>, Self::Error> {
///         Ok(vec![])
///     }
/// }
/// ```
pub trait DetectionSource {
    type Error;

    /// Run inference on raw image data.
    ///
    /// # Arguments
    /// * `input` - Raw image bytes (format depends on implementation)
    /// * `width` - Image width in pixels
    /// * `height` - Image height in pixels
    fn detect(&mut self, input: &[u8], width: u32, height: u32) -> Result<Vec<Detection>, Self::Error>;
}

/// Pose estimator run on the crops of confirmed tracks.
pub trait PoseSource {
    type Error;

    /// Estimate poses for `tracks`, keyed by track id. Tracks without a pose
    /// are simply absent from the map.
    fn estimate(
        &mut self,
        input: &[u8],
        width: u32,
        height: u32,
        tracks: &[TrackSnapshot],
    ) -> Result<PoseMap, Self::Error>;
}

/// Pose source for pipelines without a pose model.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPoses;

impl PoseSource for NoPoses {
    type Error = std::convert::Infallible;

    fn estimate(
        &mut self,
        _input: &[u8],
        _width: u32,
        _height: u32,
        _tracks: &[TrackSnapshot],
    ) -> Result<PoseMap, Self::Error> {
        Ok(PoseMap::new())
    }
}
