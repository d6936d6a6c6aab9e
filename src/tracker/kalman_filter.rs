//! Constant-velocity Kalman filter over `[cx, cy, aspect, height]` and their
//! velocities, using ndarray for the state and nalgebra Cholesky factorization
//! for the innovation covariance.

use nalgebra::{Matrix2, Matrix4, Vector2};
use ndarray::{Array1, Array2};

use crate::error::NumericalError;

const NDIM: usize = 4;

#[derive(Debug, Clone)]
pub struct KalmanFilter {
    motion_mat: Array2<f64>,
    update_mat: Array2<f64>,
    std_weight_position: f64,
    std_weight_velocity: f64,
    std_weight_height: f64,
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl KalmanFilter {
    pub fn new() -> Self {
        let mut motion_mat = Array2::eye(2 * NDIM);
        for i in 0..NDIM {
            motion_mat[[i, NDIM + i]] = 1.0;
        }

        let mut update_mat = Array2::zeros((NDIM, 2 * NDIM));
        for i in 0..NDIM {
            update_mat[[i, i]] = 1.0;
        }

        Self {
            motion_mat,
            update_mat,
            std_weight_position: 1.0 / 20.0,
            std_weight_velocity: 1.0 / 160.0,
            std_weight_height: 1.0 / 40.0,
        }
    }

    /// Create a track state from an unassociated measurement. Velocities start at zero.
    pub fn initiate(&self, measurement: [f64; 4]) -> (Array1<f64>, Array2<f64>) {
        let mut mean = Array1::zeros(2 * NDIM);
        for i in 0..NDIM {
            mean[i] = measurement[i];
        }

        let h = measurement[3];
        let std = [
            2.0 * self.std_weight_position * h,
            2.0 * self.std_weight_position * h,
            1e-2,
            2.0 * self.std_weight_position * h,
            10.0 * self.std_weight_velocity * h,
            10.0 * self.std_weight_velocity * h,
            1e-5,
            10.0 * self.std_weight_velocity * h,
        ];

        (mean, diagonal_covariance(&std))
    }

    /// Advance the state one frame.
    ///
    /// Process noise scales with the current box height: positional noise grows
    /// faster than velocity noise so near (tall) subjects may jump further.
    pub fn predict(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
    ) -> (Array1<f64>, Array2<f64>) {
        let h = mean[3];
        let std = [
            self.std_weight_position * h,
            self.std_weight_position * h,
            1e-2,
            self.std_weight_position * h,
            self.std_weight_velocity * h,
            self.std_weight_velocity * h,
            1e-5,
            self.std_weight_velocity * h,
        ];

        let new_mean = self.motion_mat.dot(mean);
        let new_covariance = self.motion_mat.dot(covariance).dot(&self.motion_mat.t())
            + diagonal_covariance(&std);

        (new_mean, new_covariance)
    }

    /// Project the state into measurement space, adding measurement noise.
    pub fn project(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
    ) -> (Array1<f64>, Array2<f64>) {
        let h = mean[3];
        let std = [
            self.std_weight_position * h,
            self.std_weight_position * h,
            1e-1,
            self.std_weight_height * h,
        ];

        let mean_proj = self.update_mat.dot(mean);
        let covariance_proj = self.update_mat.dot(covariance).dot(&self.update_mat.t())
            + diagonal_covariance(&std);

        (mean_proj, covariance_proj)
    }

    pub fn update(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
        measurement: [f64; 4],
    ) -> Result<(Array1<f64>, Array2<f64>), NumericalError> {
        let (projected_mean, projected_cov) = self.project(mean, covariance);
        let s_inv = invert_spd_4x4(&projected_cov)?;

        let innovation = Array1::from_vec(measurement.to_vec()) - &projected_mean;

        // K = P * H^T * S^-1
        let kalman_gain = covariance.dot(&self.update_mat.t()).dot(&s_inv);

        let new_mean = mean + &kalman_gain.dot(&innovation);
        let corrected = covariance - &kalman_gain.dot(&projected_cov).dot(&kalman_gain.t());
        let new_covariance = (&corrected + &corrected.t()) * 0.5;

        if new_mean.iter().chain(new_covariance.iter()).any(|v| !v.is_finite()) {
            return Err(NumericalError::new(
                "kalman update",
                "corrected state is not finite",
            ));
        }

        Ok((new_mean, new_covariance))
    }

    /// Squared Mahalanobis distance between the predicted box center and the
    /// measurement's center. Compare against a chi-square quantile with 2 dof.
    pub fn gating_distance(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
        measurement: [f64; 4],
    ) -> Result<f64, NumericalError> {
        let (projected_mean, projected_cov) = self.project(mean, covariance);
        let s = Matrix2::from_fn(|i, j| projected_cov[[i, j]]);
        let chol = s.cholesky().ok_or_else(|| {
            NumericalError::new("gating", "position covariance is not positive definite")
        })?;

        let d = Vector2::new(
            measurement[0] - projected_mean[0],
            measurement[1] - projected_mean[1],
        );
        let distance = d.dot(&chol.solve(&d));
        if distance.is_finite() {
            Ok(distance)
        } else {
            Err(NumericalError::new("gating", "distance is not finite"))
        }
    }
}

fn diagonal_covariance(std: &[f64]) -> Array2<f64> {
    let mut cov = Array2::zeros((std.len(), std.len()));
    for (i, s) in std.iter().enumerate() {
        cov[[i, i]] = s * s;
    }
    cov
}

fn invert_spd_4x4(m: &Array2<f64>) -> Result<Array2<f64>, NumericalError> {
    if m.iter().any(|v| !v.is_finite()) {
        return Err(NumericalError::new(
            "kalman update",
            "innovation covariance is not finite",
        ));
    }
    let nm = Matrix4::from_fn(|i, j| m[[i, j]]);
    let chol = nm.cholesky().ok_or_else(|| {
        NumericalError::new(
            "kalman update",
            "innovation covariance is not positive definite",
        )
    })?;
    let inv = chol.inverse();
    Ok(Array2::from_shape_fn((NDIM, NDIM), |(i, j)| inv[(i, j)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn trace(m: &Array2<f64>) -> f64 {
        m.diag().sum()
    }

    #[test]
    fn test_initiate() {
        let kf = KalmanFilter::new();
        let (mean, cov) = kf.initiate([100.0, 200.0, 0.5, 50.0]);
        assert_eq!(mean[0], 100.0);
        assert_eq!(mean[3], 50.0);
        assert_eq!(mean[4], 0.0);
        assert!(cov[[0, 0]] > cov[[2, 2]]);
    }

    #[test]
    fn test_predict_applies_velocity() {
        let kf = KalmanFilter::new();
        let (mut mean, cov) = kf.initiate([100.0, 200.0, 0.5, 50.0]);
        mean[4] = 3.0;
        mean[5] = -2.0;
        let (predicted, predicted_cov) = kf.predict(&mean, &cov);
        assert_relative_eq!(predicted[0], 103.0);
        assert_relative_eq!(predicted[1], 198.0);
        assert!(trace(&predicted_cov) > trace(&cov));
    }

    #[test]
    fn test_update_with_predicted_measurement_keeps_state_and_shrinks_covariance() {
        let kf = KalmanFilter::new();
        let (mean, cov) = kf.initiate([320.0, 240.0, 0.4, 180.0]);
        let (mean, cov) = kf.predict(&mean, &cov);
        let (projected, _) = kf.project(&mean, &cov);
        let measurement = [projected[0], projected[1], projected[2], projected[3]];

        let (updated, updated_cov) = kf.update(&mean, &cov, measurement).unwrap();

        for i in 0..8 {
            assert_relative_eq!(updated[i], mean[i], epsilon = 1e-9);
        }
        assert!(trace(&updated_cov) < trace(&cov));
        for i in 0..8 {
            for j in 0..8 {
                assert_relative_eq!(updated_cov[[i, j]], updated_cov[[j, i]], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_singular_innovation_is_an_error() {
        let kf = KalmanFilter::new();
        let mean = Array1::zeros(8);
        let cov = Array2::zeros((8, 8));
        let err = kf.update(&mean, &cov, [1.0, 1.0, 0.5, 0.0]).unwrap_err();
        assert_eq!(err.stage, "kalman update");
    }

    #[test]
    fn test_gating_distance_grows_with_offset() {
        let kf = KalmanFilter::new();
        let (mean, cov) = kf.initiate([100.0, 100.0, 0.5, 100.0]);
        let near = kf.gating_distance(&mean, &cov, [101.0, 100.0, 0.5, 100.0]).unwrap();
        let far = kf.gating_distance(&mean, &cov, [180.0, 100.0, 0.5, 100.0]).unwrap();
        assert!(near < 5.9915);
        assert!(far > 5.9915);
    }
}
