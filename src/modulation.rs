//! Sinusoidal stimulus modulation
//!
//! A sinusoid is sampled once per frame over one period and stored as a
//! gradient. During presentation the elapsed time picks a sample, which is
//! written to the stimulus opacity or contrast.

use crate::error::{AppResult, StimError};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;

/// Largest gradient `sinusoid` will build, one sample per frame.
pub const MAX_SAMPLES: usize = 1_000_000;

/// Parameters of a sampled sinusoid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinusoidParams {
    /// Modulation frequency in Hz
    pub frequency: f64,
    /// Peak deviation from `offset`
    pub amplitude: f64,
    /// Display refresh rate in Hz
    pub frame_rate: f64,
    /// Value the sinusoid oscillates around
    pub offset: f64,
}

impl Default for SinusoidParams {
    fn default() -> Self {
        Self {
            frequency: 4.0,
            amplitude: 0.5,
            frame_rate: 60.0,
            offset: 0.5,
        }
    }
}

impl SinusoidParams {
    /// Check that frequency and frame rate are finite and positive, and that
    /// one period needs at most [`MAX_SAMPLES`] samples.
    ///
    /// # Errors
    ///
    /// Returns `StimError::Configuration` naming the offending field.
    pub fn validate(&self) -> AppResult<()> {
        for (name, value) in [("frequency", self.frequency), ("frame_rate", self.frame_rate)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(StimError::Configuration(format!(
                    "Invalid modulation {} {}. Must be a positive number",
                    name, value
                )));
            }
        }
        let samples = (self.frame_rate * self.frequency).ceil();
        if !samples.is_finite() || samples > MAX_SAMPLES as f64 {
            return Err(StimError::Configuration(format!(
                "Modulation needs {} samples per period (frame_rate * frequency). Must be at most {}",
                samples, MAX_SAMPLES
            )));
        }
        if !self.amplitude.is_finite() || !self.offset.is_finite() {
            return Err(StimError::Configuration(
                "Modulation amplitude and offset must be finite".into(),
            ));
        }
        Ok(())
    }
}

/// Sample the sinusoid described by `params`.
///
/// Produces `ceil(frame_rate * frequency)` samples where sample `i` is taken at
/// `t = i / (frame_rate * frequency)`. The `4π` phase term keeps the first
/// sample at the peak.
///
/// # Errors
///
/// Returns `StimError::Configuration` for invalid parameters.
pub fn sinusoid(params: &SinusoidParams) -> AppResult<Vec<f64>> {
    params.validate()?;

    let steps = params.frame_rate * params.frequency;
    let count = steps.ceil() as usize;
    let samples: Vec<f64> = (0..count)
        .map(|i| {
            let t = i as f64 / steps;
            params.amplitude * (2.0 * PI * params.frequency * t + 4.0 * PI).cos() + params.offset
        })
        .collect();

    debug!(samples = samples.len(), frequency = params.frequency, "Sinusoid sampled");
    Ok(samples)
}

/// Index into a gradient of `len` samples spanning `total_time` seconds.
///
/// Time wraps every `total_time`; negative times wrap too. Halfway positions
/// round to the even index. Returns `None` for an empty gradient or a
/// non-positive `total_time`.
pub fn gradient_index(t: f64, len: usize, total_time: f64) -> Option<usize> {
    if len == 0 || total_time.is_nan() || total_time <= 0.0 || !t.is_finite() {
        return None;
    }
    let dec = t.rem_euclid(total_time);
    let index = (len as f64 * dec / total_time).round_ties_even() as usize;
    Some(index % len)
}

/// Stimulus property a gradient drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradientTarget {
    /// Transparency, 0 invisible to 1 opaque
    Opacity,
    /// Contrast multiplier
    Contrast,
}

/// A stimulus whose opacity and contrast can be set each frame.
pub trait Modulated {
    /// Set the opacity.
    fn set_opacity(&mut self, value: f64);
    /// Set the contrast.
    fn set_contrast(&mut self, value: f64);
}

/// Write the sample selected by `t` to `target` on `stim`.
///
/// Returns the sample index used, or `None` if nothing was written.
pub fn apply_gradient(
    t: f64,
    samples: &[f64],
    total_time: f64,
    target: GradientTarget,
    stim: &mut impl Modulated,
) -> Option<usize> {
    let index = gradient_index(t, samples.len(), total_time)?;
    let value = samples[index];
    match target {
        GradientTarget::Opacity => stim.set_opacity(value),
        GradientTarget::Contrast => stim.set_contrast(value),
    }
    Some(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Patch {
        opacity: Option<f64>,
        contrast: Option<f64>,
    }

    impl Modulated for Patch {
        fn set_opacity(&mut self, value: f64) {
            self.opacity = Some(value);
        }

        fn set_contrast(&mut self, value: f64) {
            self.contrast = Some(value);
        }
    }

    #[test]
    fn test_default_sinusoid() {
        let samples = sinusoid(&SinusoidParams::default()).unwrap();
        assert_eq!(samples.len(), 240);
        assert!((samples[0] - 1.0).abs() < 1e-9);
        for v in &samples {
            assert!(*v >= -1e-9 && *v <= 1.0 + 1e-9);
        }
    }

    #[test]
    fn test_sample_count_rounds_up() {
        let params = SinusoidParams {
            frequency: 0.5,
            frame_rate: 3.0,
            ..SinusoidParams::default()
        };
        assert_eq!(sinusoid(&params).unwrap().len(), 2);
    }

    #[test]
    fn test_invalid_params_rejected() {
        let zero = SinusoidParams {
            frequency: 0.0,
            ..SinusoidParams::default()
        };
        assert!(matches!(sinusoid(&zero), Err(StimError::Configuration(_))));

        let nan = SinusoidParams {
            frame_rate: f64::NAN,
            ..SinusoidParams::default()
        };
        assert!(nan.validate().is_err());
        assert!(SinusoidParams::default().validate().is_ok());
    }

    #[test]
    fn test_oversized_gradient_rejected() {
        let huge = SinusoidParams {
            frequency: 1e6,
            frame_rate: 1e6,
            ..SinusoidParams::default()
        };
        assert!(matches!(huge.validate(), Err(StimError::Configuration(_))));
        assert!(sinusoid(&huge).is_err());

        let limit = SinusoidParams {
            frequency: 1000.0,
            frame_rate: 1000.0,
            ..SinusoidParams::default()
        };
        assert!(limit.validate().is_ok());
    }

    #[test]
    fn test_gradient_index_wraps() {
        assert_eq!(gradient_index(0.0, 10, 2.0), Some(0));
        assert_eq!(gradient_index(0.6, 10, 2.0), Some(3));
        assert_eq!(gradient_index(2.6, 10, 2.0), Some(3));
        // rounding up at the end of a period lands back on the first sample
        assert_eq!(gradient_index(1.99, 10, 2.0), Some(0));
        assert_eq!(gradient_index(-0.5, 10, 2.0), Some(8));
    }

    #[test]
    fn test_gradient_index_halves_round_to_even() {
        // 2.5 -> 2, 3.5 -> 4, 7.5 -> 8
        assert_eq!(gradient_index(0.5, 10, 2.0), Some(2));
        assert_eq!(gradient_index(0.7, 10, 2.0), Some(4));
        assert_eq!(gradient_index(1.5, 10, 2.0), Some(8));
    }

    #[test]
    fn test_gradient_index_degenerate() {
        assert_eq!(gradient_index(1.0, 0, 2.0), None);
        assert_eq!(gradient_index(1.0, 10, 0.0), None);
        assert_eq!(gradient_index(1.0, 10, -1.0), None);
        assert_eq!(gradient_index(f64::NAN, 10, 1.0), None);
    }

    #[test]
    fn test_apply_gradient_sets_target() {
        let samples = [0.1, 0.2, 0.3, 0.4];
        let mut patch = Patch::default();

        assert_eq!(
            apply_gradient(0.25, &samples, 1.0, GradientTarget::Opacity, &mut patch),
            Some(1)
        );
        assert_eq!(patch.opacity, Some(0.2));
        assert_eq!(patch.contrast, None);

        apply_gradient(0.5, &samples, 1.0, GradientTarget::Contrast, &mut patch);
        assert_eq!(patch.contrast, Some(0.3));

        assert_eq!(apply_gradient(0.5, &[], 1.0, GradientTarget::Contrast, &mut patch), None);
    }
}
