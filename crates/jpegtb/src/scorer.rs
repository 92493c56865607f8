use image::{DynamicImage, GenericImageView};

use crate::HarnessError;

/// Largest tolerated difference, in percent.
pub const DEFAULT_THRESHOLD: f64 = 0.22;

/// Percentage difference between two images of the same mode and size.
///
/// Sums the absolute difference of every channel of every pixel, scales the
/// sum to percent of full range and divides by the number of channels, so the
/// score does not depend on the image size. `compare(a, a)` is zero and the
/// result is symmetric in its arguments.
pub fn compare(original: &DynamicImage, other: &DynamicImage) -> Result<f64, HarnessError> {
    if original.color() != other.color() {
        return Err(HarnessError::ModeMismatch {
            expected: original.color(),
            actual: other.color(),
        });
    }
    if original.dimensions() != other.dimensions() {
        return Err(HarnessError::DimensionMismatch {
            expected: original.dimensions(),
            actual: other.dimensions(),
        });
    }
    let mode = original.color();
    if mode.bytes_per_pixel() != mode.channel_count() {
        return Err(HarnessError::UnsupportedMode { mode });
    }

    let (width, height) = original.dimensions();
    let components = width as u64 * height as u64 * mode.channel_count() as u64;
    if components == 0 {
        return Ok(0.0);
    }
    let difference: u64 = original
        .as_bytes()
        .iter()
        .zip(other.as_bytes())
        .map(|(a, b)| a.abs_diff(*b) as u64)
        .sum();
    Ok((difference as f64 / 255.0 * 100.0) / components as f64)
}

/// Outcome of a passing comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparison {
    pub score: f64,
    pub threshold: f64,
}

impl Comparison {
    pub fn passed(&self) -> bool {
        self.score <= self.threshold
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityScorer {
    threshold: f64,
}

impl Default for SimilarityScorer {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl SimilarityScorer {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Scores `reconstructed` against `original` and fails with
    /// [`HarnessError::ThresholdExceeded`] when the score is above the threshold.
    pub fn score(
        &self,
        original: &DynamicImage,
        reconstructed: &DynamicImage,
    ) -> Result<Comparison, HarnessError> {
        let comparison = Comparison {
            score: compare(original, reconstructed)?,
            threshold: self.threshold,
        };
        if !comparison.passed() {
            return Err(HarnessError::ThresholdExceeded {
                score: comparison.score,
                threshold: comparison.threshold,
            });
        }
        Ok(comparison)
    }
}
