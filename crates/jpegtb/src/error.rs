use image::ColorType;
use thiserror::Error;

use crate::frame::FrameError;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("stimulus must be an RGB image, got {mode:?}")]
    InputFormat { mode: ColorType },
    #[error("image sizes differ: expected {}x{}, got {}x{}", .expected.0, .expected.1, .actual.0, .actual.1)]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("image modes differ: expected {expected:?}, got {actual:?}")]
    ModeMismatch {
        expected: ColorType,
        actual: ColorType,
    },
    #[error("cannot score images in mode {mode:?}, only 8-bit channels are supported")]
    UnsupportedMode { mode: ColorType },
    #[error("resulting image differs by {score:.4}% which exceeds the {threshold}% threshold")]
    ThresholdExceeded { score: f64, threshold: f64 },
    #[error("frame {frame} ({bytes} payload bytes) failed to decode: {source}")]
    Decode {
        frame: usize,
        bytes: usize,
        #[source]
        source: image::ImageError,
    },
    #[error("no frame completed within {cycles} clock cycles")]
    Timeout { cycles: u64 },
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Image(#[from] image::ImageError),
}
