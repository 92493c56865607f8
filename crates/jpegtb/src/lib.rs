mod codec;
mod driver;
mod error;
mod frame;
mod image_block;
mod model;
mod monitor;
mod observer;
mod report;
mod scheduler;
mod scorer;
mod signal;
pub mod stimulus;
mod testbench;

pub use codec::{ImageCodec, JpegCodec};
pub use driver::{CYCLES_PER_BLOCK, DRAIN_CYCLES, PIXELS_PER_BLOCK, PixelBlockDriver};
pub use error::HarnessError;
pub use frame::{END_OF_IMAGE, FrameError, FrameFormat, split_jpeg};
pub use image_block::{BLOCK_SIZE, BlockGrid, PixelBlock, pack_rgb, unpack_rgb};
pub use model::EncoderModel;
pub use monitor::{BitstreamBuffer, BitstreamMonitor, ReconstructedImage};
pub use observer::{HarnessEvent, LogObserver, NullObserver, Observer};
pub use report::{CaseOutcome, CaseResult, Scoreboard};
pub use scheduler::{ClockDef, Phase, Scheduler, SimEvent};
pub use scorer::{Comparison, DEFAULT_THRESHOLD, SimilarityScorer, compare};
pub use signal::{Signal, SignalBus, SignalFrame, WORD_BYTES};
pub use testbench::{Dut, Testbench, TestbenchBuilder};
