use std::task::Poll;

use image::{DynamicImage, RgbImage};

use crate::{
    HarnessError,
    image_block::{BLOCK_SIZE, BlockGrid, pack_rgb},
    observer::{HarnessEvent, Observer},
    signal::SignalBus,
};

pub const PIXELS_PER_BLOCK: usize = (BLOCK_SIZE * BLOCK_SIZE) as usize;
/// Idle cycles after each block, covering the encoder's pipeline latency.
pub const DRAIN_CYCLES: u32 = 33;
/// Pixel cycles, drain cycles and the enable-low cycle of one block.
pub const CYCLES_PER_BLOCK: u64 = PIXELS_PER_BLOCK as u64 + DRAIN_CYCLES as u64 + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    InReset,
    Streaming { block: usize, pixel: usize },
    Draining { block: usize, remaining: u32 },
    Released { block: usize },
    Done,
}

/// Feeds one RGB image into the encoder, block by block.
///
/// The driver is stepped once per rising clock edge. Each call performs the
/// writes that belong to the cycle following that edge and returns
/// [`Poll::Ready`] on the edge after the final block's enable-low cycle.
#[derive(Debug)]
pub struct PixelBlockDriver {
    image: RgbImage,
    grid: BlockGrid,
    state: State,
    cycles: u64,
}

impl PixelBlockDriver {
    /// Fails before any signal is touched if the image is not RGB.
    pub fn new(image: &DynamicImage) -> Result<Self, HarnessError> {
        let DynamicImage::ImageRgb8(rgb) = image else {
            return Err(HarnessError::InputFormat { mode: image.color() });
        };
        Ok(Self {
            grid: BlockGrid::new(rgb.width(), rgb.height()),
            image: rgb.clone(),
            state: State::Start,
            cycles: 0,
        })
    }

    pub fn grid(&self) -> &BlockGrid {
        &self.grid
    }

    /// Clock edges consumed so far, including the one that completed the image.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    pub fn step<B>(&mut self, bus: &mut B, observer: &mut dyn Observer) -> Poll<()>
    where
        B: SignalBus + ?Sized,
    {
        let state = match self.state {
            State::Done => return Poll::Ready(()),
            state => state,
        };
        self.cycles += 1;

        match state {
            State::Done => return Poll::Ready(()),
            State::Start => {
                bus.set_reset(true);
                self.state = State::InReset;
            }
            State::InReset => {
                bus.set_reset(false);
                bus.set_end_of_frame(false);
                observer.on_event(&HarnessEvent::ResetReleased);
                return self.begin_block(0, bus, observer);
            }
            State::Streaming { block, pixel } => {
                bus.set_end_of_frame(false);
                if pixel < PIXELS_PER_BLOCK {
                    self.drive_pixel(block, pixel, bus);
                    self.state = State::Streaming {
                        block,
                        pixel: pixel + 1,
                    };
                } else {
                    // This edge already counts as the first idle cycle.
                    self.state = State::Draining {
                        block,
                        remaining: DRAIN_CYCLES - 1,
                    };
                }
            }
            State::Draining { block, remaining } => {
                if remaining > 0 {
                    self.state = State::Draining {
                        block,
                        remaining: remaining - 1,
                    };
                } else {
                    bus.set_enable(false);
                    self.state = State::Released { block };
                }
            }
            State::Released { block } => {
                return self.begin_block(block + 1, bus, observer);
            }
        }
        Poll::Pending
    }

    fn begin_block<B>(&mut self, index: usize, bus: &mut B, observer: &mut dyn Observer) -> Poll<()>
    where
        B: SignalBus + ?Sized,
    {
        let Some(block) = self.grid.block(index) else {
            self.state = State::Done;
            observer.on_event(&HarnessEvent::ImageSent {
                blocks: self.grid.len(),
                cycles: self.cycles,
            });
            return Poll::Ready(());
        };

        bus.set_enable(true);
        observer.on_event(&HarnessEvent::BlockStarted {
            index,
            total: self.grid.len(),
            x: block.x,
            y: block.y,
            width: self.grid.width(),
            height: self.grid.height(),
        });
        // Single-cycle pulse on the first pixel of the bottom-right block.
        if self.grid.is_last(&block) {
            bus.set_end_of_frame(true);
        }
        self.drive_pixel(index, 0, bus);
        self.state = State::Streaming {
            block: index,
            pixel: 1,
        };
        Poll::Pending
    }

    fn drive_pixel<B>(&self, index: usize, pixel: usize, bus: &mut B)
    where
        B: SignalBus + ?Sized,
    {
        let Some(block) = self.grid.block(index) else {
            return;
        };
        let dx = pixel as u32 % BLOCK_SIZE;
        let dy = pixel as u32 / BLOCK_SIZE;
        let (x, y) = block.source(dx, dy, self.grid.width(), self.grid.height());
        bus.set_pixel_data(pack_rgb(self.image.get_pixel(x, y).0));
    }
}
