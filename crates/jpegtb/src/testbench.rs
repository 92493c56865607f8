use std::collections::VecDeque;

use image::DynamicImage;

use crate::{
    HarnessError,
    codec::{ImageCodec, JpegCodec},
    driver::PixelBlockDriver,
    frame::FrameFormat,
    monitor::{BitstreamMonitor, ReconstructedImage},
    observer::{HarnessEvent, Observer},
    scheduler::{Phase, Scheduler},
    scorer::{Comparison, SimilarityScorer},
    signal::SignalFrame,
};

mod builder;

pub use builder::TestbenchBuilder;

/// The design under test, seen from the clocked interface.
pub trait Dut {
    /// Called on every rising clock edge. The inputs in `frame` hold the
    /// values driven during the previous cycle; registered outputs are
    /// updated in place and stay valid until the next edge.
    fn rising_edge(&mut self, frame: &mut SignalFrame);

    /// A fault raised inside the DUT model since the last call. The
    /// testbench checks it after every edge and fails the case with it.
    fn take_error(&mut self) -> Option<HarnessError> {
        None
    }
}

impl<D: Dut + ?Sized> Dut for &mut D {
    fn rising_edge(&mut self, frame: &mut SignalFrame) {
        (**self).rising_edge(frame)
    }

    fn take_error(&mut self) -> Option<HarnessError> {
        (**self).take_error()
    }
}

impl<D: Dut + ?Sized> Dut for Box<D> {
    fn rising_edge(&mut self, frame: &mut SignalFrame) {
        (**self).rising_edge(frame)
    }

    fn take_error(&mut self) -> Option<HarnessError> {
        (**self).take_error()
    }
}

/// Wires one DUT to a pixel driver and a bitstream monitor on a free-running
/// clock.
///
/// Within a time step the order is: rising edge (DUT flops sample the
/// previous cycle's inputs), driver writes for the new cycle, then the
/// read-only phase in which the monitor samples the settled outputs.
pub struct Testbench<D, C = JpegCodec> {
    pub(crate) dut: D,
    pub(crate) frame: SignalFrame,
    pub(crate) scheduler: Scheduler,
    pub(crate) driver: Option<PixelBlockDriver>,
    pub(crate) monitor: BitstreamMonitor<C>,
    pub(crate) received: VecDeque<ReconstructedImage>,
    pub(crate) scorer: SimilarityScorer,
    pub(crate) observer: Box<dyn Observer>,
    pub(crate) max_cycles: Option<u64>,
    pub(crate) last_frame: Option<ReconstructedImage>,
}

impl<D, C> std::fmt::Debug for Testbench<D, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Testbench")
            .field("time", &self.scheduler.time)
            .field("cycles", &self.scheduler.cycles())
            .field("driving", &self.driver.is_some())
            .field("received", &self.received.len())
            .finish()
    }
}

impl<D: Dut> Testbench<D, JpegCodec> {
    pub fn builder(dut: D, format: FrameFormat) -> TestbenchBuilder<D, JpegCodec> {
        TestbenchBuilder::new(dut, format)
    }
}

impl<D: Dut, C: ImageCodec> Testbench<D, C> {
    pub fn dut(&self) -> &D {
        &self.dut
    }

    pub fn dut_mut(&mut self) -> &mut D {
        &mut self.dut
    }

    /// Signal values of the current cycle.
    pub fn signals(&self) -> &SignalFrame {
        &self.frame
    }

    pub fn time(&self) -> u64 {
        self.scheduler.time()
    }

    /// Rising clock edges seen so far.
    pub fn cycles(&self) -> u64 {
        self.scheduler.cycles()
    }

    pub fn monitor(&self) -> &BitstreamMonitor<C> {
        &self.monitor
    }

    pub fn scorer(&self) -> &SimilarityScorer {
        &self.scorer
    }

    /// The frame consumed by the most recent [`Testbench::process_image`].
    pub fn last_frame(&self) -> Option<&ReconstructedImage> {
        self.last_frame.as_ref()
    }

    /// Processes the next scheduled event and returns its time.
    pub fn step(&mut self) -> Result<Option<u64>, HarnessError> {
        let Some(event) = self.scheduler.pop() else {
            return Ok(None);
        };

        match event.phase {
            Phase::RisingEdge => {
                self.frame.clock = true;
                self.dut.rising_edge(&mut self.frame);
                if let Some(err) = self.dut.take_error() {
                    return Err(err);
                }
                if let Some(driver) = self.driver.as_mut() {
                    if driver
                        .step(&mut self.frame, self.observer.as_mut())
                        .is_ready()
                    {
                        self.driver = None;
                    }
                }
                log::trace!("t={} {}", event.time, self.frame);
            }
            Phase::FallingEdge => {
                self.frame.clock = false;
            }
            Phase::ReadOnly => {
                if let Some(image) = self.monitor.sample(&self.frame, self.observer.as_mut())? {
                    self.received.push_back(image);
                }
            }
        }
        Ok(Some(event.time))
    }

    /// Drives `image` into the DUT and returns once the last block has been
    /// released. Frames completed meanwhile are queued for
    /// [`Testbench::wait_for_frame`].
    pub fn send(&mut self, image: &DynamicImage) -> Result<(), HarnessError> {
        self.driver = Some(PixelBlockDriver::new(image)?);
        while self.driver.is_some() {
            self.check_watchdog()?;
            if self.step()?.is_none() {
                break;
            }
        }
        Ok(())
    }

    /// Returns the oldest reconstructed frame, running the clock until one
    /// completes.
    pub fn wait_for_frame(&mut self) -> Result<ReconstructedImage, HarnessError> {
        loop {
            if let Some(image) = self.received.pop_front() {
                return Ok(image);
            }
            self.check_watchdog()?;
            if self.step()?.is_none() {
                return Err(HarnessError::Timeout {
                    cycles: self.cycles(),
                });
            }
        }
    }

    /// Sends `image`, waits for its reconstruction and scores the pair.
    pub fn process_image(&mut self, image: &DynamicImage) -> Result<Comparison, HarnessError> {
        self.send(image)?;
        let frame = self.wait_for_frame()?;
        let result = self.scorer.score(image, &frame.image);
        self.last_frame = Some(frame);

        if let Ok(Comparison { score, threshold })
        | Err(HarnessError::ThresholdExceeded { score, threshold }) = &result
        {
            self.observer.on_event(&HarnessEvent::Scored {
                score: *score,
                threshold: *threshold,
            });
        }
        result
    }

    fn check_watchdog(&self) -> Result<(), HarnessError> {
        match self.max_cycles {
            Some(limit) if self.cycles() >= limit => Err(HarnessError::Timeout {
                cycles: self.cycles(),
            }),
            _ => Ok(()),
        }
    }
}
