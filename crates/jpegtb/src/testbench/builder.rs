use std::collections::VecDeque;

use super::{Dut, Testbench};
use crate::{
    codec::{ImageCodec, JpegCodec},
    frame::FrameFormat,
    monitor::BitstreamMonitor,
    observer::{NullObserver, Observer},
    scheduler::Scheduler,
    scorer::{DEFAULT_THRESHOLD, SimilarityScorer},
    signal::SignalFrame,
};

/// Clock period used by the reference testbench.
const DEFAULT_CLOCK_PERIOD: u64 = 100;

/// A fluent builder for configuring a [`Testbench`].
pub struct TestbenchBuilder<D, C = JpegCodec> {
    dut: D,
    format: FrameFormat,
    codec: C,
    clock_period: u64,
    max_cycles: Option<u64>,
    threshold: f64,
    observer: Box<dyn Observer>,
}

impl<D: Dut> TestbenchBuilder<D, JpegCodec> {
    pub fn new(dut: D, format: FrameFormat) -> Self {
        Self {
            dut,
            format,
            codec: JpegCodec,
            clock_period: DEFAULT_CLOCK_PERIOD,
            max_cycles: None,
            threshold: DEFAULT_THRESHOLD,
            observer: Box::new(NullObserver),
        }
    }
}

impl<D: Dut, C: ImageCodec> TestbenchBuilder<D, C> {
    /// Replace the codec used to decode captured frames.
    pub fn codec<C2: ImageCodec>(self, codec: C2) -> TestbenchBuilder<D, C2> {
        TestbenchBuilder {
            dut: self.dut,
            format: self.format,
            codec,
            clock_period: self.clock_period,
            max_cycles: self.max_cycles,
            threshold: self.threshold,
            observer: self.observer,
        }
    }

    pub fn clock_period(mut self, period: u64) -> Self {
        self.clock_period = period;
        self
    }

    /// Fail with a timeout once this many rising edges have elapsed.
    pub fn max_cycles(mut self, cycles: u64) -> Self {
        self.max_cycles = Some(cycles);
        self
    }

    /// Largest tolerated difference in percent.
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn observer(mut self, observer: impl Observer + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn build(self) -> Testbench<D, C> {
        let mut scheduler = Scheduler::new();
        scheduler.add_clock(self.clock_period, 0);
        Testbench {
            dut: self.dut,
            frame: SignalFrame::new(),
            scheduler,
            driver: None,
            monitor: BitstreamMonitor::new(self.format, self.codec),
            received: VecDeque::new(),
            scorer: SimilarityScorer::new(self.threshold),
            observer: self.observer,
            max_cycles: self.max_cycles,
            last_frame: None,
        }
    }
}
