use image::{ColorType, ImageFormat};

/// Progress reported by the driver, the monitor and the testbench.
#[derive(Debug, Clone, PartialEq)]
pub enum HarnessEvent {
    ResetReleased,
    BlockStarted {
        index: usize,
        total: usize,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    ImageSent {
        blocks: usize,
        cycles: u64,
    },
    BytesCaptured {
        count: usize,
        buffered: usize,
    },
    FrameDecoded {
        frame: usize,
        format: ImageFormat,
        width: u32,
        height: u32,
        mode: ColorType,
    },
    Scored {
        score: f64,
        threshold: f64,
    },
}

pub trait Observer {
    fn on_event(&mut self, event: &HarnessEvent);
}

impl<F> Observer for F
where
    F: FnMut(&HarnessEvent),
{
    fn on_event(&mut self, event: &HarnessEvent) {
        self(event)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl Observer for NullObserver {
    fn on_event(&mut self, _event: &HarnessEvent) {}
}

/// Forwards events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl Observer for LogObserver {
    fn on_event(&mut self, event: &HarnessEvent) {
        match event {
            HarnessEvent::ResetReleased => log::debug!("DUT reset released"),
            HarnessEvent::BlockStarted {
                x,
                y,
                width,
                height,
                ..
            } => log::debug!("Sending block X{x:4}/{width:4}, Y{y:4}/{height:4}"),
            HarnessEvent::ImageSent { blocks, cycles } => {
                log::debug!("Sent {blocks} blocks in {cycles} cycles")
            }
            HarnessEvent::BytesCaptured { count, buffered } => {
                log::trace!("Captured {count} bytes ({buffered} buffered)")
            }
            HarnessEvent::FrameDecoded {
                format,
                width,
                height,
                mode,
                ..
            } => log::info!("Recovered image {format:?} of {width}x{height} in mode {mode:?}"),
            HarnessEvent::Scored { score, .. } => {
                log::info!("Compressed image differs to original by {score:.6}%")
            }
        }
    }
}
