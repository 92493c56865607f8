use std::path::Path;

use image::{DynamicImage, ImageFormat};

use crate::{
    HarnessError,
    codec::ImageCodec,
    frame::FrameFormat,
    observer::{HarnessEvent, Observer},
    signal::{SignalBus, WORD_BYTES},
};

/// Bytes captured since the last frame boundary.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BitstreamBuffer {
    bytes: Vec<u8>,
}

impl BitstreamBuffer {
    pub fn push_word(&mut self, word: u32, valid: usize) {
        let valid = valid.min(WORD_BYTES);
        self.bytes.extend_from_slice(&word.to_be_bytes()[..valid]);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Hands the contents over and leaves the buffer empty.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.bytes)
    }
}

/// One decoded frame of encoder output.
#[derive(Debug, Clone)]
pub struct ReconstructedImage {
    pub image: DynamicImage,
    pub format: ImageFormat,
    /// Zero-based sequence number of the frame on this monitor.
    pub frame: usize,
    /// Payload bytes captured from the DUT, excluding header and end marker.
    pub payload_len: usize,
}

impl ReconstructedImage {
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), HarnessError> {
        self.image.save(path)?;
        Ok(())
    }
}

/// Samples encoder outputs once per cycle and rebuilds completed frames.
pub struct BitstreamMonitor<C> {
    format: FrameFormat,
    codec: C,
    buffer: BitstreamBuffer,
    frames: usize,
}

impl<C> std::fmt::Debug for BitstreamMonitor<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitstreamMonitor")
            .field("buffered", &self.buffer.len())
            .field("frames", &self.frames)
            .finish()
    }
}

impl<C: ImageCodec> BitstreamMonitor<C> {
    pub fn new(format: FrameFormat, codec: C) -> Self {
        Self {
            format,
            codec,
            buffer: BitstreamBuffer::default(),
            frames: 0,
        }
    }

    pub fn buffer(&self) -> &BitstreamBuffer {
        &self.buffer
    }

    /// Frame boundaries seen so far, including ones that failed to decode.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Must run in the read-only phase of every cycle; a skipped cycle drops
    /// or duplicates bytes.
    pub fn sample<B>(
        &mut self,
        bus: &B,
        observer: &mut dyn Observer,
    ) -> Result<Option<ReconstructedImage>, HarnessError>
    where
        B: SignalBus + ?Sized,
    {
        if bus.data_ready() {
            let valid = bus.bitstream_valid();
            self.buffer.push_word(bus.bitstream_out(), valid);
            observer.on_event(&HarnessEvent::BytesCaptured {
                count: valid,
                buffered: self.buffer.len(),
            });
        }
        if !bus.frame_complete() {
            return Ok(None);
        }

        let frame = self.frames;
        self.frames += 1;
        let payload = self.buffer.take();
        let stream = self.format.assemble(&payload);
        let (image, format) = self
            .codec
            .decode(&stream)
            .map_err(|source| HarnessError::Decode {
                frame,
                bytes: payload.len(),
                source,
            })?;

        observer.on_event(&HarnessEvent::FrameDecoded {
            frame,
            format,
            width: image.width(),
            height: image.height(),
            mode: image.color(),
        });
        Ok(Some(ReconstructedImage {
            image,
            format,
            frame,
            payload_len: payload.len(),
        }))
    }
}
