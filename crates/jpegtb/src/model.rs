use image::{RgbImage, codecs::jpeg::JpegEncoder};

use crate::{
    HarnessError,
    driver::PIXELS_PER_BLOCK,
    frame::{FrameFormat, split_jpeg},
    image_block::{BLOCK_SIZE, BlockGrid, unpack_rgb},
    signal::{SignalFrame, WORD_BYTES},
    testbench::Dut,
};

const DEFAULT_QUALITY: u8 = 90;
const DEFAULT_LATENCY: u32 = 16;

#[derive(Debug, Clone, Copy)]
struct Capture {
    pixels: usize,
    final_block: bool,
}

#[derive(Debug, Default)]
enum Output {
    #[default]
    Idle,
    Latency {
        remaining: u32,
        payload: Vec<u8>,
    },
    Streaming {
        payload: Vec<u8>,
        offset: usize,
    },
    Complete,
}

/// Behavioral stand-in for the hardware encoder.
///
/// Collects 8x8 blocks from the pixel interface into a frame buffer and,
/// once the block flagged with end-of-frame has been received, encodes the
/// frame in software and streams the entropy coded payload back one 32-bit
/// word per cycle, followed by a single-cycle frame-complete pulse.
#[derive(Debug)]
pub struct EncoderModel {
    quality: u8,
    latency: u32,
    grid: BlockGrid,
    canvas: RgbImage,
    next_block: usize,
    capture: Option<Capture>,
    last_enable: bool,
    output: Output,
    error: Option<HarnessError>,
    enable_pulses: usize,
    blocks_received: usize,
    frames_encoded: usize,
}

impl EncoderModel {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            latency: DEFAULT_LATENCY,
            grid: BlockGrid::new(width, height),
            canvas: RgbImage::new(width, height),
            next_block: 0,
            capture: None,
            last_enable: false,
            output: Output::Idle,
            error: None,
            enable_pulses: 0,
            blocks_received: 0,
            frames_encoded: 0,
        }
    }

    pub fn quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }

    /// Cycles between receiving the final block and the first output word.
    pub fn latency(mut self, cycles: u32) -> Self {
        self.latency = cycles;
        self
    }

    /// Header matching the streams this model produces.
    pub fn frame_format(&self) -> Result<FrameFormat, HarnessError> {
        let blank = RgbImage::new(self.grid.width(), self.grid.height());
        let stream = encode(&blank, self.quality)?;
        Ok(FrameFormat::from_reference(&stream)?)
    }

    pub fn enable_pulses(&self) -> usize {
        self.enable_pulses
    }

    pub fn blocks_received(&self) -> usize {
        self.blocks_received
    }

    pub fn frames_encoded(&self) -> usize {
        self.frames_encoded
    }

    fn reset(&mut self) {
        self.canvas = RgbImage::new(self.grid.width(), self.grid.height());
        self.next_block = 0;
        self.capture = None;
        self.last_enable = false;
        self.output = Output::Idle;
    }

    fn capture_pixel(&mut self, frame: &SignalFrame) {
        if frame.enable && !self.last_enable {
            self.enable_pulses += 1;
            self.capture = Some(Capture {
                pixels: 0,
                final_block: false,
            });
        }
        self.last_enable = frame.enable;
        if !frame.enable {
            return;
        }
        let Some(mut capture) = self.capture else {
            return;
        };
        if capture.pixels >= PIXELS_PER_BLOCK {
            return;
        }

        capture.final_block |= frame.end_of_frame;
        if let Some(block) = self.grid.block(self.next_block) {
            let x = block.x + capture.pixels as u32 % BLOCK_SIZE;
            let y = block.y + capture.pixels as u32 / BLOCK_SIZE;
            // Replicated pixels past the frame edge are dropped.
            if x < self.canvas.width() && y < self.canvas.height() {
                self.canvas.put_pixel(x, y, image::Rgb(unpack_rgb(frame.pixel_data)));
            }
        }
        capture.pixels += 1;
        self.capture = Some(capture);

        if capture.pixels == PIXELS_PER_BLOCK {
            self.blocks_received += 1;
            self.next_block += 1;
            if capture.final_block {
                self.next_block = 0;
                self.frames_encoded += 1;
                // A failed encode produces no output at all.
                match encode_payload(&self.canvas, self.quality) {
                    Ok(payload) => {
                        self.output = Output::Latency {
                            remaining: self.latency,
                            payload,
                        }
                    }
                    Err(err) => self.error = Some(err),
                }
            }
        }
    }

    fn advance_output(&mut self, frame: &mut SignalFrame) {
        self.output = match std::mem::take(&mut self.output) {
            Output::Idle => Output::Idle,
            Output::Latency { remaining, payload } if remaining > 0 => Output::Latency {
                remaining: remaining - 1,
                payload,
            },
            Output::Latency { payload, .. } => emit_word(frame, payload, 0),
            Output::Streaming { payload, offset } => emit_word(frame, payload, offset),
            Output::Complete => {
                frame.frame_complete = true;
                Output::Idle
            }
        };
    }
}

fn encode(image: &RgbImage, quality: u8) -> Result<Vec<u8>, HarnessError> {
    let mut stream = Vec::new();
    JpegEncoder::new_with_quality(&mut stream, quality).encode_image(image)?;
    Ok(stream)
}

/// Entropy coded scan of `image`, without header and end marker.
fn encode_payload(image: &RgbImage, quality: u8) -> Result<Vec<u8>, HarnessError> {
    let stream = encode(image, quality)?;
    let (_, scan) = split_jpeg(&stream)?;
    Ok(scan.to_vec())
}

fn emit_word(frame: &mut SignalFrame, payload: Vec<u8>, offset: usize) -> Output {
    if offset >= payload.len() {
        frame.frame_complete = true;
        return Output::Idle;
    }
    let end = (offset + WORD_BYTES).min(payload.len());
    let chunk = &payload[offset..end];
    let mut word = [0u8; WORD_BYTES];
    word[..chunk.len()].copy_from_slice(chunk);

    frame.data_ready = true;
    frame.bitstream_out = u32::from_be_bytes(word);
    frame.bitstream_valid = chunk.len() as u8;

    if end >= payload.len() {
        Output::Complete
    } else {
        Output::Streaming {
            payload,
            offset: end,
        }
    }
}

impl Dut for EncoderModel {
    fn rising_edge(&mut self, frame: &mut SignalFrame) {
        frame.data_ready = false;
        frame.frame_complete = false;
        frame.bitstream_valid = WORD_BYTES as u8;

        if frame.reset {
            self.reset();
            frame.bitstream_out = 0;
            return;
        }
        self.advance_output(frame);
        self.capture_pixel(frame);
    }

    fn take_error(&mut self) -> Option<HarnessError> {
        self.error.take()
    }
}
