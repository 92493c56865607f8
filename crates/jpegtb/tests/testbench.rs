use image::{DynamicImage, GrayImage, ImageFormat, ImageResult, Rgb, RgbImage};
use jpegtb::{
    CYCLES_PER_BLOCK, Dut, FrameError, FrameFormat, HarnessError, HarnessEvent, ImageCodec, SignalFrame,
    Testbench,
};
use std::cell::RefCell;
use std::rc::Rc;

/// Answers every end-of-frame block with a fixed two-word payload and one
/// frame-complete pulse per requested frame.
#[derive(Default)]
struct SyntheticEncoder {
    edges: u64,
    input_writes_seen: u64,
    countdown: Option<u32>,
    frames_per_image: u32,
    emitted: u32,
}

impl SyntheticEncoder {
    fn new(frames_per_image: u32) -> Self {
        Self {
            frames_per_image,
            ..Default::default()
        }
    }
}

impl Dut for SyntheticEncoder {
    fn rising_edge(&mut self, frame: &mut SignalFrame) {
        self.edges += 1;
        if frame.reset || frame.enable || frame.pixel_data != 0 {
            self.input_writes_seen += 1;
        }
        frame.data_ready = false;
        frame.frame_complete = false;
        if frame.end_of_frame {
            self.countdown = Some(10);
            self.emitted = 0;
        }
        let Some(count) = self.countdown else {
            return;
        };
        match count {
            2 | 1 => {
                frame.data_ready = true;
                frame.bitstream_out = 0xa0b0c0d0 + count;
            }
            0 => {
                frame.frame_complete = true;
                self.emitted += 1;
                // Further frames follow back to back with no payload.
                self.countdown = if self.emitted < self.frames_per_image {
                    Some(0)
                } else {
                    None
                };
                return;
            }
            _ => {}
        }
        self.countdown = Some(count - 1);
    }
}

/// A DUT that never produces output.
struct SilentEncoder;

impl Dut for SilentEncoder {
    fn rising_edge(&mut self, _frame: &mut SignalFrame) {}
}

/// Raises an internal fault once it sees the end-of-frame pulse.
#[derive(Default)]
struct FaultyEncoder {
    fault: Option<HarnessError>,
}

impl Dut for FaultyEncoder {
    fn rising_edge(&mut self, frame: &mut SignalFrame) {
        if frame.end_of_frame {
            self.fault = Some(FrameError::MissingStartOfScan.into());
        }
    }

    fn take_error(&mut self) -> Option<HarnessError> {
        self.fault.take()
    }
}

/// Ignores the stream and returns a preset image.
struct FixedCodec(DynamicImage);

impl ImageCodec for FixedCodec {
    fn decode(&self, _bytes: &[u8]) -> ImageResult<(DynamicImage, ImageFormat)> {
        Ok((self.0.clone(), ImageFormat::Jpeg))
    }
}

fn header() -> FrameFormat {
    FrameFormat::new(vec![0xff, 0xd8]).unwrap()
}

fn flat(width: u32, height: u32, value: u8) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([value; 3])))
}

/// The flat image with the red channel of the first 12 rows raised by 51,
/// which is a 5% difference over the whole image.
fn five_percent_off(original: &DynamicImage) -> DynamicImage {
    let mut rgb = original.to_rgb8();
    for y in 0..12 {
        for x in 0..16 {
            rgb.get_pixel_mut(x, y).0[0] += 51;
        }
    }
    DynamicImage::ImageRgb8(rgb)
}

#[test]
fn flat_image_passes_at_default_threshold() {
    let original = flat(16, 16, 100);
    let mut tb = Testbench::builder(SyntheticEncoder::new(1), header())
        .codec(FixedCodec(original.clone()))
        .build();

    let comparison = tb.process_image(&original).unwrap();
    assert_eq!(comparison.score, 0.0);
    assert_eq!(comparison.threshold, 0.22);
    assert!(comparison.passed());
    assert_eq!(tb.monitor().frames(), 1);
    assert_eq!(tb.last_frame().unwrap().payload_len, 8);
}

#[test]
fn five_percent_difference_exceeds_threshold() {
    let original = flat(16, 16, 100);
    let mut tb = Testbench::builder(SyntheticEncoder::new(1), header())
        .codec(FixedCodec(five_percent_off(&original)))
        .build();

    match tb.process_image(&original) {
        Err(HarnessError::ThresholdExceeded { score, threshold }) => {
            assert!((score - 5.0).abs() < 1e-9, "score {score}");
            assert_eq!(threshold, 0.22);
        }
        other => panic!("expected threshold failure, got {other:?}"),
    }
}

#[test]
fn caller_threshold_overrides_default() {
    let original = flat(16, 16, 100);
    let mut tb = Testbench::builder(SyntheticEncoder::new(1), header())
        .codec(FixedCodec(five_percent_off(&original)))
        .threshold(5.5)
        .build();
    assert!(tb.process_image(&original).unwrap().passed());
}

#[test]
fn grayscale_stimulus_fails_before_any_cycle() {
    let gray = DynamicImage::ImageLuma8(GrayImage::new(16, 16));
    let mut tb = Testbench::builder(SyntheticEncoder::new(1), header())
        .codec(FixedCodec(gray.clone()))
        .build();

    let err = tb.process_image(&gray).unwrap_err();
    assert!(matches!(err, HarnessError::InputFormat { .. }));
    assert_eq!(tb.cycles(), 0);
    assert_eq!(tb.dut().edges, 0);
    assert_eq!(*tb.signals(), SignalFrame::new());
}

#[test]
fn send_takes_the_fixed_number_of_cycles() {
    let original = flat(16, 8, 7);
    let mut tb = Testbench::builder(SyntheticEncoder::new(1), header())
        .codec(FixedCodec(original.clone()))
        .build();
    tb.send(&original).unwrap();
    assert_eq!(tb.cycles(), 2 + 2 * CYCLES_PER_BLOCK);
    assert!(tb.dut().input_writes_seen > 0);
    assert!(!tb.signals().enable);
}

#[test]
fn one_image_per_frame_complete_pulse() {
    let original = flat(8, 8, 50);
    let mut tb = Testbench::builder(SyntheticEncoder::new(2), header())
        .codec(FixedCodec(original.clone()))
        .build();
    tb.send(&original).unwrap();

    let first = tb.wait_for_frame().unwrap();
    let second = tb.wait_for_frame().unwrap();
    assert_eq!((first.frame, second.frame), (0, 1));
    assert_eq!(first.payload_len, 8);
    // Only the first frame follows the data words.
    assert_eq!(second.payload_len, 0);
    assert!(tb.monitor().buffer().is_empty());
}

#[test]
fn stuck_dut_times_out() {
    let original = flat(8, 8, 50);
    let mut tb = Testbench::builder(SilentEncoder, header())
        .codec(FixedCodec(original.clone()))
        .max_cycles(500)
        .build();
    let err = tb.process_image(&original).unwrap_err();
    assert!(matches!(err, HarnessError::Timeout { cycles: 500 }));
}

#[test]
fn undecodable_frame_is_a_decode_error() {
    let original = flat(8, 8, 50);
    let mut tb = Testbench::builder(SyntheticEncoder::new(1), header()).build();
    let err = tb.process_image(&original).unwrap_err();
    match err {
        HarnessError::Decode { frame, bytes, .. } => {
            assert_eq!((frame, bytes), (0, 8));
        }
        other => panic!("expected decode failure, got {other:?}"),
    }
}

#[test]
fn observer_sees_blocks_frames_and_score() {
    let original = flat(16, 16, 100);
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    let mut tb = Testbench::builder(SyntheticEncoder::new(1), header())
        .codec(FixedCodec(original.clone()))
        .observer(move |event: &HarnessEvent| sink.borrow_mut().push(event.clone()))
        .build();
    tb.process_image(&original).unwrap();

    let events = events.borrow();
    let blocks = events
        .iter()
        .filter(|e| matches!(e, HarnessEvent::BlockStarted { .. }))
        .count();
    assert_eq!(blocks, 4);
    assert_eq!(events.first(), Some(&HarnessEvent::ResetReleased));
    assert!(events.iter().any(|e| matches!(e, HarnessEvent::FrameDecoded { frame: 0, .. })));
    assert_eq!(
        events.last(),
        Some(&HarnessEvent::Scored {
            score: 0.0,
            threshold: 0.22
        })
    );
}

#[test]
fn dut_fault_fails_the_case_with_its_own_error() {
    let original = flat(8, 8, 50);
    let mut tb = Testbench::builder(FaultyEncoder::default(), header())
        .codec(FixedCodec(original.clone()))
        .max_cycles(10_000)
        .build();
    let err = tb.process_image(&original).unwrap_err();
    assert!(matches!(
        err,
        HarnessError::Frame(FrameError::MissingStartOfScan)
    ));
    // Reset, first pixel with end-of-frame, then the edge that samples it.
    assert_eq!(tb.cycles(), 3);
    assert_eq!(tb.monitor().frames(), 0);
}
