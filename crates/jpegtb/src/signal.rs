/// Width of the encoder's bitstream output word in bytes.
pub const WORD_BYTES: usize = 4;

/// Named signals of the encoder interface, using the port names of the RTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Signal {
    Clock,
    Reset,
    Enable,
    PixelData,
    EndOfFrame,
    DataReady,
    BitstreamOut,
    BitstreamValid,
    FrameComplete,
}

impl Signal {
    pub const ALL: [Signal; 9] = [
        Signal::Clock,
        Signal::Reset,
        Signal::Enable,
        Signal::PixelData,
        Signal::EndOfFrame,
        Signal::DataReady,
        Signal::BitstreamOut,
        Signal::BitstreamValid,
        Signal::FrameComplete,
    ];

    pub fn port_name(self) -> &'static str {
        match self {
            Signal::Clock => "clk",
            Signal::Reset => "rst",
            Signal::Enable => "enable",
            Signal::PixelData => "data_in",
            Signal::EndOfFrame => "end_of_file_signal",
            Signal::DataReady => "data_ready",
            Signal::BitstreamOut => "JPEG_bitstream",
            Signal::BitstreamValid => "end_of_file_bitstream_count",
            Signal::FrameComplete => "eof_data_partial_ready",
        }
    }

    /// True for signals driven by the testbench into the DUT.
    pub fn is_input(self) -> bool {
        matches!(
            self,
            Signal::Clock | Signal::Reset | Signal::Enable | Signal::PixelData | Signal::EndOfFrame
        )
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.port_name())
    }
}

/// Typed access to the DUT's clocked interface.
///
/// The driver is the only writer of the input setters; the monitor only ever
/// holds a shared reference and reads the outputs.
pub trait SignalBus {
    fn set_reset(&mut self, high: bool);
    fn set_enable(&mut self, high: bool);
    fn set_pixel_data(&mut self, word: u32);
    fn set_end_of_frame(&mut self, high: bool);

    fn data_ready(&self) -> bool;
    fn bitstream_out(&self) -> u32;
    fn frame_complete(&self) -> bool;

    /// Number of valid leading bytes in [`SignalBus::bitstream_out`].
    /// Buses without a byte count signal always present a full word.
    fn bitstream_valid(&self) -> usize {
        WORD_BYTES
    }
}

/// Values of every interface signal during one clock cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignalFrame {
    pub clock: bool,
    pub reset: bool,
    pub enable: bool,
    pub pixel_data: u32,
    pub end_of_frame: bool,
    pub data_ready: bool,
    pub bitstream_out: u32,
    pub bitstream_valid: u8,
    pub frame_complete: bool,
}

impl SignalFrame {
    pub fn new() -> Self {
        Self {
            bitstream_valid: WORD_BYTES as u8,
            ..Default::default()
        }
    }

    /// Raw value of a named signal, for tracing.
    pub fn get(&self, signal: Signal) -> u32 {
        match signal {
            Signal::Clock => self.clock as u32,
            Signal::Reset => self.reset as u32,
            Signal::Enable => self.enable as u32,
            Signal::PixelData => self.pixel_data,
            Signal::EndOfFrame => self.end_of_frame as u32,
            Signal::DataReady => self.data_ready as u32,
            Signal::BitstreamOut => self.bitstream_out,
            Signal::BitstreamValid => self.bitstream_valid as u32,
            Signal::FrameComplete => self.frame_complete as u32,
        }
    }
}

impl std::fmt::Display for SignalFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for signal in Signal::ALL {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            match signal {
                Signal::PixelData => write!(f, "{}={:06x}", signal, self.get(signal))?,
                Signal::BitstreamOut => write!(f, "{}={:08x}", signal, self.get(signal))?,
                _ => write!(f, "{}={}", signal, self.get(signal))?,
            }
        }
        Ok(())
    }
}

impl SignalBus for SignalFrame {
    fn set_reset(&mut self, high: bool) {
        self.reset = high;
    }

    fn set_enable(&mut self, high: bool) {
        self.enable = high;
    }

    fn set_pixel_data(&mut self, word: u32) {
        self.pixel_data = word;
    }

    fn set_end_of_frame(&mut self, high: bool) {
        self.end_of_frame = high;
    }

    fn data_ready(&self) -> bool {
        self.data_ready
    }

    fn bitstream_out(&self) -> u32 {
        self.bitstream_out
    }

    fn frame_complete(&self) -> bool {
        self.frame_complete
    }

    fn bitstream_valid(&self) -> usize {
        (self.bitstream_valid as usize).clamp(1, WORD_BYTES)
    }
}
