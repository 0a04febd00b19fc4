use core::fmt;

use crate::gpio::Edge;
use crate::tick::{Tick, tick_diff};

/// Low time (us) after which a falling edge starts a new frame.
const FRAME_START_US: u32 = 250_000;

/// High pulse width (us) from which a bit reads as `1`.
const ONE_BIT_US: u32 = 50;

/// Pulse width (us) beyond anything the sensor sends for a data bit.
const BAD_BIT_US: u32 = 200;

/// Number of data bits in a frame, header bits excluded.
const FRAME_BITS: i8 = 40;

/// `bit_index` after a frame start: two response bits precede the data.
const PRE_FRAME: i8 = -2;

/// Out of range for any 8-bit checksum.
const BAD_CHECKSUM: u16 = 256;

/// Status of a decoded frame.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FrameError {
    #[default]
    NoError,
    /// Fewer than 40 bits arrived before the frame was read.
    IncompleteFrame,
    /// All 40 bits arrived but the checksum byte did not match.
    ChecksumMismatch,
}

impl FrameError {
    /// Numeric error code: 0 none, 1 missing data, 2 CRC.
    pub fn code(self) -> u8 {
        match self {
            FrameError::NoError => 0,
            FrameError::IncompleteFrame => 1,
            FrameError::ChecksumMismatch => 2,
        }
    }
}

/// Result of one read cycle.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodedFrame {
    /// Outcome of the read.
    pub error: FrameError,
    /// Integral part of the temperature, in degrees Celsius.
    pub temperature: u16,
    /// Integral part of the relative humidity, in percent.
    pub humidity: u16,
}

impl DecodedFrame {
    /// Whether all 40 bits arrived and the checksum matched.
    pub fn is_valid(&self) -> bool {
        self.error == FrameError::NoError
    }
}

impl fmt::Display for DecodedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Temperature: {}°C, Humidity {} %",
            self.temperature, self.humidity
        )
    }
}

/// Request from the decoder to whoever owns the watchdog.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecoderAction {
    /// The frame is over; the watchdog should be disabled.
    ReleaseWatchdog,
}

/// Edge driven DHT11 frame decoder.
///
/// Every falling edge records its tick. The following rising edge measures
/// the pulse from it: about 26-28 us encodes a `0`, about 70 us a `1`. A
/// falling edge after more than 250 ms of quiet starts a new frame.
///
/// Only the integral humidity and temperature bytes are kept. The DHT11 always
/// sends zero in the fractional bytes, so bits 8-15 and 24-31 are skipped.
#[derive(Debug)]
pub struct FrameDecoder {
    bit_index: i8,
    checksum: u16,
    temperature: u16,
    humidity: u16,
    last_high_tick: Tick,
    error: FrameError,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Creates a decoder waiting for its first frame.
    pub const fn new() -> Self {
        FrameDecoder {
            bit_index: PRE_FRAME,
            checksum: 0,
            temperature: 0,
            humidity: 0,
            last_high_tick: 0,
            error: FrameError::NoError,
        }
    }

    /// Feeds one edge event into the state machine.
    pub fn on_edge(&mut self, edge: Edge, tick: Tick) -> Option<DecoderAction> {
        let diff = tick_diff(self.last_high_tick, tick);
        match edge {
            Edge::Falling => {
                self.falling(tick, diff);
                None
            }
            Edge::Rising => self.rising(diff),
            // Watchdog timeout: nothing more is coming.
            Edge::Either => Some(DecoderAction::ReleaseWatchdog),
        }
    }

    /// Records the tick and starts a new frame after a long low.
    fn falling(&mut self, tick: Tick, diff: u32) {
        self.last_high_tick = tick;
        if diff <= FRAME_START_US {
            return;
        }
        self.reset();
    }

    /// Starts a new frame without waiting for a long low on the line.
    ///
    /// The last falling edge tick is kept, so the next edges are still
    /// measured from it.
    pub fn begin_frame(&mut self) {
        self.reset();
    }

    /// Clears the bit counter, accumulators and error.
    fn reset(&mut self) {
        self.bit_index = PRE_FRAME;
        self.checksum = 0;
        self.temperature = 0;
        self.humidity = 0;
        self.error = FrameError::NoError;
    }

    /// Decodes one bit from the pulse that just ended.
    fn rising(&mut self, diff: u32) -> Option<DecoderAction> {
        let bit = u16::from(diff >= ONE_BIT_US);
        if diff >= BAD_BIT_US {
            self.checksum = BAD_CHECKSUM;
        }

        let mut action = None;
        match self.bit_index {
            FRAME_BITS.. => {
                self.bit_index = FRAME_BITS;
                return None;
            }
            32.. => {
                self.checksum = shift_in(self.checksum, bit);
                if self.bit_index == FRAME_BITS - 1 {
                    action = Some(DecoderAction::ReleaseWatchdog);
                    if !self.checksum_matches() {
                        log::warn!(
                            "checksum mismatch: humidity {} temperature {} checksum {}",
                            self.humidity,
                            self.temperature,
                            self.checksum
                        );
                        self.error = FrameError::ChecksumMismatch;
                    }
                }
            }
            16..24 => {
                self.temperature = shift_in(self.temperature, bit);
                self.error = FrameError::NoError;
            }
            0..8 => {
                self.humidity = shift_in(self.humidity, bit);
                self.error = FrameError::NoError;
            }
            _ => {}
        }

        self.bit_index += 1;
        action
    }

    /// Byte sum of humidity and temperature against the checksum byte.
    fn checksum_matches(&self) -> bool {
        (self.humidity + self.temperature) & 0xFF == self.checksum
    }

    /// Number of data bits received in the current frame, negative while the
    /// sensor's response bits are still arriving.
    pub fn bit_index(&self) -> i8 {
        self.bit_index
    }

    /// Whether all 40 data bits arrived.
    pub fn is_complete(&self) -> bool {
        self.bit_index >= FRAME_BITS
    }

    /// Current state as a frame. Short frames are reported as
    /// [`FrameError::IncompleteFrame`] unless the checksum already failed.
    pub fn snapshot(&self) -> DecodedFrame {
        let error = if !self.is_complete() && self.error != FrameError::ChecksumMismatch {
            FrameError::IncompleteFrame
        } else {
            self.error
        };
        DecodedFrame {
            error,
            temperature: self.temperature,
            humidity: self.humidity,
        }
    }
}

/// Shifts `bit` into `acc` MSB first. An accumulator already past 8 bits
/// stays at [`BAD_CHECKSUM`] so a forced failure cannot shift back into range.
fn shift_in(acc: u16, bit: u16) -> u16 {
    if acc > 0xFF {
        BAD_CHECKSUM
    } else {
        (acc << 1) | bit
    }
}
