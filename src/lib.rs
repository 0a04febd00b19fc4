//! DHT11 Edge-Event Decoder
//!
//! This crate decodes the DHT11 temperature and humidity sensor from edge
//! notifications delivered by a GPIO daemon (such as pigpio), instead of
//! bit-banging the line. Each notification carries a 32-bit microsecond tick
//! that wraps about every 72 minutes; bit values are recovered from the time
//! between edges.
//!
//! # Features
//! - [`FrameDecoder`]: the edge-driven state machine with checksum check
//! - [`tick_diff`] and [`Debounce`]: wrap-aware tick arithmetic and filtering
//! - [`Dht11`]: async read session over any [`GpioDaemon`]
//! - [`poll_valid`]: read loop with a caller-chosen interval
//! - Designed for `no_std` environments (requires `alloc`)
//!
//! # Dependencies
//! - [`DelayNs`] from `embedded-hal-async` for the read cycle's waits
//! - [`PinState`] from `embedded-hal` for line levels
//! - `embassy-sync` critical-section primitives to share the decoder with the
//!   daemon's notification context
//!
//! # Optional Features
//! - `defmt`: Implements `defmt::Format` for logging support
//!
//! [`DelayNs`]: embedded_hal_async::delay::DelayNs
//! [`PinState`]: embedded_hal::digital::PinState

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod decoder;
pub mod dht11;
pub mod error;
pub mod gpio;
pub mod poll;
pub mod tick;

pub use decoder::{DecodedFrame, DecoderAction, FrameDecoder, FrameError};
pub use dht11::{DecoderHandle, Dht11, SessionConfig};
pub use error::DhtError;
pub use gpio::{Edge, EdgeHandler, Gpio, GpioDaemon, Mode, Pull, Subscription};
pub use poll::{PollConfig, PollSummary, poll_valid};
pub use tick::{Debounce, DebounceOutcome, Tick, tick_diff};
