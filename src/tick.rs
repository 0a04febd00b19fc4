use core::cell::Cell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use crate::gpio::{Edge, EdgeHandler, Gpio};

/// Hardware timer reading in microseconds, wrapping modulo 2^32.
pub type Tick = u32;

/// Default debounce window, in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u32 = 100;

/// Returns the microseconds elapsed from `earlier` to `later`.
///
/// `later` is assumed to be at most one wrap of the 32-bit timer ahead of
/// `earlier`.
///
/// ```
/// assert_eq!(dht11_edge::tick_diff(4294967272, 12), 36);
/// ```
pub const fn tick_diff(earlier: Tick, later: Tick) -> Tick {
    later.wrapping_sub(earlier)
}

/// Whether a [`Debounce`] forwarded a call.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DebounceOutcome {
    /// Forwarded to the wrapped handler.
    Accepted,
    /// Dropped; too close to the last accepted call.
    Filtered,
}

/// Drops edge notifications arriving within a minimum interval of the last
/// accepted one.
///
/// Wraps any [`EdgeHandler`], closures included, so each wrapped handler
/// carries its own history. The accept decision and the update of the last
/// accepted tick happen under a critical-section mutex; the wrapped handler
/// runs after it is released, so it never executes with interrupts masked.
pub struct Debounce<H> {
    handler: H,
    threshold_us: u32,
    last_accepted: Mutex<CriticalSectionRawMutex, Cell<Tick>>,
}

impl<H: EdgeHandler> Debounce<H> {
    /// Wraps `handler` with the default 100 ms window.
    pub fn new(handler: H) -> Self {
        Self::with_threshold_ms(handler, DEFAULT_DEBOUNCE_MS)
    }

    /// Wraps `handler` with a window of `threshold_ms` milliseconds.
    pub fn with_threshold_ms(handler: H, threshold_ms: u32) -> Self {
        Self::with_threshold_us(handler, threshold_ms.saturating_mul(1000))
    }

    /// Wraps `handler` with a window of `threshold_us` microseconds.
    pub fn with_threshold_us(handler: H, threshold_us: u32) -> Self {
        Debounce {
            handler,
            threshold_us,
            last_accepted: Mutex::new(Cell::new(0)),
        }
    }

    /// Window below which calls are dropped, in microseconds.
    pub fn threshold_us(&self) -> u32 {
        self.threshold_us
    }

    /// Tick of the last call that was forwarded.
    pub fn last_accepted(&self) -> Tick {
        self.last_accepted.lock(|last| last.get())
    }

    /// Forwards the call to the wrapped handler unless it arrived within the
    /// window.
    pub fn call(&self, gpio: Gpio, edge: Edge, tick: Tick) -> DebounceOutcome {
        let outcome = self.last_accepted.lock(|last| {
            let previous = last.get();
            // Mirrors the daemon's own wrap rule, one tick short of tick_diff.
            let elapsed = if previous > tick {
                Tick::MAX - previous + tick
            } else {
                tick - previous
            };

            if elapsed > self.threshold_us {
                log::debug!(
                    "call passed by debouncer {} {} {}",
                    tick,
                    previous,
                    self.threshold_us
                );
                last.set(tick);
                DebounceOutcome::Accepted
            } else {
                log::debug!(
                    "call filtered out by debouncer {} {} {}",
                    tick,
                    previous,
                    self.threshold_us
                );
                DebounceOutcome::Filtered
            }
        });

        if outcome == DebounceOutcome::Accepted {
            self.handler.on_edge(gpio, edge, tick);
        }
        outcome
    }

    /// Returns the wrapped handler.
    pub fn into_inner(self) -> H {
        self.handler
    }
}

impl<H: EdgeHandler> EdgeHandler for Debounce<H> {
    fn on_edge(&self, gpio: Gpio, edge: Edge, tick: Tick) {
        self.call(gpio, edge, tick);
    }
}
