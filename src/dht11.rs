use alloc::sync::Arc;
use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embedded_hal::digital::PinState;
use embedded_hal_async::delay::DelayNs;

use crate::decoder::{DecodedFrame, DecoderAction, FrameDecoder};
use crate::error::DhtError;
use crate::gpio::{Edge, EdgeHandler, Gpio, GpioDaemon, Mode, Pull, Subscription};
use crate::tick::Tick;

/// How long the line is held low to wake the sensor, in milliseconds.
pub const START_PULSE_MS: u32 = 17;

/// Watchdog armed for the sensor's reply, in milliseconds.
pub const WATCHDOG_MS: u32 = 200;

/// Time given to the sensor to send its frame, in milliseconds.
pub const SETTLE_MS: u32 = 200;

/// Timing of one read cycle.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Data line of the sensor.
    pub gpio: Gpio,
    /// Time the line is held low to wake the sensor.
    pub start_pulse_ms: u32,
    /// Watchdog armed once the line is released.
    pub watchdog_ms: u32,
    /// Wait before the frame is read back.
    pub settle_ms: u32,
}

impl SessionConfig {
    /// Default DHT11 timing on `gpio`.
    pub const fn new(gpio: Gpio) -> Self {
        SessionConfig {
            gpio,
            start_pulse_ms: START_PULSE_MS,
            watchdog_ms: WATCHDOG_MS,
            settle_ms: SETTLE_MS,
        }
    }
}

struct Shared {
    decoder: Mutex<CriticalSectionRawMutex, RefCell<FrameDecoder>>,
    watchdog_release: Signal<CriticalSectionRawMutex, ()>,
}

/// Edge handler feeding a [`FrameDecoder`] shared with its session.
///
/// Clones refer to the same decoder. Watchdog release requests from the
/// decoder are latched until the read cycle picks them up.
#[derive(Clone)]
pub struct DecoderHandle(Arc<Shared>);

impl Default for DecoderHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl DecoderHandle {
    /// Creates a handle around a decoder waiting for its first frame.
    pub fn new() -> Self {
        DecoderHandle(Arc::new(Shared {
            decoder: Mutex::new(RefCell::new(FrameDecoder::new())),
            watchdog_release: Signal::new(),
        }))
    }

    /// Current decoder state as a frame.
    pub fn snapshot(&self) -> DecodedFrame {
        self.0.decoder.lock(|decoder| decoder.borrow().snapshot())
    }

    /// Discards whatever the decoder holds and waits for a new frame.
    pub fn begin_frame(&self) {
        self.0.decoder.lock(|decoder| decoder.borrow_mut().begin_frame());
    }

    /// Returns whether the decoder asked for the watchdog to be released
    /// since the last call.
    pub fn take_watchdog_release(&self) -> bool {
        self.0.watchdog_release.try_take().is_some()
    }
}

impl EdgeHandler for DecoderHandle {
    fn on_edge(&self, _gpio: Gpio, edge: Edge, tick: Tick) {
        let action = self
            .0
            .decoder
            .lock(|decoder| decoder.borrow_mut().on_edge(edge, tick));
        if let Some(DecoderAction::ReleaseWatchdog) = action {
            self.0.watchdog_release.signal(());
        }
    }
}

/// DHT11 read session on top of a GPIO daemon.
pub struct Dht11<G: GpioDaemon, D> {
    daemon: G,
    delay: D,
    config: SessionConfig,
    decoder: DecoderHandle,
    subscription: Option<G::Subscription>,
}

impl<G, D> Dht11<G, D>
where
    G: GpioDaemon,
    D: DelayNs,
{
    /// Creates a session for the sensor on `gpio` with the default timing.
    ///
    /// # Arguments
    ///
    /// * `daemon` - Client of the daemon that owns the line.
    /// * `delay` - Async delay used while the sensor is woken and replies.
    /// * `gpio` - Data line of the sensor.
    pub fn new(daemon: G, delay: D, gpio: Gpio) -> Self {
        Self::with_config(daemon, delay, SessionConfig::new(gpio))
    }

    /// Creates a session with explicit timing.
    pub fn with_config(daemon: G, delay: D, config: SessionConfig) -> Self {
        Dht11 {
            daemon,
            delay,
            config,
            decoder: DecoderHandle::new(),
            subscription: None,
        }
    }

    /// Timing used by [`Dht11::request_read`].
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Whether the decoder is subscribed to the line.
    pub fn is_active(&self) -> bool {
        self.subscription.is_some()
    }

    /// Handler currently subscribed to the line.
    pub fn decoder(&self) -> &DecoderHandle {
        &self.decoder
    }

    /// Clears the pull resistor, kills any watchdog and subscribes the
    /// decoder to both edges of the line.
    ///
    /// # Errors
    ///
    /// `DhtError::SessionActive` if the session was started and not closed.
    pub async fn start_session(&mut self) -> Result<(), DhtError<G::Error>> {
        if self.subscription.is_some() {
            return Err(DhtError::SessionActive);
        }
        let gpio = self.config.gpio;

        self.daemon.set_pull_up_down(gpio, Pull::Off).await?;
        self.daemon.set_watchdog(gpio, 0).await?;

        self.decoder = DecoderHandle::new();
        let subscription = self
            .daemon
            .subscribe_edges(gpio, Edge::Either, self.decoder.clone())
            .await?;
        self.subscription = Some(subscription);

        log::debug!("dht11 session started on gpio {}", gpio);
        Ok(())
    }

    /// Runs one read cycle and returns what the decoder holds at its end.
    ///
    /// Starts a fresh frame, holds the line low to wake the sensor, releases
    /// it as an input, arms the watchdog and waits for the frame. The
    /// watchdog is disabled again before returning. Missing bits and bad
    /// checksums are reported in the frame, not as errors.
    ///
    /// # Errors
    ///
    /// `DhtError::SessionClosed` without a running session, or the first
    /// daemon failure.
    pub async fn request_read(&mut self) -> Result<DecodedFrame, DhtError<G::Error>> {
        if self.subscription.is_none() {
            return Err(DhtError::SessionClosed);
        }
        let gpio = self.config.gpio;

        // A read with no edges must not report the previous frame.
        self.decoder.begin_frame();

        self.daemon.set_mode(gpio, Mode::Output).await?;
        self.daemon.write(gpio, PinState::Low).await?;
        self.delay.delay_ms(self.config.start_pulse_ms).await;
        self.daemon.set_mode(gpio, Mode::Input).await?;

        // Drop requests left over from a previous cycle's late timeout.
        self.decoder.take_watchdog_release();
        self.daemon.set_watchdog(gpio, self.config.watchdog_ms).await?;
        self.delay.delay_ms(self.config.settle_ms).await;

        // The cycle is over whether or not the sensor finished or timed out.
        let ended_early = self.decoder.take_watchdog_release();
        self.daemon.set_watchdog(gpio, 0).await?;

        let frame = self.decoder.snapshot();
        log::debug!(
            "dht11 read on gpio {} (ended early: {}): {:?} temperature {} humidity {}",
            gpio,
            ended_early,
            frame.error,
            frame.temperature,
            frame.humidity
        );
        Ok(frame)
    }

    /// Cancels the edge subscription and disables the watchdog.
    ///
    /// Safe to call any number of times; the subscription is cancelled once
    /// and before the daemon is contacted.
    pub async fn close_session(&mut self) -> Result<(), DhtError<G::Error>> {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
            log::debug!("dht11 session on gpio {} closed", self.config.gpio);
        }
        self.daemon.set_watchdog(self.config.gpio, 0).await?;
        Ok(())
    }

    /// Gives back the daemon and delay.
    ///
    /// An active subscription is cancelled so no further edges reach the
    /// dropped decoder. The watchdog cannot be disabled here without an
    /// await; call [`Dht11::close_session`] first for a clean shutdown.
    pub fn release(mut self) -> (G, D) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
            log::debug!("dht11 session on gpio {} released while active", self.config.gpio);
        }
        (self.daemon, self.delay)
    }
}
