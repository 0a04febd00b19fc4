//! The GPIO daemon capability consumed by a [`Dht11`](crate::Dht11) session.
//!
//! The daemon (for example a pigpio client talking to a remote Raspberry Pi)
//! owns the line. This crate only asks it to configure the pin, arm a
//! watchdog and deliver edge notifications to an [`EdgeHandler`].

use embedded_hal::digital::PinState;

use crate::tick::Tick;

/// GPIO number as understood by the daemon.
pub type Gpio = u8;

/// Kind of level change delivered to an [`EdgeHandler`].
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    /// High to low transition.
    Falling,
    /// Low to high transition.
    Rising,
    /// Subscribes to both transitions. When delivered to a handler it marks
    /// a watchdog timeout: no edge arrived within the armed window.
    Either,
}

impl Edge {
    /// Maps a raw daemon level (0 falling, 1 rising, 2 watchdog timeout).
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(Edge::Falling),
            1 => Some(Edge::Rising),
            2 => Some(Edge::Either),
            _ => None,
        }
    }

    /// Raw daemon level for this edge.
    pub fn level(self) -> u8 {
        match self {
            Edge::Falling => 0,
            Edge::Rising => 1,
            Edge::Either => 2,
        }
    }
}

/// Internal pull resistor configuration.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pull {
    /// No internal resistor; the sensor module has its own pull-up.
    Off,
    /// Pull towards ground.
    Down,
    /// Pull towards the supply.
    Up,
}

/// Pin direction.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Line released; the daemon reports its edges.
    Input,
    /// Line driven by the daemon.
    Output,
}

/// Receives edge notifications from the daemon.
///
/// Takes `&self` so one handler can be shared between the daemon's
/// notification context and its owner; implementors use interior mutability.
pub trait EdgeHandler {
    /// Called once per notification, in delivery order.
    fn on_edge(&self, gpio: Gpio, edge: Edge, tick: Tick);
}

impl<F> EdgeHandler for F
where
    F: Fn(Gpio, Edge, Tick),
{
    fn on_edge(&self, gpio: Gpio, edge: Edge, tick: Tick) {
        self(gpio, edge, tick)
    }
}

/// Handle for an active edge subscription.
pub trait Subscription {
    /// Stops delivery to the subscribed handler.
    fn cancel(&mut self);
}

/// Remote GPIO controller.
///
/// Every call may fail once the connection to the daemon is lost; the error
/// surfaces as [`DhtError::Transport`](crate::DhtError::Transport).
#[allow(async_fn_in_trait)]
pub trait GpioDaemon {
    /// Failure reported by the daemon, usually a lost connection.
    type Error;
    /// Handle returned by [`GpioDaemon::subscribe_edges`].
    type Subscription: Subscription;

    /// Configures the internal pull resistor of `gpio`.
    async fn set_pull_up_down(&mut self, gpio: Gpio, pull: Pull) -> Result<(), Self::Error>;

    /// Arms the watchdog on `gpio`; a timeout of 0 disables it.
    async fn set_watchdog(&mut self, gpio: Gpio, timeout_ms: u32) -> Result<(), Self::Error>;

    /// Switches `gpio` between input and output.
    async fn set_mode(&mut self, gpio: Gpio, mode: Mode) -> Result<(), Self::Error>;

    /// Drives `gpio` to `level`.
    async fn write(&mut self, gpio: Gpio, level: PinState) -> Result<(), Self::Error>;

    /// Delivers every matching transition on `gpio` to `handler`, plus
    /// watchdog timeouts as [`Edge::Either`] with tick 0, until the returned
    /// subscription is cancelled.
    async fn subscribe_edges<H>(
        &mut self,
        gpio: Gpio,
        edge: Edge,
        handler: H,
    ) -> Result<Self::Subscription, Self::Error>
    where
        H: EdgeHandler + 'static;
}
