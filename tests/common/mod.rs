#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use dht11_edge::{Edge, EdgeHandler, Gpio, GpioDaemon, Mode, Pull, Subscription, Tick};
use embedded_hal::digital::PinState;
use embedded_hal_async::delay::DelayNs;

/// Daemon call as recorded by [`MockDaemon`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Call {
    Pull(Gpio, Pull),
    Watchdog(Gpio, u32),
    Mode(Gpio, Mode),
    Write(Gpio, PinState),
    Subscribe(Gpio, Edge),
}

#[derive(Debug, PartialEq, Eq)]
pub struct ConnectionLost;

pub struct MockSubscription {
    active: Rc<Cell<bool>>,
    cancels: Rc<Cell<u32>>,
}

impl Subscription for MockSubscription {
    fn cancel(&mut self) {
        self.active.set(false);
        self.cancels.set(self.cancels.get() + 1);
    }
}

/// Daemon replaying one scripted burst of raw `(level, tick)` notifications
/// per armed watchdog, the way pigpio reports them.
#[derive(Default)]
pub struct MockDaemon {
    pub calls: Vec<Call>,
    pub cancels: Rc<Cell<u32>>,
    bursts: Vec<Vec<(u8, Tick)>>,
    handler: Option<Box<dyn EdgeHandler>>,
    active: Rc<Cell<bool>>,
    fail_on: Option<fn(&Call) -> bool>,
}

impl MockDaemon {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a burst delivered when the watchdog is next armed.
    pub fn with_burst(mut self, burst: Vec<(u8, Tick)>) -> Self {
        self.bursts.push(burst);
        self
    }

    /// Makes every call matching `predicate` fail.
    pub fn failing_on(mut self, predicate: fn(&Call) -> bool) -> Self {
        self.fail_on = Some(predicate);
        self
    }

    pub fn is_subscribed(&self) -> bool {
        self.active.get()
    }

    /// Delivers a raw notification as the daemon would.
    pub fn notify(&self, gpio: Gpio, level: u8, tick: Tick) {
        if !self.active.get() {
            return;
        }
        if let (Some(handler), Some(edge)) = (self.handler.as_ref(), Edge::from_level(level)) {
            handler.on_edge(gpio, edge, tick);
        }
    }

    fn record(&mut self, call: Call) -> Result<(), ConnectionLost> {
        self.calls.push(call);
        match self.fail_on {
            Some(predicate) if predicate(&call) => Err(ConnectionLost),
            _ => Ok(()),
        }
    }
}

impl GpioDaemon for MockDaemon {
    type Error = ConnectionLost;
    type Subscription = MockSubscription;

    async fn set_pull_up_down(&mut self, gpio: Gpio, pull: Pull) -> Result<(), Self::Error> {
        self.record(Call::Pull(gpio, pull))
    }

    async fn set_watchdog(&mut self, gpio: Gpio, timeout_ms: u32) -> Result<(), Self::Error> {
        self.record(Call::Watchdog(gpio, timeout_ms))?;
        if timeout_ms > 0 && !self.bursts.is_empty() {
            let burst = self.bursts.remove(0);
            for (level, tick) in burst {
                self.notify(gpio, level, tick);
            }
        }
        Ok(())
    }

    async fn set_mode(&mut self, gpio: Gpio, mode: Mode) -> Result<(), Self::Error> {
        self.record(Call::Mode(gpio, mode))
    }

    async fn write(&mut self, gpio: Gpio, level: PinState) -> Result<(), Self::Error> {
        self.record(Call::Write(gpio, level))
    }

    async fn subscribe_edges<H>(
        &mut self,
        gpio: Gpio,
        edge: Edge,
        handler: H,
    ) -> Result<Self::Subscription, Self::Error>
    where
        H: EdgeHandler + 'static,
    {
        self.record(Call::Subscribe(gpio, edge))?;
        self.handler = Some(Box::new(handler));
        self.active = Rc::new(Cell::new(true));
        Ok(MockSubscription {
            active: self.active.clone(),
            cancels: self.cancels.clone(),
        })
    }
}

/// Async delay recording every millisecond wait.
#[derive(Default)]
pub struct RecordingDelay {
    pub waits_ms: Rc<RefCell<Vec<u32>>>,
}

impl DelayNs for RecordingDelay {
    async fn delay_ns(&mut self, _ns: u32) {}

    async fn delay_ms(&mut self, ms: u32) {
        self.waits_ms.borrow_mut().push(ms);
    }
}

const ZERO_US: Tick = 26;
const ONE_US: Tick = 70;
const LOW_US: Tick = 50;

/// Raw notifications for a full frame starting at `tick`: a long low, the
/// sensor's two response pulses, then 40 data bits MSB first.
pub fn frame_burst(tick: Tick, bytes: [u8; 5]) -> Vec<(u8, Tick)> {
    partial_burst(tick, &bytes, 40)
}

/// Like [`frame_burst`] but stops after `bits` data bits.
pub fn partial_burst(mut tick: Tick, bytes: &[u8], bits: usize) -> Vec<(u8, Tick)> {
    let mut burst = vec![(0, tick)];
    for _ in 0..2 {
        tick = tick.wrapping_add(80);
        burst.push((1, tick));
        tick = tick.wrapping_add(80);
        burst.push((0, tick));
    }
    let data = bytes
        .iter()
        .flat_map(|byte| (0..8).rev().map(move |i| (byte >> i) & 1 == 1))
        .take(bits);
    for one in data {
        tick = tick.wrapping_add(if one { ONE_US } else { ZERO_US });
        burst.push((1, tick));
        tick = tick.wrapping_add(LOW_US);
        burst.push((0, tick));
    }
    burst
}
