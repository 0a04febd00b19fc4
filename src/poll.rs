//! Read-cycle driver: repeated reads with a caller-chosen pause.

use embedded_hal_async::delay::DelayNs;

use crate::decoder::DecodedFrame;
use crate::dht11::Dht11;
use crate::error::DhtError;
use crate::gpio::GpioDaemon;

/// Pause between reads when none is given. The DHT11 needs about a second
/// to recover after a reply.
pub const DEFAULT_INTERVAL_MS: u32 = 1000;

/// Stop conditions and pacing for [`poll_valid`].
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollConfig {
    /// Pause before every read, in milliseconds.
    pub interval_ms: u32,
    /// Number of valid frames to collect.
    pub wanted: u32,
    /// Upper bound on read cycles; `None` keeps reading until `wanted`.
    pub max_reads: Option<u32>,
}

impl Default for PollConfig {
    fn default() -> Self {
        PollConfig {
            interval_ms: DEFAULT_INTERVAL_MS,
            wanted: 1,
            max_reads: None,
        }
    }
}

/// Counters from a finished [`poll_valid`] run.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub reads: u32,
    pub valid: u32,
}

/// Reads `sensor` until `config.wanted` valid frames were handed to
/// `on_valid` or `config.max_reads` cycles ran. Invalid frames are dropped.
///
/// The session must already be started.
///
/// # Errors
///
/// The first error from [`Dht11::request_read`]; nothing is retried.
pub async fn poll_valid<G, D, P, F>(
    sensor: &mut Dht11<G, D>,
    pause: &mut P,
    config: &PollConfig,
    mut on_valid: F,
) -> Result<PollSummary, DhtError<G::Error>>
where
    G: GpioDaemon,
    D: DelayNs,
    P: DelayNs,
    F: FnMut(DecodedFrame),
{
    let mut summary = PollSummary::default();

    while summary.valid < config.wanted
        && config.max_reads.is_none_or(|max| summary.reads < max)
    {
        pause.delay_ms(config.interval_ms).await;
        let frame = sensor.request_read().await?;
        summary.reads += 1;

        if frame.is_valid() {
            summary.valid += 1;
            on_valid(frame);
        } else {
            log::debug!("dropping frame with {:?}", frame.error);
        }
    }

    Ok(summary)
}
