/// Possible errors from a DHT11 session.
///
/// Frame level problems (missing bits, bad checksum) are not errors here;
/// they are reported in [`DecodedFrame::error`](crate::DecodedFrame::error).
#[derive(Debug, PartialEq, Eq)]
pub enum DhtError<E> {
    /// A call to the GPIO daemon failed.
    Transport(E),
    /// `start_session` was called on a session that is already running.
    SessionActive,
    /// A read was requested without a running session.
    SessionClosed,
}

impl<E> From<E> for DhtError<E> {
    fn from(value: E) -> Self {
        Self::Transport(value)
    }
}
