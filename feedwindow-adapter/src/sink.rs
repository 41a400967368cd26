use std::future::Future;

use feedwindow::{EventSink, SinkError, TrackEvent};
use tokio::sync::mpsc;

/// An [`EventSink`] that hands events to an async consumer over an unbounded channel.
///
/// `deliver` never blocks. Once the receiving side is gone, delivery fails with
/// [`SinkError::Closed`], which the emitter swallows.
#[derive(Clone, Debug)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<TrackEvent>,
}

impl ChannelSink {
    /// Creates a sink and the receiver its events arrive on.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TrackEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl EventSink for ChannelSink {
    fn deliver(&mut self, event: &TrackEvent) -> Result<(), SinkError> {
        self.tx.send(event.clone()).map_err(|_| SinkError::Closed)
    }
}

/// Drains `rx` into an external transport until every sender is dropped.
///
/// Failed deliveries are logged and dropped, never retried. Returns the number of events the
/// transport accepted.
pub async fn forward_events<F, Fut>(
    mut rx: mpsc::UnboundedReceiver<TrackEvent>,
    mut deliver: F,
) -> usize
where
    F: FnMut(TrackEvent) -> Fut,
    Fut: Future<Output = Result<(), SinkError>>,
{
    let mut delivered = 0usize;
    while let Some(event) = rx.recv().await {
        match deliver(event).await {
            Ok(()) => delivered += 1,
            Err(_err) => {
                awarn!(error = %_err, "dropping analytics event");
            }
        }
    }
    adebug!(delivered, "event forwarding finished");
    delivered
}
