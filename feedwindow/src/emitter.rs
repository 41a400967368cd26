use alloc::string::String;
use alloc::vec::Vec;

use crate::{AbVariant, SinkError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TrackEventKind {
    View,
    Click,
    Connect,
    Scroll,
    AbImpression,
}

/// Event data. Which fields are set depends on the event kind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EventPayload {
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub item_id: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub page: Option<u32>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub element_id: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub position: Option<u64>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub variant: Option<AbVariant>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackEvent {
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: TrackEventKind,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub payload: EventPayload,
}

/// Where emitted events are forwarded.
///
/// Delivery is best-effort: errors are logged and dropped by the [`Emitter`], never retried.
pub trait EventSink {
    fn deliver(&mut self, event: &TrackEvent) -> Result<(), SinkError>;
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn deliver(&mut self, _event: &TrackEvent) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Keeps delivered events in memory. Can be switched into a failing mode.
#[derive(Clone, Debug, Default)]
pub struct VecSink {
    pub events: Vec<TrackEvent>,
    pub fail: bool,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            events: Vec::new(),
            fail: true,
        }
    }
}

impl EventSink for VecSink {
    fn deliver(&mut self, event: &TrackEvent) -> Result<(), SinkError> {
        if self.fail {
            return Err(SinkError::Closed);
        }
        self.events.push(event.clone());
        Ok(())
    }
}

/// Leading-edge throttle: the first call in a burst passes, later calls within `interval_ms`
/// are dropped.
#[derive(Clone, Copy, Debug)]
pub struct Throttle {
    interval_ms: u64,
    last_ms: Option<u64>,
}

impl Throttle {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_ms: None,
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn admit(&mut self, now_ms: u64) -> bool {
        if let Some(last) = self.last_ms {
            if now_ms.saturating_sub(last) < self.interval_ms {
                return false;
            }
        }
        self.last_ms = Some(now_ms);
        true
    }

    pub fn reset(&mut self) {
        self.last_ms = None;
    }
}

/// Turns feed signals into timestamped events.
///
/// Every emitted event is appended to an in-memory log and forwarded to the sink. Scroll events
/// go through a [`Throttle`] first; dropped scroll events are neither logged nor forwarded.
#[derive(Clone, Debug)]
pub struct Emitter<S> {
    sink: S,
    log: Vec<TrackEvent>,
    scroll_throttle: Throttle,
    delivery_failures: u64,
}

impl<S: EventSink> Emitter<S> {
    pub fn new(sink: S, scroll_throttle_ms: u64) -> Self {
        Self {
            sink,
            log: Vec::new(),
            scroll_throttle: Throttle::new(scroll_throttle_ms),
            delivery_failures: 0,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Events emitted since the last [`Self::drain_log`], in emission order.
    pub fn log(&self) -> &[TrackEvent] {
        &self.log
    }

    /// Takes the in-memory log, leaving it empty. Long-lived hosts call this periodically; the
    /// sink has already seen every drained event.
    pub fn drain_log(&mut self) -> Vec<TrackEvent> {
        core::mem::take(&mut self.log)
    }

    pub fn count(&self, kind: TrackEventKind) -> usize {
        self.log.iter().filter(|e| e.kind == kind).count()
    }

    /// Number of events the sink refused. Only useful for diagnostics.
    pub fn delivery_failures(&self) -> u64 {
        self.delivery_failures
    }

    pub fn emit(&mut self, event: TrackEvent) {
        ftrace!(kind = ?event.kind, timestamp = event.timestamp, "emit");
        if let Err(_err) = self.sink.deliver(&event) {
            fwarn!(kind = ?event.kind, error = %_err, "event delivery failed");
            self.delivery_failures = self.delivery_failures.saturating_add(1);
        }
        self.log.push(event);
    }

    fn emit_with(&mut self, kind: TrackEventKind, now_ms: u64, payload: EventPayload) {
        self.emit(TrackEvent {
            kind,
            timestamp: now_ms,
            payload,
        });
    }

    pub fn track_view(&mut self, now_ms: u64, item_id: &str, page: u32, variant: AbVariant) {
        self.emit_with(
            TrackEventKind::View,
            now_ms,
            EventPayload {
                item_id: Some(item_id.into()),
                page: Some(page),
                variant: Some(variant),
                ..EventPayload::default()
            },
        );
    }

    pub fn track_click(
        &mut self,
        now_ms: u64,
        element_id: &str,
        item_id: Option<&str>,
        page: Option<u32>,
    ) {
        self.emit_with(
            TrackEventKind::Click,
            now_ms,
            EventPayload {
                item_id: item_id.map(Into::into),
                page,
                element_id: Some(element_id.into()),
                ..EventPayload::default()
            },
        );
    }

    pub fn track_connect(&mut self, now_ms: u64, item_id: &str, page: u32) {
        self.emit_with(
            TrackEventKind::Connect,
            now_ms,
            EventPayload {
                item_id: Some(item_id.into()),
                page: Some(page),
                ..EventPayload::default()
            },
        );
    }

    /// Emits a scroll event unless one was emitted less than the throttle interval ago.
    ///
    /// Returns whether the event was emitted.
    pub fn track_scroll(&mut self, now_ms: u64, position: u64, page: u32) -> bool {
        if !self.scroll_throttle.admit(now_ms) {
            ftrace!(position, now_ms, "scroll event throttled");
            return false;
        }
        self.emit_with(
            TrackEventKind::Scroll,
            now_ms,
            EventPayload {
                page: Some(page),
                position: Some(position),
                ..EventPayload::default()
            },
        );
        true
    }

    pub fn track_ab_impression(&mut self, now_ms: u64, variant: AbVariant, item_id: Option<&str>) {
        self.emit_with(
            TrackEventKind::AbImpression,
            now_ms,
            EventPayload {
                item_id: item_id.map(Into::into),
                variant: Some(variant),
                ..EventPayload::default()
            },
        );
    }
}
