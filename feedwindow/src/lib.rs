//! A headless windowing and incremental-loading engine for paginated feeds.
//!
//! This crate decides which slice of a growing, page-by-page fetched list has to be materialized
//! at any moment, and keeps everything around that decision consistent:
//!
//! - fixed-extent window math with symmetric overscan ([`compute_window`])
//! - a single admission point for page fetches ([`maybe_load_more`]) backed by a store that
//!   allows at most one fetch in flight and discards stale responses ([`FeedStore`])
//! - per-item visibility signals ([`VisibilityObserver`]) and once-per-session exposure events
//!   ([`Emitter`])
//!
//! It is UI-agnostic and performs no I/O. An adapter is expected to provide:
//! - viewport size and scroll offset
//! - a [`PageSource`] implementation and something to await its futures
//! - wall-clock time (`now_ms`) for events and throttling
//!
//! For a ready-made driver, see the `feedwindow-adapter` crate.
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

#[cfg(test)]
extern crate std;

#[macro_use]
mod macros;

mod emitter;
mod error;
mod key;
mod options;
mod source;
mod state;
mod store;
mod types;
mod visibility;
mod window;


pub use emitter::{
    Emitter, EventPayload, EventSink, NullSink, Throttle, TrackEvent, TrackEventKind, VecSink,
};
pub use error::{ConfigError, FetchError, SinkError};
pub use options::FeedOptions;
pub use source::{Page, PageSource};
pub use state::{FeedPhase, FeedSnapshot, ScrollState};
pub use store::{ConnectOutcome, FeedStore, FetchTicket, ResolveOutcome};
pub use types::{
    AbVariant, Bounds, Education, Experience, Item, LoadDecision, ScrollDirection, Window,
};
pub use visibility::{
    GeometryObserver, ManualObserver, Transition, Transitions, VisibilityObserver, is_in_view,
};
pub use window::{WindowManager, compute_window, maybe_load_more};
