//! Adapter utilities for the `feedwindow` crate.
//!
//! The `feedwindow` crate is UI-agnostic and synchronous: it computes windows, admits fetches and
//! records events, but never awaits anything. This crate provides the pieces an adapter usually
//! needs on top of that:
//!
//! - a [`FeedController`] that owns a feed session and drives a
//!   [`feedwindow::PageSource`] asynchronously (with an optional fetch timeout)
//! - mount/unmount cycles that preserve the scroll position
//! - a channel-backed [`ChannelSink`] for forwarding analytics events off the UI path
//!
//! This crate is framework-agnostic (no DOM or widget bindings).
#![forbid(unsafe_code)]

#[macro_use]
mod macros;

mod controller;
mod sink;

#[cfg(test)]
mod tests;

pub use controller::{CARD_ELEMENT_ID, FeedController, FeedRow};
pub use sink::{ChannelSink, forward_events};
