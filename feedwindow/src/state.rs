use alloc::string::String;

use crate::ScrollDirection;

/// A lightweight, serializable snapshot of the scroll position.
///
/// With `feature = "serde"`, this type implements `Serialize`/`Deserialize`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScrollState {
    pub offset: u64,
    pub direction: Option<ScrollDirection>,
}

/// Where the feed store is in its fetch lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FeedPhase {
    Idle,
    Loading,
    Errored,
}

/// Read-only view of the feed store for the window manager and the presentation layer.
///
/// This is what a renderer needs besides the items themselves: loading and error indicators,
/// whether an end-of-feed marker should be shown, and where to restore the scroll position.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeedSnapshot {
    pub len: usize,
    pub loading: bool,
    pub error: Option<String>,
    pub next_page: u32,
    pub has_more: bool,
    pub scroll_offset: u64,
}

impl FeedSnapshot {
    pub fn phase(&self) -> FeedPhase {
        if self.loading {
            FeedPhase::Loading
        } else if self.error.is_some() {
            FeedPhase::Errored
        } else {
            FeedPhase::Idle
        }
    }

    /// Rows to lay out: loaded items plus a trailing placeholder while more pages exist.
    pub fn row_count(&self) -> usize {
        self.len + usize::from(self.has_more)
    }
}
