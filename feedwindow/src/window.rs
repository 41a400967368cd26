use core::cmp;

use crate::{FeedOptions, FeedSnapshot, LoadDecision, ScrollDirection, ScrollState, Window};

/// Computes the rendered window for a fixed-extent list.
///
/// `visible_start = scroll_offset / item_extent` and
/// `visible_end = visible_start + ceil(viewport_extent / item_extent)`, then `overscan` rows are
/// added on each side. Every index is clamped to `[0, total_count - 1]`.
///
/// Returns `None` when there is nothing to render (`total_count == 0`) or the geometry is
/// degenerate (`item_extent == 0`).
pub fn compute_window(
    scroll_offset: u64,
    viewport_extent: u32,
    item_extent: u32,
    total_count: usize,
    overscan: usize,
) -> Option<Window> {
    if total_count == 0 || item_extent == 0 {
        return None;
    }
    let last = total_count - 1;
    let extent = item_extent as u64;

    let start = scroll_offset / extent;
    let span = (viewport_extent as u64).div_ceil(extent);
    let end = start.saturating_add(span);

    let visible_start = clamp_index(start, last);
    let visible_end = clamp_index(end, last);
    Some(Window {
        visible_start,
        visible_end,
        overscan_start: visible_start.saturating_sub(overscan),
        overscan_end: cmp::min(visible_end.saturating_add(overscan), last),
    })
}

fn clamp_index(index: u64, last: usize) -> usize {
    usize::try_from(index).map_or(last, |i| cmp::min(i, last))
}

/// Decides whether the next page should be requested.
///
/// This is the only admission point for fetches. It yields `Fetch(next_page)` iff no fetch is in
/// flight, more pages exist, and either nothing is loaded yet (`window == None`) or the window's
/// trailing edge is within `load_ahead_threshold` rows of the end of loaded data.
pub fn maybe_load_more(
    window: Option<&Window>,
    state: &FeedSnapshot,
    load_ahead_threshold: usize,
) -> LoadDecision {
    if state.loading || !state.has_more {
        return LoadDecision::None;
    }
    let near_end = match window {
        Some(w) => w.overscan_end >= state.len.saturating_sub(load_ahead_threshold),
        None => state.len == 0,
    };
    if near_end {
        LoadDecision::Fetch(state.next_page)
    } else {
        LoadDecision::None
    }
}

/// Scroll geometry for a fixed-extent feed.
///
/// Holds the only mutable inputs of the window computation (scroll offset and viewport extent).
/// It never touches feed data: the row count is passed in on every query.
#[derive(Clone, Debug)]
pub struct WindowManager {
    item_extent: u32,
    viewport_extent: u32,
    overscan: usize,
    load_ahead_threshold: usize,
    scroll_offset: u64,
    scroll_direction: Option<ScrollDirection>,
}

impl WindowManager {
    pub fn new(options: &FeedOptions) -> Self {
        fdebug!(
            item_extent = options.item_extent,
            viewport_extent = options.viewport_extent,
            overscan = options.overscan,
            "WindowManager::new"
        );
        Self {
            item_extent: options.item_extent,
            viewport_extent: options.viewport_extent,
            overscan: options.overscan,
            load_ahead_threshold: options.load_ahead_threshold,
            scroll_offset: 0,
            scroll_direction: None,
        }
    }

    pub fn item_extent(&self) -> u32 {
        self.item_extent
    }

    pub fn viewport_extent(&self) -> u32 {
        self.viewport_extent
    }

    pub fn overscan(&self) -> usize {
        self.overscan
    }

    pub fn scroll_offset(&self) -> u64 {
        self.scroll_offset
    }

    pub fn scroll_direction(&self) -> Option<ScrollDirection> {
        self.scroll_direction
    }

    pub fn set_viewport_extent(&mut self, viewport_extent: u32) {
        self.viewport_extent = viewport_extent;
    }

    pub fn set_overscan(&mut self, overscan: usize) {
        self.overscan = overscan;
    }

    pub fn set_scroll_offset(&mut self, offset: u64) {
        if self.scroll_offset == offset {
            return;
        }
        let prev = self.scroll_offset;
        self.scroll_offset = offset;
        self.scroll_direction = match offset.cmp(&prev) {
            cmp::Ordering::Greater => Some(ScrollDirection::Forward),
            cmp::Ordering::Less => Some(ScrollDirection::Backward),
            cmp::Ordering::Equal => self.scroll_direction,
        };
        ftrace!(offset, "WindowManager::set_scroll_offset");
    }

    pub fn total_size(&self, row_count: usize) -> u64 {
        (row_count as u64).saturating_mul(self.item_extent as u64)
    }

    pub fn max_scroll_offset(&self, row_count: usize) -> u64 {
        self.total_size(row_count)
            .saturating_sub(self.viewport_extent as u64)
    }

    pub fn clamp_scroll_offset(&self, offset: u64, row_count: usize) -> u64 {
        cmp::min(offset, self.max_scroll_offset(row_count))
    }

    /// Start offset of the row at `index` in the scroll axis.
    pub fn row_start(&self, index: usize) -> u64 {
        (index as u64).saturating_mul(self.item_extent as u64)
    }

    pub fn window(&self, row_count: usize) -> Option<Window> {
        compute_window(
            self.scroll_offset,
            self.viewport_extent,
            self.item_extent,
            row_count,
            self.overscan,
        )
    }

    /// Runs the load-more admission check against the window over the *loaded* items.
    pub fn load_decision(&self, state: &FeedSnapshot) -> LoadDecision {
        let window = self.window(state.len);
        maybe_load_more(window.as_ref(), state, self.load_ahead_threshold)
    }

    pub fn scroll_state(&self) -> ScrollState {
        ScrollState {
            offset: self.scroll_offset,
            direction: self.scroll_direction,
        }
    }

    /// Restores a previously captured offset without recording a scroll direction.
    pub fn restore_scroll_state(&mut self, scroll: ScrollState) {
        self.scroll_offset = scroll.offset;
        self.scroll_direction = None;
    }
}
