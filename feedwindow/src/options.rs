use crate::ConfigError;

/// Configuration for a feed session.
///
/// Extents are in pixels along the scroll axis, counts are in items. All fields have the
/// defaults a 600px card feed with 200px cards would use.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeedOptions {
    /// Fixed size of every row in the scroll axis.
    pub item_extent: u32,
    /// Size of the viewport in the scroll axis.
    pub viewport_extent: u32,
    /// Size of rows and viewport in the cross axis. Only used for visibility geometry.
    pub cross_extent: u32,
    /// Extra rows materialized on each side of the visible range.
    pub overscan: usize,
    /// How close (in rows) the overscanned window may get to the end of loaded data before the
    /// next page is requested.
    pub load_ahead_threshold: usize,
    /// Minimum spacing between forwarded scroll events.
    pub scroll_throttle_ms: u64,
    /// Fraction of a row's area that must intersect the viewport for it to count as in view.
    pub visibility_threshold: f32,
    pub page_size: u32,
    /// Last page that may be fetched. `None` relies on the source's last-page signal only.
    pub page_ceiling: Option<u32>,
    /// Upper bound on a single page fetch. Enforced by the async driver, not the core.
    pub fetch_timeout_ms: Option<u64>,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            item_extent: 200,
            viewport_extent: 600,
            cross_extent: 0,
            overscan: 3,
            load_ahead_threshold: 5,
            scroll_throttle_ms: 200,
            visibility_threshold: 0.5,
            page_size: 10,
            page_ceiling: Some(5),
            fetch_timeout_ms: None,
        }
    }
}

impl FeedOptions {
    pub fn new(item_extent: u32, viewport_extent: u32) -> Self {
        Self {
            item_extent,
            viewport_extent,
            ..Self::default()
        }
    }

    pub fn with_cross_extent(mut self, cross_extent: u32) -> Self {
        self.cross_extent = cross_extent;
        self
    }

    pub fn with_overscan(mut self, overscan: usize) -> Self {
        self.overscan = overscan;
        self
    }

    pub fn with_load_ahead_threshold(mut self, threshold: usize) -> Self {
        self.load_ahead_threshold = threshold;
        self
    }

    pub fn with_scroll_throttle_ms(mut self, interval_ms: u64) -> Self {
        self.scroll_throttle_ms = interval_ms;
        self
    }

    pub fn with_visibility_threshold(mut self, threshold: f32) -> Self {
        self.visibility_threshold = threshold;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_page_ceiling(mut self, page_ceiling: Option<u32>) -> Self {
        self.page_ceiling = page_ceiling;
        self
    }

    pub fn with_fetch_timeout_ms(mut self, timeout_ms: Option<u64>) -> Self {
        self.fetch_timeout_ms = timeout_ms;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.item_extent == 0 {
            return Err(ConfigError::ZeroItemExtent);
        }
        if self.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        if self.page_ceiling == Some(0) {
            return Err(ConfigError::ZeroPageCeiling);
        }
        if !(0.0..=1.0).contains(&self.visibility_threshold) {
            return Err(ConfigError::InvalidThreshold(self.visibility_threshold));
        }
        Ok(())
    }

    /// 1-based page an item at `index` was delivered in.
    pub fn page_of(&self, index: usize) -> u32 {
        let size = self.page_size.max(1) as usize;
        (index / size) as u32 + 1
    }
}
