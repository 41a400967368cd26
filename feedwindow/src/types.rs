use alloc::string::String;
use alloc::vec::Vec;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Education {
    pub school: String,
    pub degree: Option<String>,
    pub major: Option<String>,
    pub year: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Experience {
    pub company: String,
    pub title: String,
    pub duration: Option<String>,
}

/// A profile card in the feed.
///
/// Everything except `connected` is fixed at fetch time. `id` is unique across a session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Item {
    pub id: String,
    pub name: String,
    pub avatar_url: String,
    pub title: String,
    pub company: String,
    pub industry: String,
    pub mutual_count: u32,
    pub distance_label: Option<String>,
    pub tags: Vec<String>,
    pub connected: bool,
    pub education: Vec<Education>,
    pub experience: Vec<Experience>,
}

impl Item {
    /// Creates an item with the given id and empty profile attributes.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_connected(mut self, connected: bool) -> Self {
        self.connected = connected;
        self
    }
}

/// The experiment arm a feed session is rendered under.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AbVariant {
    #[default]
    Control,
    VariantA,
    VariantB,
}

impl AbVariant {
    /// Picks a variant uniformly from a caller-supplied seed.
    pub fn from_seed(seed: u64) -> Self {
        match seed % 3 {
            0 => Self::Control,
            1 => Self::VariantA,
            _ => Self::VariantB,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Control => "control",
            Self::VariantA => "variant_a",
            Self::VariantB => "variant_b",
        }
    }
}

/// The rendered index range, derived from scroll geometry.
///
/// All four indexes are inclusive and lie in `[0, total_count - 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Window {
    pub visible_start: usize,
    pub visible_end: usize,
    pub overscan_start: usize,
    pub overscan_end: usize,
}

impl Window {
    pub fn visible(&self) -> core::ops::RangeInclusive<usize> {
        self.visible_start..=self.visible_end
    }

    pub fn overscanned(&self) -> core::ops::RangeInclusive<usize> {
        self.overscan_start..=self.overscan_end
    }

    /// Number of rows to materialize (visible + overscan). Never zero.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.overscan_end - self.overscan_start + 1
    }

    pub fn contains(&self, index: usize) -> bool {
        self.overscanned().contains(&index)
    }
}

/// Result of the load-more admission check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadDecision {
    Fetch(u32),
    None,
}

impl LoadDecision {
    pub fn page(self) -> Option<u32> {
        match self {
            Self::Fetch(page) => Some(page),
            Self::None => None,
        }
    }
}

/// An axis-aligned rectangle in content coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bounds {
    pub x: u64,
    pub y: u64,
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    pub fn new(x: u64, y: u64, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> u64 {
        self.x.saturating_add(self.width as u64)
    }

    pub fn bottom(&self) -> u64 {
        self.y.saturating_add(self.height as u64)
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Area of the overlap with `other`; zero when they only touch or are disjoint.
    pub fn intersection_area(&self, other: &Bounds) -> u64 {
        let left = self.x.max(other.x);
        let right = self.right().min(other.right());
        let top = self.y.max(other.y);
        let bottom = self.bottom().min(other.bottom());
        if right <= left || bottom <= top {
            return 0;
        }
        (right - left).saturating_mul(bottom - top)
    }

    pub fn contains_point(&self, x: u64, y: u64) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScrollDirection {
    Forward,
    Backward,
}
