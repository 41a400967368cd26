use alloc::vec::Vec;
use core::future::Future;

use crate::{FetchError, Item};

/// One page of items as delivered by a [`PageSource`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Page {
    pub items: Vec<Item>,
    /// Set by the source when no page follows this one.
    pub is_last: bool,
}

impl Page {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items,
            is_last: false,
        }
    }

    pub fn last(items: Vec<Item>) -> Self {
        Self {
            items,
            is_last: true,
        }
    }
}

/// A remote collection that can be fetched page by page.
///
/// `page` is 1-based. Implementations perform I/O only: they never touch feed state, and they do
/// not need to support cancellation. Responses that arrive after the feed moved on are discarded
/// by [`crate::FeedStore::resolve`].
pub trait PageSource {
    fn fetch_page(
        &self,
        page: u32,
        page_size: u32,
    ) -> impl Future<Output = Result<Page, FetchError>>;
}

impl<S: PageSource + ?Sized> PageSource for &S {
    fn fetch_page(
        &self,
        page: u32,
        page_size: u32,
    ) -> impl Future<Output = Result<Page, FetchError>> {
        (**self).fetch_page(page, page_size)
    }
}
