use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::key::{KeyMap, KeySet};
use crate::{AbVariant, FeedOptions, FeedPhase, FeedSnapshot, FetchError, Item, Page};

/// Proof that a fetch was admitted.
///
/// Handed out by [`FeedStore::begin_fetch`] and handed back with the response to
/// [`FeedStore::resolve`]. The ticket remembers the session it was issued in, so a response that
/// outlives a [`FeedStore::reset`] is recognized as stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchTicket {
    page: u32,
    session: u64,
}

impl FetchTicket {
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn session(&self) -> u64 {
        self.session
    }
}

/// What [`FeedStore::resolve`] did with a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolveOutcome {
    Applied { appended: usize, duplicates: usize },
    Failed,
    /// The response no longer matched the store and was dropped.
    Stale,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected,
    AlreadyConnected,
    NotFound,
}

/// The single owner of feed data and pagination state.
///
/// Items are append-only and unique by id. Mutation happens only through the transitions below:
///
/// - `Idle --begin_fetch--> Loading`
/// - `Loading --resolve(Ok)--> Idle`
/// - `Loading --resolve(Err)--> Errored`
/// - `Errored --begin_fetch--> Loading` (clears the error)
///
/// At most one fetch is in flight at any time, including across [`FeedStore::reset`].
#[derive(Clone, Debug)]
pub struct FeedStore {
    page_size: u32,
    page_ceiling: Option<u32>,

    items: Vec<Item>,
    index_by_id: KeyMap<String, usize>,
    exposed: KeySet<String>,

    in_flight: Option<FetchTicket>,
    error: Option<String>,
    next_page: u32,
    has_more: bool,
    scroll_offset: u64,
    session: u64,
    variant: AbVariant,
}

impl FeedStore {
    pub fn new(options: &FeedOptions) -> Self {
        Self {
            page_size: options.page_size,
            page_ceiling: options.page_ceiling,
            items: Vec::new(),
            index_by_id: KeyMap::new(),
            exposed: KeySet::new(),
            in_flight: None,
            error: None,
            next_page: 1,
            has_more: true,
            scroll_offset: 0,
            session: 0,
            variant: AbVariant::default(),
        }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Item> {
        self.index_of(id).map(|i| &self.items[i])
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn next_page(&self) -> u32 {
        self.next_page
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn scroll_offset(&self) -> u64 {
        self.scroll_offset
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    pub fn variant(&self) -> AbVariant {
        self.variant
    }

    pub fn set_variant(&mut self, variant: AbVariant) {
        self.variant = variant;
    }

    pub fn phase(&self) -> FeedPhase {
        self.snapshot().phase()
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        FeedSnapshot {
            len: self.items.len(),
            loading: self.is_loading(),
            error: self.error.clone(),
            next_page: self.next_page,
            has_more: self.has_more,
            scroll_offset: self.scroll_offset,
        }
    }

    /// Admits a fetch for `page`, moving the store into `Loading`.
    ///
    /// Returns `None` if a fetch is already in flight, the feed is exhausted, or `page` is not the
    /// page the store expects next.
    pub fn begin_fetch(&mut self, page: u32) -> Option<FetchTicket> {
        if self.in_flight.is_some() || !self.has_more || page != self.next_page {
            ftrace!(
                page,
                loading = self.in_flight.is_some(),
                has_more = self.has_more,
                "FeedStore::begin_fetch rejected"
            );
            return None;
        }
        let ticket = FetchTicket {
            page,
            session: self.session,
        };
        self.in_flight = Some(ticket);
        self.error = None;
        fdebug!(page, session = self.session, "FeedStore::begin_fetch");
        Some(ticket)
    }

    /// Applies the response for an admitted fetch.
    ///
    /// A response is applied only if its ticket is the one in flight, it belongs to the current
    /// session, and its page is still the expected next page. Anything else is dropped silently.
    /// Items whose id is already present are skipped.
    pub fn resolve(
        &mut self,
        ticket: FetchTicket,
        result: Result<Page, FetchError>,
    ) -> ResolveOutcome {
        let was_in_flight = self.in_flight == Some(ticket);
        if was_in_flight {
            self.in_flight = None;
        }
        if !was_in_flight || ticket.session != self.session || ticket.page != self.next_page {
            fdebug!(
                page = ticket.page,
                session = ticket.session,
                current_session = self.session,
                "FeedStore::resolve dropped stale response"
            );
            return ResolveOutcome::Stale;
        }

        let page = match result {
            Ok(page) => page,
            Err(err) => {
                fwarn!(page = ticket.page, error = %err, "page fetch failed");
                self.error = Some(err.to_string());
                return ResolveOutcome::Failed;
            }
        };

        let exhausted = page.is_last || page.items.is_empty();
        let mut appended = 0usize;
        let mut duplicates = 0usize;
        for item in page.items {
            if self.index_by_id.contains_key(item.id.as_str()) {
                fdebug!(id = %item.id, page = ticket.page, "dropping duplicate item");
                duplicates += 1;
                continue;
            }
            self.index_by_id.insert(item.id.clone(), self.items.len());
            self.items.push(item);
            appended += 1;
        }

        self.next_page = self.next_page.saturating_add(1);
        if exhausted || self.page_ceiling.is_some_and(|ceiling| self.next_page > ceiling) {
            self.has_more = false;
        }
        fdebug!(
            page = ticket.page,
            appended,
            duplicates,
            has_more = self.has_more,
            "FeedStore::resolve applied"
        );
        ResolveOutcome::Applied {
            appended,
            duplicates,
        }
    }

    /// Marks an item as connected. Connecting twice is a no-op.
    pub fn connect(&mut self, id: &str) -> ConnectOutcome {
        let Some(index) = self.index_of(id) else {
            return ConnectOutcome::NotFound;
        };
        let item = &mut self.items[index];
        if item.connected {
            return ConnectOutcome::AlreadyConnected;
        }
        item.connected = true;
        ConnectOutcome::Connected
    }

    /// Stores the last known scroll offset for restoration after remount.
    pub fn set_scroll_offset(&mut self, offset: u64) {
        self.scroll_offset = offset;
    }

    /// Records the first exposure of `id` in this session.
    ///
    /// Returns `true` only the first time; later calls for the same id return `false`.
    pub fn mark_exposed(&mut self, id: &str) -> bool {
        if self.exposed.contains(id) {
            return false;
        }
        self.exposed.insert(id.to_string());
        true
    }

    pub fn is_exposed(&self, id: &str) -> bool {
        self.exposed.contains(id)
    }

    /// Starts a new session: drops items, exposure history, error and scroll position.
    ///
    /// A fetch that is still in flight stays in flight (no second fetch is admitted until it
    /// resolves), but its response will be discarded as stale.
    pub fn reset(&mut self) {
        self.items.clear();
        self.index_by_id.clear();
        self.exposed.clear();
        self.error = None;
        self.next_page = 1;
        self.has_more = true;
        self.scroll_offset = 0;
        self.session = self.session.wrapping_add(1);
        fdebug!(session = self.session, "FeedStore::reset");
    }
}
