use std::collections::HashSet;
use std::time::Duration;

use feedwindow::{
    AbVariant, Bounds, ConfigError, ConnectOutcome, Emitter, EventSink, FeedOptions, FeedSnapshot,
    FeedStore, FetchError, FetchTicket, Item, LoadDecision, Page, PageSource, ResolveOutcome,
    TrackEvent, VisibilityObserver, Window, WindowManager,
};

/// Element id reported for clicks on a feed card.
pub const CARD_ELEMENT_ID: &str = "contact_card";

/// One row of the rendered window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedRow<'a> {
    Item { index: usize, item: &'a Item },
    /// Trailing row shown while more pages may follow.
    Placeholder { index: usize },
}

/// A framework-neutral controller that wires a feed session together.
///
/// It owns the [`FeedStore`] for as long as the feed is mounted and routes every mutation through
/// it. Adapters drive it by calling:
/// - `on_scroll` / `on_viewport_extent` when UI events occur
/// - `load_more` (or `poll_load` + `resolve`) whenever `load_decision` asks for a page
/// - `connect` / `click` for user actions
///
/// Rendering reads `rows()` and `snapshot()`; per-item exposure flags come from `is_in_view`.
#[derive(Debug)]
pub struct FeedController<P, O, S> {
    options: FeedOptions,
    source: P,
    store: FeedStore,
    window: WindowManager,
    observer: O,
    emitter: Emitter<S>,
    rendered: Vec<String>,
    in_view: HashSet<String>,
}

impl<P, O, S> FeedController<P, O, S>
where
    P: PageSource,
    O: VisibilityObserver<String>,
    S: EventSink,
{
    /// Creates a controller for a fresh session.
    pub fn new(options: FeedOptions, source: P, observer: O, sink: S) -> Result<Self, ConfigError> {
        let store = FeedStore::new(&options);
        Self::with_store(options, source, observer, sink, store)
    }

    /// Creates a controller around an existing session, e.g. one returned by `unmount`.
    pub fn with_store(
        options: FeedOptions,
        source: P,
        observer: O,
        sink: S,
        store: FeedStore,
    ) -> Result<Self, ConfigError> {
        options.validate()?;
        Ok(Self {
            window: WindowManager::new(&options),
            emitter: Emitter::new(sink, options.scroll_throttle_ms),
            options,
            source,
            store,
            observer,
            rendered: Vec::new(),
            in_view: HashSet::new(),
        })
    }

    pub fn options(&self) -> &FeedOptions {
        &self.options
    }

    pub fn store(&self) -> &FeedStore {
        &self.store
    }

    pub fn emitter(&self) -> &Emitter<S> {
        &self.emitter
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Direct access to the observer, e.g. to feed it host intersection signals. Call
    /// [`Self::sync`] afterwards to process them.
    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    pub fn window_manager(&self) -> &WindowManager {
        &self.window
    }

    pub fn source(&self) -> &P {
        &self.source
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        self.store.snapshot()
    }

    /// Sets the session's A/B arm, e.g. `AbVariant::from_seed(user_seed)`. Call before `mount`
    /// so the impression carries it.
    pub fn set_variant(&mut self, variant: AbVariant) {
        self.store.set_variant(variant);
    }

    /// Takes the emitted events kept in memory. See [`Emitter::drain_log`].
    pub fn drain_events(&mut self) -> Vec<TrackEvent> {
        self.emitter.drain_log()
    }

    /// Restores the saved scroll position, re-attaches visibility tracking and records the
    /// session's A/B impression.
    pub fn mount(&mut self, now_ms: u64) {
        let offset = self.store.scroll_offset();
        self.window.restore_scroll_state(feedwindow::ScrollState {
            offset,
            direction: None,
        });
        adebug!(offset, session = self.store.session(), "FeedController::mount");
        self.emitter
            .track_ab_impression(now_ms, self.store.variant(), None);
        self.sync(now_ms);
    }

    /// Detaches visibility tracking and hands the session back for a later `mount`.
    pub fn unmount(mut self) -> FeedStore {
        self.detach_all();
        self.store.set_scroll_offset(self.window.scroll_offset());
        self.store
    }

    /// The current window over all rows (loaded items plus placeholder).
    pub fn window(&self) -> Option<Window> {
        self.window.window(self.store.snapshot().row_count())
    }

    pub fn rows(&self) -> Vec<FeedRow<'_>> {
        let Some(window) = self.window() else {
            return Vec::new();
        };
        let items = self.store.items();
        window
            .overscanned()
            .map(|index| match items.get(index) {
                Some(item) => FeedRow::Item { index, item },
                None => FeedRow::Placeholder { index },
            })
            .collect()
    }

    /// Loaded items inside the rendered window, in feed order.
    pub fn visible_items(&self) -> Vec<&Item> {
        self.rows()
            .into_iter()
            .filter_map(|row| match row {
                FeedRow::Item { item, .. } => Some(item),
                FeedRow::Placeholder { .. } => None,
            })
            .collect()
    }

    pub fn is_in_view(&self, id: &str) -> bool {
        self.in_view.contains(id)
    }

    pub fn on_viewport_extent(&mut self, extent: u32, now_ms: u64) -> LoadDecision {
        self.window.set_viewport_extent(extent);
        self.sync(now_ms);
        self.load_decision()
    }

    /// Call this when the UI reports a scroll offset change.
    ///
    /// Returns whether a page should be loaded now.
    pub fn on_scroll(&mut self, offset: u64, now_ms: u64) -> LoadDecision {
        self.window.set_scroll_offset(offset);
        self.store.set_scroll_offset(offset);
        let first = self.window().map_or(0, |w| w.visible_start);
        self.emitter
            .track_scroll(now_ms, offset, self.options.page_of(first));
        self.sync(now_ms);
        self.load_decision()
    }

    pub fn load_decision(&self) -> LoadDecision {
        self.window.load_decision(&self.store.snapshot())
    }

    /// Admits the next fetch if the window asks for one.
    ///
    /// Use this together with [`Self::resolve`] when the fetch is awaited outside the
    /// controller.
    pub fn poll_load(&mut self) -> Option<FetchTicket> {
        let page = self.load_decision().page()?;
        self.store.begin_fetch(page)
    }

    /// Applies a fetch result and refreshes the rendered window.
    pub fn resolve(
        &mut self,
        ticket: FetchTicket,
        result: Result<Page, FetchError>,
        now_ms: u64,
    ) -> ResolveOutcome {
        let outcome = self.store.resolve(ticket, result);
        self.sync(now_ms);
        outcome
    }

    /// Fetches the next page if the window asks for one.
    ///
    /// Returns `None` when no fetch was admitted. Dropping the future before it completes
    /// resolves the fetch as [`FetchError::Cancelled`].
    pub async fn load_more(&mut self, now_ms: u64) -> Option<ResolveOutcome> {
        let ticket = self.poll_load()?;
        Some(self.run(ticket, now_ms).await)
    }

    /// Fetches the next page regardless of scroll position (manual retry).
    ///
    /// Still refused while a fetch is in flight or once the feed is exhausted.
    pub async fn retry(&mut self, now_ms: u64) -> Option<ResolveOutcome> {
        let ticket = self.store.begin_fetch(self.store.next_page())?;
        Some(self.run(ticket, now_ms).await)
    }

    async fn run(&mut self, ticket: FetchTicket, now_ms: u64) -> ResolveOutcome {
        let guard = AbandonOnDrop::new(&mut self.store, ticket);
        let result = fetch(&self.source, &self.options, ticket.page()).await;
        let ticket = guard.disarm();
        self.resolve(ticket, result, now_ms)
    }

    /// Marks an item as connected and records a `connect` event the first time.
    pub fn connect(&mut self, id: &str, now_ms: u64) -> ConnectOutcome {
        let outcome = self.store.connect(id);
        if outcome == ConnectOutcome::Connected {
            let page = self.page_of_id(id);
            self.emitter.track_connect(now_ms, id, page);
        }
        outcome
    }

    /// Records a click on a card. Unknown ids are ignored.
    pub fn click(&mut self, id: &str, now_ms: u64) -> bool {
        if self.store.index_of(id).is_none() {
            return false;
        }
        let page = self.page_of_id(id);
        self.emitter
            .track_click(now_ms, CARD_ELEMENT_ID, Some(id), Some(page));
        true
    }

    /// Starts a new session in place: clears data, exposure history and scroll position.
    pub fn reset(&mut self, now_ms: u64) {
        self.detach_all();
        self.store.reset();
        self.window.restore_scroll_state(feedwindow::ScrollState::default());
        self.sync(now_ms);
    }

    /// Recomputes the rendered window, updates visibility registrations, and turns first-time
    /// exposures into `view` events.
    pub fn sync(&mut self, now_ms: u64) {
        let next: Vec<String> = match self.window() {
            Some(window) => {
                let items = self.store.items();
                window
                    .overscanned()
                    .filter_map(|index| items.get(index).map(|item| item.id.clone()))
                    .collect()
            }
            None => Vec::new(),
        };

        for id in &self.rendered {
            if !next.contains(id) {
                self.observer.unobserve(id);
                self.in_view.remove(id);
            }
        }

        let cross = self.options.cross_extent.max(1);
        self.observer.set_viewport(Bounds::new(
            0,
            self.window.scroll_offset(),
            cross,
            self.window.viewport_extent(),
        ));
        for id in &next {
            if self.rendered.contains(id) {
                continue;
            }
            let Some(index) = self.store.index_of(id) else {
                continue;
            };
            let bounds = Bounds::new(
                0,
                self.window.row_start(index),
                cross,
                self.window.item_extent(),
            );
            self.observer
                .observe(id.clone(), bounds, self.options.visibility_threshold);
        }
        self.rendered = next;

        while let Some(t) = self.observer.poll_transition() {
            if !t.in_view {
                self.in_view.remove(&t.key);
                continue;
            }
            self.in_view.insert(t.key.clone());
            if self.store.mark_exposed(&t.key) {
                let page = self.page_of_id(&t.key);
                self.emitter
                    .track_view(now_ms, &t.key, page, self.store.variant());
            }
        }
    }

    fn detach_all(&mut self) {
        for id in self.rendered.drain(..) {
            self.observer.unobserve(&id);
        }
        self.in_view.clear();
    }

    fn page_of_id(&self, id: &str) -> u32 {
        self.store
            .index_of(id)
            .map_or(self.store.next_page(), |i| self.options.page_of(i))
    }
}

async fn fetch<P: PageSource>(
    source: &P,
    options: &FeedOptions,
    page: u32,
) -> Result<Page, FetchError> {
    let request = source.fetch_page(page, options.page_size);
    let Some(after_ms) = options.fetch_timeout_ms else {
        return request.await;
    };
    match tokio::time::timeout(Duration::from_millis(after_ms), request).await {
        Ok(result) => result,
        Err(_) => {
            awarn!(page, after_ms, "page fetch timed out");
            Err(FetchError::Timeout { page, after_ms })
        }
    }
}

/// Resolves an admitted ticket as cancelled if the fetch future is dropped before it completes,
/// so the store never stays in `Loading`.
struct AbandonOnDrop<'a> {
    store: &'a mut FeedStore,
    ticket: FetchTicket,
    armed: bool,
}

impl<'a> AbandonOnDrop<'a> {
    fn new(store: &'a mut FeedStore, ticket: FetchTicket) -> Self {
        Self {
            store,
            ticket,
            armed: true,
        }
    }

    fn disarm(mut self) -> FetchTicket {
        self.armed = false;
        self.ticket
    }
}

impl Drop for AbandonOnDrop<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let page = self.ticket.page();
        awarn!(page, "page fetch dropped before completion");
        self.store
            .resolve(self.ticket, Err(FetchError::Cancelled { page }));
    }
}
