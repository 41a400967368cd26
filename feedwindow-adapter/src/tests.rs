use crate::*;

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::time::Duration;

use feedwindow::{
    AbVariant, ConnectOutcome, FeedOptions, FeedPhase, FeedStore, FetchError, GeometryObserver,
    Item, LoadDecision, ManualObserver, Page, PageSource, ResolveOutcome, SinkError, TrackEvent,
    TrackEventKind, VecSink,
};

#[derive(Debug, Default)]
struct FakeSource {
    total_pages: u32,
    calls: Cell<u32>,
    fail_once: RefCell<Vec<u32>>,
    delay: Option<Duration>,
}

impl FakeSource {
    fn new(total_pages: u32) -> Self {
        Self {
            total_pages,
            ..Self::default()
        }
    }

    fn failing_once(mut self, page: u32) -> Self {
        self.fail_once.get_mut().push(page);
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl PageSource for FakeSource {
    fn fetch_page(
        &self,
        page: u32,
        page_size: u32,
    ) -> impl Future<Output = Result<Page, FetchError>> {
        self.calls.set(self.calls.get() + 1);
        let fail = {
            let mut pending = self.fail_once.borrow_mut();
            match pending.iter().position(|p| *p == page) {
                Some(pos) => {
                    pending.remove(pos);
                    true
                }
                None => false,
            }
        };
        let delay = self.delay;
        let is_last = page >= self.total_pages;
        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if fail {
                return Err(FetchError::Network("offline".to_string()));
            }
            let items = (0..page_size)
                .map(|i| Item::new(format!("u{page}-{i}")))
                .collect();
            Ok(Page { items, is_last })
        }
    }
}

type Ctl = FeedController<FakeSource, GeometryObserver<String>, VecSink>;

fn controller(options: FeedOptions, source: FakeSource) -> Ctl {
    FeedController::new(options, source, GeometryObserver::new(), VecSink::new()).unwrap()
}

fn views_of(c: &Ctl, id: &str) -> usize {
    c.emitter()
        .log()
        .iter()
        .filter(|e| e.kind == TrackEventKind::View && e.payload.item_id.as_deref() == Some(id))
        .count()
}

fn visible_ids<P, O, S>(c: &FeedController<P, O, S>) -> Vec<String>
where
    P: PageSource,
    O: feedwindow::VisibilityObserver<String>,
    S: feedwindow::EventSink,
{
    c.visible_items().iter().map(|i| i.id.clone()).collect()
}

#[tokio::test]
async fn initial_load_then_scroll_driven_pages() {
    let mut c = controller(
        FeedOptions::default().with_page_ceiling(None),
        FakeSource::new(10),
    );
    c.mount(0);
    assert_eq!(c.load_decision(), LoadDecision::Fetch(1));

    let out = c.load_more(1).await;
    assert_eq!(
        out,
        Some(ResolveOutcome::Applied {
            appended: 10,
            duplicates: 0
        })
    );
    // overscan_end 6 is within 5 rows of the 10 loaded items.
    assert_eq!(c.load_decision(), LoadDecision::Fetch(2));
    c.load_more(2).await;
    assert_eq!(c.snapshot().len, 20);
    assert_eq!(c.load_decision(), LoadDecision::None);
    assert_eq!(c.load_more(3).await, None);

    assert_eq!(
        visible_ids(&c),
        ["u1-0", "u1-1", "u1-2", "u1-3", "u1-4", "u1-5", "u1-6"]
    );

    assert_eq!(c.on_scroll(1_600, 4), LoadDecision::None);
    assert_eq!(c.on_scroll(1_800, 5), LoadDecision::Fetch(3));
    c.load_more(6).await;
    assert_eq!(c.snapshot().len, 30);
    assert_eq!(c.source().calls.get(), 3);
}

#[tokio::test]
async fn scroll_storm_during_fetch_admits_nothing() {
    let mut c = controller(FeedOptions::default(), FakeSource::new(10));
    c.mount(0);
    let ticket = c.poll_load().unwrap();
    assert_eq!(ticket.page(), 1);
    assert!(c.snapshot().loading);

    for i in 0..200u64 {
        assert_eq!(c.on_scroll(i * 53, i), LoadDecision::None);
        assert!(c.poll_load().is_none());
    }

    let result = c.source().fetch_page(1, 10).await;
    c.resolve(ticket, result, 300);
    assert!(!c.snapshot().loading);
    assert_eq!(c.snapshot().len, 10);
    assert_eq!(c.source().calls.get(), 1);
}

#[tokio::test]
async fn exposures_fire_once_per_item() {
    let mut c = controller(
        FeedOptions::default().with_page_ceiling(None),
        FakeSource::new(10),
    );
    c.mount(0);
    c.load_more(1).await;

    // Viewport 0..600 fully contains the first three 200px rows.
    assert_eq!(c.emitter().count(TrackEventKind::View), 3);
    assert!(c.is_in_view("u1-0"));
    assert!(!c.is_in_view("u1-3"));

    c.on_scroll(200, 300);
    assert_eq!(c.emitter().count(TrackEventKind::View), 4);
    assert!(!c.is_in_view("u1-0"));
    assert!(c.is_in_view("u1-3"));

    c.on_scroll(0, 600);
    assert!(c.is_in_view("u1-0"));
    assert!(!c.is_in_view("u1-3"));
    assert_eq!(c.emitter().count(TrackEventKind::View), 4);

    // Leave the window entirely, then come back.
    c.on_scroll(1_400, 900);
    assert!(!c.is_in_view("u1-0"));
    c.on_scroll(0, 1_200);
    assert!(c.is_in_view("u1-0"));
    assert_eq!(views_of(&c, "u1-0"), 1);
    assert_eq!(views_of(&c, "u1-3"), 1);

    let view = c
        .emitter()
        .log()
        .iter()
        .find(|e| e.kind == TrackEventKind::View)
        .unwrap();
    assert_eq!(view.timestamp, 1);
    assert_eq!(view.payload.page, Some(1));
    assert_eq!(view.payload.variant, Some(AbVariant::Control));
}

#[tokio::test]
async fn manual_observer_drives_exposure() {
    let mut c = FeedController::new(
        FeedOptions::default(),
        FakeSource::new(10),
        ManualObserver::<String>::new(),
        VecSink::new(),
    )
    .unwrap();
    c.mount(0);
    c.load_more(1).await;
    assert_eq!(c.emitter().count(TrackEventKind::View), 0);
    assert_eq!(c.observer().observed().count(), 7);

    let x = "u1-0".to_string();
    assert!(c.observer_mut().simulate(&x, true));
    c.sync(10);
    assert!(c.is_in_view("u1-0"));
    assert_eq!(c.emitter().count(TrackEventKind::View), 1);

    for (step, flag) in [false, true, false, true].into_iter().enumerate() {
        c.observer_mut().simulate(&x, flag);
        c.sync(20 + step as u64);
    }
    assert_eq!(c.emitter().count(TrackEventKind::View), 1);

    // Rows outside the rendered window are not observed.
    assert!(!c.observer_mut().simulate(&"u1-9".to_string(), true));
}

#[tokio::test]
async fn mount_records_ab_impression_with_session_variant() {
    let opts = FeedOptions::default();
    let mut store = FeedStore::new(&opts);
    store.set_variant(AbVariant::VariantB);
    let mut c = FeedController::with_store(
        opts,
        FakeSource::new(10),
        GeometryObserver::new(),
        VecSink::new(),
        store,
    )
    .unwrap();
    c.mount(42);
    c.load_more(43).await;

    let first = &c.emitter().log()[0];
    assert_eq!(first.kind, TrackEventKind::AbImpression);
    assert_eq!(first.timestamp, 42);
    assert_eq!(first.payload.variant, Some(AbVariant::VariantB));
    assert!(
        c.emitter()
            .log()
            .iter()
            .filter(|e| e.kind == TrackEventKind::View)
            .all(|e| e.payload.variant == Some(AbVariant::VariantB))
    );
}

#[tokio::test]
async fn variant_picked_from_seed_reaches_events() {
    let mut c = controller(FeedOptions::default(), FakeSource::new(10));
    c.set_variant(AbVariant::from_seed(4));
    c.mount(0);
    c.load_more(1).await;
    assert_eq!(c.store().variant(), AbVariant::VariantA);
    assert!(
        c.emitter()
            .log()
            .iter()
            .filter(|e| matches!(e.kind, TrackEventKind::AbImpression | TrackEventKind::View))
            .all(|e| e.payload.variant == Some(AbVariant::VariantA))
    );
}

#[tokio::test]
async fn drained_events_are_not_kept() {
    let mut c = controller(FeedOptions::default(), FakeSource::new(10));
    c.mount(0);
    c.load_more(1).await;
    let drained = c.drain_events();
    assert_eq!(drained[0].kind, TrackEventKind::AbImpression);
    assert_eq!(drained.len(), 4);
    assert!(c.emitter().log().is_empty());

    c.on_scroll(200, 1_000);
    assert_eq!(c.emitter().count(TrackEventKind::Scroll), 1);
    assert_eq!(c.emitter().count(TrackEventKind::View), 1);
    assert_eq!(c.emitter().sink().events.len(), 6);
}

#[tokio::test]
async fn connect_twice_emits_once() {
    let mut c = controller(FeedOptions::default(), FakeSource::new(10));
    c.mount(0);
    c.load_more(1).await;
    c.load_more(2).await;

    assert_eq!(c.connect("u2-4", 10), ConnectOutcome::Connected);
    let items = c.store().items().to_vec();
    assert_eq!(c.connect("u2-4", 11), ConnectOutcome::AlreadyConnected);
    assert_eq!(c.store().items(), items.as_slice());
    assert_eq!(c.connect("missing", 12), ConnectOutcome::NotFound);

    assert_eq!(c.emitter().count(TrackEventKind::Connect), 1);
    let event = c
        .emitter()
        .log()
        .iter()
        .find(|e| e.kind == TrackEventKind::Connect)
        .unwrap();
    assert_eq!(event.payload.item_id.as_deref(), Some("u2-4"));
    assert_eq!(event.payload.page, Some(2));
    assert!(c.store().get("u2-4").unwrap().connected);
}

#[tokio::test]
async fn click_records_card_and_page() {
    let mut c = controller(FeedOptions::default(), FakeSource::new(10));
    c.mount(0);
    c.load_more(1).await;
    assert!(!c.click("nobody", 5));
    assert!(c.click("u1-3", 6));
    let click = c.emitter().log().last().unwrap();
    assert_eq!(click.kind, TrackEventKind::Click);
    assert_eq!(click.payload.element_id.as_deref(), Some(CARD_ELEMENT_ID));
    assert_eq!(click.payload.item_id.as_deref(), Some("u1-3"));
    assert_eq!(click.payload.page, Some(1));
}

#[tokio::test]
async fn failed_page_keeps_items_and_retry_recovers() {
    let mut c = controller(
        FeedOptions::default(),
        FakeSource::new(10).failing_once(2),
    );
    c.mount(0);
    c.load_more(1).await;

    assert_eq!(c.load_more(2).await, Some(ResolveOutcome::Failed));
    let snap = c.snapshot();
    assert_eq!(snap.phase(), FeedPhase::Errored);
    assert!(!snap.loading);
    assert_eq!(snap.error.as_deref(), Some("network error: offline"));
    assert_eq!(visible_ids(&c).len(), 7);

    // The error is advisory: the window may still ask for the page.
    assert_eq!(c.load_decision(), LoadDecision::Fetch(2));
    assert!(matches!(
        c.retry(3).await,
        Some(ResolveOutcome::Applied { appended: 10, .. })
    ));
    assert_eq!(c.snapshot().error, None);
    assert_eq!(c.snapshot().len, 20);
}

#[tokio::test(start_paused = true)]
async fn slow_fetch_times_out_into_error() {
    let mut c = controller(
        FeedOptions::default().with_fetch_timeout_ms(Some(1_000)),
        FakeSource::new(10).with_delay(Duration::from_secs(10)),
    );
    c.mount(0);
    assert_eq!(c.load_more(1).await, Some(ResolveOutcome::Failed));
    let snap = c.snapshot();
    assert!(!snap.loading);
    assert_eq!(snap.error.as_deref(), Some("page 1 timed out after 1000ms"));
    assert_eq!(snap.next_page, 1);
}

#[tokio::test(start_paused = true)]
async fn fetch_within_timeout_applies() {
    let mut c = controller(
        FeedOptions::default().with_fetch_timeout_ms(Some(1_000)),
        FakeSource::new(10).with_delay(Duration::from_millis(300)),
    );
    c.mount(0);
    assert!(matches!(
        c.load_more(1).await,
        Some(ResolveOutcome::Applied { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn dropped_fetch_leaves_store_retryable() {
    let mut c = controller(
        FeedOptions::default(),
        FakeSource::new(10).with_delay(Duration::from_millis(1_000)),
    );
    c.mount(0);
    let timed_out = tokio::time::timeout(Duration::from_millis(10), c.load_more(1)).await;
    assert!(timed_out.is_err());
    tokio::time::sleep(Duration::from_millis(5_000)).await;

    let snap = c.snapshot();
    assert!(!snap.loading);
    assert_eq!(snap.phase(), FeedPhase::Errored);
    assert_eq!(snap.error.as_deref(), Some("page 1 fetch was cancelled"));
    assert_eq!(snap.len, 0);
    assert_eq!(c.load_decision(), LoadDecision::Fetch(1));

    assert!(matches!(
        c.retry(6_000).await,
        Some(ResolveOutcome::Applied { appended: 10, .. })
    ));
    assert_eq!(c.snapshot().error, None);
    assert_eq!(c.source().calls.get(), 2);
}

#[tokio::test]
async fn reset_while_loading_discards_response() {
    let mut c = controller(FeedOptions::default(), FakeSource::new(10));
    c.mount(0);
    c.load_more(1).await;
    c.on_scroll(400, 1);
    let ticket = c.poll_load().unwrap();
    assert_eq!(ticket.page(), 2);

    c.reset(2);
    let snap = c.snapshot();
    assert_eq!(snap.len, 0);
    assert_eq!(snap.next_page, 1);
    assert_eq!(snap.scroll_offset, 0);
    assert!(snap.loading);
    assert!(c.poll_load().is_none());
    assert_eq!(c.observer().observed_len(), 0);

    let late = c.source().fetch_page(2, 10).await;
    assert_eq!(c.resolve(ticket, late, 3), ResolveOutcome::Stale);
    assert_eq!(c.snapshot().len, 0);
    assert!(!c.snapshot().loading);

    c.load_more(4).await;
    assert_eq!(visible_ids(&c)[0], "u1-0");
    // Exposure history was reset with the session.
    assert_eq!(views_of(&c, "u1-0"), 2);
}

#[tokio::test]
async fn unmount_and_mount_restore_scroll_position() {
    let opts = FeedOptions::default();
    let mut c = controller(opts.clone(), FakeSource::new(10));
    c.mount(0);
    c.load_more(1).await;
    c.load_more(2).await;
    c.on_scroll(1_200, 10);
    assert_eq!(c.emitter().count(TrackEventKind::View), 6);

    let store = c.unmount();
    assert_eq!(store.scroll_offset(), 1_200);
    assert_eq!(store.len(), 20);

    let mut c = FeedController::with_store(
        opts,
        FakeSource::new(10),
        GeometryObserver::new(),
        VecSink::new(),
        store,
    )
    .unwrap();
    c.mount(20);
    assert_eq!(c.window_manager().scroll_offset(), 1_200);
    let rows = c.rows();
    assert_eq!(rows.first().map(row_index), Some(3));
    assert!(c.is_in_view("u1-6"));
    // Everything on screen was already exposed in this session.
    assert_eq!(c.emitter().count(TrackEventKind::View), 0);
    assert_eq!(c.emitter().count(TrackEventKind::AbImpression), 1);
}

fn row_index(row: &FeedRow<'_>) -> usize {
    match row {
        FeedRow::Item { index, .. } | FeedRow::Placeholder { index } => *index,
    }
}

#[tokio::test]
async fn placeholder_row_trails_until_exhausted() {
    let mut c = controller(
        FeedOptions::default().with_page_ceiling(Some(2)),
        FakeSource::new(10),
    );
    c.mount(0);
    assert_eq!(c.rows(), [FeedRow::Placeholder { index: 0 }]);
    assert!(c.visible_items().is_empty());

    c.load_more(1).await;
    c.on_scroll(1_400, 1);
    assert_eq!(c.rows().last(), Some(&FeedRow::Placeholder { index: 10 }));

    c.load_more(2).await;
    assert!(!c.snapshot().has_more);
    c.on_scroll(100_000, 2);
    let rows = c.rows();
    assert!(matches!(
        rows.last(),
        Some(FeedRow::Item { index: 19, .. })
    ));
}

#[tokio::test]
async fn ceiling_stops_fetching_for_good() {
    let mut c = controller(FeedOptions::default(), FakeSource::new(10));
    c.mount(0);
    let mut now = 0;
    while let Some(outcome) = c.retry(now).await {
        assert!(matches!(outcome, ResolveOutcome::Applied { .. }));
        now += 1;
    }
    assert_eq!(c.source().calls.get(), 5);
    assert!(!c.snapshot().has_more);

    for offset in [0, 5_000, 9_400, 1_000_000] {
        assert_eq!(c.on_scroll(offset, now), LoadDecision::None);
        assert_eq!(c.load_more(now).await, None);
    }
    assert_eq!(c.source().calls.get(), 5);
}

#[tokio::test]
async fn source_last_page_signal_ends_feed() {
    let mut c = controller(
        FeedOptions::default().with_page_ceiling(None),
        FakeSource::new(2),
    );
    c.mount(0);
    c.retry(0).await;
    c.retry(1).await;
    assert!(!c.snapshot().has_more);
    assert_eq!(c.retry(2).await, None);
}

#[tokio::test]
async fn scroll_events_are_throttled() {
    let mut c = controller(FeedOptions::default(), FakeSource::new(10));
    c.mount(0);
    c.load_more(0).await;
    for (offset, now) in [(10, 1_000), (20, 1_050), (30, 1_150), (40, 1_200), (50, 1_390)] {
        c.on_scroll(offset, now);
    }
    assert_eq!(c.emitter().count(TrackEventKind::Scroll), 2);
    // The store still sees every offset.
    assert_eq!(c.snapshot().scroll_offset, 50);
}

#[tokio::test]
async fn invalid_options_are_rejected() {
    let err = FeedController::new(
        FeedOptions::default().with_page_size(0),
        FakeSource::new(1),
        GeometryObserver::<String>::new(),
        VecSink::new(),
    )
    .unwrap_err();
    assert_eq!(err, feedwindow::ConfigError::ZeroPageSize);
}

#[tokio::test]
async fn channel_sink_forwards_and_swallows_closed_receiver() {
    let (sink, mut rx) = ChannelSink::channel();
    let mut c = FeedController::new(
        FeedOptions::default(),
        FakeSource::new(10),
        ManualObserver::<String>::new(),
        sink,
    )
    .unwrap();
    c.mount(7);
    c.load_more(8).await;

    let event = rx.try_recv().unwrap();
    assert_eq!(event.kind, TrackEventKind::AbImpression);
    assert_eq!(event.timestamp, 7);

    drop(rx);
    assert!(c.click("u1-0", 9));
    assert_eq!(c.emitter().delivery_failures(), 1);
    assert_eq!(c.emitter().count(TrackEventKind::Click), 1);
}

#[tokio::test]
async fn forward_events_drops_failed_deliveries() {
    let (sink, rx) = ChannelSink::channel();
    let mut emitter = feedwindow::Emitter::new(sink, 200);
    emitter.track_view(1, "a", 1, AbVariant::Control);
    emitter.track_scroll(2, 100, 1);
    emitter.track_connect(3, "a", 1);
    drop(emitter);

    let seen = RefCell::new(Vec::new());
    let delivered = forward_events(rx, |event: TrackEvent| {
        seen.borrow_mut().push(event.kind);
        let kind = event.kind;
        async move {
            if kind == TrackEventKind::Scroll {
                Err(SinkError::Rejected("scroll disabled".to_string()))
            } else {
                Ok(())
            }
        }
    })
    .await;
    assert_eq!(delivered, 2);
    assert_eq!(
        seen.into_inner(),
        [
            TrackEventKind::View,
            TrackEventKind::Scroll,
            TrackEventKind::Connect
        ]
    );
}
