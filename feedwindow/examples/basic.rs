// Example: drive a feed by hand, without an async runtime.
use feedwindow::{
    Bounds, Emitter, FeedOptions, FeedStore, GeometryObserver, Item, LoadDecision, Page, VecSink,
    VisibilityObserver, WindowManager,
};

fn fake_page(page: u32, page_size: u32) -> Page {
    let items = (0..page_size)
        .map(|i| Item::new(format!("u{page}-{i}")).with_name(format!("User {page}-{i}")))
        .collect();
    Page::new(items)
}

fn main() {
    let opts = FeedOptions::default();
    let mut store = FeedStore::new(&opts);
    let mut window = WindowManager::new(&opts);
    let mut emitter = Emitter::new(VecSink::new(), opts.scroll_throttle_ms);

    // Load until the window no longer asks for more.
    while let LoadDecision::Fetch(page) = window.load_decision(&store.snapshot()) {
        let Some(ticket) = store.begin_fetch(page) else {
            break;
        };
        let outcome = store.resolve(ticket, Ok(fake_page(page, opts.page_size)));
        println!("page {page}: {outcome:?}");
    }

    window.set_scroll_offset(1_000);
    let snapshot = store.snapshot();
    let w = window.window(snapshot.row_count());
    println!("rows={} window={w:?}", snapshot.row_count());
    emitter.track_scroll(0, window.scroll_offset(), 1);

    // Geometry-based exposure for the rendered rows.
    let mut observer = GeometryObserver::new();
    observer.set_viewport(Bounds::new(0, window.scroll_offset(), 1, window.viewport_extent()));
    for index in w.map(|w| w.overscanned()).into_iter().flatten() {
        if let Some(item) = store.items().get(index) {
            let bounds = Bounds::new(0, window.row_start(index), 1, window.item_extent());
            observer.observe(item.id.clone(), bounds, opts.visibility_threshold);
        }
    }
    for t in observer.transitions() {
        if t.in_view && store.mark_exposed(&t.key) {
            let page = store.index_of(&t.key).map_or(1, |i| opts.page_of(i));
            emitter.track_view(0, &t.key, page, store.variant());
        }
    }

    for event in emitter.log() {
        println!("{:?} {:?}", event.kind, event.payload.item_id);
    }
    println!("next decision={:?}", window.load_decision(&store.snapshot()));
}
