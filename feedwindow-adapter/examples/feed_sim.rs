use std::future::Future;
use std::time::Duration;

use feedwindow::{
    AbVariant, FeedOptions, FetchError, GeometryObserver, Item, LoadDecision, Page, PageSource,
};
use feedwindow_adapter::{ChannelSink, FeedController, forward_events};

struct SlowSource;

impl PageSource for SlowSource {
    fn fetch_page(
        &self,
        page: u32,
        page_size: u32,
    ) -> impl Future<Output = Result<Page, FetchError>> {
        async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            if page == 3 {
                return Err(FetchError::Status { page, status: 503 });
            }
            let items = (0..page_size)
                .map(|i| Item::new(format!("u{page}-{i}")))
                .collect();
            Ok(Page::new(items))
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Simulate a framework adapter: scroll events come in, pages load, analytics flow out.
    let (sink, rx) = ChannelSink::channel();
    let forwarder = tokio::spawn(forward_events(rx, |event| async move {
        println!("-> {:?} {:?}", event.kind, event.payload.item_id);
        Ok(())
    }));

    let opts = FeedOptions::default().with_fetch_timeout_ms(Some(1_000));
    let mut feed = FeedController::new(opts, SlowSource, GeometryObserver::new(), sink)
        .expect("valid options");
    feed.set_variant(AbVariant::from_seed(7));
    feed.mount(0);

    let mut now = 0;
    for offset in (0..4_000).step_by(250) {
        now += 100;
        if feed.on_scroll(offset, now) != LoadDecision::None {
            let outcome = feed.load_more(now).await;
            println!("offset={offset} outcome={outcome:?} snapshot={:?}", feed.snapshot());
        }
    }
    if feed.snapshot().error.is_some() {
        println!("retrying: {:?}", feed.retry(now).await);
    }

    feed.connect("u1-2", now);
    feed.click("u1-2", now);

    println!("kept in memory: {} events", feed.drain_events().len());
    let store = feed.unmount();
    println!("saved scroll offset={}", store.scroll_offset());
    let delivered = forwarder.await.expect("forwarder task");
    println!("delivered={delivered}");
}
