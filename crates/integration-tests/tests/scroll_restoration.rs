//! Scroll memory across full reloads and partial swaps.

#![allow(clippy::unwrap_used)]

use chrono::Utc;
use secondhand_integration_tests::{Recorded, page, runtime};
use secondhand_session::store::keys;
use secondhand_session::{Event, MemoryStorage};

const LISTING: &str = "/produkty?kategoria=kurtki&strona=2";

fn page_loaded(path: &str) -> Event {
    Event::PageLoaded {
        url: page(path),
        now: Utc::now(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_reload_restores_once() {
    let mut rt = runtime(MemoryStorage::new());
    rt.handle(page_loaded(LISTING)).await;
    rt.handle(Event::SaveScrollPosition {
        position: 500.0,
        url: page(LISTING),
    })
    .await;

    // Full reload: same storage, fresh reconciler.
    let storage = rt.into_parts().0.into_storage();
    let mut rt = runtime(storage);
    rt.handle(page_loaded(LISTING)).await;
    assert!(rt.host().scrolls().is_empty());
    rt.settle().await;
    assert_eq!(rt.host().scrolls(), vec![500.0]);
    assert!(rt.reconciler().store().backend().peek(keys::SCROLL_RESTORATION).is_none());

    // And another reload finds nothing.
    let storage = rt.into_parts().0.into_storage();
    let mut rt = runtime(storage);
    rt.handle(page_loaded(LISTING)).await;
    rt.settle().await;
    assert!(rt.host().scrolls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_reload_elsewhere_drops_memory() {
    let storage = MemoryStorage::new().with_entry(
        keys::SCROLL_RESTORATION,
        &serde_json::json!({ "position": 800.0, "returnUrl": page(LISTING).as_str() })
            .to_string(),
    );
    let mut rt = runtime(storage);
    rt.handle(page_loaded("/produkty?kategoria=buty")).await;
    rt.settle().await;

    assert!(rt.host().scrolls().is_empty());
    assert!(rt.reconciler().store().backend().peek(keys::SCROLL_RESTORATION).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_back_to_listing_after_detail_swap() {
    let mut rt = runtime(MemoryStorage::new());
    rt.handle(page_loaded(LISTING)).await;
    rt.handle(Event::SaveScrollPosition {
        position: 1200.0,
        url: page(LISTING),
    })
    .await;

    // Detail view swapped in: scrolls to top, memory survives.
    rt.handle(Event::AfterSwap {
        url: page("/produkty/kurtka-puchowa"),
        target: "content".to_string(),
        history_restore: false,
    })
    .await;
    assert_eq!(rt.host().calls.last(), Some(&Recorded::ScrollToTop));

    // Listing swapped back in: restored instead of scrolled to top.
    rt.handle(Event::AfterSwap {
        url: page(LISTING),
        target: "content".to_string(),
        history_restore: false,
    })
    .await;
    rt.settle().await;

    let top_scrolls = rt
        .host()
        .calls
        .iter()
        .filter(|c| **c == Recorded::ScrollToTop)
        .count();
    assert_eq!(top_scrolls, 1);
    assert_eq!(rt.host().scrolls(), vec![1200.0]);
}

#[tokio::test(start_paused = true)]
async fn test_history_restore_swap_keeps_position() {
    let mut rt = runtime(MemoryStorage::new());
    rt.handle(page_loaded(LISTING)).await;
    rt.handle(Event::AfterSwap {
        url: page(LISTING),
        target: "content".to_string(),
        history_restore: true,
    })
    .await;
    rt.settle().await;

    assert!(!rt.host().calls.contains(&Recorded::ScrollToTop));
    assert!(rt.host().scrolls().is_empty());
}
