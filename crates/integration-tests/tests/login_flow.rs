//! Login, registration and logout, driven by server-emitted triggers.

#![allow(clippy::unwrap_used)]

use axum::Json;
use axum::response::{Html, IntoResponse, Response};
use chrono::{Duration, Utc};
use http::StatusCode;
use secondhand_core::{
    AuthSource, CartSnapshot, GuestCartId, Notification, NotificationKind, ServerEvent,
    SessionToken, TriggerSet,
};
use secondhand_integration_tests::{jwt_expiring_at, observe, page, runtime};
use secondhand_session::store::keys;
use secondhand_session::{AuthPhase, ClientEvent, Event, MemoryStorage, NavigationMode};

/// Login handler as the storefront would write it.
fn login_response(token: Option<&str>) -> Response {
    let triggers = TriggerSet::new().with(ServerEvent::LoginSucceeded {
        token: token.map(|t| SessionToken::new(t).unwrap()),
    });
    (triggers, Html("<p>Witaj ponownie!</p>")).into_response()
}

fn page_loaded(path: &str) -> Event {
    Event::PageLoaded {
        url: page(path),
        now: Utc::now(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_login_trigger_stores_token_and_lands() {
    let mut rt = runtime(MemoryStorage::new());
    rt.handle(page_loaded("/logowanie")).await;

    let response = observe("/api/auth/login", login_response(Some("abc123")))
        .await
        .unwrap();
    assert!(response.trigger.is_some());
    rt.handle(Event::ResponseReceived { response }).await;

    assert_eq!(
        rt.reconciler().store().backend().peek(keys::TOKEN),
        Some("abc123")
    );
    assert!(rt.host().navigations().is_empty());
    assert!(rt.host().dispatched().contains(&&ClientEvent::AuthStateChanged {
        authenticated: true,
        source: Some(AuthSource::Login),
    }));

    rt.settle().await;
    let navigations = rt.host().navigations();
    assert_eq!(navigations.len(), 1);
    assert_eq!(navigations[0].path, "/moje-konto");
    assert_eq!(navigations[0].mode, NavigationMode::Replace);
    assert_eq!(rt.reconciler().phase(), AuthPhase::Authenticated);
}

#[tokio::test(start_paused = true)]
async fn test_login_trigger_without_token() {
    let mut rt = runtime(MemoryStorage::new());
    rt.handle(page_loaded("/logowanie")).await;

    let response = observe("/api/auth/login", login_response(None))
        .await
        .unwrap();
    rt.handle(Event::ResponseReceived { response }).await;
    rt.settle().await;

    assert!(rt.reconciler().store().backend().peek(keys::TOKEN).is_none());
    assert!(rt.host().navigations().is_empty());
    assert!(rt.host().dispatched().iter().any(|e| matches!(
        e,
        ClientEvent::Notify { notification, .. } if notification.kind == NotificationKind::Error
    )));
}

#[tokio::test(start_paused = true)]
async fn test_in_band_token_and_trigger_log_in_once() {
    let token = jwt_expiring_at((Utc::now() + Duration::hours(1)).timestamp());
    let triggers = TriggerSet::new().with(ServerEvent::LoginSucceeded {
        token: Some(SessionToken::new(token.clone()).unwrap()),
    });
    let server = (triggers, Json(serde_json::json!({ "token": token }))).into_response();

    let mut rt = runtime(MemoryStorage::new());
    rt.handle(page_loaded("/logowanie")).await;
    let response = observe("/api/auth/login", server).await.unwrap();
    rt.handle(Event::ResponseReceived { response }).await;
    rt.settle().await;

    let logins = rt
        .host()
        .dispatched()
        .iter()
        .filter(|e| matches!(e, ClientEvent::AuthStateChanged { authenticated: true, .. }))
        .count();
    assert_eq!(logins, 1);
    assert_eq!(rt.host().navigations().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_credentials_return_to_anonymous() {
    let mut rt = runtime(MemoryStorage::new());
    rt.handle(page_loaded("/logowanie")).await;

    let mut request = secondhand_session::OutboundRequest::new("/api/auth/login");
    assert!(rt.before_request(&mut request).await);
    assert_eq!(rt.reconciler().phase(), AuthPhase::Authenticating);

    let server = (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "message": "Nieprawidłowy email lub hasło" })),
    )
        .into_response();
    let response = observe("/api/auth/login", server).await.unwrap();
    rt.handle(Event::ResponseReceived { response }).await;
    rt.handle(Event::RequestFinished).await;
    rt.settle().await;

    assert_eq!(rt.reconciler().phase(), AuthPhase::Anonymous);
    assert!(rt.host().navigations().is_empty());
    assert!(rt.host().dispatched().is_empty());
    assert_eq!(rt.host().indicator(), Some(false));
}

#[tokio::test(start_paused = true)]
async fn test_registration_without_session_goes_to_login() {
    let triggers = TriggerSet::new().with(ServerEvent::RegistrationCompleted {
        token: None,
        message: Some("Konto utworzone. Zaloguj się.".to_string()),
    });
    let server = (triggers, Html("")).into_response();

    let mut rt = runtime(MemoryStorage::new());
    rt.handle(page_loaded("/rejestracja")).await;
    let response = observe("/api/auth/register", server).await.unwrap();
    rt.handle(Event::ResponseReceived { response }).await;
    rt.settle().await;

    assert!(rt.host().dispatched().iter().any(|e| matches!(
        e,
        ClientEvent::Notify { notification, .. }
            if notification == &Notification::success("Konto utworzone. Zaloguj się.")
    )));
    assert_eq!(rt.host().navigations()[0].path, "/logowanie");
}

#[tokio::test(start_paused = true)]
async fn test_logout_waits_for_notification() {
    let token = jwt_expiring_at((Utc::now() + Duration::hours(1)).timestamp());
    let mut rt = runtime(MemoryStorage::new().with_entry(keys::TOKEN, &token));
    rt.handle(page_loaded("/moje-konto")).await;

    rt.handle(Event::LogoutRequested).await;
    assert!(rt.reconciler().store().backend().peek(keys::TOKEN).is_none());
    assert!(rt.host().navigations().is_empty());

    tokio::time::advance(std::time::Duration::from_millis(300)).await;
    assert!(rt.host().navigations().is_empty());

    rt.settle().await;
    assert_eq!(rt.host().navigations()[0].path, "/");
    assert_eq!(rt.reconciler().phase(), AuthPhase::Anonymous);
}

#[tokio::test(start_paused = true)]
async fn test_cart_triggers_adopt_guest_cart() {
    let guest = GuestCartId::random();
    let triggers = TriggerSet::new()
        .with(ServerEvent::CartCountUpdated(CartSnapshot {
            count: 3,
            total_price: 24_700,
            guest_cart_id: Some(guest),
        }))
        .with(ServerEvent::ShowMessage(Notification::success(
            "Dodano do koszyka",
        )));
    let server = (triggers, StatusCode::NO_CONTENT).into_response();

    let mut rt = runtime(MemoryStorage::new());
    rt.handle(page_loaded("/produkty/kurtka-puchowa")).await;
    let response = observe("/api/cart/add", server).await.unwrap();
    rt.handle(Event::ResponseReceived { response }).await;

    assert_eq!(rt.reconciler().store().guest_cart_id(), Some(guest));
    assert!(rt.host().dispatched().iter().any(|e| matches!(
        e,
        ClientEvent::CartStateUpdated { cart } if cart.count == 3
    )));

    // Checkout drops the guest cart.
    let server = (
        TriggerSet::new().with(ServerEvent::OrderPlaced {
            order_id: Some("ZAM-2040".to_string()),
        }),
        Html("<h1>Dziękujemy</h1>"),
    )
        .into_response();
    let response = observe("/api/orders", server).await.unwrap();
    rt.handle(Event::ResponseReceived { response }).await;
    assert!(rt.reconciler().store().guest_cart_id().is_none());
}
