//! Wallet-connector view driven through its public API with scripted
//! providers.

mod common;

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use common::{CountingResolver, MockProvider};
use phantom_connect::{
    Action, ConnectOpts, Injected, LocalWallet, Screen, SharedConnectorView, StaticResolver,
    ViewError, WalletConnectorView, CONNECTOR_HEADING, PHANTOM_INSTALL_URL,
};

fn view_with(mock: &Rc<MockProvider>) -> WalletConnectorView<StaticResolver> {
    let mut view = WalletConnectorView::new(StaticResolver::new(Injected::phantom(mock.clone())));
    assert!(view.mount());
    view
}

// ─── Detection ─────────────────────────────────────────────────────

#[test]
fn missing_provider_renders_install_prompt() {
    let mut view = WalletConnectorView::new(StaticResolver::empty());
    assert!(!view.mount());

    let screen = view.render();
    assert!(screen.buttons().is_empty());
    assert!(screen.has_text("No provider found. Install"));
    let links: Vec<_> = screen.links().collect();
    assert_eq!(links, vec![("Phantom Browser extension", PHANTOM_INSTALL_URL)]);
}

#[test]
fn provider_without_marker_counts_as_missing() {
    let mock = Rc::new(MockProvider::resolving("ABC"));
    let mut view = WalletConnectorView::new(StaticResolver::new(Injected::foreign(mock)));
    assert!(!view.mount());
    assert!(view.render().has_text("No provider found. Install"));
}

#[test]
fn phantom_provider_renders_connect_button() {
    let mock = Rc::new(MockProvider::resolving("ABC"));
    let view = view_with(&mock);

    let screen = view.render();
    assert_eq!(screen.buttons(), vec![Action::Connect]);
    assert!(!screen.has_text("No provider found. Install"));
    assert_eq!(screen.links().count(), 0);
    assert_eq!(view.wallet_key(), None);
}

#[test]
fn mount_resolves_once() {
    let resolver = Rc::new(CountingResolver::new(StaticResolver::new(Injected::phantom(
        Rc::new(MockProvider::resolving("ABC")),
    ))));
    let mut view = WalletConnectorView::new(Rc::clone(&resolver));

    assert!(view.mount());
    assert!(view.mount());
    assert!(view.mount());
    assert_eq!(resolver.calls.get(), 1);
}

// ─── Connect / disconnect ──────────────────────────────────────────

#[tokio::test]
async fn connect_then_disconnect_round_trip() {
    let mock = Rc::new(MockProvider::resolving("ABC"));
    let mut view = view_with(&mock);
    assert!(view.render().has_button(Action::Connect));

    view.dispatch(Action::Connect).await.unwrap();
    let screen = view.render();
    assert_eq!(screen.to_string(), format!("== {CONNECTOR_HEADING} ==\n[ Disconnect ]\nConnected account: ABC\n"));
    assert!(screen.has_text("Connected account: ABC"));
    assert_eq!(screen.buttons(), vec![Action::Disconnect]);
    assert_eq!(view.wallet_key(), Some("ABC"));

    view.dispatch(Action::Disconnect).await.unwrap();
    let screen = view.render();
    assert_eq!(screen.buttons(), vec![Action::Connect]);
    assert!(!screen.has_text("Connected account: ABC"));
    assert_eq!(view.wallet_key(), None);
    assert_eq!(mock.disconnect_calls.get(), 1);
}

#[tokio::test]
async fn connect_never_forces_silent_mode() {
    let mock = Rc::new(MockProvider::resolving("ABC"));
    let mut view = view_with(&mock);
    view.connect().await.unwrap();
    assert_eq!(mock.last_opts.get(), Some(ConnectOpts { only_if_trusted: false }));
}

#[tokio::test]
async fn rejected_connect_changes_nothing() {
    let mock = Rc::new(MockProvider::rejecting());
    let mut view = view_with(&mock);
    let before = view.render();

    let err = view.connect().await.unwrap_err();
    assert!(err.is_user_rejection());
    assert_eq!(view.render(), before);
    assert_eq!(view.wallet_key(), None);

    // A shell that surfaces errors attaches them to the screen.
    let shown = view.render().with_notice(&err);
    assert_eq!(shown.notice(), Some("user rejected the request"));
}

#[tokio::test]
async fn failed_disconnect_keeps_address() {
    let mock = Rc::new(MockProvider::resolving("ABC").failing_disconnect());
    let mut view = view_with(&mock);
    view.connect().await.unwrap();

    let err = view.disconnect().await.unwrap_err();
    assert!(matches!(err, ViewError::Provider(_)));
    assert_eq!(view.wallet_key(), Some("ABC"));
    assert!(view.render().has_button(Action::Disconnect));
}

#[tokio::test]
async fn hidden_buttons_are_refused() {
    let mock = Rc::new(MockProvider::resolving("ABC"));
    let mut view = view_with(&mock);

    let err = view.dispatch(Action::Disconnect).await.unwrap_err();
    assert!(matches!(err, ViewError::ActionUnavailable(Action::Disconnect)));
    assert_eq!(mock.disconnect_calls.get(), 0);

    view.dispatch(Action::Connect).await.unwrap();
    let err = view.dispatch(Action::Connect).await.unwrap_err();
    assert!(matches!(err, ViewError::ActionUnavailable(Action::Connect)));
    assert_eq!(mock.connect_calls.get(), 1);
}

#[tokio::test]
async fn local_wallet_reports_its_own_key() {
    let wallet = Rc::new(LocalWallet::generate());
    let expected = wallet.keypair().pubkey().to_string();
    let mut view = WalletConnectorView::new(StaticResolver::new(Injected::phantom(wallet)));
    view.mount();

    let key = view.connect().await.unwrap();
    assert_eq!(key, expected);
    assert!(view.render().has_text(&format!("Connected account: {expected}")));
}

// ─── Shared view ───────────────────────────────────────────────────

struct PromptSnapshot {
    busy: bool,
    screen: Screen,
    second_click_refused: bool,
}

/// While the mock's prompt is open: render, then try a second connect.
fn watch_prompt(
    mock: &MockProvider,
    shared: &Rc<SharedConnectorView<StaticResolver>>,
) -> Rc<RefCell<Vec<PromptSnapshot>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let weak = Rc::downgrade(shared);
    mock.set_on_prompt(move || {
        let Some(shared) = weak.upgrade() else {
            return;
        };
        let mut second = std::pin::pin!(shared.connect());
        let polled = second.as_mut().poll(&mut Context::from_waker(Waker::noop()));
        sink.borrow_mut().push(PromptSnapshot {
            busy: shared.is_busy(),
            screen: shared.render(),
            second_click_refused: matches!(polled, Poll::Ready(Err(ViewError::Busy))),
        });
    });
    seen
}

fn shared_view(mock: &Rc<MockProvider>, surface_errors: bool) -> Rc<SharedConnectorView<StaticResolver>> {
    let shared = Rc::new(SharedConnectorView::new(
        StaticResolver::new(Injected::phantom(mock.clone())),
        surface_errors,
    ));
    assert!(shared.mount());
    shared
}

#[tokio::test]
async fn shared_view_renders_while_connect_prompt_is_open() {
    let mock = Rc::new(MockProvider::resolving("ABC"));
    let shared = shared_view(&mock, false);
    let seen = watch_prompt(&mock, &shared);

    assert_eq!(shared.connect().await.unwrap(), "ABC");

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].busy);
    assert!(seen[0].screen.has_button(Action::Connect));
    assert!(seen[0].second_click_refused);
    assert_eq!(mock.connect_calls.get(), 1);

    assert!(!shared.is_busy());
    assert!(shared.render().has_text("Connected account: ABC"));
    assert_eq!(shared.wallet_key().as_deref(), Some("ABC"));
}

#[tokio::test]
async fn shared_view_renders_while_disconnect_is_pending() {
    let mock = Rc::new(MockProvider::resolving("ABC"));
    let shared = shared_view(&mock, false);
    shared.connect().await.unwrap();
    let seen = watch_prompt(&mock, &shared);

    shared.disconnect().await.unwrap();

    let seen = seen.borrow();
    assert!(seen[0].busy);
    assert!(seen[0].screen.has_text("Connected account: ABC"));
    assert!(shared.render().has_button(Action::Connect));
    assert_eq!(shared.wallet_key(), None);
}

#[tokio::test]
async fn shared_view_surfaces_and_clears_notice() {
    let mock = Rc::new(MockProvider::rejecting());
    let shared = shared_view(&mock, true);

    assert!(shared.connect().await.unwrap_err().is_user_rejection());
    assert!(!shared.is_busy());
    assert_eq!(shared.render().notice(), Some("user rejected the request"));

    let quiet = shared_view(&Rc::new(MockProvider::rejecting()), false);
    assert!(quiet.connect().await.is_err());
    assert_eq!(quiet.render().notice(), None);
}

#[tokio::test]
async fn shared_view_without_provider_is_not_left_busy() {
    let shared = SharedConnectorView::new(StaticResolver::empty(), false);
    assert!(!shared.mount());
    assert!(matches!(shared.connect().await, Err(ViewError::ProviderMissing)));
    assert!(!shared.is_busy());
}
