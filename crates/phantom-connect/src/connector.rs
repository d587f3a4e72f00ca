//! Wallet-connector view: detect the extension, connect, disconnect.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::ViewError;
use crate::provider::{request_connection, ProviderError, ProviderResolver, WalletProvider};
use crate::render::{Action, Element, Screen, PHANTOM_INSTALL_URL};

pub const CONNECTOR_HEADING: &str = "Connect to Phantom Wallet";

/// View state: the provider handle found at mount and the connected key.
///
/// Actions take `&mut self`, so the shell owns the view and drives one
/// action at a time; there is no intermediate "connecting" state.
pub struct WalletConnectorView<R> {
    resolver: R,
    provider: Option<Rc<dyn WalletProvider>>,
    wallet_key: Option<String>,
    mounted: bool,
}

impl<R: ProviderResolver> WalletConnectorView<R> {
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            provider: None,
            wallet_key: None,
            mounted: false,
        }
    }

    /// Look up the provider. Only the first call per view does anything;
    /// returns whether a provider is available.
    pub fn mount(&mut self) -> bool {
        if !self.mounted {
            self.mounted = true;
            self.provider = self.resolver.resolve();
            if self.provider.is_none() {
                self.wallet_key = None;
                tracing::info!("no wallet provider injected");
            }
        }
        self.provider.is_some()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn provider_detected(&self) -> bool {
        self.provider.is_some()
    }

    pub fn wallet_key(&self) -> Option<&str> {
        self.wallet_key.as_deref()
    }

    pub(crate) fn provider(&self) -> Result<Rc<dyn WalletProvider>, ViewError> {
        self.provider.clone().ok_or(ViewError::ProviderMissing)
    }

    /// Ask the wallet to connect. On failure (including the user closing the
    /// prompt) the state is left as it was.
    pub async fn connect(&mut self) -> Result<String, ViewError> {
        let provider = self.provider()?;
        let result = request_connection(provider.as_ref()).await;
        self.finish_connect(result)
    }

    pub(crate) fn finish_connect(&mut self, result: Result<String, ProviderError>) -> Result<String, ViewError> {
        match result {
            Ok(key) => {
                self.wallet_key = Some(key.clone());
                Ok(key)
            }
            Err(err) => {
                tracing::debug!(error = %err, "connect request did not complete");
                Err(err.into())
            }
        }
    }

    /// Disconnect the wallet and forget the key. On failure the key is kept
    /// and the error logged.
    pub async fn disconnect(&mut self) -> Result<(), ViewError> {
        let provider = self.provider()?;
        let result = provider.disconnect().await;
        self.finish_disconnect(result)
    }

    pub(crate) fn finish_disconnect(&mut self, result: Result<(), ProviderError>) -> Result<(), ViewError> {
        match result {
            Ok(()) => {
                self.wallet_key = None;
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "error disconnecting wallet");
                Err(err.into())
            }
        }
    }

    /// Route a button click. Buttons not on the current screen are refused.
    pub async fn dispatch(&mut self, action: Action) -> Result<(), ViewError> {
        if !self.render().has_button(action) {
            return Err(ViewError::ActionUnavailable(action));
        }
        match action {
            Action::Connect => self.connect().await.map(|_| ()),
            Action::Disconnect => self.disconnect().await,
            Action::CreateAccount | Action::Transfer => Err(ViewError::ActionUnavailable(action)),
        }
    }

    pub fn render(&self) -> Screen {
        let mut screen = Screen::new(CONNECTOR_HEADING);
        match (&self.provider, &self.wallet_key) {
            (Some(_), Some(key)) => {
                screen.button(Action::Disconnect);
                screen.text(format!("Connected account: {key}"));
            }
            (Some(_), None) => screen.button(Action::Connect),
            (None, _) => {
                screen.text("No provider found. Install");
                screen.push(Element::Link {
                    text: "Phantom Browser extension".into(),
                    href: PHANTOM_INSTALL_URL.into(),
                });
            }
        }
        screen
    }
}

/// A connector view reachable through `&self`, for shells that keep
/// rendering while a wallet prompt is open.
///
/// Only the provider handle is taken out of the view before awaiting, so
/// `render` and `mount` never meet an outstanding borrow. A second action
/// while one is pending fails with [`ViewError::Busy`].
pub struct SharedConnectorView<R> {
    view: RefCell<WalletConnectorView<R>>,
    in_flight: Cell<bool>,
    surface_errors: bool,
    notice: RefCell<Option<String>>,
}

/// Clears the in-flight flag even when the action future is dropped.
struct InFlight<'a>(&'a Cell<bool>);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<R: ProviderResolver> SharedConnectorView<R> {
    pub fn new(resolver: R, surface_errors: bool) -> Self {
        Self {
            view: RefCell::new(WalletConnectorView::new(resolver)),
            in_flight: Cell::new(false),
            surface_errors,
            notice: RefCell::new(None),
        }
    }

    pub fn mount(&self) -> bool {
        self.view.borrow_mut().mount()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.get()
    }

    pub fn wallet_key(&self) -> Option<String> {
        self.view.borrow().wallet_key().map(str::to_owned)
    }

    fn begin(&self) -> Result<(InFlight<'_>, Rc<dyn WalletProvider>), ViewError> {
        if self.in_flight.get() {
            return Err(ViewError::Busy);
        }
        let provider = self.view.borrow().provider()?;
        self.in_flight.set(true);
        Ok((InFlight(&self.in_flight), provider))
    }

    pub async fn connect(&self) -> Result<String, ViewError> {
        let result = match self.begin() {
            Ok((guard, provider)) => {
                let result = request_connection(provider.as_ref()).await;
                drop(guard);
                self.view.borrow_mut().finish_connect(result)
            }
            Err(err) => Err(err),
        };
        self.settle(result)
    }

    pub async fn disconnect(&self) -> Result<(), ViewError> {
        let result = match self.begin() {
            Ok((guard, provider)) => {
                let result = provider.disconnect().await;
                drop(guard);
                self.view.borrow_mut().finish_disconnect(result)
            }
            Err(err) => Err(err),
        };
        self.settle(result)
    }

    /// The current screen, with the last failure attached when errors are
    /// surfaced.
    pub fn render(&self) -> Screen {
        let screen = self.view.borrow().render();
        match self.notice.borrow().as_deref() {
            Some(notice) => screen.with_notice(notice),
            None => screen,
        }
    }

    fn settle<T>(&self, result: Result<T, ViewError>) -> Result<T, ViewError> {
        match &result {
            Ok(_) => {
                self.notice.replace(None);
            }
            Err(err) if self.surface_errors => {
                self.notice.replace(Some(err.to_string()));
            }
            Err(_) => {}
        }
        result
    }
}
