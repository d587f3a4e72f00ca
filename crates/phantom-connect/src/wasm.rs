//! Browser bindings: `window.solana` as a [`WalletProvider`], plus a small
//! JS-facing wrapper around the connector view.

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use js_sys::{Function, Promise, Reflect};
use serde_json::{json, Value};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

use crate::connector::SharedConnectorView;
use crate::error::ViewError;
use crate::logging::init_console_logging;
use crate::provider::{
    ConnectOpts, ConnectResponse, EventHandler, Injected, ProviderError, ProviderEvent,
    ProviderResolver, RequestMethod, StaticResolver, WalletProvider,
};

#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    init_console_logging();
}

fn js_error(err: JsValue) -> ProviderError {
    let message = Reflect::get(&err, &JsValue::from_str("message"))
        .ok()
        .and_then(|m| m.as_string())
        .unwrap_or_else(|| format!("{err:?}"));
    match Reflect::get(&err, &JsValue::from_str("code"))
        .ok()
        .and_then(|c| c.as_f64())
    {
        Some(code) => ProviderError::from_code(code as i64, message),
        None => ProviderError::Internal(message),
    }
}

fn to_json(value: &JsValue) -> Value {
    if value.is_undefined() || value.is_null() {
        return Value::Null;
    }
    js_sys::JSON::stringify(value)
        .ok()
        .and_then(|s| s.as_string())
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or(Value::Null)
}

fn from_json(value: &Value) -> Result<JsValue, ProviderError> {
    js_sys::JSON::parse(&value.to_string()).map_err(js_error)
}

/// `PublicKey` objects stringify to base58.
fn key_to_string(key: &JsValue) -> Option<String> {
    if key.is_undefined() || key.is_null() {
        return None;
    }
    if let Some(text) = key.as_string() {
        return Some(text);
    }
    let to_string = Reflect::get(key, &JsValue::from_str("toString"))
        .ok()?
        .dyn_into::<Function>()
        .ok()?;
    to_string.call0(key).ok()?.as_string()
}

/// The object the Phantom extension injects as `window.solana`.
pub struct PhantomProvider {
    inner: JsValue,
    // Kept alive for as long as the provider may call them.
    listeners: RefCell<Vec<Closure<dyn FnMut(JsValue)>>>,
}

impl PhantomProvider {
    pub fn new(inner: JsValue) -> Self {
        Self {
            inner,
            listeners: RefCell::new(Vec::new()),
        }
    }

    fn get(&self, name: &str) -> Option<JsValue> {
        Reflect::get(&self.inner, &JsValue::from_str(name)).ok()
    }

    fn method(&self, name: &str) -> Result<Function, ProviderError> {
        self.get(name)
            .and_then(|f| f.dyn_into::<Function>().ok())
            .ok_or_else(|| ProviderError::MethodNotFound(name.to_string()))
    }

    async fn invoke(&self, name: &str, args: &[JsValue]) -> Result<JsValue, ProviderError> {
        let function = self.method(name)?;
        let args: js_sys::Array = args.iter().collect();
        let returned = function.apply(&self.inner, &args).map_err(js_error)?;
        JsFuture::from(Promise::resolve(&returned))
            .await
            .map_err(js_error)
    }
}

#[async_trait(?Send)]
impl WalletProvider for PhantomProvider {
    fn public_key(&self) -> Option<String> {
        self.get("publicKey").as_ref().and_then(key_to_string)
    }

    fn is_connected(&self) -> bool {
        self.get("isConnected")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    async fn connect(&self, opts: ConnectOpts) -> Result<ConnectResponse, ProviderError> {
        let args = if opts.only_if_trusted {
            vec![from_json(&json!({ "onlyIfTrusted": true }))?]
        } else {
            Vec::new()
        };
        let response = self.invoke("connect", &args).await?;
        let key = Reflect::get(&response, &JsValue::from_str("publicKey")).map_err(js_error)?;
        let public_key = key_to_string(&key)
            .ok_or_else(|| ProviderError::Internal("connect returned no public key".into()))?;
        Ok(ConnectResponse { public_key })
    }

    async fn disconnect(&self) -> Result<(), ProviderError> {
        self.invoke("disconnect", &[]).await?;
        Ok(())
    }

    fn on(&self, event: ProviderEvent, handler: EventHandler) {
        let Ok(on) = self.method("on") else {
            tracing::warn!(event = event.as_str(), "provider has no 'on'; listener dropped");
            return;
        };
        let closure = Closure::<dyn FnMut(JsValue)>::new(move |payload: JsValue| {
            let payload = match key_to_string(&payload) {
                Some(key) if event == ProviderEvent::AccountChanged => Value::String(key),
                _ => to_json(&payload),
            };
            handler(&payload);
        });
        if let Err(err) = on.call2(
            &self.inner,
            &JsValue::from_str(event.as_str()),
            closure.as_ref(),
        ) {
            tracing::warn!(event = event.as_str(), error = %js_error(err), "could not register listener");
            return;
        }
        self.listeners.borrow_mut().push(closure);
    }

    async fn request(&self, method: RequestMethod, params: Value) -> Result<Value, ProviderError> {
        let body = from_json(&json!({ "method": method.as_str(), "params": params }))?;
        let result = self.invoke("request", &[body]).await?;
        Ok(to_json(&result))
    }
}

/// Looks up `window.solana` on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhantomResolver;

impl ProviderResolver for PhantomResolver {
    fn resolve(&self) -> Option<Rc<dyn WalletProvider>> {
        let window = web_sys::window()?;
        let solana = Reflect::get(&window, &JsValue::from_str("solana")).ok()?;
        if solana.is_undefined() || solana.is_null() {
            return None;
        }
        let is_phantom = Reflect::get(&solana, &JsValue::from_str("isPhantom"))
            .ok()
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let provider: Rc<dyn WalletProvider> = Rc::new(PhantomProvider::new(solana));
        StaticResolver::new(Injected { is_phantom, provider }).resolve()
    }
}

/// The connector view for a page script.
#[wasm_bindgen]
pub struct ConnectorApp {
    view: SharedConnectorView<PhantomResolver>,
}

fn to_js(err: ViewError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[wasm_bindgen]
impl ConnectorApp {
    #[wasm_bindgen(constructor)]
    pub fn new(surface_errors: bool) -> Self {
        Self {
            view: SharedConnectorView::new(PhantomResolver, surface_errors),
        }
    }

    #[wasm_bindgen]
    pub fn mount(&self) -> bool {
        self.view.mount()
    }

    /// Resolves to the connected account, base58. Safe to `render` while the
    /// wallet prompt is open.
    #[wasm_bindgen]
    pub async fn connect(&self) -> Result<String, JsValue> {
        self.view.connect().await.map_err(to_js)
    }

    #[wasm_bindgen]
    pub async fn disconnect(&self) -> Result<(), JsValue> {
        self.view.disconnect().await.map_err(to_js)
    }

    #[wasm_bindgen(js_name = "isBusy")]
    pub fn is_busy(&self) -> bool {
        self.view.is_busy()
    }

    #[wasm_bindgen]
    pub fn render(&self) -> String {
        self.view.render().to_string()
    }
}
