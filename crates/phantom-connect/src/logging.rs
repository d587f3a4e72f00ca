use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_JSON_ENV: &str = "PHANTOM_CONNECT_LOG_JSON";

#[cfg(not(target_arch = "wasm32"))]
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// stderr subscriber; JSON lines when `PHANTOM_CONNECT_LOG_JSON=1`.
#[cfg(not(target_arch = "wasm32"))]
pub fn init_logging() {
    let use_json = std::env::var(LOG_JSON_ENV)
        .map(|value| value == "1")
        .unwrap_or(false);

    if use_json {
        let _ = fmt::Subscriber::builder()
            .with_env_filter(env_filter())
            .json()
            .with_writer(std::io::stderr)
            .try_init();
    } else {
        let _ = fmt::Subscriber::builder()
            .with_env_filter(env_filter())
            .with_writer(std::io::stderr)
            .try_init();
    }
}

/// Browser console subscriber. No timestamps: there is no system clock.
#[cfg(feature = "wasm")]
pub fn init_console_logging() {
    let _ = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::new("info"))
        .without_time()
        .with_ansi(false)
        .with_writer(console::ConsoleWriter::default)
        .try_init();
}

#[cfg(feature = "wasm")]
mod console {
    use std::io;

    use wasm_bindgen::JsValue;

    /// Buffers one formatted event and logs it when dropped.
    #[derive(Default)]
    pub struct ConsoleWriter {
        buf: Vec<u8>,
    }

    impl io::Write for ConsoleWriter {
        fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
            self.buf.extend_from_slice(bytes);
            Ok(bytes.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Drop for ConsoleWriter {
        fn drop(&mut self) {
            let line = String::from_utf8_lossy(&self.buf);
            let line = line.trim_end();
            if !line.is_empty() {
                web_sys::console::log_1(&JsValue::from_str(line));
            }
        }
    }
}
