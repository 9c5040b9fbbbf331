//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Installs a global tracing subscriber.
///
/// The filter comes from `RUST_LOG` when set, defaulting to `info`. With
/// `json` set, events are emitted as structured JSON lines for log
/// shippers. Calling this more than once is harmless; later calls are
/// ignored.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing(false);
        init_tracing(true);
    }
}
