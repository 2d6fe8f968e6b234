use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the process-wide tracing subscriber.
///
/// `RUST_LOG` overrides the default filter. Safe to call once from the caller
/// layer's entry point; library code only emits events.
pub fn init() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "quorum_core=info,quorum_vote=info".into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
