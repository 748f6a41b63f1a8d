use tracing_subscriber::{
    fmt::Layer, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Json logs, filtered by `RUST_LOG`. Falls back to `info` so balance samples are visible.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(Layer::default().json().flatten_event(true))
        .with(filter)
        .init();
}
