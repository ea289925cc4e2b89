/// Install a JSON `tracing` subscriber filtered by `RUST_LOG`.
///
/// Does nothing if a global subscriber is already set.
#[cfg(feature = "tracing-basic")]
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .try_init();
}

/// Stub for when tracing-subscriber is not enabled
#[cfg(not(feature = "tracing-basic"))]
pub fn init_tracing() {}
