use tracing_subscriber::EnvFilter;

/// Route library logs to the test harness. Set `RUST_LOG=mutator=debug` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
