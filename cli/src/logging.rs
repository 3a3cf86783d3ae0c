use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `HEFT_LOG` takes precedence over the
/// configured level. Logs go to stderr so `--json` output stays parseable.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_env("HEFT_LOG")
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
