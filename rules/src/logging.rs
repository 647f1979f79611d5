//! Diagnostic tracing for the `rules` binary.
//!
//! # What gets logged
//!
//! - **Loading** (`io::loader`, `parser`): skipped rule lines and elements at
//!   `error`/`info`, unknown priority words at `warn`, per-file rule counts
//!   at `info`.
//! - **Inference** (`core::context`): cyclic rule references and qualifiers
//!   that cannot be evaluated at `warn`; candidate walks, matches and empty
//!   results at `debug`.
//!
//! Library code only emits events. Query results go to stdout and are
//! unaffected by `RUST_LOG`; tracing always goes to stderr.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install a stderr subscriber filtered by `RUST_LOG` (default `warn`).
///
/// # Example
/// ```bash
/// RUST_LOG=rules=debug rules query color --model page.rules
/// ```
pub fn init() {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = env_filter(directives.as_deref());

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}

/// Filter for `directives`; missing or unparseable directives mean `warn`.
fn env_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn defaults_to_warn() {
        assert_eq!(env_filter(None).max_level_hint(), Some(LevelFilter::WARN));
        assert_eq!(
            env_filter(Some("rules=loud")).max_level_hint(),
            Some(LevelFilter::WARN)
        );
    }

    #[test]
    fn honours_module_directives() {
        assert_eq!(
            env_filter(Some("rules=debug")).max_level_hint(),
            Some(LevelFilter::DEBUG)
        );
    }
}
