use std::str::FromStr;

use tracing::metadata::LevelFilter;
use tracing_subscriber::{
    Layer, filter::FilterFn, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt,
};

/// Environment variable consulted by [`init`] for the maximum log level.
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

/// Emit an event inside a named span. Accepts everything `tracing::event!`
/// does after the level, so structured fields work as usual:
///
/// ```ignore
/// log!(Level::INFO, "outgoing", message_id = %id, "delivered");
/// ```
#[macro_export]
macro_rules! log {
    ($level:expr, $span:expr, $($arg:tt)+) => {{
        let span = $crate::tracing::span!($level, $span);
        let _enter = span.enter();

        $crate::tracing::event!($level, $($arg)+)
    }};
}

/// Traffic leaving the process (webhook requests).
#[macro_export]
macro_rules! outgoing {
    (level = $level:ident, $($arg:tt)+) => {
        $crate::log!($crate::tracing::Level::$level, "outgoing", $($arg)+)
    };

    ($($arg:tt)+) => {
        $crate::outgoing!(level = TRACE, $($arg)+)
    };
}

/// Traffic arriving at the process (control API requests).
#[macro_export]
macro_rules! incoming {
    (level = $level:ident, $($arg:tt)+) => {
        $crate::log!($crate::tracing::Level::$level, "incoming", $($arg)+)
    };

    ($($arg:tt)+) => {
        $crate::incoming!(level = TRACE, $($arg)+)
    };
}

/// Scheduler, store and cache bookkeeping.
#[macro_export]
macro_rules! internal {
    (level = $level:ident, $($arg:tt)+) => {
        $crate::log!($crate::tracing::Level::$level, "internal", $($arg)+)
    };

    ($($arg:tt)+) => {
        $crate::internal!(level = TRACE, $($arg)+)
    };
}

const fn default_level() -> LevelFilter {
    if cfg!(debug_assertions) {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    }
}

/// Resolve the level filter from an optional `LOG_LEVEL` value, falling back
/// to the build default when it is missing or unparseable.
#[must_use]
pub fn resolve_level(raw: Option<&str>) -> LevelFilter {
    let default = default_level();

    raw.map_or(default, |level| {
        LevelFilter::from_str(level.trim()).unwrap_or_else(|_| {
            eprintln!("Invalid log level specified {level}, defaulting to {default}");
            default
        })
    })
}

/// Install the global subscriber. Only events from `herald*` targets are
/// emitted. Calling this more than once is harmless; later calls are ignored.
pub fn init() {
    let level = resolve_level(std::env::var(LOG_LEVEL_ENV).ok().as_deref());

    let _ = tracing_subscriber::Registry::default()
        .with(
            tracing_subscriber::fmt::layer()
                .with_file(false)
                .with_line_number(false)
                .compact()
                .with_ansi(true)
                .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339())
                .with_filter(level)
                .with_filter(FilterFn::new(|metadata| {
                    metadata.target().starts_with("herald")
                })),
        )
        .try_init();
}
