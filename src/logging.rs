use crate::config::LogConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Where human-readable log lines go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Console {
    Stderr,
    /// Full-screen UI owns the terminal
    Off,
}

/// Install the global subscriber.
///
/// Filter comes from `RUST_LOG` (default `info`). With `config.dir` set, a
/// daily-rotated JSON file `bmi.log` is written there as well; keep the
/// returned guard alive until exit so buffered lines are flushed.
pub fn init_logging(config: &LogConfig, console: Console) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match &config.dir {
        Some(dir) => {
            let (writer, guard) = tracing_appender::non_blocking(rolling::daily(dir, "bmi.log"));
            let layer = fmt::layer().with_writer(writer).with_ansi(false).json();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let console_layer = match console {
        Console::Stderr => Some(fmt::layer().with_writer(std::io::stderr)),
        Console::Off => None,
    };

    // try_init: tests and repeated calls must not panic
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init();

    guard
}
