use std::sync::Once;

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info",
/// "neutrino_bridge=debug,wgpu_core=warn").
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

static INIT: Once = Once::new();

/// Installs the global logger. Later calls are ignored.
///
/// Filter precedence: `config.env_filter`, then `RUST_LOG`, then `info`.
/// Returns `true` only for the call that installed `env_logger`; when
/// another logger already owns the `log` facade (a test harness, an
/// embedding application) it is kept and this returns `false`.
pub fn init_logging(config: LoggingConfig) -> bool {
    let mut installed = false;

    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Some(filter) = config.env_filter {
            builder.parse_filters(&filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            // wgpu is chatty at info.
            builder
                .filter_level(log::LevelFilter::Info)
                .filter_module("wgpu_core", log::LevelFilter::Warn)
                .filter_module("wgpu_hal", log::LevelFilter::Warn)
                .filter_module("naga", log::LevelFilter::Warn);
        }

        builder.write_style(config.write_style);

        match builder.try_init() {
            Ok(()) => {
                installed = true;
                log::debug!("logging initialized");
            }
            Err(err) => log::debug!("keeping the existing logger: {err}"),
        }
    });

    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sink;

    impl log::Log for Sink {
        fn enabled(&self, _: &log::Metadata<'_>) -> bool {
            true
        }

        fn log(&self, _: &log::Record<'_>) {}

        fn flush(&self) {}
    }

    static SINK: Sink = Sink;

    #[test]
    fn existing_logger_is_kept() {
        let _ = log::set_logger(&SINK);

        assert!(!init_logging(LoggingConfig::default()));
        // Once only.
        assert!(!init_logging(LoggingConfig::default()));
    }
}
