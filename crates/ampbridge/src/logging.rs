use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Crates `--log-level` applies to. Everything else (tungstenite, reqwest,
/// and friends) stays at `warn` so transport chatter does not drown the
/// broker's own diagnostics.
const WORKSPACE_CRATES: [&str; 4] = [
    "ampbridge",
    "ampbridge_control",
    "ampbridge_transport",
    "ampbridge_wire",
];

fn default_directives(level: LogLevel) -> String {
    let level = level.as_directive();
    let mut directives = String::from("warn");
    for name in WORKSPACE_CRATES {
        directives.push_str(&format!(",{name}={level}"));
    }
    directives
}

/// Logs go to stderr; stdout carries command output only. A set `RUST_LOG`
/// replaces the default directives wholesale.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(env) => EnvFilter::new(env),
        Err(_) => EnvFilter::new(default_directives(level)),
    };
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(true);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }
}
