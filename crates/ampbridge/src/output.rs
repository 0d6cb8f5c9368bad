use std::io::IsTerminal;

use clap::ValueEnum;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Text
        } else {
            Self::Json
        }
    }
}

/// Print one result record: the JSON value on the json format, the plain
/// rendering otherwise.
pub fn emit(format: OutputFormat, json: serde_json::Value, text: String) {
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(&json).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Text => println!("{text}"),
    }
}

/// Print one subscription event tagged with its kind.
pub fn emit_event(format: OutputFormat, kind: &str, value: serde_json::Value, text: String) {
    match format {
        OutputFormat::Json => {
            let record = serde_json::json!({ "event": kind, "value": value });
            println!(
                "{}",
                serde_json::to_string(&record).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Text => println!("{kind}: {text}"),
    }
}
