use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use wavtrig_frame::Command;

pub const SCHEMA_BASE: &str = "https://schemas.3leaps.dev/wavtrig/cli/v1";

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

pub fn schema_id(name: &str) -> String {
    format!("{SCHEMA_BASE}/{name}.schema.json")
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

/// Two-column key/value table.
pub fn print_fields(rows: &[(&str, String)]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["FIELD", "VALUE"]);
    for (key, value) in rows {
        table.add_row(vec![key.to_string(), value.clone()]);
    }
    println!("{table}");
}

/// Frames captured in dry-run mode, one row each.
pub fn print_frames(frames: &[String]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "COMMAND", "FRAME"]);
    for (index, frame) in frames.iter().enumerate() {
        table.add_row(vec![
            (index + 1).to_string(),
            frame_name(frame).to_string(),
            frame.clone(),
        ]);
    }
    println!("{table}");
}

/// Catalog name of a hex-encoded command frame, or `?` if it matches none.
pub fn frame_name(hex: &str) -> &'static str {
    let byte = |index: usize| {
        hex.get(index * 2..index * 2 + 2)
            .and_then(|pair| u8::from_str_radix(pair, 16).ok())
    };
    let (Some(opcode), sub_code) = (byte(3), byte(4)) else {
        return "?";
    };

    Command::ALL
        .iter()
        .map(|command| command.template())
        .find(|t| {
            t.opcode == opcode
                && t.len() * 2 == hex.len()
                && (t.slots.track != Some(5) || Some(t.bytes[4]) == sub_code)
        })
        .map_or("?", |t| t.name)
}
