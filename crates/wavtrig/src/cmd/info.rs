use serde::Serialize;
use wavtrig_device::DeviceInfo;

use crate::cmd::link::open_session;
use crate::cmd::LinkArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_fields, print_json, schema_id, OutputFormat};

#[derive(Serialize)]
struct InfoOutput {
    schema_id: String,
    port: String,
    #[serde(flatten)]
    device: DeviceInfo,
}

pub fn run(link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let mut conn = open_session(link)?;
    let device = conn.session()?.info().clone();
    let port = conn.port.clone();
    conn.finish()?;

    let out = InfoOutput {
        schema_id: schema_id("device-info"),
        port,
        device,
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => print_fields(&[
            ("port", out.port.clone()),
            ("version", display_version(&out.device.version)),
            ("voices", out.device.voices.to_string()),
            ("tracks", out.device.tracks.to_string()),
        ]),
        OutputFormat::Pretty => {
            println!("Device Info:");
            println!("  Port:     {}", out.port);
            println!("  Firmware: {}", display_version(&out.device.version));
            println!("  Voices:   {}", out.device.voices);
            println!("  Tracks:   {}", out.device.tracks);
        }
    }
    Ok(SUCCESS)
}

fn display_version(version: &str) -> String {
    if version.is_empty() {
        "unavailable".to_string()
    } else {
        version.to_string()
    }
}
