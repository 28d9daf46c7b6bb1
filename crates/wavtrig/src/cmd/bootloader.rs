use serde::Serialize;
use wavtrig_device::bootloader::{probe, BootloaderConfig};

use crate::cmd::link::{open_link, Simulated};
use crate::cmd::LinkArgs;
use crate::exit::{device_error, transport_error, CliResult, SUCCESS};
use crate::output::{print_fields, print_json, schema_id, OutputFormat};

#[derive(Serialize)]
struct BootloaderOutput {
    schema_id: String,
    port: String,
    bootloader_version: Option<u8>,
    reply: String,
}

pub fn run(link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let mut raw = open_link(link, Simulated::Bootloader)?;
    let info = probe(&mut raw.link, &BootloaderConfig::default())
        .map_err(|err| device_error("bootloader probe failed", err))?;
    raw.link
        .close()
        .map_err(|err| transport_error("close failed", err))?;

    let out = BootloaderOutput {
        schema_id: schema_id("bootloader"),
        port: raw.port,
        bootloader_version: info.version(),
        reply: info.hex(),
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table | OutputFormat::Pretty => print_fields(&[
            ("port", out.port.clone()),
            (
                "bootloader",
                out.bootloader_version
                    .map_or_else(|| "unknown".to_string(), |v| format!("0x{v:02X}")),
            ),
            ("reply", out.reply.clone()),
        ]),
    }
    Ok(SUCCESS)
}
