use serde::Serialize;
use wavtrig_frame::Command as Frame;

use crate::cmd::link::{open_session, Session};
use crate::cmd::LinkArgs;
use crate::exit::{device_error, CliResult, SUCCESS};
use crate::output::{print_fields, print_frames, print_json, schema_id, OutputFormat};

#[derive(Serialize)]
struct SentOutput {
    schema_id: String,
    command: &'static str,
    port: String,
    dry_run: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    frames: Vec<String>,
}

/// Open a session, issue one fire-and-forget command, and leave playback running.
pub fn run(
    link: &LinkArgs,
    format: OutputFormat,
    command: Frame,
    op: impl FnOnce(&mut Session) -> wavtrig_device::Result<()>,
) -> CliResult<i32> {
    let mut conn = open_session(link)?;
    op(conn.session()?).map_err(|err| device_error(command.name(), err))?;

    let port = conn.port.clone();
    let dry_run = conn.dry_run();
    let frames = conn.finish()?;

    let out = SentOutput {
        schema_id: schema_id("command-sent"),
        command: command.name(),
        port,
        dry_run,
        frames,
    };
    print_sent(&out, format);
    Ok(SUCCESS)
}

fn print_sent(out: &SentOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table if out.dry_run => print_frames(&out.frames),
        OutputFormat::Table => print_fields(&[
            ("command", out.command.to_string()),
            ("port", out.port.clone()),
        ]),
        OutputFormat::Pretty => {
            println!("sent {} to {}", out.command, out.port);
            for frame in &out.frames {
                println!("  {frame}");
            }
        }
    }
}
