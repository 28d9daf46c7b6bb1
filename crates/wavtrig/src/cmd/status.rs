use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::cmd::link::{open_session, Connection};
use crate::cmd::{parse_duration, LinkArgs, StatusArgs};
use crate::exit::{device_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_json, schema_id, OutputFormat};

#[derive(Serialize)]
struct StatusOutput {
    schema_id: String,
    state: &'static str,
    tracks: Vec<i16>,
}

pub fn run(link: &LinkArgs, args: StatusArgs, format: OutputFormat) -> CliResult<i32> {
    let interval = args.watch.as_deref().map(parse_duration).transpose()?;
    let mut conn = open_session(link)?;

    match interval {
        None => print_status(&poll(&mut conn)?, format),
        Some(interval) => watch(&mut conn, interval, format)?,
    }

    conn.finish()?;
    Ok(SUCCESS)
}

fn watch(conn: &mut Connection, interval: Duration, format: OutputFormat) -> CliResult<()> {
    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    while running.load(Ordering::SeqCst) {
        print_status(&poll(conn)?, format);
        std::thread::sleep(interval);
    }
    Ok(())
}

fn poll(conn: &mut Connection) -> CliResult<StatusOutput> {
    conn.simulate_idle_status();
    let playing = conn
        .session()?
        .playing()
        .map_err(|err| device_error("status query failed", err))?;

    let (state, tracks) = match playing {
        Some(tracks) if tracks.is_empty() => ("idle", tracks),
        Some(tracks) => ("playing", tracks),
        None => ("unknown", Vec::new()),
    };

    Ok(StatusOutput {
        schema_id: schema_id("status"),
        state,
        tracks,
    })
}

fn print_status(out: &StatusOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table | OutputFormat::Pretty => {
            let tracks = out
                .tracks
                .iter()
                .map(i16::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            if tracks.is_empty() {
                println!("{}", out.state);
            } else {
                println!("{}: {tracks}", out.state);
            }
        }
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
