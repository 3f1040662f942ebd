use std::io::BufRead;
use std::sync::Arc;
use std::thread;

use anyhow::Context;

use client::events::{ConnectionStatus, EventKind, GameEvent};
use client::network::{client_commands, Connection};
use client::settings::{self, UserSettings};

/// Terminal session: prints server traffic to stdout, forwards stdin lines
/// as `reply` while the server is asking a question and as game commands
/// otherwise. Lines starting with `/` address items and the map directly.
fn main() -> anyhow::Result<()> {
    let settings = load_settings();
    ew_core::initialize_logger(log::LevelFilter::Info, settings.log_file.as_deref())
        .context("logger initialization failed")?;

    let connection = Arc::new(Connection::connect(&settings)?);
    let rx = connection.events().subscribe(EventKind::all());

    let input_conn = Arc::clone(&connection);
    thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || forward_stdin(&input_conn))?;

    for event in rx {
        match event {
            GameEvent::StatusChanged(ConnectionStatus::Unconnected) => {
                println!("* disconnected");
                break;
            }
            GameEvent::StatusChanged(status) => println!("* status: {status:?}"),
            GameEvent::Query { prompt, .. } => println!("? {prompt}"),
            GameEvent::DrawInfo { text, .. } => println!("{text}"),
            GameEvent::DrawExtInfo { text, .. } => println!("{text}"),
            GameEvent::NewMap => println!("* entered a new map"),
            GameEvent::PlayerChanged => {
                if let Some(player) = connection
                    .player
                    .lock()
                    .expect("player lock poisoned")
                    .player()
                {
                    println!("* playing as {}", player.name);
                }
            }
            other => log::debug!("{other:?}"),
        }
    }
    Ok(())
}

/// Settings come from disk, then host/port arguments override them.
fn load_settings() -> UserSettings {
    let mut settings = settings::load_settings_from_disk(&settings::default_settings_path());
    let mut args = std::env::args().skip(1);
    if let Some(host) = args.next() {
        settings.server_host = host;
    }
    if let Some(port) = args.next() {
        match port.parse() {
            Ok(p) => settings.server_port = p,
            Err(_) => eprintln!("ignoring unparseable port {port:?}"),
        }
    }
    settings
}

fn forward_stdin(connection: &Connection) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let sent = if let Some(local) = line.strip_prefix('/') {
            local_command(connection, local)
        } else if connection.status() == ConnectionStatus::Query {
            connection.send_reply(line)
        } else {
            connection.send_command(line).map(|_| ())
        };
        if let Err(e) = sent {
            log::error!("send failed: {e}");
            break;
        }
    }
}

/// Slash commands address item tags and the map without going through the
/// server-side command parser.
fn local_command(
    connection: &Connection,
    line: &str,
) -> Result<(), ew_core::error::ProtocolError> {
    let mut parts = line.split_ascii_whitespace();
    let verb = parts.next().unwrap_or("");
    let args: Vec<i64> = parts.filter_map(|t| t.parse().ok()).collect();
    let body = match (verb, args.as_slice()) {
        ("apply", [tag]) => client_commands::apply(*tag as u32),
        ("examine", [tag]) => client_commands::examine(*tag as u32),
        ("mark", [tag]) => client_commands::mark(*tag as u32),
        ("lock", [flag, tag]) => client_commands::lock(*flag != 0, *tag as u32),
        ("lookat", [dx, dy]) => client_commands::lookat(*dx as i32, *dy as i32),
        ("move", [to, tag, nrof]) => {
            client_commands::move_item(*to as u32, *tag as u32, *nrof as u32)
        }
        ("redraw", []) => client_commands::mapredraw(),
        _ => {
            println!("* unknown local command: /{line}");
            return Ok(());
        }
    };
    connection.writer().send(&body)
}
