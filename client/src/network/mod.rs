//! Connection plumbing: framed packet writer, TCP connect, and the reader
//! thread that feeds the session.

pub mod client_commands;
pub mod frame;
pub mod server_commands;
pub mod session;

use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use ew_core::error::ProtocolError;

use crate::events::{ConnectionStatus, EventBus, GameEvent};
use crate::faces::FaceCache;
use crate::map::MapGrid;
use crate::player_state::PlayerState;
use crate::settings::UserSettings;

use session::Session;

/// Serializes outbound frames. Length prefix, body and flush happen under
/// one lock so concurrent senders cannot interleave partial frames.
pub struct PacketWriter {
    inner: Mutex<WriterInner>,
}

struct WriterInner {
    sink: Box<dyn Write + Send>,
    packet: u8,
}

impl PacketWriter {
    pub fn new(sink: Box<dyn Write + Send>) -> Self {
        Self {
            inner: Mutex::new(WriterInner { sink, packet: 0 }),
        }
    }

    /// Frames and sends one command body. Bodies longer than the u16
    /// length prefix can express are rejected, never truncated.
    pub fn send(&self, body: &[u8]) -> Result<(), ProtocolError> {
        let prefix = length_prefix(body)?;
        let mut inner = self.inner.lock().expect("writer lock poisoned");
        inner.sink.write_all(&prefix)?;
        inner.sink.write_all(body)?;
        inner.sink.flush()?;
        Ok(())
    }

    /// Sends an `ncom` command and returns the packet id the server will
    /// echo in `comc`. The id wraps as an 8-bit counter.
    pub fn send_ncom(&self, repeat: u32, command: &str) -> Result<u16, ProtocolError> {
        let mut inner = self.inner.lock().expect("writer lock poisoned");
        let packet = u16::from(inner.packet.wrapping_add(1));
        let body = client_commands::ncom(packet, repeat, command);
        // The counter only advances once the body is known to frame.
        let prefix = length_prefix(&body)?;
        inner.packet = inner.packet.wrapping_add(1);
        inner.sink.write_all(&prefix)?;
        inner.sink.write_all(&body)?;
        inner.sink.flush()?;
        Ok(packet)
    }
}

fn length_prefix(body: &[u8]) -> Result<[u8; 2], ProtocolError> {
    let len = u16::try_from(body.len())
        .map_err(|_| ProtocolError::malformed("frame", "body exceeds the u16 length prefix"))?;
    Ok(len.to_be_bytes())
}

/// A live connection: shared state handles, the event bus, and the reader
/// thread applying server traffic.
pub struct Connection {
    pub map: Arc<Mutex<MapGrid>>,
    pub faces: Arc<Mutex<FaceCache>>,
    pub player: Arc<Mutex<PlayerState>>,
    writer: Arc<PacketWriter>,
    events: EventBus,
    status: Arc<Mutex<ConnectionStatus>>,
    reader: Option<JoinHandle<()>>,
}

impl Connection {
    /// Connects and spawns the reader thread. The handshake starts when the
    /// server sends its `version` frame.
    pub fn connect(settings: &UserSettings) -> anyhow::Result<Self> {
        let addr = format!("{}:{}", settings.server_host, settings.server_port);
        log::info!("connecting to {addr}");
        let stream = TcpStream::connect(&addr)?;
        let write_half = stream.try_clone()?;

        let map_size = settings.map_size();
        let map = Arc::new(Mutex::new(MapGrid::new(map_size.0, map_size.1)));
        let faces = Arc::new(Mutex::new(FaceCache::new(
            settings.face_cache_dir.as_ref().map(Into::into),
        )));
        let player = Arc::new(Mutex::new(PlayerState::new()));
        let writer = Arc::new(PacketWriter::new(Box::new(write_half)));
        let events = EventBus::new();
        let status = Arc::new(Mutex::new(ConnectionStatus::Unconnected));

        let session = Session::new(
            Arc::clone(&map),
            Arc::clone(&faces),
            Arc::clone(&player),
            Arc::clone(&writer),
            events.clone(),
            Arc::clone(&status),
            map_size,
        );
        let reader = thread::Builder::new()
            .name("reader".to_string())
            .spawn(move || run_reader(stream, session))?;

        Ok(Self {
            map,
            faces,
            player,
            writer,
            events,
            status,
            reader: Some(reader),
        })
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status.lock().expect("status lock poisoned")
    }

    /// Answers a server query and returns the connection to Playing.
    pub fn send_reply(&self, text: &str) -> Result<(), ProtocolError> {
        self.writer.send(&client_commands::reply(text))?;
        let mut status = self.status.lock().expect("status lock poisoned");
        if *status == ConnectionStatus::Query {
            *status = ConnectionStatus::Playing;
            drop(status);
            self.events
                .publish(GameEvent::StatusChanged(ConnectionStatus::Playing));
        }
        Ok(())
    }

    /// Sends a game command via `ncom`, returning the ack packet id.
    pub fn send_command(&self, command: &str) -> Result<u16, ProtocolError> {
        self.writer.send_ncom(1, command)
    }

    pub fn writer(&self) -> &Arc<PacketWriter> {
        &self.writer
    }

    /// Waits for the reader thread to finish.
    pub fn join(mut self) {
        if let Some(handle) = self.reader.take() {
            let _ = handle.join();
        }
    }
}

/// Reads frames until stream end or a fatal error, then marks the
/// connection Unconnected.
fn run_reader(mut stream: impl Read, mut session: Session) {
    loop {
        match frame::read_frame(&mut stream) {
            Ok(Some(frame)) => {
                if let Err(e) = session.handle_frame(&frame) {
                    log::error!("fatal protocol error: {e}");
                    break;
                }
            }
            Ok(None) => {
                log::info!("server closed the connection");
                break;
            }
            Err(e) => {
                log::error!("stream error: {e}");
                break;
            }
        }
    }
    session.set_status(ConnectionStatus::Unconnected);
}
