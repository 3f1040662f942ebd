//! Event fan-out from the reader thread to consumers.
//!
//! Consumers subscribe with a kind mask and receive matching events over a
//! plain mpsc channel; the bus drops subscribers whose receiver went away.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use bitflags::bitflags;

bitflags! {
    /// Subscription mask for [`EventBus::subscribe`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EventKind: u32 {
        const STATUS      = 1 << 0;
        const MAP         = 1 << 1;
        const FACES       = 1 << 2;
        const ITEMS       = 1 << 3;
        const STATS       = 1 << 4;
        const SKILLS      = 1 << 5;
        const SPELLS      = 1 << 6;
        const TEXT        = 1 << 7;
        const QUERY       = 1 << 8;
        const SOUND       = 1 << 9;
        const MAGICMAP    = 1 << 10;
        const COMMAND_ACK = 1 << 11;
    }
}

/// Connection lifecycle as seen by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Unconnected,
    Playing,
    /// The server asked a question; input lines should be sent as `reply`.
    Query,
}

/// Typed events published by the session. Never carries errors; decode
/// failures stay on the reader side as log entries.
#[derive(Debug, Clone)]
pub enum GameEvent {
    StatusChanged(ConnectionStatus),
    NewMap,
    MapUpdated,
    MapScrolled {
        dx: i32,
        dy: i32,
    },
    FaceLoaded {
        id: u16,
    },
    ItemsChanged {
        location: u32,
    },
    PlayerChanged,
    StatsChanged,
    SkillRegistered {
        id: u8,
        name: String,
    },
    SpellAdded {
        tag: u32,
    },
    SpellUpdated {
        tag: u32,
    },
    SpellRemoved {
        tag: u32,
    },
    DrawInfo {
        color: u32,
        text: String,
    },
    DrawExtInfo {
        color: u32,
        kind: u32,
        subtype: u32,
        text: String,
    },
    Query {
        flags: u32,
        prompt: String,
    },
    Sound {
        x: i8,
        y: i8,
        num: u16,
        kind: u8,
    },
    MagicMap {
        width: u32,
        height: u32,
        px: u32,
        py: u32,
        data: Vec<u8>,
    },
    CommandAck {
        packet: u16,
        time: u32,
    },
}

impl GameEvent {
    fn kind(&self) -> EventKind {
        match self {
            GameEvent::StatusChanged(_) => EventKind::STATUS,
            GameEvent::NewMap | GameEvent::MapUpdated | GameEvent::MapScrolled { .. } => {
                EventKind::MAP
            }
            GameEvent::FaceLoaded { .. } => EventKind::FACES,
            GameEvent::ItemsChanged { .. } | GameEvent::PlayerChanged => EventKind::ITEMS,
            GameEvent::StatsChanged => EventKind::STATS,
            GameEvent::SkillRegistered { .. } => EventKind::SKILLS,
            GameEvent::SpellAdded { .. }
            | GameEvent::SpellUpdated { .. }
            | GameEvent::SpellRemoved { .. } => EventKind::SPELLS,
            GameEvent::DrawInfo { .. } | GameEvent::DrawExtInfo { .. } => EventKind::TEXT,
            GameEvent::Query { .. } => EventKind::QUERY,
            GameEvent::Sound { .. } => EventKind::SOUND,
            GameEvent::MagicMap { .. } => EventKind::MAGICMAP,
            GameEvent::CommandAck { .. } => EventKind::COMMAND_ACK,
        }
    }
}

/// Shared publisher; cheap to clone across threads.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<(EventKind, Sender<GameEvent>)>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a receiver that sees every event matching `mask`.
    pub fn subscribe(&self, mask: EventKind) -> Receiver<GameEvent> {
        let (tx, rx) = mpsc::channel();
        let mut subs = self.subscribers.lock().expect("event bus lock poisoned");
        subs.push((mask, tx));
        rx
    }

    /// Delivers an event to every live subscriber whose mask matches.
    pub fn publish(&self, event: GameEvent) {
        let kind = event.kind();
        let mut subs = self.subscribers.lock().expect("event bus lock poisoned");
        subs.retain(|(mask, tx)| {
            if !mask.contains(kind) {
                return true;
            }
            tx.send(event.clone()).is_ok()
        });
    }
}
