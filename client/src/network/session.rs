//! Applies decoded commands to the shared client state.
//!
//! The session runs on the reader thread and is the only mutator. Lock
//! order when both are needed is faces before map; every state lock is
//! released before the writer lock is taken.

use std::sync::{Arc, Mutex};

use ew_core::constants::{
    CS_STAT_AC, CS_STAT_ARMOUR, CS_STAT_CHA, CS_STAT_CON, CS_STAT_DAM, CS_STAT_DEX, CS_STAT_FLAGS,
    CS_STAT_FOOD, CS_STAT_GRACE, CS_STAT_HP, CS_STAT_INT, CS_STAT_LEVEL, CS_STAT_MAXGRACE,
    CS_STAT_MAXHP, CS_STAT_MAXSP, CS_STAT_POW, CS_STAT_SKILL_START, CS_STAT_SP, CS_STAT_STR,
    CS_STAT_WC, CS_STAT_WIS, EMPTY_FACE, MAP_MARGIN, SKILL_COUNT,
};
use ew_core::error::ProtocolError;
use ew_core::types::stats::{SkillValue, Stats};

use crate::events::{ConnectionStatus, EventBus, GameEvent};
use crate::faces::FaceCache;
use crate::map::MapGrid;
use crate::player_state::{Player, PlayerState};

use super::client_commands;
use super::server_commands::{self, ItemUpdate, MapRecord, ServerCommand, StatUpdate};
use super::PacketWriter;

pub const CLIENT_CS_VERSION: u32 = 1023;
pub const CLIENT_SC_VERSION: u32 = 1027;
pub const CLIENT_VERSION_INFO: &str = "Emberwake Rust Client 0.1";

/// Per-connection interpreter state. Owned by the reader thread.
pub struct Session {
    map: Arc<Mutex<MapGrid>>,
    faces: Arc<Mutex<FaceCache>>,
    player: Arc<Mutex<PlayerState>>,
    writer: Arc<PacketWriter>,
    events: EventBus,
    status: Arc<Mutex<ConnectionStatus>>,
    /// Viewport size asked for in `setup mapsize`.
    requested_map_size: (usize, usize),
    /// Size echoed back by the server; used for the next `newmap`.
    negotiated_map_size: (usize, usize),
}

impl Session {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        map: Arc<Mutex<MapGrid>>,
        faces: Arc<Mutex<FaceCache>>,
        player: Arc<Mutex<PlayerState>>,
        writer: Arc<PacketWriter>,
        events: EventBus,
        status: Arc<Mutex<ConnectionStatus>>,
        map_size: (usize, usize),
    ) -> Self {
        Self {
            map,
            faces,
            player,
            writer,
            events,
            status,
            requested_map_size: map_size,
            negotiated_map_size: map_size,
        }
    }

    /// Decodes and applies one frame. Only stream-level errors escape;
    /// everything else is logged and the frame dropped.
    pub fn handle_frame(&mut self, frame: &[u8]) -> Result<(), ProtocolError> {
        match server_commands::parse(frame).and_then(|cmd| self.apply(cmd)) {
            Ok(()) => Ok(()),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                log::warn!("dropping frame: {e}");
                Ok(())
            }
        }
    }

    pub fn set_status(&self, status: ConnectionStatus) {
        let mut current = self.status.lock().expect("status lock poisoned");
        if *current != status {
            *current = status;
            drop(current);
            self.events.publish(GameEvent::StatusChanged(status));
        }
    }

    fn apply(&mut self, cmd: ServerCommand) -> Result<(), ProtocolError> {
        match cmd {
            ServerCommand::Version { cs, sc, info } => self.handshake(cs, sc, &info),
            ServerCommand::Setup(pairs) => {
                self.apply_setup(&pairs);
                Ok(())
            }
            ServerCommand::ReplyInfo { kind, payload } => self.apply_replyinfo(&kind, &payload),
            ServerCommand::AddmeSuccess => {
                log::info!("join accepted");
                self.set_status(ConnectionStatus::Playing);
                Ok(())
            }
            ServerCommand::AddmeFailed => {
                log::warn!("join rejected by the server");
                Ok(())
            }
            ServerCommand::Goodbye => {
                log::info!("server said goodbye");
                Ok(())
            }
            ServerCommand::NewMap => {
                let (w, h) = self.negotiated_map_size;
                *self.map.lock().expect("map lock poisoned") = MapGrid::new(w, h);
                self.events.publish(GameEvent::NewMap);
                Ok(())
            }
            ServerCommand::Map1(records) => self.apply_map1(&records),
            ServerCommand::MapScroll { dx, dy } => {
                self.map.lock().expect("map lock poisoned").scroll(dx, dy);
                self.events.publish(GameEvent::MapScrolled { dx, dy });
                Ok(())
            }
            ServerCommand::MagicMap {
                width,
                height,
                px,
                py,
                data,
            } => {
                self.events.publish(GameEvent::MagicMap {
                    width,
                    height,
                    px,
                    py,
                    data,
                });
                Ok(())
            }
            ServerCommand::Image { face, data } => self.apply_image(face, &data),
            ServerCommand::Face1 {
                num,
                checksum,
                name,
            } => {
                self.faces
                    .lock()
                    .expect("face lock poisoned")
                    .define_face(num, checksum, &name);
                self.top_up_fetches()
            }
            ServerCommand::Item2 { location, items } => {
                {
                    let mut player = self.player.lock().expect("player lock poisoned");
                    for item in items {
                        player.upsert_item(item);
                    }
                }
                self.events.publish(GameEvent::ItemsChanged { location });
                Ok(())
            }
            ServerCommand::UpdItem(update) => {
                self.apply_upditem(update);
                Ok(())
            }
            ServerCommand::DelItem(tags) => {
                let mut locations = Vec::new();
                {
                    let mut player = self.player.lock().expect("player lock poisoned");
                    for tag in tags {
                        if let Some(loc) = player.item(tag).map(|i| i.location) {
                            player.remove_item(tag);
                            if !locations.contains(&loc) {
                                locations.push(loc);
                            }
                        } else {
                            log::warn!("delitem for unknown tag {tag}");
                        }
                    }
                }
                for location in locations {
                    self.events.publish(GameEvent::ItemsChanged { location });
                }
                Ok(())
            }
            ServerCommand::DelInv { location } => {
                self.player
                    .lock()
                    .expect("player lock poisoned")
                    .clear_location(location);
                self.events.publish(GameEvent::ItemsChanged { location });
                Ok(())
            }
            ServerCommand::Player {
                tag,
                weight,
                face,
                name,
            } => {
                self.player
                    .lock()
                    .expect("player lock poisoned")
                    .set_player(Player {
                        tag,
                        weight,
                        face,
                        name,
                    });
                self.events.publish(GameEvent::PlayerChanged);
                Ok(())
            }
            ServerCommand::Stats(updates) => {
                {
                    let mut player = self.player.lock().expect("player lock poisoned");
                    for update in updates {
                        apply_stat(&mut player, update);
                    }
                }
                self.events.publish(GameEvent::StatsChanged);
                Ok(())
            }
            ServerCommand::AddSpell(spells) => {
                let mut tags = Vec::new();
                {
                    let mut player = self.player.lock().expect("player lock poisoned");
                    for spell in spells {
                        tags.push(spell.tag);
                        player.add_spell(spell);
                    }
                }
                for tag in tags {
                    self.events.publish(GameEvent::SpellAdded { tag });
                }
                Ok(())
            }
            ServerCommand::UpdSpell {
                tag,
                fields,
                mana,
                grace,
                damage,
            } => {
                let known = self
                    .player
                    .lock()
                    .expect("player lock poisoned")
                    .update_spell(tag, fields, mana, grace, damage);
                if known {
                    self.events.publish(GameEvent::SpellUpdated { tag });
                } else {
                    log::warn!("updspell for unknown tag {tag}");
                }
                Ok(())
            }
            ServerCommand::DelSpell { tag } => {
                let known = self
                    .player
                    .lock()
                    .expect("player lock poisoned")
                    .remove_spell(tag);
                if known {
                    self.events.publish(GameEvent::SpellRemoved { tag });
                } else {
                    log::warn!("delspell for unknown tag {tag}");
                }
                Ok(())
            }
            ServerCommand::Query { flags, prompt } => {
                self.set_status(ConnectionStatus::Query);
                self.events.publish(GameEvent::Query { flags, prompt });
                Ok(())
            }
            ServerCommand::DrawInfo { color, text } => {
                self.events.publish(GameEvent::DrawInfo { color, text });
                Ok(())
            }
            ServerCommand::DrawExtInfo {
                color,
                kind,
                subtype,
                text,
            } => {
                self.events.publish(GameEvent::DrawExtInfo {
                    color,
                    kind,
                    subtype,
                    text,
                });
                Ok(())
            }
            ServerCommand::Sound { x, y, num, kind } => {
                self.events.publish(GameEvent::Sound { x, y, num, kind });
                Ok(())
            }
            ServerCommand::Comc { packet, time } => {
                self.events.publish(GameEvent::CommandAck { packet, time });
                Ok(())
            }
        }
    }

    /// The fixed opening sequence, sent when the server announces itself.
    /// `addme` follows later, once the image_info reply arrives.
    fn handshake(&self, cs: u32, sc: u32, info: &str) -> Result<(), ProtocolError> {
        log::info!("server version cs={cs} sc={sc} ({info})");
        let (w, h) = self.requested_map_size;
        self.writer.send(&client_commands::version(
            CLIENT_CS_VERSION,
            CLIENT_SC_VERSION,
            CLIENT_VERSION_INFO,
        ))?;
        self.writer
            .send(&client_commands::toggleextendedtext(&[1, 2, 3, 4, 5, 6, 7]))?;
        self.writer.send(&client_commands::setup(&[
            ("sound", "0".to_string()),
            ("exp64", "1".to_string()),
            ("map1cmd", "1".to_string()),
            ("darkness", "1".to_string()),
            ("newmapcmd", "1".to_string()),
            ("facecache", "1".to_string()),
            ("extendedTextInfos", "1".to_string()),
            ("itemcmd", "2".to_string()),
            ("spellmon", "1".to_string()),
            ("mapsize", format!("{w}x{h}")),
        ]))?;
        self.writer.send(&client_commands::requestinfo("image_info"))?;
        self.writer.send(&client_commands::requestinfo("skill_info"))?;
        self.writer.send(&client_commands::toggleextendedtext(&[1]))?;
        Ok(())
    }

    fn apply_setup(&mut self, pairs: &[(String, String)]) {
        for (key, value) in pairs {
            match key.as_str() {
                "mapsize" => match parse_map_size(value) {
                    Some(size) => {
                        log::info!("server map size {}x{}", size.0, size.1);
                        self.negotiated_map_size = size;
                    }
                    None => log::warn!("unparseable mapsize value {value:?}"),
                },
                "sound" => check_setup(key, value, "0"),
                "exp64" | "map1cmd" | "darkness" | "newmapcmd" | "facecache"
                | "extendedTextInfos" | "spellmon" => check_setup(key, value, "1"),
                "itemcmd" => check_setup(key, value, "2"),
                other => log::info!("ignoring setup option {other} = {value}"),
            }
        }
    }

    fn apply_replyinfo(&mut self, kind: &str, payload: &[u8]) -> Result<(), ProtocolError> {
        match kind {
            "image_info" => {
                let text = String::from_utf8_lossy(payload);
                match text.lines().next().and_then(|l| l.trim().parse::<u32>().ok()) {
                    Some(count) => log::info!("server has {count} faces"),
                    None => log::warn!("image_info reply without a face count"),
                }
                self.writer.send(&client_commands::addme())
            }
            "skill_info" => {
                let text = String::from_utf8_lossy(payload);
                let mut registered = Vec::new();
                {
                    let mut player = self.player.lock().expect("player lock poisoned");
                    for line in text.lines().filter(|l| !l.is_empty()) {
                        let Some((id, name)) = line.split_once(':') else {
                            log::warn!("bad skill_info line {line:?}");
                            continue;
                        };
                        let Ok(id) = id.parse::<u16>() else {
                            log::warn!("bad skill id in {line:?}");
                            continue;
                        };
                        let start = CS_STAT_SKILL_START as u16;
                        if !(start..start + SKILL_COUNT as u16).contains(&id) {
                            log::warn!("skill id {id} out of range");
                            continue;
                        }
                        let slot = (id - start) as usize;
                        player.skills.register(slot, name.to_string());
                        registered.push((id as u8, name.to_string()));
                    }
                }
                for (id, name) in registered {
                    self.events.publish(GameEvent::SkillRegistered { id, name });
                }
                Ok(())
            }
            other => {
                log::info!("ignoring replyinfo type {other:?}");
                Ok(())
            }
        }
    }

    fn apply_map1(&mut self, records: &[MapRecord]) -> Result<(), ProtocolError> {
        {
            let mut faces = self.faces.lock().expect("face lock poisoned");
            let mut map = self.map.lock().expect("map lock poisoned");
            let (view_w, view_h) = map.view_size();
            for rec in records {
                if rec.is_skip() {
                    continue;
                }
                if rec.x >= view_w || rec.y >= view_h {
                    log::warn!(
                        "map1 record at ({},{}) outside the {view_w}x{view_h} viewport",
                        rec.x,
                        rec.y
                    );
                    break;
                }
                let gx = rec.x + MAP_MARGIN;
                let gy = rec.y + MAP_MARGIN;
                if let Some(darkness) = rec.darkness {
                    if let Err(e) = map.set_darkness(gx, gy, u16::from(darkness)) {
                        log::warn!("{e}");
                    }
                }
                for &(layer, id) in &rec.faces {
                    let face = if id == EMPTY_FACE {
                        None
                    } else {
                        let snapshot = faces.square_face(id);
                        if !faces.face(id).is_some_and(|f| f.loaded) {
                            faces.request_fetch(id);
                        }
                        Some(snapshot)
                    };
                    if let Err(e) = map.set_face(gx, gy, layer, face) {
                        log::warn!("{e}");
                    }
                }
            }
        }
        self.top_up_fetches()?;
        self.events.publish(GameEvent::MapUpdated);
        Ok(())
    }

    fn apply_image(&mut self, face: u32, data: &[u8]) -> Result<(), ProtocolError> {
        let Ok(id) = u16::try_from(face) else {
            return Err(ProtocolError::malformed(
                "image",
                format!("face number {face} out of range"),
            ));
        };
        let stored = self
            .faces
            .lock()
            .expect("face lock poisoned")
            .store_image(id, data);
        if let Err(e) = stored {
            // Placeholder already substituted; keep going.
            log::warn!("{e}");
        }
        self.map
            .lock()
            .expect("map lock poisoned")
            .dirty_face(id);
        self.events.publish(GameEvent::FaceLoaded { id });
        self.top_up_fetches()
    }

    /// Sends one `askface` per newly pending id. No state lock is held
    /// while the writer lock is.
    fn top_up_fetches(&self) -> Result<(), ProtocolError> {
        let ids = self
            .faces
            .lock()
            .expect("face lock poisoned")
            .take_fetches();
        for id in ids {
            self.writer.send(&client_commands::askface(id))?;
        }
        Ok(())
    }

    fn apply_upditem(&self, update: ItemUpdate) {
        let location;
        {
            let mut player = self.player.lock().expect("player lock poisoned");
            if let Some(loc) = update.location {
                player.move_item(update.tag, loc);
            }
            let Some(item) = player.item_mut(update.tag) else {
                log::warn!("upditem for unknown tag {}", update.tag);
                return;
            };
            if let Some(flags) = update.flags {
                item.flags = flags;
            }
            if let Some(weight) = update.weight {
                item.weight = weight;
            }
            if let Some(face) = update.face {
                item.face = face;
            }
            if let Some((name, name_pl)) = update.names {
                item.name = name;
                item.name_pl = name_pl;
            }
            if let Some(anim) = update.anim {
                item.anim = anim;
            }
            if let Some(anim_speed) = update.anim_speed {
                item.anim_speed = anim_speed;
            }
            if let Some(nrof) = update.nrof {
                item.nrof = nrof;
            }
            location = item.location;
        }
        self.events.publish(GameEvent::ItemsChanged { location });
    }
}

fn check_setup(key: &str, value: &str, expected: &str) {
    if value != expected {
        log::warn!("server negotiated {key} = {value}, wanted {expected}");
    }
}

fn parse_map_size(value: &str) -> Option<(usize, usize)> {
    let (w, h) = value.split_once('x')?;
    Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
}

fn apply_stat(player: &mut PlayerState, update: StatUpdate) {
    match update {
        StatUpdate::Core { stat, value } => apply_core_stat(&mut player.stats, stat, value),
        StatUpdate::Exp(v) => player.stats.exp = u64::from(v),
        StatUpdate::Exp64(v) => player.stats.exp = v,
        StatUpdate::Speed(v) => player.stats.speed = v,
        StatUpdate::WeaponSpeed(v) => player.stats.weapon_speed = v,
        StatUpdate::WeightLimit(v) => player.stats.weight_limit = v,
        StatUpdate::SpellAttune(v) => player.stats.spell_attune = v,
        StatUpdate::SpellRepel(v) => player.stats.spell_repel = v,
        StatUpdate::SpellDeny(v) => player.stats.spell_deny = v,
        StatUpdate::Range(v) => player.stats.range = v,
        StatUpdate::Title(v) => player.stats.title = v,
        StatUpdate::Resist { slot, value } => {
            if let Some(entry) = player.stats.resists.get_mut(slot) {
                *entry = value;
            }
        }
        StatUpdate::Skill {
            slot,
            level,
            experience,
        } => {
            if !player.skills.set_value(slot, SkillValue { level, experience }) {
                log::warn!("skill value for out-of-range slot {slot}");
            }
        }
    }
}

fn apply_core_stat(stats: &mut Stats, stat: u8, value: i16) {
    match stat {
        CS_STAT_HP => stats.hp = value,
        CS_STAT_MAXHP => stats.max_hp = value,
        CS_STAT_SP => stats.sp = value,
        CS_STAT_MAXSP => stats.max_sp = value,
        CS_STAT_GRACE => stats.grace = value,
        CS_STAT_MAXGRACE => stats.max_grace = value,
        CS_STAT_STR => stats.str_ = value,
        CS_STAT_INT => stats.int_ = value,
        CS_STAT_WIS => stats.wis = value,
        CS_STAT_DEX => stats.dex = value,
        CS_STAT_CON => stats.con = value,
        CS_STAT_CHA => stats.cha = value,
        CS_STAT_POW => stats.pow = value,
        CS_STAT_LEVEL => stats.level = value,
        CS_STAT_WC => stats.wc = value,
        CS_STAT_AC => stats.ac = value,
        CS_STAT_DAM => stats.dam = value,
        CS_STAT_ARMOUR => stats.armour = value,
        CS_STAT_FOOD => stats.food = value,
        CS_STAT_FLAGS => stats.flags = value,
        other => log::warn!("no field for stat number {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use crate::network::frame;
    use ew_core::constants::{
        CS_STAT_EXP64, CS_STAT_HP, DEFAULT_DARKNESS, MAP_LAYERS,
    };
    use std::io::Write;

    /// Write sink that keeps its bytes reachable after being boxed.
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn take_frames(&self) -> Vec<Vec<u8>> {
            let mut bytes = self.0.lock().unwrap();
            let mut cursor = std::io::Cursor::new(std::mem::take(&mut *bytes));
            let mut frames = Vec::new();
            while let Some(f) = frame::read_frame(&mut cursor).unwrap() {
                frames.push(f);
            }
            frames
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn session() -> (Session, SharedBuf, EventBus) {
        let sink = SharedBuf::default();
        let events = EventBus::new();
        let session = Session::new(
            Arc::new(Mutex::new(MapGrid::new(5, 5))),
            Arc::new(Mutex::new(FaceCache::new(None))),
            Arc::new(Mutex::new(PlayerState::new())),
            Arc::new(PacketWriter::new(Box::new(sink.clone()))),
            events.clone(),
            Arc::new(Mutex::new(ConnectionStatus::Unconnected)),
            (5, 5),
        );
        (session, sink, events)
    }

    fn map1_frame(records: &[(u16, u16, u16, Option<u8>, &[u16])]) -> Vec<u8> {
        let mut body = b"map1 ".to_vec();
        for &(x, y, presence, darkness, faces) in records {
            let word =
                presence | (u16::from(darkness.is_some()) << 4) | (x << 5) | (y << 10);
            body.extend_from_slice(&word.to_be_bytes());
            if let Some(d) = darkness {
                body.push(d);
            }
            for f in faces {
                body.extend_from_slice(&f.to_be_bytes());
            }
        }
        body
    }

    #[test]
    fn handshake_order_is_fixed_and_addme_waits_for_image_info() {
        let (mut session, sink, _events) = session();
        session
            .handle_frame(b"version 1023 1027 Test Server")
            .unwrap();

        let frames = sink.take_frames();
        let names: Vec<String> = frames
            .iter()
            .map(|f| String::from_utf8_lossy(frame::split_frame(f).0).into_owned())
            .collect();
        assert_eq!(
            names,
            [
                "version",
                "toggleextendedtext",
                "setup",
                "requestinfo",
                "requestinfo",
                "toggleextendedtext"
            ]
        );
        assert_eq!(frames[3], b"requestinfo image_info");
        assert_eq!(frames[4], b"requestinfo skill_info");
        assert_eq!(frames[5], b"toggleextendedtext 1");
        assert!(
            std::str::from_utf8(&frames[2])
                .unwrap()
                .contains("mapsize 5x5")
        );

        session
            .handle_frame(b"replyinfo image_info\n1234\n")
            .unwrap();
        assert_eq!(sink.take_frames(), vec![b"addme".to_vec()]);
    }

    #[test]
    fn map1_touches_only_the_selected_layers() {
        let (mut session, _sink, _events) = session();
        // Layers {0,2}: wire order is layer 2 (face 7) then layer 0 (face 3).
        let frame = map1_frame(&[(2, 2, 0b0101, None, &[7, 3])]);
        session.handle_frame(&frame).unwrap();

        let map = session.map.lock().unwrap();
        let sq = map.square(2 + MAP_MARGIN, 2 + MAP_MARGIN).unwrap();
        assert_eq!(sq.faces[2].unwrap().id, 7);
        assert_eq!(sq.faces[0].unwrap().id, 3);
        assert!(sq.faces[1].is_none());
        assert!(sq.faces[3].is_none());
        assert_eq!(sq.darkness, DEFAULT_DARKNESS);
        drop(map);

        // Identical record again: idempotent.
        let frame = map1_frame(&[(2, 2, 0b0101, None, &[7, 3])]);
        session.handle_frame(&frame).unwrap();
        let map = session.map.lock().unwrap();
        let sq = map.square(2 + MAP_MARGIN, 2 + MAP_MARGIN).unwrap();
        assert_eq!(sq.faces[2].unwrap().id, 7);
        assert_eq!(sq.faces[0].unwrap().id, 3);
        for layer in 0..MAP_LAYERS {
            if layer == 0 || layer == 2 {
                continue;
            }
            assert!(sq.faces[layer].is_none());
        }
    }

    #[test]
    fn map1_unseen_faces_are_fetched_capped() {
        let (mut session, sink, _events) = session();
        let faces: Vec<u16> = (1..=12).collect();
        let records: Vec<(u16, u16, u16, Option<u8>, &[u16])> = faces
            .chunks(1)
            .enumerate()
            .map(|(i, f)| (i as u16 % 5, i as u16 / 5, 0b0001u16, None, f))
            .collect();
        let frame = map1_frame(&records);
        session.handle_frame(&frame).unwrap();

        let frames = sink.take_frames();
        assert_eq!(frames.len(), 8);
        assert!(frames.iter().all(|f| f.starts_with(b"askface ")));
    }

    #[test]
    fn bad_image_keeps_the_session_alive_and_tops_up() {
        let (mut session, sink, _events) = session();
        // Queue more fetches than the cap.
        for id in 1..=10u16 {
            session.faces.lock().unwrap().request_fetch(id);
        }
        session.top_up_fetches().unwrap();
        assert_eq!(sink.take_frames().len(), 8);

        // A garbage image for face 1 frees a slot; the next id goes out.
        let mut frame = b"image ".to_vec();
        frame.extend_from_slice(&1u32.to_be_bytes());
        frame.extend_from_slice(&3u32.to_be_bytes());
        frame.extend_from_slice(b"bad");
        session.handle_frame(&frame).unwrap();

        let frames = sink.take_frames();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].starts_with(b"askface "));
        assert!(session.faces.lock().unwrap().face(1).unwrap().loaded);
    }

    #[test]
    fn query_flips_status_and_surfaces_the_prompt() {
        let (mut session, _sink, events) = session();
        let rx = events.subscribe(EventKind::STATUS | EventKind::QUERY);
        session.handle_frame(b"query 4 What is your name?").unwrap();

        assert!(matches!(
            rx.try_recv(),
            Ok(GameEvent::StatusChanged(ConnectionStatus::Query))
        ));
        assert!(matches!(
            rx.try_recv(),
            Ok(GameEvent::Query { flags: 4, ref prompt }) if prompt == "What is your name?"
        ));
    }

    #[test]
    fn stats_frames_update_typed_fields() {
        let (mut session, _sink, _events) = session();
        let mut frame = b"stats ".to_vec();
        frame.push(CS_STAT_HP);
        frame.extend_from_slice(&37i16.to_be_bytes());
        frame.push(CS_STAT_EXP64);
        frame.extend_from_slice(&5_000_000_000u64.to_be_bytes());
        session.handle_frame(&frame).unwrap();

        let player = session.player.lock().unwrap();
        assert_eq!(player.stats.hp, 37);
        assert_eq!(player.stats.exp, 5_000_000_000);
    }

    #[test]
    fn skill_info_reply_registers_names() {
        let (mut session, _sink, _events) = session();
        session
            .handle_frame(b"replyinfo skill_info\n140:lockpicking\n141:alchemy\n999:bogus\n")
            .unwrap();
        let player = session.player.lock().unwrap();
        assert_eq!(player.skills.name(0), Some("lockpicking"));
        assert_eq!(player.skills.name(1), Some("alchemy"));
    }

    #[test]
    fn setup_mapsize_echo_controls_the_next_newmap() {
        let (mut session, _sink, _events) = session();
        session.handle_frame(b"setup mapsize 7x9").unwrap();
        session.handle_frame(b"newmap").unwrap();
        let map = session.map.lock().unwrap();
        assert_eq!(map.view_size(), (7, 9));
    }

    #[test]
    fn unknown_commands_do_not_kill_the_session() {
        let (mut session, _sink, _events) = session();
        session.handle_frame(b"frobnicate now").unwrap();
        session.handle_frame(b"newmap").unwrap();
    }
}
