//! Inbound command decoding: one frame in, one typed [`ServerCommand`] out.
//!
//! Parsing is side-effect free; applying a command to client state is the
//! session's job. Body layouts are big-endian throughout.

use std::str::FromStr;

use ew_core::byte_operations::ByteReader;
use ew_core::constants::{
    CS_STAT_AC, CS_STAT_ARMOUR, CS_STAT_CHA, CS_STAT_CON, CS_STAT_DAM, CS_STAT_DEX, CS_STAT_EXP,
    CS_STAT_EXP64, CS_STAT_FLAGS, CS_STAT_FOOD, CS_STAT_GRACE, CS_STAT_HP, CS_STAT_INT,
    CS_STAT_LEVEL, CS_STAT_MAXGRACE, CS_STAT_MAXHP, CS_STAT_MAXSP, CS_STAT_POW, CS_STAT_RANGE,
    CS_STAT_RESIST_START, CS_STAT_SKILL_START, CS_STAT_SP, CS_STAT_SPEED, CS_STAT_SPELL_ATTUNE,
    CS_STAT_SPELL_DENY, CS_STAT_SPELL_REPEL, CS_STAT_STR, CS_STAT_TITLE, CS_STAT_WC,
    CS_STAT_WEAP_SP, CS_STAT_WEIGHT_LIM, CS_STAT_WIS, ItemFlags, MAP_LAYERS, RESIST_TYPES,
    SKILL_COUNT, UpdItem, UpdSpell,
};
use ew_core::error::ProtocolError;
use ew_core::types::item::Item;
use ew_core::types::spell::Spell;

use super::frame;

/// One decoded `map1` record. Raw coordinates are viewport-relative; faces
/// are kept in wire order, highest layer index first.
#[derive(Debug, PartialEq, Eq)]
pub struct MapRecord {
    pub x: usize,
    pub y: usize,
    pub darkness: Option<u8>,
    pub faces: Vec<(usize, u16)>,
}

impl MapRecord {
    /// A run-skip record: presence nibble 0, nothing follows the word.
    pub fn is_skip(&self) -> bool {
        self.darkness.is_none() && self.faces.is_empty()
    }
}

/// One `upditem` delta; only the fields selected by `fields` are present.
#[derive(Debug)]
pub struct ItemUpdate {
    pub tag: u32,
    pub fields: UpdItem,
    pub location: Option<u32>,
    pub flags: Option<ItemFlags>,
    pub weight: Option<u32>,
    pub face: Option<u32>,
    pub names: Option<(String, String)>,
    pub anim: Option<u16>,
    pub anim_speed: Option<u8>,
    pub nrof: Option<u32>,
}

/// One entry of a `stats` command, already matched to its wire width.
#[derive(Debug, PartialEq, Eq)]
pub enum StatUpdate {
    /// The plain i16 stats (hp, abilities, combat values, flags and so on).
    Core { stat: u8, value: i16 },
    Exp(u32),
    Exp64(u64),
    Speed(u32),
    WeaponSpeed(u32),
    WeightLimit(u32),
    SpellAttune(u32),
    SpellRepel(u32),
    SpellDeny(u32),
    Range(String),
    Title(String),
    Resist { slot: usize, value: i16 },
    Skill { slot: usize, level: u8, experience: u64 },
}

#[derive(Debug)]
pub enum ServerCommand {
    Version {
        cs: u32,
        sc: u32,
        info: String,
    },
    Setup(Vec<(String, String)>),
    ReplyInfo {
        kind: String,
        payload: Vec<u8>,
    },
    AddmeSuccess,
    AddmeFailed,
    Goodbye,
    NewMap,
    Map1(Vec<MapRecord>),
    MapScroll {
        dx: i32,
        dy: i32,
    },
    MagicMap {
        width: u32,
        height: u32,
        px: u32,
        py: u32,
        data: Vec<u8>,
    },
    Image {
        face: u32,
        data: Vec<u8>,
    },
    Face1 {
        num: u16,
        checksum: u32,
        name: String,
    },
    Item2 {
        location: u32,
        items: Vec<Item>,
    },
    UpdItem(ItemUpdate),
    DelItem(Vec<u32>),
    DelInv {
        location: u32,
    },
    Player {
        tag: u32,
        weight: u32,
        face: u32,
        name: String,
    },
    Stats(Vec<StatUpdate>),
    AddSpell(Vec<Spell>),
    UpdSpell {
        tag: u32,
        fields: UpdSpell,
        mana: u16,
        grace: u16,
        damage: u16,
    },
    DelSpell {
        tag: u32,
    },
    Query {
        flags: u32,
        prompt: String,
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
    Sound {
        x: i8,
        y: i8,
        num: u16,
        kind: u8,
    },
    Comc {
        packet: u16,
        time: u32,
    },
}

/// Decodes one frame. Unknown names are recoverable; the caller logs and
/// keeps reading.
pub fn parse(frame: &[u8]) -> Result<ServerCommand, ProtocolError> {
    let (name, body) = frame::split_frame(frame);
    // The name ends at the first space, so whole-name equality is the
    // longest matching command prefix.
    match name {
        b"version" => parse_version(body),
        b"setup" => parse_setup(body),
        b"replyinfo" => parse_replyinfo(body),
        b"addme_success" => Ok(ServerCommand::AddmeSuccess),
        b"addme_failed" => Ok(ServerCommand::AddmeFailed),
        b"goodbye" => Ok(ServerCommand::Goodbye),
        b"newmap" => Ok(ServerCommand::NewMap),
        b"map1" => parse_map1(body),
        b"map_scroll" => parse_map_scroll(body),
        b"magicmap" => parse_magicmap(body),
        b"image" => parse_image(body),
        b"face1" => parse_face1(body),
        b"item2" => parse_item2(body),
        b"upditem" => parse_upditem(body),
        b"delitem" => parse_delitem(body),
        b"delinv" => parse_delinv(body),
        b"player" => parse_player(body),
        b"stats" => parse_stats(body),
        b"addspell" => parse_addspell(body),
        b"updspell" => parse_updspell(body),
        b"delspell" => parse_delspell(body),
        b"query" => parse_query(body),
        b"drawinfo" => parse_drawinfo(body),
        b"drawextinfo" => parse_drawextinfo(body),
        b"sound" => parse_sound(body),
        b"comc" => parse_comc(body),
        _ => Err(ProtocolError::UnknownCommand(
            String::from_utf8_lossy(name).into_owned(),
        )),
    }
}

fn ascii<'a>(body: &'a [u8], command: &'static str) -> Result<&'a str, ProtocolError> {
    std::str::from_utf8(body).map_err(|_| ProtocolError::malformed(command, "body is not UTF-8"))
}

fn number<T: FromStr>(token: &str, command: &'static str) -> Result<T, ProtocolError> {
    token
        .parse()
        .map_err(|_| ProtocolError::malformed(command, format!("bad number {token:?}")))
}

fn parse_version(body: &[u8]) -> Result<ServerCommand, ProtocolError> {
    let text = ascii(body, "version")?;
    let mut parts = text.splitn(3, ' ');
    let cs = number(
        parts
            .next()
            .ok_or_else(|| ProtocolError::malformed("version", "missing csval"))?,
        "version",
    )?;
    let sc = number(
        parts
            .next()
            .ok_or_else(|| ProtocolError::malformed("version", "missing scval"))?,
        "version",
    )?;
    let info = parts.next().unwrap_or("").to_string();
    Ok(ServerCommand::Version { cs, sc, info })
}

fn parse_setup(body: &[u8]) -> Result<ServerCommand, ProtocolError> {
    let text = ascii(body, "setup")?;
    let tokens: Vec<&str> = text.split_ascii_whitespace().collect();
    if tokens.len() % 2 != 0 {
        return Err(ProtocolError::malformed("setup", "odd token count"));
    }
    let pairs = tokens
        .chunks_exact(2)
        .map(|pair| (pair[0].to_string(), pair[1].to_string()))
        .collect();
    Ok(ServerCommand::Setup(pairs))
}

fn parse_replyinfo(body: &[u8]) -> Result<ServerCommand, ProtocolError> {
    let (kind, payload) = match body.iter().position(|&b| b == b'\n') {
        Some(i) => (&body[..i], &body[i + 1..]),
        None => (body, &body[body.len()..]),
    };
    Ok(ServerCommand::ReplyInfo {
        kind: String::from_utf8_lossy(kind).trim().to_string(),
        payload: payload.to_vec(),
    })
}

fn parse_map1(body: &[u8]) -> Result<ServerCommand, ProtocolError> {
    let mut r = ByteReader::new(body);
    let mut records = Vec::new();
    while !r.is_empty() {
        let word = r
            .read_u16()
            .ok_or_else(|| ProtocolError::malformed("map1", "truncated coordinate word"))?;
        let presence = word & 0x000F;
        let x = ((word >> 5) & 0x1F) as usize;
        let y = ((word >> 10) & 0x1F) as usize;

        // Presence nibble 0 is a run-skip: the record is just the word.
        if presence == 0 {
            records.push(MapRecord {
                x,
                y,
                darkness: None,
                faces: Vec::new(),
            });
            continue;
        }

        let darkness = if word & 0x0010 != 0 {
            Some(
                r.read_u8()
                    .ok_or_else(|| ProtocolError::malformed("map1", "truncated darkness byte"))?,
            )
        } else {
            None
        };

        // Faces arrive highest layer index first, lowest display priority
        // to highest.
        let mut faces = Vec::new();
        for layer in (0..MAP_LAYERS).rev() {
            if presence & (1 << layer) != 0 {
                let face = r
                    .read_u16()
                    .ok_or_else(|| ProtocolError::malformed("map1", "truncated face word"))?;
                faces.push((layer, face));
            }
        }
        records.push(MapRecord {
            x,
            y,
            darkness,
            faces,
        });
    }
    Ok(ServerCommand::Map1(records))
}

fn parse_map_scroll(body: &[u8]) -> Result<ServerCommand, ProtocolError> {
    let text = ascii(body, "map_scroll")?;
    let mut parts = text.split_ascii_whitespace();
    let dx = number(
        parts
            .next()
            .ok_or_else(|| ProtocolError::malformed("map_scroll", "missing dx"))?,
        "map_scroll",
    )?;
    let dy = number(
        parts
            .next()
            .ok_or_else(|| ProtocolError::malformed("map_scroll", "missing dy"))?,
        "map_scroll",
    )?;
    Ok(ServerCommand::MapScroll { dx, dy })
}

fn parse_magicmap(body: &[u8]) -> Result<ServerCommand, ProtocolError> {
    // Four ASCII decimals, one space, then w*h raw bytes.
    let mut rest = body;
    let mut header = [0u32; 4];
    for slot in &mut header {
        let end = rest
            .iter()
            .position(|&b| b == b' ')
            .ok_or_else(|| ProtocolError::malformed("magicmap", "truncated header"))?;
        let token = std::str::from_utf8(&rest[..end])
            .map_err(|_| ProtocolError::malformed("magicmap", "header is not UTF-8"))?;
        *slot = number(token, "magicmap")?;
        rest = &rest[end + 1..];
    }
    let [width, height, px, py] = header;
    let expected = (width as usize) * (height as usize);
    if rest.len() < expected {
        return Err(ProtocolError::malformed(
            "magicmap",
            format!("expected {expected} data bytes, got {}", rest.len()),
        ));
    }
    Ok(ServerCommand::MagicMap {
        width,
        height,
        px,
        py,
        data: rest[..expected].to_vec(),
    })
}

fn parse_image(body: &[u8]) -> Result<ServerCommand, ProtocolError> {
    let mut r = ByteReader::new(body);
    let face = r
        .read_u32()
        .ok_or_else(|| ProtocolError::malformed("image", "truncated face number"))?;
    let len = r
        .read_u32()
        .ok_or_else(|| ProtocolError::malformed("image", "truncated data length"))?
        as usize;
    let data = r
        .read_bytes(len)
        .ok_or_else(|| ProtocolError::malformed("image", "truncated image data"))?;
    Ok(ServerCommand::Image {
        face,
        data: data.to_vec(),
    })
}

fn parse_face1(body: &[u8]) -> Result<ServerCommand, ProtocolError> {
    let mut r = ByteReader::new(body);
    let num = r
        .read_u16()
        .ok_or_else(|| ProtocolError::malformed("face1", "truncated face number"))?;
    let checksum = r
        .read_u32()
        .ok_or_else(|| ProtocolError::malformed("face1", "truncated checksum"))?;
    let name = r.rest_str();
    Ok(ServerCommand::Face1 {
        num,
        checksum,
        name,
    })
}

/// Splits the `name '\0' name_pl` buffer; a missing separator reuses the
/// singular form.
fn split_names(bytes: &[u8]) -> (String, String) {
    match bytes.iter().position(|&b| b == 0) {
        Some(i) => (
            String::from_utf8_lossy(&bytes[..i]).to_string(),
            String::from_utf8_lossy(&bytes[i + 1..]).to_string(),
        ),
        None => {
            let name = String::from_utf8_lossy(bytes).to_string();
            (name.clone(), name)
        }
    }
}

fn parse_item2(body: &[u8]) -> Result<ServerCommand, ProtocolError> {
    let truncated = || ProtocolError::malformed("item2", "truncated item record");
    let mut r = ByteReader::new(body);
    let location = r.read_u32().ok_or_else(truncated)?;
    let mut items = Vec::new();
    while !r.is_empty() {
        let tag = r.read_u32().ok_or_else(truncated)?;
        let flags = ItemFlags::from_bits_retain(r.read_u32().ok_or_else(truncated)?);
        let weight = r.read_u32().ok_or_else(truncated)?;
        let face = r.read_u32().ok_or_else(truncated)?;
        let names_len = r.read_u8().ok_or_else(truncated)? as usize;
        let (name, name_pl) = split_names(r.read_bytes(names_len).ok_or_else(truncated)?);
        let anim = r.read_u16().ok_or_else(truncated)?;
        let anim_speed = r.read_u8().ok_or_else(truncated)?;
        let nrof = r.read_u32().ok_or_else(truncated)?;
        let item_type = r.read_u16().ok_or_else(truncated)?;
        items.push(Item {
            tag,
            location,
            flags,
            weight,
            face,
            name,
            name_pl,
            anim,
            anim_speed,
            nrof,
            item_type,
        });
    }
    Ok(ServerCommand::Item2 { location, items })
}

fn parse_upditem(body: &[u8]) -> Result<ServerCommand, ProtocolError> {
    let truncated = || ProtocolError::malformed("upditem", "truncated update");
    let mut r = ByteReader::new(body);
    let fields = UpdItem::from_bits_retain(r.read_u8().ok_or_else(truncated)?);
    let tag = r.read_u32().ok_or_else(truncated)?;

    let mut update = ItemUpdate {
        tag,
        fields,
        location: None,
        flags: None,
        weight: None,
        face: None,
        names: None,
        anim: None,
        anim_speed: None,
        nrof: None,
    };
    if fields.contains(UpdItem::LOCATION) {
        update.location = Some(r.read_u32().ok_or_else(truncated)?);
    }
    if fields.contains(UpdItem::FLAGS) {
        update.flags = Some(ItemFlags::from_bits_retain(
            r.read_u32().ok_or_else(truncated)?,
        ));
    }
    if fields.contains(UpdItem::WEIGHT) {
        update.weight = Some(r.read_u32().ok_or_else(truncated)?);
    }
    if fields.contains(UpdItem::FACE) {
        update.face = Some(r.read_u32().ok_or_else(truncated)?);
    }
    if fields.contains(UpdItem::NAME) {
        let len = r.read_u8().ok_or_else(truncated)? as usize;
        update.names = Some(split_names(r.read_bytes(len).ok_or_else(truncated)?));
    }
    if fields.contains(UpdItem::ANIM) {
        update.anim = Some(r.read_u16().ok_or_else(truncated)?);
    }
    if fields.contains(UpdItem::ANIMSPEED) {
        update.anim_speed = Some(r.read_u8().ok_or_else(truncated)?);
    }
    if fields.contains(UpdItem::NROF) {
        update.nrof = Some(r.read_u32().ok_or_else(truncated)?);
    }
    Ok(ServerCommand::UpdItem(update))
}

fn parse_delitem(body: &[u8]) -> Result<ServerCommand, ProtocolError> {
    let mut r = ByteReader::new(body);
    let mut tags = Vec::new();
    while !r.is_empty() {
        tags.push(
            r.read_u32()
                .ok_or_else(|| ProtocolError::malformed("delitem", "truncated tag"))?,
        );
    }
    Ok(ServerCommand::DelItem(tags))
}

fn parse_delinv(body: &[u8]) -> Result<ServerCommand, ProtocolError> {
    let text = ascii(body, "delinv")?;
    let location = number(text.trim(), "delinv")?;
    Ok(ServerCommand::DelInv { location })
}

fn parse_player(body: &[u8]) -> Result<ServerCommand, ProtocolError> {
    let truncated = || ProtocolError::malformed("player", "truncated body");
    let mut r = ByteReader::new(body);
    let tag = r.read_u32().ok_or_else(truncated)?;
    let weight = r.read_u32().ok_or_else(truncated)?;
    let face = r.read_u32().ok_or_else(truncated)?;
    let name = r.read_string8().ok_or_else(truncated)?;
    Ok(ServerCommand::Player {
        tag,
        weight,
        face,
        name,
    })
}

fn parse_stats(body: &[u8]) -> Result<ServerCommand, ProtocolError> {
    let truncated = || ProtocolError::malformed("stats", "truncated stat value");
    let mut r = ByteReader::new(body);
    let mut updates = Vec::new();
    while !r.is_empty() {
        let stat = r.read_u8().ok_or_else(truncated)?;
        let update = match stat {
            CS_STAT_EXP => StatUpdate::Exp(r.read_u32().ok_or_else(truncated)?),
            CS_STAT_EXP64 => StatUpdate::Exp64(r.read_u64().ok_or_else(truncated)?),
            CS_STAT_SPEED => StatUpdate::Speed(r.read_u32().ok_or_else(truncated)?),
            CS_STAT_WEAP_SP => StatUpdate::WeaponSpeed(r.read_u32().ok_or_else(truncated)?),
            CS_STAT_WEIGHT_LIM => StatUpdate::WeightLimit(r.read_u32().ok_or_else(truncated)?),
            CS_STAT_SPELL_ATTUNE => StatUpdate::SpellAttune(r.read_u32().ok_or_else(truncated)?),
            CS_STAT_SPELL_REPEL => StatUpdate::SpellRepel(r.read_u32().ok_or_else(truncated)?),
            CS_STAT_SPELL_DENY => StatUpdate::SpellDeny(r.read_u32().ok_or_else(truncated)?),
            CS_STAT_RANGE => StatUpdate::Range(r.read_string8().ok_or_else(truncated)?),
            CS_STAT_TITLE => StatUpdate::Title(r.read_string8().ok_or_else(truncated)?),
            s if (CS_STAT_RESIST_START..CS_STAT_RESIST_START + RESIST_TYPES as u8).contains(&s) => {
                StatUpdate::Resist {
                    slot: (s - CS_STAT_RESIST_START) as usize,
                    value: r.read_i16().ok_or_else(truncated)?,
                }
            }
            s if (CS_STAT_SKILL_START..CS_STAT_SKILL_START + SKILL_COUNT as u8).contains(&s) => {
                StatUpdate::Skill {
                    slot: (s - CS_STAT_SKILL_START) as usize,
                    level: r.read_u8().ok_or_else(truncated)?,
                    experience: r.read_u64().ok_or_else(truncated)?,
                }
            }
            CS_STAT_HP | CS_STAT_MAXHP | CS_STAT_SP | CS_STAT_MAXSP | CS_STAT_STR | CS_STAT_INT
            | CS_STAT_WIS | CS_STAT_DEX | CS_STAT_CON | CS_STAT_CHA | CS_STAT_LEVEL | CS_STAT_WC
            | CS_STAT_AC | CS_STAT_DAM | CS_STAT_ARMOUR | CS_STAT_FOOD | CS_STAT_POW
            | CS_STAT_GRACE | CS_STAT_MAXGRACE | CS_STAT_FLAGS => StatUpdate::Core {
                stat,
                value: r.read_i16().ok_or_else(truncated)?,
            },
            other => {
                return Err(ProtocolError::malformed(
                    "stats",
                    format!("unknown stat number {other}"),
                ));
            }
        };
        updates.push(update);
    }
    Ok(ServerCommand::Stats(updates))
}

fn parse_addspell(body: &[u8]) -> Result<ServerCommand, ProtocolError> {
    let truncated = || ProtocolError::malformed("addspell", "truncated spell record");
    let mut r = ByteReader::new(body);
    let mut spells = Vec::new();
    while !r.is_empty() {
        spells.push(Spell {
            tag: r.read_u32().ok_or_else(truncated)?,
            level: r.read_u16().ok_or_else(truncated)?,
            casting_time: r.read_u16().ok_or_else(truncated)?,
            mana: r.read_u16().ok_or_else(truncated)?,
            grace: r.read_u16().ok_or_else(truncated)?,
            damage: r.read_u16().ok_or_else(truncated)?,
            skill: r.read_u8().ok_or_else(truncated)?,
            path: r.read_u32().ok_or_else(truncated)?,
            face: r.read_u32().ok_or_else(truncated)?,
            name: r.read_string8().ok_or_else(truncated)?,
            message: r.read_string16().ok_or_else(truncated)?,
        });
    }
    Ok(ServerCommand::AddSpell(spells))
}

fn parse_updspell(body: &[u8]) -> Result<ServerCommand, ProtocolError> {
    let truncated = || ProtocolError::malformed("updspell", "truncated update");
    let mut r = ByteReader::new(body);
    let fields = UpdSpell::from_bits_retain(r.read_u8().ok_or_else(truncated)?);
    let tag = r.read_u32().ok_or_else(truncated)?;
    let mut mana = 0;
    let mut grace = 0;
    let mut damage = 0;
    if fields.contains(UpdSpell::MANA) {
        mana = r.read_u16().ok_or_else(truncated)?;
    }
    if fields.contains(UpdSpell::GRACE) {
        grace = r.read_u16().ok_or_else(truncated)?;
    }
    if fields.contains(UpdSpell::DAMAGE) {
        damage = r.read_u16().ok_or_else(truncated)?;
    }
    Ok(ServerCommand::UpdSpell {
        tag,
        fields,
        mana,
        grace,
        damage,
    })
}

fn parse_delspell(body: &[u8]) -> Result<ServerCommand, ProtocolError> {
    let mut r = ByteReader::new(body);
    let tag = r
        .read_u32()
        .ok_or_else(|| ProtocolError::malformed("delspell", "truncated tag"))?;
    Ok(ServerCommand::DelSpell { tag })
}

fn parse_query(body: &[u8]) -> Result<ServerCommand, ProtocolError> {
    let text = ascii(body, "query")?;
    let mut parts = text.splitn(2, ' ');
    let flags = number(
        parts
            .next()
            .ok_or_else(|| ProtocolError::malformed("query", "missing flags"))?,
        "query",
    )?;
    let prompt = parts.next().unwrap_or("").to_string();
    Ok(ServerCommand::Query { flags, prompt })
}

fn parse_drawinfo(body: &[u8]) -> Result<ServerCommand, ProtocolError> {
    let text = ascii(body, "drawinfo")?;
    let mut parts = text.splitn(2, ' ');
    let color = number(
        parts
            .next()
            .ok_or_else(|| ProtocolError::malformed("drawinfo", "missing color"))?,
        "drawinfo",
    )?;
    let text = parts.next().unwrap_or("").to_string();
    Ok(ServerCommand::DrawInfo { color, text })
}

fn parse_drawextinfo(body: &[u8]) -> Result<ServerCommand, ProtocolError> {
    let text = ascii(body, "drawextinfo")?;
    let mut parts = text.splitn(4, ' ');
    let mut header = [0u32; 3];
    for slot in &mut header {
        *slot = number(
            parts
                .next()
                .ok_or_else(|| ProtocolError::malformed("drawextinfo", "truncated header"))?,
            "drawextinfo",
        )?;
    }
    let [color, kind, subtype] = header;
    let text = parts.next().unwrap_or("").to_string();
    Ok(ServerCommand::DrawExtInfo {
        color,
        kind,
        subtype,
        text,
    })
}

fn parse_sound(body: &[u8]) -> Result<ServerCommand, ProtocolError> {
    let truncated = || ProtocolError::malformed("sound", "truncated body");
    let mut r = ByteReader::new(body);
    Ok(ServerCommand::Sound {
        x: r.read_i8().ok_or_else(truncated)?,
        y: r.read_i8().ok_or_else(truncated)?,
        num: r.read_u16().ok_or_else(truncated)?,
        kind: r.read_u8().ok_or_else(truncated)?,
    })
}

fn parse_comc(body: &[u8]) -> Result<ServerCommand, ProtocolError> {
    let truncated = || ProtocolError::malformed("comc", "truncated body");
    let mut r = ByteReader::new(body);
    Ok(ServerCommand::Comc {
        packet: r.read_u16().ok_or_else(truncated)?,
        time: r.read_u32().ok_or_else(truncated)?,
    })
}
