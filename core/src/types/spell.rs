//! Known spell as carried by `addspell` / `updspell`.

#[derive(Debug, Clone)]
pub struct Spell {
    pub tag: u32,
    pub level: u16,
    pub casting_time: u16,
    pub mana: u16,
    pub grace: u16,
    pub damage: u16,
    pub skill: u8,
    pub path: u32,
    pub face: u32,
    pub name: String,
    pub message: String,
}
