//! The player-side registry: items by tag, the player object, stats,
//! skills and known spells.

use std::collections::HashMap;

use ew_core::constants::UpdSpell;
use ew_core::types::item::Item;
use ew_core::types::spell::Spell;
use ew_core::types::stats::{SkillSet, Stats};

/// The player object as announced by the `player` command.
#[derive(Debug, Clone, Default)]
pub struct Player {
    pub tag: u32,
    pub weight: u32,
    pub face: u32,
    pub name: String,
}

/// Everything the server tells us about the character and what it carries.
///
/// Items are keyed by tag; per-location insertion order is kept so inventory
/// listings are stable across updates.
#[derive(Default)]
pub struct PlayerState {
    items: HashMap<u32, Item>,
    locations: HashMap<u32, Vec<u32>>,
    player: Option<Player>,
    pub stats: Stats,
    pub skills: SkillSet,
    spells: HashMap<u32, Spell>,
}

impl PlayerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn player(&self) -> Option<&Player> {
        self.player.as_ref()
    }

    /// Installs a new player object. Items owned by the previous player tag
    /// are dropped; the server re-sends the new inventory afterwards.
    pub fn set_player(&mut self, player: Player) {
        if let Some(old) = self.player.take() {
            if old.tag != player.tag {
                self.clear_location(old.tag);
            }
        }
        log::info!("now playing as {} (tag {})", player.name, player.tag);
        self.player = Some(player);
    }

    /// Inserts or replaces an item. A re-sent tag moves the item to its new
    /// location, keeping tag uniqueness.
    pub fn upsert_item(&mut self, item: Item) {
        if let Some(old) = self.items.get(&item.tag) {
            self.unlink(old.location, item.tag);
        }
        self.locations.entry(item.location).or_default().push(item.tag);
        self.items.insert(item.tag, item);
    }

    pub fn item(&self, tag: u32) -> Option<&Item> {
        self.items.get(&tag)
    }

    /// Mutable access for `upditem`. Relocation must go through
    /// [`PlayerState::move_item`] so the ordering lists stay consistent.
    pub fn item_mut(&mut self, tag: u32) -> Option<&mut Item> {
        self.items.get_mut(&tag)
    }

    /// Moves an item between locations. Returns false for an unknown tag.
    pub fn move_item(&mut self, tag: u32, location: u32) -> bool {
        let Some(old_location) = self.items.get(&tag).map(|i| i.location) else {
            return false;
        };
        if old_location != location {
            self.unlink(old_location, tag);
            self.locations.entry(location).or_default().push(tag);
            if let Some(item) = self.items.get_mut(&tag) {
                item.location = location;
            }
        }
        true
    }

    /// Removes one item. Returns false for an unknown tag.
    pub fn remove_item(&mut self, tag: u32) -> bool {
        match self.items.remove(&tag) {
            Some(item) => {
                self.unlink(item.location, tag);
                true
            }
            None => false,
        }
    }

    /// Empties a container: removes every item whose location is `tag`.
    pub fn clear_location(&mut self, tag: u32) {
        if let Some(tags) = self.locations.remove(&tag) {
            for t in tags {
                self.items.remove(&t);
            }
        }
    }

    /// Items in one location, in the order the server sent them.
    pub fn items_at(&self, location: u32) -> impl Iterator<Item = &Item> {
        self.locations
            .get(&location)
            .into_iter()
            .flatten()
            .filter_map(|tag| self.items.get(tag))
    }

    pub fn add_spell(&mut self, spell: Spell) {
        self.spells.insert(spell.tag, spell);
    }

    /// Applies an `updspell` delta. Returns false for an unknown tag.
    pub fn update_spell(
        &mut self,
        tag: u32,
        fields: UpdSpell,
        mana: u16,
        grace: u16,
        damage: u16,
    ) -> bool {
        let Some(spell) = self.spells.get_mut(&tag) else {
            return false;
        };
        if fields.contains(UpdSpell::MANA) {
            spell.mana = mana;
        }
        if fields.contains(UpdSpell::GRACE) {
            spell.grace = grace;
        }
        if fields.contains(UpdSpell::DAMAGE) {
            spell.damage = damage;
        }
        true
    }

    pub fn remove_spell(&mut self, tag: u32) -> bool {
        self.spells.remove(&tag).is_some()
    }

    pub fn spell(&self, tag: u32) -> Option<&Spell> {
        self.spells.get(&tag)
    }

    fn unlink(&mut self, location: u32, tag: u32) {
        if let Some(tags) = self.locations.get_mut(&location) {
            tags.retain(|&t| t != tag);
            if tags.is_empty() {
                self.locations.remove(&location);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ew_core::constants::ItemFlags;

    fn item(tag: u32, location: u32, name: &str) -> Item {
        Item {
            tag,
            location,
            flags: ItemFlags::empty(),
            weight: 10,
            face: 1,
            name: name.to_string(),
            name_pl: format!("{name}s"),
            anim: 0,
            anim_speed: 0,
            nrof: 1,
            item_type: 0,
        }
    }

    #[test]
    fn resent_tag_moves_the_item() {
        let mut state = PlayerState::new();
        state.upsert_item(item(10, 1, "sword"));
        state.upsert_item(item(11, 1, "shield"));

        let mut moved = item(10, 2, "sword");
        moved.nrof = 3;
        state.upsert_item(moved);

        assert_eq!(state.items_at(1).count(), 1);
        let in_two: Vec<_> = state.items_at(2).collect();
        assert_eq!(in_two.len(), 1);
        assert_eq!(in_two[0].display_name(), "swords");
    }

    #[test]
    fn ordering_within_a_location_is_arrival_order() {
        let mut state = PlayerState::new();
        state.upsert_item(item(1, 5, "a"));
        state.upsert_item(item(2, 5, "b"));
        state.upsert_item(item(3, 5, "c"));
        let names: Vec<_> = state.items_at(5).map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn delinv_empties_a_container() {
        let mut state = PlayerState::new();
        state.upsert_item(item(1, 5, "a"));
        state.upsert_item(item(2, 5, "b"));
        state.upsert_item(item(3, 6, "c"));
        state.clear_location(5);
        assert!(state.item(1).is_none());
        assert!(state.item(2).is_none());
        assert!(state.item(3).is_some());
    }

    #[test]
    fn remove_item_reports_unknown_tags() {
        let mut state = PlayerState::new();
        state.upsert_item(item(1, 0, "a"));
        assert!(state.remove_item(1));
        assert!(!state.remove_item(1));
    }

    #[test]
    fn new_player_drops_the_old_inventory() {
        let mut state = PlayerState::new();
        state.set_player(Player {
            tag: 100,
            weight: 0,
            face: 0,
            name: "Alder".to_string(),
        });
        state.upsert_item(item(1, 100, "sword"));
        state.upsert_item(item(2, 0, "rock"));

        state.set_player(Player {
            tag: 200,
            weight: 0,
            face: 0,
            name: "Betony".to_string(),
        });
        assert!(state.item(1).is_none());
        assert!(state.item(2).is_some());
        assert_eq!(state.player().unwrap().tag, 200);
    }

    #[test]
    fn spell_update_applies_only_selected_fields() {
        let mut state = PlayerState::new();
        state.add_spell(Spell {
            tag: 7,
            level: 1,
            casting_time: 10,
            mana: 5,
            grace: 0,
            damage: 8,
            skill: 141,
            path: 0,
            face: 0,
            name: "firebolt".to_string(),
            message: String::new(),
        });

        assert!(state.update_spell(7, UpdSpell::MANA | UpdSpell::DAMAGE, 9, 99, 12));
        let spell = state.spell(7).unwrap();
        assert_eq!(spell.mana, 9);
        assert_eq!(spell.grace, 0);
        assert_eq!(spell.damage, 12);

        assert!(!state.update_spell(8, UpdSpell::MANA, 1, 1, 1));
        assert!(state.remove_spell(7));
        assert!(!state.remove_spell(7));
    }
}
