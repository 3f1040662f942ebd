pub mod item;
pub mod map;
pub mod spell;
pub mod stats;
