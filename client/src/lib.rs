//! Network half of the Emberwake client: framing, command interpreters,
//! the map grid engine, face cache, player registry and event bus. The
//! rendering/input layers consume this crate through the shared-state
//! handles on [`network::Connection`] and the [`events::EventBus`].

pub mod events;
pub mod faces;
pub mod map;
pub mod network;
pub mod player_state;
pub mod settings;
