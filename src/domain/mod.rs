//! Domain layer: entities, value objects and the port boundaries.

pub mod membership;
pub mod money;
pub mod order;
pub mod ports;
pub mod split;
pub mod wallet;
pub mod withdrawal;
