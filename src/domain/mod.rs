//! Domain layer: billing entities, value objects and the ports the engine talks through.

pub mod directory;
pub mod money;
pub mod outcome;
pub mod payment;
pub mod ports;
pub mod rate;
pub mod stay;
pub mod title;
pub mod transfer;
