//! Shared domain types for the Veris admission and network-defense core.

pub mod address;
pub mod events;
pub mod identity;
pub mod sensitive;
pub mod transaction;
pub mod transfer;
