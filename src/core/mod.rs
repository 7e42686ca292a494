//! Core transition engine - framework-agnostic and storage-agnostic.
//!
//! Leaf to root: [`envelope`] builds the period snapshot, [`preferences`] remembers
//! choices, [`validation`] checks them, [`processor`] moves balances, [`rollover`]
//! clears and re-dates transactions, and [`orchestrator`] sequences it all.

pub mod batch;
pub mod envelope;
pub mod orchestrator;
pub mod period;
pub mod preferences;
pub mod processor;
pub mod rollover;
pub mod store;
pub mod validation;
