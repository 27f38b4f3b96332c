//! notetree: a hierarchy of notes and folders kept in a flat store
//!
//! Layers, innermost first: [`domain`] (entities and state machines),
//! [`application`] (services and the interactive [`application::Session`]),
//! [`infrastructure`] (stores and wiring) and [`cli`].

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
