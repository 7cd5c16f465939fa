//! # Arena Client Library
//!
//! Client-side simulation for the arena vehicle game: local driving, weapons,
//! the boss encounter, pickups, portals and the respawn flow, kept in sync with
//! an authoritative server over UDP.
//!
//! ## Architecture Overview
//!
//! Everything that happens in a frame goes through [`game::Simulation::tick`].
//! The simulation never touches a socket or a screen directly:
//!
//! - Server events are queued with [`game::Simulation::push_event`] and applied
//!   at the start of the next tick.
//! - Outgoing intents, UI notices and portal navigation are queued and drained
//!   by the driver after the tick.
//! - Rendering goes through the [`collaborators::VisualFactory`] trait, so the
//!   whole simulation runs headless in tests.
//!
//! ### Authority
//! In [`boss::AuthorityMode::Server`] the server decides boss defeats,
//! respawns and pickup ownership; the client only reports hits and waits for
//! confirmation. [`boss::AuthorityMode::Offline`] lets the client resolve
//! those decisions itself so the game is playable without a server.
//!
//! ## Module Organization
//!
//! ### Simulation (`game`, `reconcile`, `scheduler`, `registry`)
//! The tick pipeline, application of server events, virtual-time timers and
//! the store of every live entity.
//!
//! ### Entities (`vehicle`, `boss`, `projectile`, `pickup`, `portal`, `easter_egg`)
//! Per-entity state and the rules that mutate it.
//!
//! ### Rules (`collision`, `respawn`)
//! Boss contact resolution and the death/respawn state machine.
//!
//! ### Driver (`network`, `hud`, `config`, `controls`, `collaborators`)
//! The tokio UDP loop, a log-backed HUD, session configuration, player input
//! and the traits the simulation talks to the outside world through.
//!
//! ## Usage Example
//!
//! ```rust
//! use client::collaborators::{ArenaMap, NullVisuals};
//! use client::config::SimConfig;
//! use client::game::Simulation;
//! use std::time::Duration;
//!
//! let mut sim = Simulation::new(
//!     SimConfig::offline(),
//!     "local",
//!     Box::new(ArenaMap::default()),
//!     Box::new(NullVisuals::new()),
//! );
//! sim.tick(Duration::from_millis(16));
//! assert!(sim.boss().is_some());
//! ```

pub mod boss;
pub mod collaborators;
pub mod collision;
pub mod config;
pub mod controls;
pub mod easter_egg;
pub mod game;
pub mod hud;
pub mod network;
pub mod pickup;
pub mod portal;
pub mod projectile;
pub mod reconcile;
pub mod registry;
pub mod respawn;
pub mod scheduler;
pub mod vehicle;
