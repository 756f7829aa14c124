//! # Debris Tracking Satellite Simulator
//!
//! A ground-side stand-in for a debris-tracking satellite, used as deterministic
//! test stimulus during integration testing. It accepts a single client, evolves
//! a seeded synthetic debris field on a fixed schedule, and streams frame
//! snapshots and on-demand placeholder imagery over a length-prefixed JSON channel.
//!
//! ## Features
//!
//! - **Deterministic debris field**: Seeded spawning, straight-line motion, culling at the view edge
//! - **Periodic broadcast**: One frame snapshot per tick, pushed to the client
//! - **Synthetic imagery**: Id-tagged placeholder chunks with position offsets
//! - **Tolerant dispatch**: Unknown message kinds are logged, never fatal
//! - **Single-client sessions**: One connection per run, torn down cleanly on disconnect
//!
//! ## Quick Start
//!
//! ```rust
//! use debrissat::{FieldSimulator, ImageSynthesizer, SimConfig};
//!
//! let config = SimConfig::default();
//! let mut field = FieldSimulator::from_config(&config);
//! field.initialize(config.initial_entity_count());
//!
//! // Advance one tick and capture the field
//! let report = field.tick();
//! let frame = field.snapshot();
//! assert_eq!(frame.entities.len(), field.len());
//! assert!(report.stepped <= config.max_entities);
//!
//! // Imagery for an id that is not live falls back to the placeholder
//! let image = ImageSynthesizer::from_config(&config).synthesize(&field, 9_999);
//! assert_eq!(image.entity_id, debrissat::entity::PLACEHOLDER_ID);
//! ```
//!
//! ## Architecture
//!
//! - [`entity`] - Debris entity model
//! - [`field`] - Seeded field simulation
//! - [`imagery`] - Placeholder image synthesis
//! - [`protocol`] - Message kinds and frame encoding
//! - [`transport`] - Length-prefixed framed reader/writer
//! - [`broadcast`] - Periodic tick-and-publish scheduler
//! - [`session`] - Per-connection protocol handler
//! - [`listener`] - Single-client TCP endpoint

#![deny(warnings)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod broadcast;
pub mod config;
pub mod entity;
pub mod error;
pub mod field;
pub mod imagery;
pub mod listener;
pub mod protocol;
pub mod session;
pub mod transport;

// Re-export main public types for convenience
pub use broadcast::BroadcastScheduler;
pub use config::SimConfig;
pub use entity::Entity;
pub use field::FieldSimulator;
pub use imagery::ImageSynthesizer;
pub use listener::SatListener;
pub use protocol::{FrameSnapshot, ImageResponse, Message};
pub use session::{Session, SessionReport};
