//! # Rogue Wave
//!
//! The engine-independent core of Rogue Wave: procedural campaign levels
//! and the nanobot recipe economy, tied together into a playable session.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐   ┌──────────────────────┐
//! │ rogue_wave_procedural│   │ rogue_wave_economy   │
//! │  • Tile constraints  │   │  • Recipes           │
//! │  • Level generator   │   │  • Nanobot scheduler │
//! │  • Encounters        │   │  • Profiles          │
//! └──────────┬───────────┘   └──────────┬───────────┘
//!            │                          │
//!            └────────────┬─────────────┘
//!                         ▼
//!              ┌─────────────────────┐        ┌────────┐
//!              │ Session             │──────> │  Host  │
//!              │  • Runs and deaths  │ events │        │
//!              │  • Autosave         │        └────────┘
//!              └─────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `config`: Game configuration loaded from TOML
//! - `events`: Session-to-host event channel
//! - `session`: Run lifecycle orchestration

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod events;
pub mod session;

// Re-export the subsystems
pub use rogue_wave_economy as economy;
pub use rogue_wave_procedural as procedural;

pub use config::{CampaignConfig, GameConfig, SessionConfig};
pub use error::{SessionError, SessionResult};
pub use events::{EventBus, EventReceiver, EventSender, GameEvent, TransitionReason};
pub use session::{load_campaign, ActiveLevel, Session, LEVEL_DIR};
