// Referral attribution and tiered rewards
// This module holds the data model shared by every storage backend and the
// pure parts of the reward system.
//
// Key Features:
// - Two-level referral graph (referrer + grand referrer snapshot taken at signup)
// - Linear XP multiplier scaling reward rates by level
// - Level/rank derivation from a cumulative invite curve (capped at level 100)
// - Simulator projecting the full level range for the admin settings screen

mod code;
mod error;
mod level;
mod reward;
mod settings;
mod simulator;
mod user;

pub use code::*;
pub use error::*;
pub use level::*;
pub use reward::*;
pub use settings::*;
pub use simulator::*;
pub use user::*;
