mod providers;

pub mod memory;
pub mod sled;

pub use self::{memory::MemoryStorage, providers::*, sled::SledStorage};

/// Every collection the referral engine reads and writes.
///
/// Writes go through `&self`: backends are shared between concurrent
/// reward calls and must make each counter update atomic on their own.
pub trait Storage:
    UserProvider + RewardLedgerProvider + SettingsProvider + Send + Sync + 'static
{
}
