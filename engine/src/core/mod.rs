pub mod directory;
pub mod error;
pub mod leaderboard;
pub mod rewards;
pub mod settings;
pub mod storage;
