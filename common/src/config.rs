// Levels are capped, the simulator always projects the full range
pub const MAX_LEVEL: u32 = 100;

// First level every user starts at, even with zero referrals
pub const MIN_LEVEL: u32 = 1;

// Referral codes are short enough to be typed by hand
pub const REFERRAL_CODE_LENGTH: usize = 6;

// Uppercase letters and digits only
pub const REFERRAL_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

// How many times a fresh code is drawn before giving up on collisions
pub const DEFAULT_REFERRAL_CODE_ATTEMPTS: u32 = 16;

// Maximum number of users returned per leaderboard page
pub const DEFAULT_LEADERBOARD_PAGE_SIZE: u32 = 100;

// Maximum number of rows returned per page for per-user listings
// (direct referrals, reward history)
pub const MAX_ENTRIES_PER_PAGE: u32 = 1000;

// Default reward rates, expressed as fractions of the event amount
pub const DEFAULT_TIER1_RATE: f64 = 0.10;
pub const DEFAULT_TIER2_RATE: f64 = 0.05;

// Default linear XP curve: 1.0 at level 1, +2% per level
pub const DEFAULT_BASE_XP_MULTIPLIER: f64 = 1.0;
pub const DEFAULT_XP_MULTIPLIER_PER_LEVEL: f64 = 0.02;
