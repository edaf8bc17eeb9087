mod ledger;
mod settings;
mod user;

pub use ledger::*;
pub use settings::*;
pub use user::*;
