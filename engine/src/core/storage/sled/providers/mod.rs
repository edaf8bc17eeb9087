mod ledger;
mod settings;
mod user;
