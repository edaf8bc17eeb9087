// Allow some clippy lints kept consistent with the common crate
#![allow(clippy::module_inception)]
#![allow(clippy::too_many_arguments)]

pub mod config;
pub mod core;
