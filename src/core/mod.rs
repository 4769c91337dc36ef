pub mod codec;
pub mod command;
pub mod error;
pub mod filter;
pub mod parameters;
pub mod runner;
