#![deny(warnings)]

pub mod capture;
pub mod config;
pub mod emotion;
pub mod history;
pub mod motivation;
pub mod session;
pub mod speech;
pub mod state;
pub mod voice;
