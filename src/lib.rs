pub mod cipher;
pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod flowxml;
pub mod model;
pub mod report;
pub mod runner;
pub mod script;
pub mod translate;
