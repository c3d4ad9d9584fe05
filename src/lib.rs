pub mod app;
pub mod audit;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod output;
pub mod processor;
pub mod runner;
pub mod source;
pub mod store;
pub mod validate;
