pub mod config;
pub mod dashboard;
pub mod dispatch;
pub mod error;
pub mod github;
pub mod mutator;
pub mod panel;
pub mod status;
pub mod terminal;
pub mod vault;
