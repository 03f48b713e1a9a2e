//! Port traits for the collaborators around the simulation core.

pub mod config_port;
pub mod quote_port;
pub mod report_port;
