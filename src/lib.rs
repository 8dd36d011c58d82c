pub mod config;
pub mod convergence;
pub mod deploy;
pub mod deploy_config;
pub mod errors;
pub mod logging;
pub mod phase;
pub mod phases;
pub mod prereq;
pub mod process;
pub mod sequencer;
pub mod summary;
pub mod ui;
