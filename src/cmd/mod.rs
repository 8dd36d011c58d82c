//! CLI command implementations.
//!
//! | Module     | Commands handled        |
//! |------------|-------------------------|
//! | `deploy`   | `Deploy` (default)      |
//! | `check`    | `Check`                 |
//! | `summary`  | `Summary`               |
//! | `config`   | `Config`                |

pub mod check;
pub mod config;
pub mod deploy;
pub mod summary;

pub use check::cmd_check;
pub use config::cmd_config;
pub use deploy::cmd_deploy;
pub use summary::cmd_summary;
