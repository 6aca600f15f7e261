//! Library facade - re-export internal modules so integration
//! tests or external code can use `pingmon::...`.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod external;
pub mod formatter;
pub mod monitor;
pub mod probe;
pub mod stats;
pub mod window;
