pub mod aggregate;
pub mod bundle;
pub mod collect;
pub mod config;
pub mod contract;
pub mod error;
pub mod load_config;
pub mod logging;
pub mod sink;
pub mod synchronise;
pub mod tracker;
