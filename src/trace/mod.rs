pub mod logger;
pub mod monitor;
pub mod trace;
