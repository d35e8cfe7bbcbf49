pub mod cancel;
pub mod dedup;
pub mod model;
pub mod walker;
