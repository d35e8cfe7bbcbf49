pub mod coordinator;
pub mod hierarchy;
