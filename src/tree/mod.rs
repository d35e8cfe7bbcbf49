pub mod dump;
pub mod node;
