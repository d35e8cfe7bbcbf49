#![allow(dead_code)]

pub mod fake_tree;
pub mod faulty_store;
pub mod utils;
