pub mod map;
pub mod tree;
