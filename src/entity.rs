mod failure;

pub use failure::*;
