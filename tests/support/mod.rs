#![allow(dead_code)]

pub mod fixtures;
pub mod sketcheval_env;
