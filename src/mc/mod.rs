pub mod mc_engine;
pub mod parallel;
pub mod paths;
pub mod payoffs;
