//! Host application module

pub mod cli;
pub mod host;
pub mod startup;
