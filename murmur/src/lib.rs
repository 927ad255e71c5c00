//! Command line front end for murmur-asr.

pub mod cli;
pub mod config;
pub mod languages;
pub mod transcribe;
