//! Model implementations.

pub mod whisper;
