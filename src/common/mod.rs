//! Cross-cutting utilities shared by the whole substrate
pub mod fatal;
pub mod prime;
