//! Process-level helpers for hosts embedding the stores.

pub mod bootstrap;
