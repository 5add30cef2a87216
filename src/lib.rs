//! Visualizes storage usage across a set of named buckets served by an
//! HTTP backend: a size-sorted bucket list, and per bucket an
//! expandable folder tree sorted by size at every level.
//!
//! All state and logic live in this library. The egui and terminal
//! binaries are thin shells that poll fetch completions and paint
//! whatever the [`session::Session`] holds.

pub mod expand_state;
pub mod format;
pub mod gateway;
pub mod model;
pub mod render_tree;
pub mod session;
pub mod tree;
