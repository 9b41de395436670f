//! Falling letters that rest on whatever silhouette the camera sees.
//!
//! The library holds the per-frame core (buffers, transforms, coordinates,
//! simulation, orchestration) plus the window/camera plumbing used by the binary.

pub mod app;
pub mod camera;
pub mod config;
pub mod coords;
pub mod draw;
pub mod error;
pub mod glyph;
pub mod rain;
pub mod types;
pub mod vision;
