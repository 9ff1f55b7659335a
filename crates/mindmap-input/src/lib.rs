//! Pointer and touch interpretation shared by the embedded rendering surface
//! and hosts that receive raw multi-touch input directly.

pub mod config;
pub mod controller;
pub mod hit;
pub mod tap;

pub use config::{GestureConfig, GestureConfigError};
pub use controller::{GestureController, GestureIntent, PointerId};
pub use hit::{HitTest, topmost};
pub use tap::{TapOutcome, TapPhase, TapRecognizer};
