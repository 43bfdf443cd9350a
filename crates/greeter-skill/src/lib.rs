//! greeter-skill — Greets people the camera recognizes and learns new faces.
//!
//! The host assistant owns intent matching and speech; it hands this crate a
//! [`FaceEncoder`](greeter_core::FaceEncoder) and a [`Dialog`] and calls
//! [`GreetingSkill::handle_hello`] for every greeting.

pub mod config;
pub mod dialog;
pub mod skill;

pub use config::{Config, MatchMetric};
pub use dialog::{Dialog, DialogData};
pub use skill::{Greeting, GreetingSkill, SkillError};
