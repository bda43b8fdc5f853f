//! Entity Component System module
//!
//! Agents live in a hecs world as entities carrying these components

mod components;

pub use components::{Name, Transform};
