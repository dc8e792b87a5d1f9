//! Embedded map data
//!
//! - Position templates (label slots per map)

pub mod template;

pub use template::{PositionTemplate, TemplateSlot, SUPREME_ISTHMUS_YAML};
