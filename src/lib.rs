//! Canvas Wire - binding resolution and execution runtime for AI-wired
//! canvas components

pub mod canvas;
pub mod core;
pub mod descriptor;
pub mod executor;
pub mod llm;
pub mod pending;
pub mod reconciler;
pub mod resolver;
pub mod table;
