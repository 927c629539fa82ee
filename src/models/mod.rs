//! Data model definitions for the webwatch engine.

pub mod check_result;
pub mod event;
pub mod monitor;
