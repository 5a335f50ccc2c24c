//! Shared helpers used across tasks and the dev server.

pub mod exec;
pub mod html;
pub mod mime;
