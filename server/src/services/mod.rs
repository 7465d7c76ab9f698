//! Domain services used by HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own upstream calls and payload interpretation so route
//! handlers can stay focused on protocol translation.

pub mod broker;
