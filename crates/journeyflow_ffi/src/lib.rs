//! Flutter-facing bindings for `journeyflow_core`.

pub mod api;
