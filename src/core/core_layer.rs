// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "ai/mod.rs"]
pub mod ai;

#[path = "calendar_import/mod.rs"]
pub mod calendar_import;

#[path = "markers.rs"]
pub mod markers;
