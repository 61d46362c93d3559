// The infra module contains implementations of core traits.
// Each external dependency gets its own submodule.

#[path = "ai/mod.rs"]
pub mod ai;

#[path = "calendar/mod.rs"]
pub mod calendar;
