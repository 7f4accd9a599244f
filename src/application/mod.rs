// Application layer - Monitors, poll cycle and reset orchestration
pub mod confirmation;
pub mod monitor;
pub mod render_surface;
pub mod reset_coordinator;
pub mod telemetry_controller;
pub mod telemetry_source;

#[cfg(test)]
pub mod fakes;
