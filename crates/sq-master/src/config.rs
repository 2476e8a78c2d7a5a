//! Render session configuration.

/// Capacities of the rings between control and render.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    pub command_capacity: usize,
    pub telemetry_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            command_capacity: 64,
            telemetry_capacity: 1024,
        }
    }
}
