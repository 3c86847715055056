//! Environment probe port
//!
//! Reports whether the process runs inside a simulated or virtualized test
//! environment. Reporting is never activated in such environments.

/// Environment variable read by [`EnvProbe`].
pub const SIMULATED_ENV_VAR: &str = "CRASHGATE_SIMULATED";

/// Detects simulated/virtualized test environments.
pub trait EnvironmentProbe: Send + Sync {
    fn is_simulated(&self) -> bool;
}

/// Probe with a fixed answer, typically taken from configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticProbe(pub bool);

impl EnvironmentProbe for StaticProbe {
    fn is_simulated(&self) -> bool {
        self.0
    }
}

/// Probe that reads [`SIMULATED_ENV_VAR`] (`1`, `true` or `yes`).
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvProbe;

impl EnvironmentProbe for EnvProbe {
    fn is_simulated(&self) -> bool {
        std::env::var(SIMULATED_ENV_VAR)
            .map(|v| is_truthy(&v))
            .unwrap_or(false)
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}
