pub mod alerts;
pub mod health;
/// Background health monitoring and alerting
pub mod monitor;
pub mod probe;

pub use alerts::{Alert, AlertManager};
pub use health::{ComponentHealth, HealthCheckResult, HealthChecker, HealthStatus};
pub use monitor::{breaches, Breach, HealthMonitor, MonitorConfig, Threshold};
pub use probe::{parse_loadavg, parse_meminfo, ProcfsProbe, ResourceProbe, ResourceSample};
