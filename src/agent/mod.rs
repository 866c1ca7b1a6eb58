//! Node Agent: the per-host process supervisor. Owns a table of child
//! processes it has spawned and exposes it over HTTP for the scheduler
//! to drive.

pub mod config;
pub mod error;
pub mod http;
pub mod metrics;
pub mod process;
pub mod reaper;

pub use config::AgentConfig;
pub use error::AgentError;
pub use http::{router, AgentState};
pub use metrics::CpuSampler;
pub use process::ProcessTable;
