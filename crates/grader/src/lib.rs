pub mod config;
pub mod error;
pub mod events;
pub mod interpreter;
pub mod orchestrator;
pub mod report;
pub mod sandbox;
pub mod staging;
pub mod toolchain;
pub mod workspace;

pub use config::{GraderConfig, ToolchainConfig};
pub use error::{GraderError, GradingFailure, Result};
pub use events::{EventBroadcaster, EventStream, GradingEvent};
pub use interpreter::interpret;
pub use orchestrator::GradingOrchestrator;
pub use report::{GradingReport, SubmissionOutcome, SubmissionReport};
pub use sandbox::{
    ContainerInvocation, ExecutionError, ProcessRunner, RawOutput, SandboxExecutor,
    TokioProcessRunner,
};
pub use staging::{FixtureStager, StagedLayout, StagingError};
pub use toolchain::{Toolchain, ToolchainRegistry};
pub use workspace::{WorkspaceError, WorkspaceHandle, WorkspaceManager};
pub use tokio_util::sync::CancellationToken;
