//! Command-line workflow, independent of argument parsing

pub mod orchestration;

pub use orchestration::{
    build_request, plan_release, publish_release, run_release_workflow, ReleasePlan,
    ReleaseWorkflowArgs, WorkflowOutcome,
};
