//! Domain logic - pure release rules independent of git operations

pub mod bump;
pub mod commit;
pub mod prerelease;
pub mod tag;
pub mod version;

pub use bump::{resolve, BumpInstruction, BumpLevel, ReleaseRequest};
pub use commit::ParsedCommit;
pub use prerelease::PreRelease;
pub use tag::{plan_tags, CommitId, TagNamingConfig, TagPlan, TagRef};
pub use version::Version;
