use anyhow::Result;
use clap::Parser;

use git_semrel::cli::{run_release_workflow, ReleaseWorkflowArgs, WorkflowOutcome};
use git_semrel::config;
use git_semrel::domain::BumpLevel;
use git_semrel::ui;

#[derive(clap::Parser)]
#[command(
    name = "git-semrel",
    about = "Release the next semantic version: tag, push and publish"
)]
struct Args {
    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<String>,

    #[arg(long, group = "bump", help = "Force a major release")]
    major: bool,

    #[arg(long, group = "bump", help = "Force a minor release")]
    minor: bool,

    #[arg(long, group = "bump", help = "Force a patch release")]
    patch: bool,

    #[arg(long, help = "Release the current version as the next pre-release")]
    prerelease: bool,

    #[arg(long, help = "Make the resolved release a pre-release")]
    as_prerelease: bool,

    #[arg(long, value_name = "TOKEN", help = "Pre-release token (default from config, \"rc\")")]
    prerelease_token: Option<String>,

    #[arg(long, value_name = "METADATA", help = "Build metadata appended to the version")]
    build_metadata: Option<String>,

    #[arg(long, help = "Create tags locally without pushing")]
    no_push: bool,

    #[arg(long, help = "Skip creating the hosted release")]
    no_vcs_release: bool,

    #[arg(long, help = "Show what would happen without making changes")]
    noop: bool,

    #[arg(long, help = "Print the next version and exit")]
    print: bool,

    #[arg(long, help = "Enable debug logging")]
    verbose: bool,

    #[arg(short, long, help = "Print version information")]
    version: bool,
}

impl Args {
    fn forced(&self) -> Option<BumpLevel> {
        if self.major {
            Some(BumpLevel::Major)
        } else if self.minor {
            Some(BumpLevel::Minor)
        } else if self.patch {
            Some(BumpLevel::Patch)
        } else {
            None
        }
    }

    fn workflow_args(&self) -> ReleaseWorkflowArgs {
        ReleaseWorkflowArgs {
            forced: self.forced(),
            prerelease: self.prerelease,
            as_prerelease: self.as_prerelease,
            prerelease_token: self.prerelease_token.clone(),
            build_metadata: self.build_metadata.clone(),
            no_push: self.no_push,
            no_vcs_release: self.no_vcs_release,
            noop: self.noop,
            print_only: self.print,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    if args.version {
        println!("git-semrel {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Load configuration
    let config = match config::load_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            ui::display_error(&format!("Error loading config: {}", e));
            std::process::exit(1);
        }
    };
    let remote = config.publish.remote.clone();

    let outcome = match run_release_workflow(args.workflow_args(), config) {
        Ok(outcome) => outcome,
        Err(e) => {
            ui::display_error(&format!("{:#}", e));
            let partial = e
                .downcast_ref::<git_semrel::SemrelError>()
                .is_some_and(|err| err.is_partial());
            if partial {
                ui::display_status(
                    "Some steps completed; re-run to finish, completed steps are skipped",
                );
            }
            std::process::exit(1);
        }
    };

    match outcome {
        WorkflowOutcome::NothingToRelease { reason, warnings } => {
            for warning in &warnings {
                ui::display_boundary_warning(warning);
            }
            ui::display_status(&format!("No release: {}", reason));
        }
        WorkflowOutcome::Printed(version) => {
            println!("{}", version);
        }
        WorkflowOutcome::Planned(plan) => {
            for warning in &plan.warnings {
                ui::display_boundary_warning(warning);
            }
            ui::display_version_change(plan.current.as_ref(), &plan.version);
            ui::display_plan(&plan.reconciliation);
            ui::display_status("No operation mode: nothing was changed");
        }
        WorkflowOutcome::Published {
            plan,
            result,
            release_url,
        } => {
            for warning in &plan.warnings {
                ui::display_boundary_warning(warning);
            }
            ui::display_version_change(plan.current.as_ref(), &plan.version);
            ui::display_plan(&plan.reconciliation);

            if result.pushed.is_empty() && !result.tags_applied.is_empty() {
                let tags: Vec<String> = result
                    .tags_applied
                    .iter()
                    .map(|entry| entry.tag().name.clone())
                    .collect();
                ui::display_manual_push_instruction(&tags, &remote);
            }
            ui::display_success(&format!(
                "Released {}: {}",
                plan.tags.canonical.name,
                ui::format_publish_summary(&result)
            ));
            if let Some(url) = release_url {
                ui::display_status(&format!("Release page: {}", url));
            }
        }
    }

    Ok(())
}
