mod cli;
mod io;
mod job;
mod logging;
mod outside;
mod result;
mod sanitize;
mod scheduler;
mod settings;
mod shell;
mod types;
mod utils;
mod workspace;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use clap::Parser;
use miette::{IntoDiagnostic, WrapErr};
use tracing::{debug, info, warn};

use crate::{
    cli::Args, job::JobContext, logging::init_logging, outside::load_external_components,
    scheduler::Scheduler, settings::Settings, shell::ExitReason,
};

fn main() -> miette::Result<()> {
    // Initialize the environment & CLI
    let args = Args::parse();
    init_logging(args.log_level())?;
    let settings = Settings::load(&args)?;
    debug!("{settings:?}");

    // Missing programs are fatal before anything is asked to the user
    let (ytdl, ffmpeg) = load_external_components()?;

    // Make sure the output directory exists, workspaces are created inside it
    std::fs::create_dir_all(&settings.out_dir)
        .into_diagnostic()
        .wrap_err("Could not create out directory")?;

    let ctx = JobContext::new(
        Arc::new(ytdl),
        Arc::new(ffmpeg),
        settings.out_dir.clone(),
        settings.container,
    );
    let scheduler = Scheduler::new(ctx, settings.max_concurrent_jobs);

    info!(
        "Saving {} files under {}",
        settings.container.ext(),
        settings.out_dir.display()
    );
    let reason = shell::run(&scheduler);

    // Whatever ended the session, running jobs are always waited for
    match &reason {
        Ok(ExitReason::Interrupted) => info!("Interrupted"),
        Ok(reason) => debug!("Session ended: {reason:?}"),
        Err(err) => warn!("Session ended abruptly: {err}"),
    }
    let report = scheduler.shutdown();
    for (id, outcome) in &report.outcomes {
        debug!("Job {id}: {outcome}");
    }

    info!(
        "All jobs finished: {} completed, {} failed",
        report.completed(),
        report.failed()
    );
    reason.map(|_| ())
}
