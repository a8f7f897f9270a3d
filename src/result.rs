use std::fmt::Display;

use miette::miette;

/// Failure of a job, or of the machinery around it.
///
/// The first five variants are terminal job outcomes, one per stage that can fail.
#[derive(Debug)]
pub enum Error {
    /// The resolver could not give us the video (deleted, private, geo-blocked, resolver failure)
    Unavailable(String),

    /// No adaptive video-only + audio-only pair in the wanted container
    NoSuitableStream,

    Transfer(miette::Report),

    Merge(miette::Report),

    Relocation(miette::Report),

    /// The scheduler is draining and refuses new jobs
    ShuttingDown,

    Miette(miette::Report),
}

impl From<miette::Report> for Error {
    fn from(err: miette::Report) -> Self {
        Error::Miette(err)
    }
}

impl From<Error> for miette::Report {
    fn from(err: Error) -> Self {
        match err {
            Error::Unavailable(reason) => miette!("Video unavailable: {reason}"),
            Error::NoSuitableStream => miette!("No suitable stream"),
            Error::Transfer(err) => err.wrap_err("Download failed"),
            Error::Merge(err) => err.wrap_err("Merge failed"),
            Error::Relocation(err) => err.wrap_err("Could not move the merged file"),
            Error::ShuttingDown => miette!("Shutting down, not accepting new downloads"),
            Error::Miette(err) => err,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Unavailable(reason) => write!(f, "video unavailable: {reason}"),
            Error::NoSuitableStream => write!(f, "no suitable stream"),
            Error::Transfer(report) => write_chain(f, "download failed: ", report),
            Error::Merge(report) => write_chain(f, "merge failed: ", report),
            Error::Relocation(report) => write_chain(f, "relocation failed: ", report),
            Error::ShuttingDown => write!(f, "shutting down, not accepting new downloads"),
            Error::Miette(report) => write_chain(f, "", report),
        }
    }
}

/// Reports only display their outermost message, the causes matter in logs
fn write_chain(
    f: &mut std::fmt::Formatter<'_>,
    prefix: &str,
    report: &miette::Report,
) -> std::fmt::Result {
    write!(f, "{prefix}")?;
    for (i, cause) in report.chain().enumerate() {
        if i > 0 {
            write!(f, ": ")?;
        }
        write!(f, "{cause}")?;
    }
    Ok(())
}

impl Error {
    pub fn wrap_err_with<D, F>(self, f: F) -> Error
    where
        D: Display + Send + Sync + 'static,
        F: FnOnce() -> D,
    {
        match self {
            Error::Miette(report) => Error::Miette(report.wrap_err(f())),
            err => err,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

pub fn bail<T, D>(msg: D) -> Result<T>
where
    D: Display + std::fmt::Debug + Send + Sync + 'static,
{
    Err(Error::Miette(miette::Report::msg(msg)))
}
