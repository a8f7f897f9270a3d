use std::io::{BufRead, Write};

use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender};
use miette::{IntoDiagnostic, Result, WrapErr};
use owo_colors::OwoColorize;
use tracing::{debug, error, info, warn};

use crate::scheduler::{InFlight, Scheduler};

/// Words ending the session, compared case-insensitively
pub const EXIT_KEYWORDS: [&str; 3] = ["q", "quit", "exit"];

#[derive(Debug, PartialEq, Eq)]
pub enum Input<'a> {
    Empty,
    Exit,
    Url(&'a str),
}

pub fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    if line.is_empty() {
        Input::Empty
    } else if EXIT_KEYWORDS
        .iter()
        .any(|keyword| line.eq_ignore_ascii_case(keyword))
    {
        Input::Exit
    } else {
        Input::Url(line)
    }
}

/// Why the session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Keyword,
    EndOfInput,
    Interrupted,
}

/// Read URLs from stdin and submit them until the user leaves.
///
/// Ctrl-C ends the session like an exit keyword would.
pub fn run(scheduler: &Scheduler) -> Result<ExitReason> {
    let (interrupt_send, interrupts) = bounded(1);
    let in_flight = scheduler.in_flight_counter();
    ctrlc::set_handler(move || {
        interrupt(&interrupt_send, &in_flight);
    })
    .into_diagnostic()
    .wrap_err("Could not set the Ctrl-C handler")?;

    let (line_send, lines) = unbounded();
    std::thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if line_send.send(line).is_err() {
                    break;
                }
            }
            // Dropping the sender tells the shell the input is over
        })
        .into_diagnostic()
        .wrap_err("Could not start the input reader")?;

    Ok(run_loop(scheduler, &lines, &interrupts))
}

/// Forward a Ctrl-C to the shell. Return false when the session is already
/// over (or about to be), in which case only the user is told.
fn interrupt(send: &Sender<()>, in_flight: &InFlight) -> bool {
    if send.try_send(()).is_ok() {
        return true;
    }

    warn!(
        "Already shutting down, waiting for {} job(s) to finish",
        in_flight.get()
    );
    false
}

fn run_loop(scheduler: &Scheduler, lines: &Receiver<String>, interrupts: &Receiver<()>) -> ExitReason {
    loop {
        prompt(scheduler.in_flight());

        let line = select! {
            recv(lines) -> line => match line {
                Ok(line) => line,
                Err(_) => {
                    println!();
                    return ExitReason::EndOfInput;
                }
            },
            recv(interrupts) -> _ => {
                println!();
                return ExitReason::Interrupted;
            },
        };

        match parse_input(&line) {
            Input::Empty => continue,
            Input::Exit => return ExitReason::Keyword,
            Input::Url(url) => match scheduler.submit(url) {
                Ok(id) => info!("Job {id}: queued {url}"),
                Err(err) => error!("Could not submit {url}: {err}"),
            },
        }
    }
}

fn prompt(in_flight: usize) {
    let mut stdout = std::io::stdout().lock();
    let res = if in_flight > 0 {
        write!(stdout, "{} {} ", format!("[{in_flight} running]").dimmed(), "URL>".bold())
    } else {
        write!(stdout, "{} ", "URL>".bold())
    };

    if let Err(err) = res.and_then(|()| stdout.flush()) {
        debug!("Could not write the prompt: {err}");
    }
}
