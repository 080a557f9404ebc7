use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use log::debug;
use std::env;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::broadcast;

use event_planner::auth::User;
use event_planner::prelude::*;

/// Used when neither `--session-file` nor `EVENT_PLANNER_SESSION_FILE` is given
const DEFAULT_SESSION_FILE: &str = ".event-planner/session.json";

/// Read instead of prompting, for scripted use
const PASSWORD_VAR: &str = "EVENT_PLANNER_PASSWORD";

#[derive(Parser)]
#[clap(name = "event-planner", version, about = "Plan personal events stored in Supabase")]
struct Cli {
    /// Where to keep the signed-in session between runs
    #[clap(long, value_name = "FILE")]
    session_file: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in with email and password; the password is prompted for unless
    /// EVENT_PLANNER_PASSWORD is set
    Login {
        #[clap(long)]
        email: String,
    },
    /// Create an account; the password is read like for `login`
    Signup {
        #[clap(long)]
        email: String,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List events in date order
    List {
        /// Only show events whose name, location or description contain this text
        #[clap(long)]
        search: Option<String>,
    },
    /// Add an event
    Add {
        #[clap(long)]
        name: String,
        /// Date as YYYY-MM-DD
        #[clap(long)]
        date: NaiveDate,
        #[clap(long)]
        location: Option<String>,
        #[clap(long)]
        description: Option<String>,
    },
    /// Change an event; omitted fields keep their current value
    Edit {
        id: i64,
        #[clap(long)]
        name: Option<String>,
        #[clap(long)]
        date: Option<NaiveDate>,
        #[clap(long)]
        location: Option<String>,
        #[clap(long)]
        description: Option<String>,
    },
    /// Delete an event
    Delete { id: i64 },
}

#[tokio::main]
async fn main() -> ExitCode {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<bool, Error> {
    let config = ProjectConfig::from_env()?;
    let mut options = ClientOptions::default().with_env_overrides();
    if cli.session_file.is_some() {
        options = options.with_session_file(cli.session_file);
    }
    if options.session_file.is_none() {
        options = options.with_session_file(Some(PathBuf::from(DEFAULT_SESSION_FILE)));
    }
    debug!("Using session file {:?}", options.session_file);

    let planner = EventPlanner::new_with_options(config, options)?;
    let mut notifications = planner.notifications();
    planner.session().resolve().await;

    let outcome = execute(&planner, cli.command).await;
    let failure_reported = print_notifications(&mut notifications);
    planner.session().shutdown();

    match outcome {
        // already shown as a notification
        Err(err) if failure_reported => {
            debug!("{}", err);
            Ok(false)
        }
        other => other,
    }
}

fn signed_in(planner: &EventPlanner) -> Result<User, Error> {
    match planner.session().guard() {
        Access::Granted(user) => Ok(user),
        Access::Redirect(_) | Access::Pending => Err(Error::NotAuthenticated),
    }
}

async fn execute(planner: &EventPlanner, command: Command) -> Result<bool, Error> {
    let session = planner.session();
    let events = planner.events();

    match command {
        Command::Login { email } => {
            let password = read_password(env::var(PASSWORD_VAR).ok(), prompt_password)?;
            return Ok(session.login(&email, &password).await);
        }
        Command::Signup { email } => {
            let password = read_password(env::var(PASSWORD_VAR).ok(), prompt_password)?;
            return Ok(session.signup(&email, &password).await);
        }
        Command::Logout => return Ok(session.logout().await),
        Command::Whoami => {
            let user = signed_in(planner)?;
            println!("{} ({})", user.email.as_deref().unwrap_or("no email"), user.id);
        }
        Command::List { search } => {
            signed_in(planner)?;
            events.fetch_all().await?;
            let shown = match search {
                Some(term) => events.search(&term),
                None => events.events(),
            };
            if shown.is_empty() {
                println!("No events found.");
            }
            for event in &shown {
                print_event(event);
            }
        }
        Command::Add {
            name,
            date,
            location,
            description,
        } => {
            signed_in(planner)?;
            let draft = EventDraft {
                name,
                date: Some(date),
                location,
                description,
            };
            let event = events.add(&draft).await?;
            print_event(&event);
        }
        Command::Edit {
            id,
            name,
            date,
            location,
            description,
        } => {
            signed_in(planner)?;
            events.fetch_all().await?;
            let id = EventId(id);
            let current = events.get(id).ok_or(Error::UnknownEvent(id))?;

            let mut draft = current.to_draft();
            if let Some(name) = name {
                draft.name = name;
            }
            if date.is_some() {
                draft.date = date;
            }
            if location.is_some() {
                draft.location = location;
            }
            if description.is_some() {
                draft.description = description;
            }
            let event = events.update(id, &draft).await?;
            print_event(&event);
        }
        Command::Delete { id } => {
            signed_in(planner)?;
            events.fetch_all().await?;
            events.remove(EventId(id)).await?;
        }
    }

    Ok(true)
}

/// Take the password from the environment when present, otherwise ask for it
fn read_password<F>(from_env: Option<String>, prompt: F) -> Result<String, Error>
where
    F: FnOnce() -> io::Result<String>,
{
    match from_env {
        Some(password) if !password.is_empty() => Ok(password),
        _ => prompt().map_err(|err| Error::config(format!("Failed to read password: {}", err))),
    }
}

fn prompt_password() -> io::Result<String> {
    rpassword::prompt_password("Password: ")
}

fn print_event(event: &Event) {
    println!(
        "{:>5}  {}  {}{}",
        event.id.0,
        event.date,
        event.name,
        event
            .location
            .as_deref()
            .map(|location| format!(" @ {}", location))
            .unwrap_or_default()
    );
    if let Some(description) = &event.description {
        println!("       {}", description);
    }
}

/// Print pending notifications; returns whether any of them was a failure
fn print_notifications(rx: &mut broadcast::Receiver<Notification>) -> bool {
    let mut failed = false;
    while let Ok(notification) = rx.try_recv() {
        if notification.is_failure() {
            failed = true;
            eprintln!("{}: {}", notification.title, notification.description);
        } else {
            println!("{}: {}", notification.title, notification.description);
        }
    }
    failed
}
