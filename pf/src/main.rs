//! Pathfinder - venue discovery and evening planning client
//!
//! CLI entry point. With no subcommand the interactive wizard is launched.

use std::borrow::Cow;
use std::fs;
use std::sync::Arc;

use clap::{CommandFactory, FromArgMatches};
use colored::Colorize;
use eyre::{Context, Result, eyre};
use localstore::{LocalStore, MemoryStore, Storage};
use rustyline::completion::Completer;
use rustyline::config::Configurer;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{ColorMode, Editor, Helper};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use pathfinder::cli::{
    Cli, Command, OutputFormat, PlanArgs, PlansCommand, VenuesCommand, generate_after_help, get_log_path,
};
use pathfinder::config::Config;
use pathfinder::domain::{Plan, Rating, Venue};
use pathfinder::mapping::{MapClient, create_map_client};
use pathfinder::{Credentials, PlanDetails, PlanPersister, Registration, ScriptedPlan, Session, create_client, tui};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Logging isn't initialized yet, so nothing in here can log
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cmd = Cli::command().after_help(generate_after_help());
    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let storage: Arc<dyn Storage> = if cli.ephemeral {
        debug!("main: ephemeral session");
        Arc::new(MemoryStore::new())
    } else {
        let path = config.storage.expanded_path();
        Arc::new(LocalStore::open(&path).context(format!("Failed to open storage at {}", path.display()))?)
    };

    let api = create_client(&config, storage.clone()).context("Failed to create API client")?;
    let session = Arc::new(Session::restore(api, storage));
    let format = cli.format;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        None => cmd_tui(&config, session).await,
        Some(Command::Login { email, password }) => cmd_login(&session, email, password, format).await,
        Some(Command::Register { name, email, password }) => {
            cmd_register(&session, name, email, password, format).await
        }
        Some(Command::Logout) => cmd_logout(&session, format),
        Some(Command::Whoami) => cmd_whoami(&session, format).await,
        Some(Command::Venues { command }) => cmd_venues(&session, command, format).await,
        Some(Command::Attributes) => cmd_attributes(&session, format).await,
        Some(Command::Plans { command }) => cmd_plans(&config, &session, command, format).await,
        Some(Command::Plan(args)) => cmd_plan(&config, &session, args, format).await,
        Some(Command::Geocode { text }) => cmd_geocode(&config, &text, format).await,
    }
}

async fn cmd_tui(config: &Config, session: Arc<Session>) -> Result<()> {
    let maps = match create_map_client(&config.mapping) {
        Ok(maps) => Some(maps),
        Err(e) => {
            warn!(error = %e, "Location search disabled");
            None
        }
    };
    tui::run(config, session, maps).await
}

fn map_client(config: &Config) -> Result<Arc<dyn MapClient>> {
    create_map_client(&config.mapping).context("Location search is not available")
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Hides typed characters
struct MaskedInput;

impl Completer for MaskedInput {
    type Candidate = String;
}

impl Hinter for MaskedInput {
    type Hint = String;
}

impl Validator for MaskedInput {}

impl Highlighter for MaskedInput {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        Cow::Owned("*".repeat(line.chars().count()))
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        true
    }
}

impl Helper for MaskedInput {}

fn prompt_password() -> Result<String> {
    let mut rl: Editor<MaskedInput, DefaultHistory> =
        Editor::new().map_err(|e| eyre!("Failed to initialize readline: {}", e))?;
    rl.set_helper(Some(MaskedInput));
    rl.set_color_mode(ColorMode::Forced);
    rl.set_auto_add_history(false);
    rl.readline("Password: ")
        .map_err(|e| eyre!("Failed to read password: {}", e))
}

fn require_login(session: &Session, what: &str) -> Result<()> {
    if session.is_logged_in() {
        Ok(())
    } else {
        Err(eyre!("Log in to {} (pf login <email>)", what))
    }
}

async fn cmd_login(session: &Session, email: String, password: Option<String>, format: OutputFormat) -> Result<()> {
    debug!(%email, "cmd_login: called");
    let password = match password {
        Some(p) => p,
        None => prompt_password()?,
    };
    let user = session
        .login(&Credentials::new(email, password))
        .await
        .context("Login failed")?;

    match format {
        OutputFormat::Json => print_json(&user),
        OutputFormat::Text => {
            println!("{} Logged in as {} <{}>", "✓".green(), user.name.bold(), user.email);
            Ok(())
        }
    }
}

async fn cmd_register(
    session: &Session,
    name: String,
    email: String,
    password: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    debug!(%email, "cmd_register: called");
    let password = match password {
        Some(p) => p,
        None => prompt_password()?,
    };
    let user = session
        .register(&Registration::new(name, email, password))
        .await
        .context("Registration failed")?;

    match format {
        OutputFormat::Json => print_json(&user),
        OutputFormat::Text => {
            println!("{} Registered and logged in as {} <{}>", "✓".green(), user.name.bold(), user.email);
            Ok(())
        }
    }
}

fn cmd_logout(session: &Session, format: OutputFormat) -> Result<()> {
    debug!("cmd_logout: called");
    session.logout().context("Logout failed")?;
    match format {
        OutputFormat::Json => print_json(&json!({ "logged_in": false })),
        OutputFormat::Text => {
            println!("Logged out");
            Ok(())
        }
    }
}

async fn cmd_whoami(session: &Session, format: OutputFormat) -> Result<()> {
    debug!("cmd_whoami: called");
    require_login(session, "see your account")?;
    let user = session.current_user().await.context("Failed to fetch current user")?;
    match format {
        OutputFormat::Json => print_json(&user),
        OutputFormat::Text => {
            println!("{} <{}> (id {})", user.name.bold(), user.email, user.id);
            Ok(())
        }
    }
}

fn print_venues(venues: &[Venue]) {
    if venues.is_empty() {
        println!("{}", "No venues found.".dimmed());
        return;
    }
    for venue in venues {
        let rating = venue.rating.map(|r| format!(" ★{:.1}", r)).unwrap_or_default();
        println!(
            "{:>5}  {}{}  {}",
            venue.id.to_string().cyan(),
            venue.name.bold(),
            rating.yellow(),
            venue.attributes.join(", ").dimmed()
        );
    }
}

fn print_venue(venue: &Venue) {
    println!("{} {}", venue.name.bold(), format!("(id {})", venue.id).dimmed());
    if let Some(address) = &venue.address {
        println!("  Address:    {}", address);
    }
    println!(
        "  Location:   {:.5}, {:.5}",
        venue.coordinates.latitude, venue.coordinates.longitude
    );
    if !venue.attributes.is_empty() {
        println!("  Attributes: {}", venue.attributes.join(", "));
    }
    if let Some(rating) = venue.rating {
        println!("  Rating:     {:.1}", rating);
    }
}

async fn cmd_venues(session: &Session, command: VenuesCommand, format: OutputFormat) -> Result<()> {
    debug!(?command, "cmd_venues: called");
    let api = session.api();
    match command {
        VenuesCommand::List => {
            let venues = api.venues().await.context("Failed to list venues")?;
            match format {
                OutputFormat::Json => print_json(&venues),
                OutputFormat::Text => {
                    print_venues(&venues);
                    Ok(())
                }
            }
        }
        VenuesCommand::Search { name } => {
            let venues = api.search_venues(&name).await.context("Venue search failed")?;
            match format {
                OutputFormat::Json => print_json(&venues),
                OutputFormat::Text => {
                    print_venues(&venues);
                    Ok(())
                }
            }
        }
        VenuesCommand::Show { id } => {
            let venue = api.venue(id).await.context(format!("Failed to load venue {}", id))?;
            match format {
                OutputFormat::Json => print_json(&venue),
                OutputFormat::Text => {
                    print_venue(&venue);
                    Ok(())
                }
            }
        }
        VenuesCommand::Rate { id, rating } => {
            require_login(session, "rate venues")?;
            let rating = Rating::new(rating)?;
            api.rate_venue(id, rating).await.context(format!("Failed to rate venue {}", id))?;
            match format {
                OutputFormat::Json => print_json(&json!({ "venue_id": id, "rating": rating })),
                OutputFormat::Text => {
                    println!("{} Rated venue {} {}", "✓".green(), id, rating.stars().yellow());
                    Ok(())
                }
            }
        }
        VenuesCommand::Rating { id } => {
            require_login(session, "see your ratings")?;
            let rating = api
                .venue_rating(id)
                .await
                .context(format!("Failed to load rating for venue {}", id))?;
            match format {
                OutputFormat::Json => print_json(&json!({ "venue_id": id, "rating": rating })),
                OutputFormat::Text => {
                    match rating {
                        Some(r) => println!("{}", r.stars().yellow()),
                        None => println!("{}", "Not rated yet".dimmed()),
                    }
                    Ok(())
                }
            }
        }
        VenuesCommand::Favourites => {
            require_login(session, "see your favourites")?;
            let venues = api.favourite_venues().await.context("Failed to load favourites")?;
            match format {
                OutputFormat::Json => print_json(&venues),
                OutputFormat::Text => {
                    print_venues(&venues);
                    Ok(())
                }
            }
        }
    }
}

async fn cmd_attributes(session: &Session, format: OutputFormat) -> Result<()> {
    debug!("cmd_attributes: called");
    let attributes = session.api().attributes().await.context("Failed to load attributes")?;
    match format {
        OutputFormat::Json => print_json(&attributes),
        OutputFormat::Text => {
            for attribute in &attributes {
                println!("{}", attribute.name);
            }
            Ok(())
        }
    }
}

fn print_plan(plan: &Plan) {
    println!("{} {}", plan.name.bold(), format!("(plan {})", plan.id).dimmed());
    match (plan.start_date, plan.start_time) {
        (Some(d), Some(t)) => println!("  {} at {}", d.format("%a %-d %b %Y"), t.format("%H:%M")),
        (Some(d), None) => println!("  {}", d.format("%a %-d %b %Y")),
        (None, Some(t)) => println!("  at {}", t.format("%H:%M")),
        (None, None) => {}
    }
    println!("  {:>5}  {}", "Start".green(), plan.start.name);
    for (i, venue) in plan.venues.iter().enumerate() {
        println!("  {:>5}  {}", (i + 1).to_string().cyan(), venue.name);
    }
    println!("  {:>5}  {}", "End".red(), plan.end.name);
}

async fn cmd_plans(config: &Config, session: &Session, command: PlansCommand, format: OutputFormat) -> Result<()> {
    debug!(?command, "cmd_plans: called");
    let api = session.api();
    match command {
        PlansCommand::Public => {
            let plans = api.public_plans().await.context("Failed to list public plans")?;
            match format {
                OutputFormat::Json => print_json(&plans),
                OutputFormat::Text => {
                    if plans.is_empty() {
                        println!("{}", "No public plans.".dimmed());
                    }
                    for plan in &plans {
                        let date = plan.start_date.map(|d| d.to_string()).unwrap_or_default();
                        println!(
                            "{:>5}  {}  {}  {}",
                            plan.id.to_string().cyan(),
                            plan.name.bold(),
                            format!("{} venues", plan.venue_count).dimmed(),
                            date.dimmed()
                        );
                    }
                    Ok(())
                }
            }
        }
        PlansCommand::Random => {
            let plan = api.random_public_plan().await.context("Failed to load a random plan")?;
            match format {
                OutputFormat::Json => print_json(&json!({ "summary": plan.summary(), "plan": plan })),
                OutputFormat::Text => {
                    print_plan(&plan);
                    Ok(())
                }
            }
        }
        PlansCommand::Show { id } => {
            let plan = api.plan(id).await.context(format!("Failed to load plan {}", id))?;
            match format {
                OutputFormat::Json => print_json(&plan),
                OutputFormat::Text => {
                    print_plan(&plan);
                    Ok(())
                }
            }
        }
        PlansCommand::Route { id } => {
            let maps = map_client(config)?;
            let plan = api.plan(id).await.context(format!("Failed to load plan {}", id))?;
            let route = maps
                .walking_route(&plan.waypoints())
                .await
                .context("Failed to load walking route")?;
            match format {
                OutputFormat::Json => print_json(&json!({
                    "plan_id": plan.id,
                    "distance_m": route.distance_m,
                    "duration_s": route.duration_s,
                    "coordinates": route.coordinates.iter().map(|c| c.as_lng_lat()).collect::<Vec<_>>(),
                })),
                OutputFormat::Text => {
                    print_plan(&plan);
                    println!(
                        "\nWalking: {:.1} km, about {} min",
                        route.kilometres(),
                        route.minutes()
                    );
                    Ok(())
                }
            }
        }
    }
}

async fn cmd_plan(config: &Config, session: &Session, args: PlanArgs, format: OutputFormat) -> Result<()> {
    debug!(?args, "cmd_plan: called");
    let maps = map_client(config)?;
    let script = ScriptedPlan {
        start: args.start,
        end: args.end,
        stops: args.stops.into_iter().map(|s| s.0).collect(),
        details: PlanDetails {
            name: args.name.unwrap_or_default(),
            start_date: args.date,
            start_time: args.time,
        },
        dry_run: args.dry_run,
    };

    let persister = PlanPersister::from_config(&config.plan);
    let outcome = script.run(session, maps.as_ref(), &persister).await?;

    match format {
        OutputFormat::Json => print_json(&json!({
            "start": { "name": outcome.start.name, "coordinates": outcome.start.coordinates.as_lng_lat() },
            "end": { "name": outcome.end.name, "coordinates": outcome.end.coordinates.as_lng_lat() },
            "stops": outcome.stops,
            "venues": outcome.venues,
            "plan_id": outcome.plan_id,
        })),
        OutputFormat::Text => {
            println!("  {:>5}  {}", "Start".green(), outcome.start.name);
            for (i, (venue, stop)) in outcome.venues.iter().zip(&outcome.stops).enumerate() {
                println!(
                    "  {:>5}  {}  {}",
                    (i + 1).to_string().cyan(),
                    venue.name.bold(),
                    stop.join(", ").dimmed()
                );
            }
            println!("  {:>5}  {}", "End".red(), outcome.end.name);
            println!();
            match outcome.plan_id {
                Some(id) => println!("{} Saved plan {}", "✓".green(), id),
                None => println!("{}", "Dry run: plan not saved".dimmed()),
            }
            Ok(())
        }
    }
}

async fn cmd_geocode(config: &Config, text: &str, format: OutputFormat) -> Result<()> {
    debug!(%text, "cmd_geocode: called");
    let maps = map_client(config)?;
    let places = maps.geocode(text).await.context("Location search failed")?;
    match format {
        OutputFormat::Json => print_json(
            &places
                .iter()
                .map(|p| json!({ "name": p.name, "coordinates": p.coordinates.as_lng_lat() }))
                .collect::<Vec<_>>(),
        ),
        OutputFormat::Text => {
            if places.is_empty() {
                println!("{}", "No places found.".dimmed());
            }
            for place in &places {
                println!(
                    "{}  {}",
                    place.name,
                    format!("{:.5}, {:.5}", place.coordinates.latitude, place.coordinates.longitude).dimmed()
                );
            }
            Ok(())
        }
    }
}
