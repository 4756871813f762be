use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Result};
use castswap_contracts::aspect::select_aspect_ratio;
use castswap_contracts::chat::{parse_intent, STUDIO_HELP_COMMANDS};
use castswap_contracts::events::EventWriter;
use castswap_contracts::failures::{FailureKind, GenerationFailure};
use castswap_contracts::images::{ImageId, UploadedImage};
use castswap_engine::{
    ApiKeyStore, CompositeGenerator, CredentialProvider, GeminiImageClient, PersonUploadReport,
    Studio, StudioConfig,
};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "castswap",
    version,
    about = "Put your own cast into a movie poster"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// One-shot generation from a poster and person photos.
    Generate(GenerateArgs),
    /// Interactive session driven by slash commands.
    Studio(StudioArgs),
}

#[derive(Debug, Parser)]
struct GenerateArgs {
    #[arg(long)]
    poster: PathBuf,
    /// Person photos, in the order they replace the poster's characters.
    #[arg(long = "person", required = true)]
    persons: Vec<PathBuf>,
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long)]
    model: Option<String>,
}

#[derive(Debug, Parser)]
struct StudioArgs {
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long)]
    model: Option<String>,
}

const EXIT_GENERATION_FAILED: i32 = 2;

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("castswap error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Generate(args) => run_generate(args),
        Command::Studio(args) => {
            run_studio(args)?;
            Ok(0)
        }
    }
}

fn run_generate(args: GenerateArgs) -> Result<i32> {
    let config = StudioConfig::from_env().with_model(args.model.clone());
    let events = args
        .events
        .as_ref()
        .map(|path| EventWriter::new(path, new_session_id()));
    let client = GeminiImageClient::new(&config)?;
    let mut studio = Studio::new(client, ApiKeyStore::from_env(), config.max_persons, events)?;

    let poster = studio.upload_poster(&args.poster)?;
    print_poster(&poster);
    // One file per upload keeps the command-line order as the mapping order.
    for path in &args.persons {
        let report = studio.upload_persons(std::slice::from_ref(path));
        print_person_report(&report);
        require_every_person(&report)?;
    }

    println!(
        "Generating with {} on {} person photo(s)...",
        config.model,
        studio.state().persons.len()
    );
    let outcome = studio.generate()?;
    let code = match outcome {
        Ok(_) => {
            let saved = studio.download(&args.out)?;
            println!("Saved {}", saved.display());
            0
        }
        Err(failure) => {
            print_failure(&failure);
            EXIT_GENERATION_FAILED
        }
    };
    warn_event_error(&mut studio);
    Ok(code)
}

fn run_studio(args: StudioArgs) -> Result<()> {
    let config = StudioConfig::from_env().with_model(args.model.clone());
    let events_path = args
        .events
        .clone()
        .unwrap_or_else(|| args.out.join("events.jsonl"));
    let client = GeminiImageClient::new(&config)?;
    let mut studio = Studio::new(
        client,
        PromptKeyStore::from_env(),
        config.max_persons,
        Some(EventWriter::new(&events_path, new_session_id())),
    )?;

    println!(
        "Castswap studio started ({}). Type /help for commands.",
        config.model
    );
    if !studio.state().api_key_selected {
        println!("No API key selected yet. Use /key to select one.");
    }

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let intent = parse_intent(line.trim_end_matches(['\n', '\r']));
        match intent.action.as_str() {
            "noop" => {}
            "help" => println!("Commands: {}", STUDIO_HELP_COMMANDS.join("  ")),
            "set_poster" => match intent.arg_str("path") {
                Some(path) => match studio.upload_poster(Path::new(path)) {
                    Ok(poster) => print_poster(&poster),
                    Err(err) => println!("Could not load poster: {err:#}"),
                },
                None => println!("/poster requires a path"),
            },
            "add_persons" => {
                let paths: Vec<PathBuf> = intent
                    .arg_list("paths")
                    .into_iter()
                    .map(PathBuf::from)
                    .collect();
                if paths.is_empty() {
                    println!("/person requires at least one path");
                } else if studio.state().remaining_person_slots() == 0 {
                    println!(
                        "Person list is full ({} max). Remove one first.",
                        studio.state().max_persons
                    );
                } else {
                    let report = studio.upload_persons(&paths);
                    print_person_report(&report);
                }
            }
            "remove_person" => match intent.arg_str("id") {
                Some(id) => {
                    if studio.remove_person(&ImageId::from(id)) {
                        println!("Removed {id}");
                    } else {
                        println!("No person photo with id {id}");
                    }
                }
                None => println!("/remove requires an id (see /status)"),
            },
            "clear_poster" => {
                studio.clear_poster();
                println!("Poster cleared");
            }
            "select_key" => {
                let selected = match intent.arg_str("value") {
                    Some(value) => {
                        studio.credentials_mut().set_key(value);
                        studio.sync_api_key()
                    }
                    None => match studio.select_api_key() {
                        Ok(selected) => selected,
                        Err(err) => {
                            println!("Key selection failed: {err:#}");
                            false
                        }
                    },
                };
                if selected {
                    println!("API key selected");
                } else {
                    println!("No API key selected");
                }
            }
            "generate" => {
                println!(
                    "Generating with {} person photo(s)...",
                    studio.state().persons.len()
                );
                match studio.generate() {
                    Ok(Ok(image)) => println!(
                        "Result ready ({} base64 chars). Use /download to save it.",
                        image.base64_payload().len()
                    ),
                    Err(err) => println!("Generation not started: {err:#}"),
                    Ok(Err(failure)) => {
                        print_failure(&failure);
                        if failure.kind == FailureKind::AuthKeyInvalid
                            || failure.kind == FailureKind::MissingCredential
                        {
                            println!("Use /key to select an API key.");
                        }
                    }
                }
            }
            "download" => {
                let target = intent
                    .arg_str("path")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| args.out.clone());
                match studio.download(&target) {
                    Ok(saved) => println!("Saved {}", saved.display()),
                    Err(err) => println!("Download failed: {err:#}"),
                }
            }
            "status" => print_status(&studio),
            "dismiss_error" => studio.dismiss_error(),
            "reset" => {
                studio.reset();
                println!("Session reset");
            }
            "quit" => break,
            _ => println!("Unknown command. Type /help for commands."),
        }
        warn_event_error(&mut studio);
    }

    Ok(())
}

/// Key store that can prompt on stdin when asked to select a key.
struct PromptKeyStore {
    store: ApiKeyStore,
}

impl PromptKeyStore {
    fn from_env() -> Self {
        Self {
            store: ApiKeyStore::from_env(),
        }
    }

    fn set_key(&mut self, key: &str) {
        self.store.set_key(key);
    }
}

impl CredentialProvider for PromptKeyStore {
    fn has_selected_key(&self) -> bool {
        self.store.has_selected_key()
    }

    fn open_select_key(&mut self) -> Result<()> {
        print!("Paste a Gemini API key: ");
        io::stdout().flush()?;
        let mut raw = String::new();
        io::stdin().read_line(&mut raw)?;
        if raw.trim().is_empty() {
            bail!("no API key entered");
        }
        self.store.set_key(raw);
        Ok(())
    }

    fn api_key(&self) -> Option<String> {
        self.store.api_key()
    }
}

fn print_poster(poster: &UploadedImage) {
    println!(
        "Poster: {} ({}, {}) -> aspect ratio {}",
        poster.file_name,
        poster.mime_type,
        poster.dimensions_label(),
        select_aspect_ratio(poster.width, poster.height)
    );
}

fn print_person_report(report: &PersonUploadReport) {
    for person in &report.added {
        println!(
            "Person [{}] {} ({})",
            person.id,
            person.file_name,
            person.dimensions_label()
        );
    }
    for (path, err) in &report.failed {
        println!("Skipped {}: {err}", path.display());
    }
    if report.skipped > 0 {
        println!("Ignored {} file(s): person list is full", report.skipped);
    }
}

/// A skipped photo would shift every later person onto the wrong character.
fn require_every_person(report: &PersonUploadReport) -> Result<()> {
    if let Some((path, err)) = report.failed.first() {
        bail!("person photo {} could not be loaded: {err}", path.display());
    }
    if report.skipped > 0 {
        bail!("too many person photos: the person list is full");
    }
    Ok(())
}

fn warn_event_error<G, C>(studio: &mut Studio<G, C>)
where
    G: CompositeGenerator,
    C: CredentialProvider,
{
    if let Some(err) = studio.take_event_error() {
        eprintln!("warning: event log write failed: {err:#}");
    }
}

fn print_failure(failure: &GenerationFailure) {
    eprintln!("Generation failed [{}]: {}", failure.kind.as_str(), failure.message);
}

fn print_status<G, C>(studio: &Studio<G, C>)
where
    G: CompositeGenerator,
    C: CredentialProvider,
{
    let state = studio.state();
    match &state.poster {
        Some(poster) => print_poster(poster),
        None => println!("Poster: none"),
    }
    println!("Persons: {}/{}", state.persons.len(), state.max_persons);
    for (idx, person) in state.persons.iter().enumerate() {
        println!("  {}. [{}] {}", idx + 1, person.id, person.file_name);
    }
    println!(
        "API key: {}",
        if state.api_key_selected {
            "selected"
        } else {
            "not selected"
        }
    );
    if state.result.is_some() {
        println!("Result: ready");
    }
    if let Some(error) = &state.error {
        println!("Last error [{}]: {}", error.kind.as_str(), error.message);
    }
}

fn new_session_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis())
        .unwrap_or(0);
    format!("session-{millis}")
}
