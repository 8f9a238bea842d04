mod config;

use std::{
    path::PathBuf,
    process::Command,
    rc::Rc,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tao::{
    event::Event,
    event_loop::{ControlFlow, EventLoop},
};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use keyevent::{
    CenterConfig, JsonFileStore, KeyEvent, ObservationSet, Transition, center,
};

use crate::config::{Binding, Config, parse_assignment};

/// How often the run loop drains hotkey signals
const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Parser, Debug)]
#[command(name = "keyevent-cli")]
#[command(about = "Register named global key events and run their commands", long_about = None)]
struct Args {
    /// Path to RON binding definition file
    #[arg(required_unless_present_any = ["list", "set", "clear"])]
    config: Option<PathBuf>,

    /// JSON file holding the chosen combinations
    #[arg(long, default_value = "keyevents.json")]
    store: PathBuf,

    /// Print the persisted combinations and exit
    #[arg(long)]
    list: bool,

    /// Persist a combination, e.g. --set save=cmd+shift+s
    #[arg(long, value_name = "NAME=KEY")]
    set: Vec<String>,

    /// Forget the persisted combination for an event
    #[arg(long, value_name = "NAME")]
    clear: Vec<String>,

    /// Set the log level
    #[arg(short, long, value_enum)]
    log_level: Option<LogLevel>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Only initialize tracing if RUST_LOG is set or log level is explicitly provided
    if std::env::var("RUST_LOG").is_ok() || args.log_level.is_some() {
        let log_level = match args.log_level.clone().unwrap_or(LogLevel::Info) {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .without_time()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            )
            .with(
                EnvFilter::from_default_env()
                    .add_directive(format!("keyevent={log_level}").parse()?)
                    .add_directive(format!("keyevent_cli={log_level}").parse()?),
            )
            .init();
    }

    let store = Rc::new(
        JsonFileStore::open(&args.store)
            .with_context(|| format!("Failed to open store: {:?}", args.store))?,
    );

    if args.list || !args.set.is_empty() || !args.clear.is_empty() {
        return edit_store(&args, &store);
    }

    let path = args
        .config
        .as_deref()
        .context("Config path is required")?;
    info!("Loading bindings from: {:?}", path);
    let config = Config::load(path)?;

    // The event loop has to exist before any hotkey is registered on macOS
    let event_loop = EventLoop::new();
    center::configure(CenterConfig::new().with_store(store));

    let mut observations = ObservationSet::new();
    let mut events = Vec::new();
    for binding in &config.bindings {
        let event = register(binding, &mut observations)?;
        events.push(event);
    }
    println!("Listening for {} key events", events.len());

    info!("Starting tao event loop...");
    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::WaitUntil(Instant::now() + POLL_INTERVAL);

        let delivered = center::pump();
        if delivered > 0 {
            debug!("Delivered {} hotkey signals", delivered);
        }

        if let Event::LoopDestroyed = event {
            info!("Event loop destroyed");
            observations.clear();
            events.clear();
            center::shutdown();
        }
    })
}

/// Create the event for `binding`, seeding its default combination when
/// nothing is persisted, and run its command on key down
fn register(binding: &Binding, observations: &mut ObservationSet) -> Result<KeyEvent> {
    let event = KeyEvent::new(binding.name.as_str());

    if event.combination().is_empty() {
        if let Some(default) = binding.default_combination()? {
            if let Err(e) = event.set_combination(default) {
                warn!("Could not install default for '{}': {}", binding.name, e);
            }
        }
    }

    if event.is_enabled() {
        println!("  {} - {}", event.combination().symbols(), binding.name);
    } else {
        println!("  (unassigned) - {}", binding.name);
    }

    let name = binding.name.clone();
    let command = binding.command.clone();
    observations.add(event.observe(Transition::KeyDown, move || {
        println!("{name}");
        if let Some(command) = &command {
            execute_shell(command);
        }
    }));
    Ok(event)
}

fn execute_shell(command: &str) {
    debug!("Running: {}", command);
    if let Err(e) = Command::new("sh").arg("-c").arg(command).spawn() {
        error!("Failed to run '{}': {}", command, e);
    }
}

/// Handle --set, --clear and --list against the store without the event loop
fn edit_store(args: &Args, store: &Rc<JsonFileStore>) -> Result<()> {
    center::configure(
        CenterConfig::new()
            .with_backend(DetachedBackend)
            .with_store(store.clone()),
    );

    for assignment in &args.set {
        let (name, combination) = parse_assignment(assignment)?;
        KeyEvent::new(name.as_str())
            .set_combination(combination)
            .with_context(|| format!("Failed to store combination for '{name}'"))?;
        info!("Stored {} for '{}'", assignment, name);
    }
    for name in &args.clear {
        KeyEvent::new(name.as_str())
            .clear()
            .with_context(|| format!("Failed to clear '{name}'"))?;
    }

    if args.list {
        for (key, value) in store.entries() {
            println!("{key}: {value}");
        }
    }
    center::shutdown();
    Ok(())
}

/// Accepts every install without touching the OS, for editing the store
/// from a process that never runs an event loop
struct DetachedBackend;

impl keyevent::HotkeyBackend for DetachedBackend {
    fn install(
        &mut self,
        identifier: keyevent::Identifier,
        _combination: &keyevent::KeyCombination,
    ) -> keyevent::Result<keyevent::HookHandle> {
        Ok(keyevent::HookHandle::new(identifier, identifier.get()))
    }

    fn uninstall(&mut self, _handle: keyevent::HookHandle) -> keyevent::Result<()> {
        Ok(())
    }

    fn poll(&mut self) -> Vec<keyevent::Signal> {
        Vec::new()
    }
}
