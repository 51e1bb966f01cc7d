//! Entry point for the **wsindicator** daemon.
//!
//! Parses the command line, loads the config file, spawns the control
//! socket listener on a background thread and hands the main thread to the
//! event loop.
//!
//! When the `indicator-gtk` feature is enabled the main thread runs the
//! GLib main loop (GTK4 requires it).  Without the feature, a headless loop
//! that only logs label changes is used instead.

use clap::{Parser, ValueEnum};
use log::{error, info, warn};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use wsindicator::command::Command;
use wsindicator::config::{self, Config, ProbeKind};
use wsindicator::engine::EngineError;
use wsindicator::komorebi::{KomorebicSource, Query};
use wsindicator::probe::NoProbe;
use wsindicator::registry::MonitorRegistry;
use wsindicator::template;
use wsindicator::traits::{FullscreenProbe, StateSource};

/// Floating per-monitor workspace indicator for komorebi
#[derive(Parser, Debug)]
#[command(name = "wsindicator")]
#[command(version)]
#[command(about = "Shows the focused komorebi workspace on every monitor")]
struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/wsindicator/config.json)
    #[arg(short = 'c', long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Label template; {monitor}, {workspace} and {name} are substituted
    #[arg(short = 't', long, value_name = "TEMPLATE")]
    template: Option<String>,

    /// Prefix the label with the monitor number (ignored with --template)
    #[arg(long)]
    show_monitor: bool,

    /// Append the workspace name (ignored with --template)
    #[arg(long)]
    show_name: bool,

    /// Path to the komorebic executable
    #[arg(long, value_name = "PATH", env = "WSINDICATOR_KOMOREBIC")]
    komorebic: Option<PathBuf>,

    /// Log level (default: no logging)
    #[arg(long, value_name = "LEVEL", group = "logging")]
    log_level: Option<LogLevel>,

    /// Shorthand for --log-level info
    #[arg(short = 'v', long, group = "logging")]
    verbose: bool,

    /// Shorthand for --log-level debug
    #[arg(long, group = "logging")]
    debug: bool,

    /// Also append log records to this file while logging is enabled
    /// (default: $XDG_CONFIG_HOME/wsindicator/wsindicator.log)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Print what komorebic reports and exit
    #[arg(long)]
    check: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Cli {
    fn log_filter(&self) -> &'static str {
        if self.debug {
            return "debug";
        }
        if self.verbose {
            return "info";
        }
        match self.log_level {
            Some(LogLevel::Debug) => "debug",
            Some(LogLevel::Info) => "info",
            Some(LogLevel::Warning) => "warn",
            Some(LogLevel::Error) | Some(LogLevel::Critical) => "error",
            None => "off",
        }
    }

    fn logging_enabled(&self) -> bool {
        self.log_filter() != "off" || std::env::var_os("RUST_LOG").is_some()
    }

    fn log_file_path(&self) -> Option<PathBuf> {
        self.log_file
            .clone()
            .or_else(|| config::config_dir().map(|d| d.join(LOG_FILE_NAME)))
    }

    /// Let command-line flags override the file.
    fn apply(&self, mut config: Config) -> Config {
        if let Some(ref path) = self.komorebic {
            config.komorebic = path.clone();
        }
        if let Some(ref t) = self.template {
            config.template = Some(t.clone());
        }
        config
    }
}

const LOG_FILE_NAME: &str = "wsindicator.log";

//  Main

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    let config = match load_config(&cli) {
        Ok(c) => cli.apply(c),
        Err(e) => {
            error!("{}", e);
            eprintln!("wsindicator: {}", e);
            std::process::exit(1);
        }
    };
    let template = template::compose(config.template.as_deref(), cli.show_monitor, cli.show_name);
    info!("label template {:?}", template);

    let source = KomorebicSource::new(&config.komorebic, config.query_timeout());
    if cli.check {
        std::process::exit(run_check(&source));
    }

    let probe = build_probe(&config);
    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
    spawn_control_socket(&config, cmd_tx.clone());

    if let Err(e) = start_event_loop(source, probe, &config, template, cmd_tx, cmd_rx) {
        error!("{}", e);
        eprintln!("wsindicator: {}", e);
        std::process::exit(1);
    }
}

/// Log to stderr and, while logging is enabled, to the log file as well.
fn init_logging(cli: &Cli) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_filter()));
    let mut file_error = None;
    if cli.logging_enabled() {
        if let Some(path) = cli.log_file_path() {
            match open_log_file(&path) {
                Ok(file) => {
                    builder.target(env_logger::Target::Pipe(Box::new(Tee { file })));
                }
                Err(e) => file_error = Some((path, e)),
            }
        }
    }
    builder.init();
    if let Some((path, e)) = file_error {
        warn!("cannot write log file {}: {}", path.display(), e);
    }
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Copies every log record to stderr and to the log file.
struct Tee {
    file: File,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let _ = io::stderr().write_all(buf);
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let _ = io::stderr().flush();
        self.file.flush()
    }
}

fn load_config(cli: &Cli) -> Result<Config, config::ConfigError> {
    match cli.config {
        Some(ref path) => {
            let cfg = Config::load(path)?;
            info!("loaded config from {}", path.display());
            Ok(cfg)
        }
        None => match config::default_config_path() {
            Some(path) => {
                let cfg = Config::load_or_default(&path)?;
                info!("config: {}", path.display());
                Ok(cfg)
            }
            None => Ok(Config::default()),
        },
    }
}

fn build_probe(config: &Config) -> Box<dyn FullscreenProbe> {
    match config.fullscreen_probe {
        ProbeKind::None => Box::new(NoProbe),
        #[cfg(windows)]
        ProbeKind::Win32 => Box::new(wsindicator::win32::Win32Probe::new()),
        #[cfg(not(windows))]
        ProbeKind::Win32 => {
            info!("win32 fullscreen detection is only available on Windows");
            Box::new(NoProbe)
        }
        #[cfg(unix)]
        ProbeKind::Hyprland => match wsindicator::hyprland::HyprlandProbe::from_env() {
            Ok(p) => Box::new(p),
            Err(e) => {
                info!("fullscreen detection disabled: {}", e);
                Box::new(NoProbe)
            }
        },
        #[cfg(not(unix))]
        ProbeKind::Hyprland => {
            info!("fullscreen detection is not available on this platform");
            Box::new(NoProbe)
        }
    }
}

//  Diagnostics

/// Print what the tool reports.  Returns the process exit code.
fn run_check(source: &KomorebicSource) -> i32 {
    println!("komorebic: {}", source.program().display());
    if !source.is_available() {
        println!("komorebi is not reachable");
        return 1;
    }
    for kind in [
        Query::Version,
        Query::FocusedMonitorIndex,
        Query::FocusedWorkspaceIndex,
        Query::FocusedWorkspaceName,
        Query::FocusedWorkspaceLayout,
    ] {
        match source.query(kind) {
            Ok(answer) => println!("{}: {}", kind.as_arg(), answer.as_deref().unwrap_or("-")),
            Err(e) => println!("{}: error: {}", kind.as_arg(), e),
        }
    }

    let mut registry = MonitorRegistry::new();
    match registry.refresh(source) {
        Ok(()) => println!("{}", registry.summary()),
        Err(e) => {
            println!("monitor-information: error: {}", e);
            return 1;
        }
    }
    match source.snapshot_all_workspace_states() {
        Ok(states) => {
            for s in states {
                println!(
                    "monitor {}: workspace {} name {} layout {}",
                    s.monitor_id,
                    s.workspace_index + 1,
                    s.workspace_name.as_deref().unwrap_or("-"),
                    s.workspace_layout.as_deref().unwrap_or("-"),
                );
            }
            0
        }
        Err(e) => {
            println!("state: error: {}", e);
            1
        }
    }
}

//  Event loops

#[cfg(feature = "indicator-gtk")]
fn start_event_loop<S, P>(
    source: S,
    probe: P,
    config: &Config,
    template: String,
    cmd_tx: mpsc::Sender<Command>,
    cmd_rx: mpsc::Receiver<Command>,
) -> Result<(), EngineError>
where
    S: StateSource + 'static,
    P: FullscreenProbe + 'static,
{
    wsindicator::indicator::gtk::run_main_loop(
        source,
        probe,
        config,
        template,
        config::default_css_path(),
        cmd_tx,
        cmd_rx,
    )
}

#[cfg(not(feature = "indicator-gtk"))]
fn start_event_loop<S, P>(
    source: S,
    probe: P,
    config: &Config,
    template: String,
    cmd_tx: mpsc::Sender<Command>,
    cmd_rx: mpsc::Receiver<Command>,
) -> Result<(), EngineError>
where
    S: StateSource,
    P: FullscreenProbe,
{
    // Only the control socket sends commands here.
    drop(cmd_tx);
    wsindicator::indicator::headless::run_loop(source, probe, config, template, cmd_rx)
}

//  Helpers

#[cfg(unix)]
fn spawn_control_socket(config: &Config, tx: mpsc::Sender<Command>) {
    use wsindicator::ipc::{default_socket_path, UnixSocketListener};
    use wsindicator::traits::CommandSource;

    let path = default_socket_path(&config.socket_name);
    std::thread::spawn(move || {
        let mut source = UnixSocketListener::new(&path);
        if let Err(e) = source.run(tx) {
            error!("control socket error: {}", e);
        }
    });
}

#[cfg(not(unix))]
fn spawn_control_socket(_config: &Config, _tx: mpsc::Sender<Command>) {
    info!("control socket is not available on this platform");
}
