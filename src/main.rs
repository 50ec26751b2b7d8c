use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{info, warn};

use tg_plot::config::{ClientId, ConfigError, PaperFormat, PlotterConfig, Speed};
use tg_plot::connection::{self, SessionHandle};
use tg_plot::geometry::Viewbox;
use tg_plot::job::{JobCoordinator, JobEvent, JobOutcome};
use tg_plot::recorder::{LineOutcome, Recorder};
use tg_plot::session::{SessionEvent, SessionState};
use tg_plot::svg::{self, Rendered};

/// How long `cancel` waits for the worker to confirm.
const CANCEL_REPLY_TIMEOUT: Duration = Duration::from_secs(5);
/// How long shutdown waits for the closing handshake.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to read input: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid JSON output: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no segments recorded")]
    Empty,
    #[error("gave up connecting to {0}")]
    Disconnected(String),
    #[error("session task ended unexpectedly")]
    SessionClosed,
    #[error("job could not be sent")]
    NotSent,
    #[error("connection dropped while the job was in flight; check the plotter or run `tg-plot cancel`")]
    JobLost,
}

#[derive(Parser, Debug)]
#[command(name = "tg-plot", version, about = "Fit line drawings onto paper and send them to the pen plotter")]
struct Cli {
    #[arg(long, env = "TG_PLOT_SERVER_URL")]
    server: Option<String>,

    #[arg(long, env = "TG_PLOT_CLIENT_ID")]
    client_id: Option<String>,

    #[arg(long, help = "Paper preset, e.g. \"A3 Landscape\"")]
    format: Option<PaperFormat>,

    #[arg(long, help = "Drawing speed in percent (10-100)")]
    speed: Option<Speed>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print line statistics for the input.
    Stats(InputArgs),
    /// Write the print-ready SVG without submitting it.
    Preview {
        #[command(flatten)]
        input: InputArgs,
        #[arg(long, short, help = "Output path; defaults to <timestamp>_<digest>.svg")]
        output: Option<PathBuf>,
    },
    /// Submit the drawing and follow it through the queue. Ctrl-C cancels.
    Plot(InputArgs),
    /// Cancel this client's queued or running job.
    Cancel,
}

#[derive(Args, Debug)]
struct InputArgs {
    #[arg(long, default_value = "-", help = "JSON lines of segments, or - for stdin")]
    input: String,

    #[arg(long, value_parser = parse_viewbox, help = "Source area x,y,width,height; defaults to the drawing's bounding box")]
    viewbox: Option<Viewbox>,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    let cli = Cli::parse();
    let mut config = PlotterConfig::from_env();
    if let Some(server) = cli.server {
        config.server_url = server;
    }
    if let Some(client_id) = cli.client_id {
        config.client_id = client_id;
    }
    if let Some(format) = cli.format {
        config.format = format;
    }
    if let Some(speed) = cli.speed {
        config.speed = speed;
    }

    match cli.command {
        Command::Stats(input) => run_stats(&config, &input),
        Command::Preview { input, output } => run_preview(&config, &input, output),
        Command::Plot(input) => run_plot(&config, &input).await,
        Command::Cancel => run_cancel(&config).await,
    }
}

// =============================================================================
// OFFLINE COMMANDS
// =============================================================================

fn run_stats(config: &PlotterConfig, input: &InputArgs) -> Result<(), CliError> {
    let mut recorder = read_input(config, input)?;
    let stats = recorder.stats();
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

fn run_preview(config: &PlotterConfig, input: &InputArgs, output: Option<PathBuf>) -> Result<(), CliError> {
    let rendered = render(config, input)?;
    let path = output.unwrap_or_else(|| PathBuf::from(rendered.file_name()));
    std::fs::write(&path, &rendered.document)?;
    eprintln!(
        "wrote {}: segments={} digest={}",
        path.display(),
        rendered.stats.count,
        rendered.digest
    );
    Ok(())
}

// =============================================================================
// ONLINE COMMANDS
// =============================================================================

async fn run_plot(config: &PlotterConfig, input: &InputArgs) -> Result<(), CliError> {
    ClientId::parse(&config.client_id)?;
    let rendered = render(config, input)?;

    let (handle, mut events) = connect(config);
    let mut job = JobCoordinator::new(handle.clone(), &config.client_id);
    let mut submitted = false;
    let mut cancel_requested = false;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let result = loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    break Err(CliError::SessionClosed);
                };
                match event {
                    SessionEvent::Connected if !submitted => {
                        submitted = job.submit(&rendered, config.format, config.speed);
                        if !submitted {
                            break Err(CliError::NotSent);
                        }
                        eprintln!(
                            "submitted as {}: format={} speed={} segments={}",
                            config.client_id,
                            config.format,
                            config.speed.get(),
                            rendered.stats.count
                        );
                    }
                    event => {
                        report_session_event(&event);
                        match job.handle_session_event(&event) {
                            Some(JobEvent::Finished(JobOutcome::Lost)) => {
                                eprintln!("{}", job.status_line());
                                break Err(CliError::JobLost);
                            }
                            Some(JobEvent::Finished(_)) => {
                                eprintln!("{}", job.status_line());
                                break Ok(());
                            }
                            Some(JobEvent::State(_)) => eprintln!("{}", job.status_line()),
                            Some(JobEvent::WorkerError(msg)) => eprintln!("plotter says: {msg}"),
                            Some(JobEvent::QueueLength(length)) => info!(length, "queue length"),
                            None => {}
                        }
                        if event == SessionEvent::Disconnected {
                            break Err(CliError::Disconnected(config.server_url.clone()));
                        }
                    }
                }
            }
            _ = &mut ctrl_c => {
                if cancel_requested || !submitted {
                    break Ok(());
                }
                cancel_requested = true;
                eprintln!("canceling... (Ctrl-C again to quit)");
                job.cancel();
                ctrl_c.set(tokio::signal::ctrl_c());
            }
        }
    };

    shutdown(&handle).await;
    result
}

async fn run_cancel(config: &PlotterConfig) -> Result<(), CliError> {
    ClientId::parse(&config.client_id)?;
    let (handle, mut events) = connect(config);
    let mut job = JobCoordinator::new(handle.clone(), &config.client_id);

    let result = loop {
        let Some(event) = events.recv().await else {
            break Err(CliError::SessionClosed);
        };
        match event {
            SessionEvent::Connected => {
                job.cancel();
                break wait_for_cancel(&mut events, &mut job).await;
            }
            SessionEvent::Disconnected => break Err(CliError::Disconnected(config.server_url.clone())),
            other => report_session_event(&other),
        }
    };

    shutdown(&handle).await;
    result
}

async fn wait_for_cancel(
    events: &mut mpsc::UnboundedReceiver<SessionEvent>,
    job: &mut JobCoordinator<SessionHandle>,
) -> Result<(), CliError> {
    let wait = async {
        while let Some(event) = events.recv().await {
            if let SessionEvent::Message(text) = event {
                if let Some(JobEvent::Finished(_)) = job.handle_message(&text) {
                    eprintln!("{}", job.status_line());
                    return Ok(());
                }
            }
        }
        Err(CliError::SessionClosed)
    };
    if let Ok(result) = tokio::time::timeout(CANCEL_REPLY_TIMEOUT, wait).await {
        result
    } else {
        eprintln!("cancel sent, no confirmation from plotter");
        Ok(())
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn connect(config: &PlotterConfig) -> (SessionHandle, mpsc::UnboundedReceiver<SessionEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = connection::spawn(config.session, tx);
    handle.start(config.server_url.clone());
    (handle, rx)
}

async fn shutdown(handle: &SessionHandle) {
    handle.stop();
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, handle.wait_for(SessionState::Disconnected))
        .await
        .is_err()
    {
        warn!("session did not close in time");
    }
}

fn report_session_event(event: &SessionEvent) {
    match event {
        SessionEvent::Connecting { retry: 0 } => eprintln!("connecting..."),
        SessionEvent::Connecting { retry } => eprintln!("connecting (retry {retry})..."),
        SessionEvent::Waiting { retry } => eprintln!("waiting to reconnect ({retry})..."),
        SessionEvent::Connected => eprintln!("connected"),
        SessionEvent::Disconnected => eprintln!("disconnected"),
        SessionEvent::Error { code, reason } => eprintln!("connection error ({code}): {reason}"),
        SessionEvent::Message(_) => {}
    }
}

fn render(config: &PlotterConfig, input: &InputArgs) -> Result<Rendered, CliError> {
    let recorder = read_input(config, input)?;
    recorder.render(&svg::now_timestamp()).ok_or(CliError::Empty)
}

/// Feed every JSON line of the input into a fresh recorder. Blank lines are
/// skipped; malformed ones are counted and skipped.
fn read_input(config: &PlotterConfig, input: &InputArgs) -> Result<Recorder<Option<Viewbox>>, CliError> {
    let reader: Box<dyn BufRead> = if input.input == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(File::open(&input.input)?))
    };

    let mut recorder = Recorder::new(input.viewbox, config.format);
    let mut skipped = 0_usize;
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let outcome = match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => recorder.add_value(&value),
            Err(e) => {
                warn!(error = %e, "skipping line that is not JSON");
                skipped = skipped.saturating_add(1);
                continue;
            }
        };
        if matches!(outcome, LineOutcome::Rejected(_)) {
            skipped = skipped.saturating_add(1);
        }
    }
    info!(recorded = recorder.lines().len(), skipped, "input read");
    Ok(recorder)
}

fn parse_viewbox(raw: &str) -> Result<Viewbox, String> {
    let parts: Vec<f64> = raw
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid number in viewbox: {e}"))?;
    match parts.as_slice() {
        &[x, y, width, height] if width > 0.0 && height > 0.0 => Ok(Viewbox::new(x, y, width, height)),
        &[_, _, _, _] => Err("viewbox width and height must be positive".to_owned()),
        _ => Err("viewbox must be x,y,width,height".to_owned()),
    }
}
