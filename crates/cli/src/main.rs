#![deny(warnings)]

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use moodcheck_core::capture::{read_frames_jsonl, FrameSource, ReplayFrameSource};
use moodcheck_core::config::{
    resolve_optional_path, resolve_path_with_default, resolve_scan_window, AppConfig, Env,
    HistoryConfig, SpeechSettings, StdEnv, DEFAULT_FRAME_INTERVAL_MS, DEFAULT_HISTORY_FILE,
    DEFAULT_LISTEN_TIMEOUT_MS, DEFAULT_SPEECH_RATE, DEFAULT_SPEECH_VOLUME, ENV_HISTORY_FILE,
    ENV_MOTIVATIONS_FILE, ENV_SCAN_FRAMES,
};
use moodcheck_core::history::MoodLogger;
use moodcheck_core::motivation::MotivationTable;
use moodcheck_core::session::{self, MoodSession, SessionConfig};
use moodcheck_core::speech::ConsoleSpeaker;
use moodcheck_core::state::{MoodBoard, MoodReader};
use moodcheck_core::voice::{self, KeywordMoodAnalyzer, ScriptedRecognizer};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "moodcheck")]
#[command(about = "Mood check-in from facial-emotion samples and an optional spoken sentence")]
struct Cli {
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan one window of detector output, respond, and log the mood.
    Scan(ScanArgs),
    /// Follow detector output continuously and print the mood on every change.
    Monitor(InputArgs),
    /// Show recent history, a per-mood summary and today's check-ins.
    History(HistoryArgs),
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Detector output, one JSON object (or `null`) per frame.
    #[arg(long)]
    frames: PathBuf,

    /// What the user said, as returned by the speech-to-text service.
    #[arg(long)]
    transcript: Option<String>,

    #[arg(long)]
    scan_frames: Option<usize>,

    #[arg(long, default_value_t = DEFAULT_FRAME_INTERVAL_MS)]
    frame_interval_ms: u64,

    #[arg(long, default_value_t = DEFAULT_LISTEN_TIMEOUT_MS)]
    listen_timeout_ms: u64,

    #[arg(long, env = ENV_MOTIVATIONS_FILE)]
    motivations: Option<PathBuf>,

    /// Seed for message selection.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct ScanArgs {
    #[command(flatten)]
    input: InputArgs,

    #[arg(long, env = ENV_HISTORY_FILE)]
    history_file: Option<PathBuf>,

    #[arg(long)]
    no_history: bool,

    /// Also suggest a song and mention counseling.
    #[arg(long)]
    support: bool,

    #[arg(long, default_value_t = DEFAULT_SPEECH_RATE)]
    speech_rate: u32,

    #[arg(long, default_value_t = DEFAULT_SPEECH_VOLUME)]
    speech_volume: f32,
}

#[derive(Args, Debug)]
struct HistoryArgs {
    #[arg(long, env = ENV_HISTORY_FILE)]
    history_file: Option<PathBuf>,

    #[arg(long, default_value_t = 5)]
    count: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    let env = StdEnv;
    match cli.command {
        Command::Scan(args) => run_scan(args, &env).await,
        Command::Monitor(args) => run_monitor(args, &env).await,
        Command::History(args) => show_history(args, &env),
    }
}

async fn run_scan(args: ScanArgs, env: &impl Env) -> anyhow::Result<()> {
    let speech = SpeechSettings::new(args.speech_rate, args.speech_volume)?;
    let history = HistoryConfig {
        enabled: !args.no_history,
        path: resolve_path_with_default(
            args.history_file,
            ENV_HISTORY_FILE,
            env,
            DEFAULT_HISTORY_FILE,
        ),
    };
    let cfg = build_config(&args.input, speech, history, env)?;

    tracing::info!(
        scan_frames = cfg.scan.frames(),
        history = cfg.history.enabled,
        "config loaded"
    );

    let logger = if cfg.history.enabled {
        Some(
            MoodLogger::open(&cfg.history.path)
                .with_context(|| format!("opening {}", cfg.history.path.display()))?,
        )
    } else {
        None
    };

    let mut config = SessionConfig::from_app(&cfg);
    config.support = args.support;

    let mut session = MoodSession {
        frames: load_frames(&args.input.frames, cfg.frame_interval)?,
        recognizer: args.input.transcript.clone().map(ScriptedRecognizer::said),
        analyzer: KeywordMoodAnalyzer::new(),
        speaker: ConsoleSpeaker::new(cfg.speech),
        motivations: load_motivations(cfg.motivations.as_deref())?,
        logger,
        config,
    };

    let mut rng = rng_for(args.input.seed);
    let report = session.run(&mut rng).await?;

    if let Some(logger) = &session.logger {
        if report.logged {
            println!("Mood logged to {}", logger.path().display());
        }
        println!(
            "You've checked your mood {} time(s) today",
            logger.today().len()
        );
    }
    tracing::debug!(?report, "session finished");
    Ok(())
}

async fn run_monitor(args: InputArgs, env: &impl Env) -> anyhow::Result<()> {
    let cfg = build_config(
        &args,
        SpeechSettings::default(),
        HistoryConfig::default(),
        env,
    )?;
    let frames = load_frames(&args.frames, cfg.frame_interval)?;
    let motivations = load_motivations(cfg.motivations.as_deref())?;

    let board = MoodBoard::default();
    let mut reader = board.reader();
    let printer = tokio::spawn(async move {
        while reader.changed().await {
            match report_line(&reader) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!(error = %e, "failed to encode report"),
            }
        }
    });

    let voice_task = args.transcript.clone().map(|text| {
        let timeout = cfg.listen_timeout;
        tokio::spawn(async move {
            voice::listen(
                &ScriptedRecognizer::said(text),
                &KeywordMoodAnalyzer::new(),
                timeout,
            )
            .await
        })
    });

    let capacity = SessionConfig::from_app(&cfg).channel_capacity();
    let (tx, mut rx) = tokio::sync::mpsc::channel(capacity);
    let capture = tokio::spawn(frames.start(tx));

    let mut rng = rng_for(args.seed);
    session::monitor(&mut rx, voice_task, &board, &motivations, &mut rng).await?;

    capture
        .await
        .context("capture task panicked")?
        .context("frame capture failed")?;
    drop(board);
    printer.await.context("report printer panicked")?;
    Ok(())
}

fn report_line(reader: &MoodReader) -> anyhow::Result<String> {
    Ok(serde_json::to_string(&reader.report())?)
}

fn show_history(args: HistoryArgs, env: &impl Env) -> anyhow::Result<()> {
    let path = resolve_path_with_default(
        args.history_file,
        ENV_HISTORY_FILE,
        env,
        DEFAULT_HISTORY_FILE,
    );
    let logger =
        MoodLogger::open(&path).with_context(|| format!("opening {}", path.display()))?;

    let recent = logger.recent(args.count);
    if !recent.is_empty() {
        println!("Recent mood history:");
        for entry in recent {
            println!(
                "  {}: {} ({:.2})",
                entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                entry.mood,
                entry.confidence
            );
        }
    }

    let summary = logger.summary();
    if !summary.is_empty() {
        println!("Overall mood summary:");
        for (mood, count) in summary {
            println!("  {mood}: {count} times");
        }
    }

    println!(
        "You've checked your mood {} time(s) today",
        logger.today().len()
    );
    Ok(())
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .parse()
                .with_context(|| format!("invalid --log-level: {level}"))?,
        )
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn build_config(
    input: &InputArgs,
    speech: SpeechSettings,
    history: HistoryConfig,
    env: &impl Env,
) -> anyhow::Result<AppConfig> {
    let scan = resolve_scan_window(input.scan_frames, ENV_SCAN_FRAMES, env)?;
    let motivations = resolve_optional_path(input.motivations.clone(), ENV_MOTIVATIONS_FILE, env);

    Ok(AppConfig {
        scan,
        frame_interval: Duration::from_millis(input.frame_interval_ms),
        listen_timeout: Duration::from_millis(input.listen_timeout_ms),
        speech,
        history,
        motivations,
    })
}

fn load_frames(path: &Path, interval: Duration) -> anyhow::Result<ReplayFrameSource> {
    let file = std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let frames = read_frames_jsonl(BufReader::new(file))
        .with_context(|| format!("reading {}", path.display()))?;
    Ok(ReplayFrameSource::new(frames, interval))
}

fn load_motivations(path: Option<&Path>) -> anyhow::Result<MotivationTable> {
    match path {
        Some(path) => MotivationTable::from_json_file(path)
            .with_context(|| format!("loading motivations from {}", path.display())),
        None => Ok(MotivationTable::default()),
    }
}

fn rng_for(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}
