// SPDX-License-Identifier: MIT OR Apache-2.0
//! Motion Editor command line

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use motion_editor_app::audio::SystemDecoder;
use motion_editor_app::{convert, EditorConfig, EditorState, FsStore, Script};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "motion_editor", version)]
struct Cli {
    /// Editor config (RON). Defaults apply when the file does not exist.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a project into a device motion file.
    Export(ExportArgs),
    /// Print track contents of a project.
    Info(InfoArgs),
    /// Replay an edit script on a project and save the result.
    Apply(ApplyArgs),
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Input project JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output motion JSON.
    #[arg(long)]
    out: PathBuf,

    /// Indent the output.
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

#[derive(Parser, Debug)]
struct InfoArgs {
    /// Input project JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct ApplyArgs {
    /// Input project JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Edit script (RON).
    #[arg(long)]
    script: PathBuf,

    /// Output project; defaults to overwriting the input.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("motion_editor_app=debug".parse().context("parse log directive")?);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    match cli.cmd {
        Command::Export(args) => cmd_export(config, args),
        Command::Info(args) => cmd_info(config, args),
        Command::Apply(args) => cmd_apply(config, args),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<EditorConfig> {
    match path {
        Some(path) => EditorConfig::load_or_default(path)
            .with_context(|| format!("read config '{}'", path.display())),
        None => Ok(EditorConfig::default()),
    }
}

fn open(config: EditorConfig, path: &Path) -> anyhow::Result<EditorState> {
    let mut state = EditorState::new(config);
    state
        .open_project(&FsStore, path, Some(&SystemDecoder))
        .with_context(|| format!("open project '{}'", path.display()))?;
    Ok(state)
}

fn cmd_export(config: EditorConfig, args: ExportArgs) -> anyhow::Result<()> {
    let state = open(config, &args.in_path)?;
    let motion = convert(&state.document, state.scale());
    let json = if args.pretty {
        motion.to_json_pretty()
    } else {
        motion.to_json()
    }
    .context("serialize motion")?;

    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, json).with_context(|| format!("write motion '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_info(config: EditorConfig, args: InfoArgs) -> anyhow::Result<()> {
    let state = open(config, &args.in_path)?;
    let document = &state.document;

    println!("{} ({} keyframes)", state.project_name(), document.keyframe_count());
    for (index, track) in document.tracks().iter().enumerate() {
        let link = if track.is_link_source() || track.is_following() {
            if track.linked {
                " [linked]"
            } else {
                " [unlinked]"
            }
        } else {
            ""
        };
        let last = track
            .last_frame()
            .map(|frame| format!(", last at frame {frame}"))
            .unwrap_or_default();
        println!("{index}: {:<14} {:>4} keyframes{last}{link}", track.name, track.len());
    }
    if document.audio.is_loaded() {
        println!(
            "sound: {} (delay {:.2}s)",
            document.audio.name,
            state.scale().frames_to_seconds(document.audio.delay_frames)
        );
    }
    Ok(())
}

fn cmd_apply(config: EditorConfig, args: ApplyArgs) -> anyhow::Result<()> {
    let mut state = open(config, &args.in_path)?;
    let script = Script::load(&args.script).with_context(|| format!("read script '{}'", args.script.display()))?;
    let steps = script.run(&mut state).context("run script")?;

    let out = args.out.unwrap_or_else(|| args.in_path.clone());
    if state.needs_save() || out != args.in_path {
        state
            .save_project(&FsStore, &out)
            .with_context(|| format!("save project '{}'", out.display()))?;
        eprintln!("applied {steps} steps, wrote {}", out.display());
    } else {
        eprintln!("applied {steps} steps, no changes");
    }
    Ok(())
}
