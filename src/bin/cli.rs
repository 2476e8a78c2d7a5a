//! sequent CLI: play the built-in demo song or export it as WAV.
//!
//! Usage:
//!   cargo run --bin sequent-cli
//!   cargo run --bin sequent-cli -- --wav demo.wav --stereo 60

use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use std::{fs, thread};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use sequent::demo_song;
use sq_master::{Controller, CpalOutput, EngineConfig, StereoMode, Telemetry};

#[derive(Parser)]
#[command(name = "sequent-cli")]
#[command(about = "Play or render the sequent demo song", long_about = None)]
struct Cli {
    /// Render to this WAV file instead of playing
    #[arg(long)]
    wav: Option<PathBuf>,

    /// Longest render or playback time
    #[arg(short, long, default_value = "60")]
    seconds: u32,

    /// Sample rate for WAV export (playback uses the device rate)
    #[arg(long, default_value = "44100")]
    sample_rate: u32,

    #[arg(long, value_enum, default_value = "imaging")]
    stereo_mode: StereoArg,

    /// Stereo separation in percent (0 mono, 100 unchanged)
    #[arg(long, default_value = "100")]
    stereo: u16,

    /// Override the song tempo in BPM
    #[arg(long)]
    tempo: Option<u16>,
}

#[derive(Clone, Copy, ValueEnum)]
enum StereoArg {
    /// ProTracker 2 style, narrows only
    Pt2,
    /// Free imaging up to 200%
    Imaging,
}

impl From<StereoArg> for StereoMode {
    fn from(arg: StereoArg) -> Self {
        match arg {
            StereoArg::Pt2 => StereoMode::Pt2,
            StereoArg::Imaging => StereoMode::Imaging,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let song = demo_song();

    println!("Title:    {}", song.title);
    println!("Channels: {}", song.channel_count());
    println!("Patterns: {}", song.patterns.len());
    println!("Orders:   {}", song.order.len());
    println!(
        "Tempo:    {} BPM, Speed: {}",
        cli.tempo.unwrap_or(song.initial_tempo),
        song.initial_speed
    );
    println!();
    print!("{}", sq_ir::analyze(&song));
    println!();

    let config = EngineConfig {
        stereo_mode: cli.stereo_mode.into(),
        stereo_percent: cli.stereo,
        tempo: cli.tempo,
        ..EngineConfig::one_shot(cli.sample_rate)
    };

    match &cli.wav {
        Some(path) => render_to_wav(config, song, path, cli.seconds),
        None => play_audio(config, song, cli.seconds),
    }
}

fn play_audio(config: EngineConfig, song: sq_ir::Song, seconds: u32) -> Result<()> {
    let output = CpalOutput::new().context("opening audio device")?;
    let mut ctrl = Controller::with_output(config, output);
    ctrl.load_song(song).context("loading song")?;
    ctrl.play()?;
    println!("Playing at {} Hz...", ctrl.sample_rate());
    println!();

    let deadline = Instant::now() + Duration::from_secs(seconds.into());
    while ctrl.is_playing() && Instant::now() < deadline {
        let pos = ctrl.position();
        print!("\rOrd: {:02X} | Row: {:02X}", pos.order, pos.row);
        let _ = std::io::stdout().flush();
        while let Some(telemetry) = ctrl.poll() {
            if let Telemetry::Diagnostic(d) = telemetry {
                println!("\n{d:?}");
            }
        }
        thread::sleep(Duration::from_millis(10));
    }

    ctrl.stop()?;
    println!("\rDone.          ");
    Ok(())
}

fn render_to_wav(config: EngineConfig, song: sq_ir::Song, path: &PathBuf, seconds: u32) -> Result<()> {
    let mut ctrl = Controller::new(config);
    ctrl.load_song(song).context("loading song")?;
    println!("Rendering to {} at {} Hz...", path.display(), ctrl.sample_rate());

    let wav = ctrl.render_to_wav(seconds)?;
    println!("Rendered {} bytes", wav.len());

    fs::write(path, &wav).with_context(|| format!("writing {}", path.display()))?;
    println!("Done.");
    Ok(())
}
