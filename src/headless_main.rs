use anyhow::Result;
use clap::Parser;
use log::{info, warn};
use std::cell::Cell;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use serene_audio::audio::{RodioBackend, RodioPlatform, SignalTap};
use serene_audio::graphics::FrequencySource;
use serene_audio::{EngineConfig, PlaybackSession, SessionProps};

#[derive(Parser)]
#[command(name = "serene-headless")]
#[command(about = "Play a narration and background in the terminal, logging progress and spectrum")]
struct Args {
    /// Narration audio file (MP3, WAV, OGG, FLAC)
    #[arg()]
    narration: String,

    /// Background track, looped under the narration
    #[arg(short, long)]
    background: Option<String>,

    /// JSON config file
    #[arg(short, long)]
    config: Option<String>,

    /// Initial narration volume from 0 to 1
    #[arg(long)]
    volume: Option<f32>,
}

const FRAME: Duration = Duration::from_millis(16);
const REPORT_EVERY: Duration = Duration::from_secs(1);
const SPECTRUM_BANDS: usize = 24;

/// One character per band, from silent to loud.
fn spectrum_line(data: &[u8]) -> String {
    const LEVELS: &[u8] = b" .:-=+*#%@";
    if data.is_empty() {
        return " ".repeat(SPECTRUM_BANDS);
    }
    let band = (data.len() / SPECTRUM_BANDS).max(1);
    data.chunks(band)
        .take(SPECTRUM_BANDS)
        .map(|chunk| {
            let mean = chunk.iter().map(|&v| v as usize).sum::<usize>() / chunk.len();
            LEVELS[mean * (LEVELS.len() - 1) / 255] as char
        })
        .collect()
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(volume) = args.volume {
        config.narration_volume = volume;
    }

    info!("Serene Audio headless player");
    info!("Narration: {}", args.narration);
    if let Some(background) = &args.background {
        info!("Background: {}", background);
    }

    let finished = Rc::new(Cell::new(false));
    let done = finished.clone();
    let mut props = SessionProps::new(args.narration.clone()).on_end(move || done.set(true));
    props.background_url = args.background.clone();

    let tap = SignalTap::shared(Box::new(RodioPlatform), config.analyser_options());
    let mut session = PlaybackSession::new(props, RodioBackend::new()?, tap, &config);

    let mut started = false;
    let mut last_report = Instant::now();
    let mut spectrum = Vec::new();

    while !finished.get() {
        session.tick();
        let snapshot = session.snapshot();

        if let Some(error) = &snapshot.error {
            if error.is_fatal() {
                return Err(error.clone().into());
            }
        }

        if !started && !snapshot.loading {
            if let Some(error) = &snapshot.error {
                warn!("Continuing without {}", error.role);
            }
            session.toggle_play();
            started = true;
            info!("Playback started");
        }

        if last_report.elapsed() >= REPORT_EVERY {
            last_report = Instant::now();
            if !session.fill_frequency_data(&mut spectrum) {
                spectrum.clear();
            }
            info!(
                "{:5.1}% [{}]",
                snapshot.progress * 100.0,
                spectrum_line(&spectrum)
            );
        }

        thread::sleep(FRAME);
    }

    info!("Narration finished");
    Ok(())
}
