use anyhow::Result;
use clap::Parser;
use log::info;
use std::sync::Arc;
use std::time::Instant;
use winit::{
    event::{ElementState, Event, WindowEvent},
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::WindowBuilder,
};

use serene_audio::audio::{RodioBackend, RodioPlatform, SignalTap};
use serene_audio::graphics::{CanvasFade, GraphicsEngine, RasterCanvas, VisualStyle, Visualizer};
use serene_audio::{EngineConfig, PlaybackSession, SessionProps};

#[derive(Parser)]
#[command(name = "serene-audio")]
#[command(about = "Play a guided narration over a looping background with a live visualizer")]
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

    /// Visual style: waveform, radial or particles
    #[arg(long)]
    style: Option<String>,

    /// Base color, as rgba(...) or #rrggbb
    #[arg(long)]
    color: Option<String>,

    /// Visual intensity from 0 to 1
    #[arg(long)]
    intensity: Option<f32>,

    /// Initial narration volume from 0 to 1
    #[arg(long)]
    volume: Option<f32>,
}

const SEEK_STEP: f32 = 0.05;
const VOLUME_STEP: f32 = 0.1;

fn load_config(args: &Args) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(style) = &args.style {
        config.visualizer.style = VisualStyle::from_tag(style);
    }
    if let Some(color) = &args.color {
        config.visualizer.color = color.clone();
    }
    if let Some(intensity) = args.intensity {
        config.visualizer.intensity = intensity;
    }
    if let Some(volume) = args.volume {
        config.narration_volume = volume;
    }
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = load_config(&args)?;
    info!("Starting Serene Audio");

    let event_loop = EventLoop::new()?;
    let window = Arc::new(WindowBuilder::new()
        .with_title("Serene Audio")
        .with_inner_size(winit::dpi::LogicalSize::new(960, 540))
        .build(&event_loop)?);

    let mut graphics_engine = pollster::block_on(GraphicsEngine::new(Arc::clone(&window)))?;

    let tap = SignalTap::shared(Box::new(RodioPlatform), config.analyser_options());
    let mut props = SessionProps::new(args.narration.clone())
        .on_end(|| info!("Narration finished"));
    props.background_url = args.background.clone();
    let mut session = PlaybackSession::new(props, RodioBackend::new()?, tap, &config);

    let mut canvas = RasterCanvas::new(1, 1);
    let mut visualizer = Visualizer::new(config.visualizer.clone());
    let logical = window.inner_size().to_logical::<f32>(window.scale_factor());
    visualizer.resize(&mut canvas, logical.width, logical.height, window.scale_factor() as f32);
    visualizer.mount();

    info!("Space: play/pause, M: mute, arrows: seek/volume, 1-3: style, Esc: quit");

    let started = Instant::now();
    let mut last_frame = started;
    let mut fade = CanvasFade::new();
    let window_clone = Arc::clone(&window);
    event_loop.run(move |event, elwt| {
        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => {
                    info!("Close requested");
                    elwt.exit();
                }
                WindowEvent::KeyboardInput {
                    event,
                    ..
                } => {
                    if event.state != ElementState::Pressed {
                        return;
                    }
                    let snapshot = session.snapshot();
                    match event.physical_key {
                        PhysicalKey::Code(KeyCode::Escape) => {
                            info!("Escape pressed");
                            elwt.exit();
                        }
                        PhysicalKey::Code(KeyCode::Space) if !event.repeat => {
                            let playing = session.toggle_play();
                            info!("{}", if playing { "Playing" } else { "Paused" });
                        }
                        PhysicalKey::Code(KeyCode::KeyM) if !event.repeat => {
                            let muted = session.toggle_mute();
                            info!("{}", if muted { "Muted" } else { "Unmuted" });
                        }
                        PhysicalKey::Code(KeyCode::ArrowLeft) => {
                            session.seek(snapshot.progress - SEEK_STEP);
                        }
                        PhysicalKey::Code(KeyCode::ArrowRight) => {
                            session.seek(snapshot.progress + SEEK_STEP);
                        }
                        PhysicalKey::Code(KeyCode::ArrowUp) => {
                            session.set_volume(snapshot.volume + VOLUME_STEP);
                        }
                        PhysicalKey::Code(KeyCode::ArrowDown) => {
                            session.set_volume(snapshot.volume - VOLUME_STEP);
                        }
                        PhysicalKey::Code(KeyCode::Digit1) => visualizer.set_style(VisualStyle::Waveform),
                        PhysicalKey::Code(KeyCode::Digit2) => visualizer.set_style(VisualStyle::Radial),
                        PhysicalKey::Code(KeyCode::Digit3) => visualizer.set_style(VisualStyle::Particles),
                        _ => {}
                    }
                }
                WindowEvent::Resized(physical_size) => {
                    graphics_engine.resize(physical_size);
                    let scale = window_clone.scale_factor();
                    let logical = physical_size.to_logical::<f32>(scale);
                    visualizer.resize(&mut canvas, logical.width, logical.height, scale as f32);
                }
                WindowEvent::RedrawRequested => {
                    session.tick();
                    let playing = session.snapshot().playing;
                    let now = Instant::now();
                    let time = now.duration_since(started).as_secs_f64();
                    let opacity = fade.update(playing, now.duration_since(last_frame).as_secs_f32());
                    last_frame = now;
                    visualizer.on_animation_frame(&mut canvas, &mut session, playing, time);
                    if let Err(e) = graphics_engine.render(&canvas, opacity) {
                        log::error!("Render error: {}", e);
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window_clone.request_redraw();
            }
            _ => {}
        }
    })?;

    Ok(())
}
