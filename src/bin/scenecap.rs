use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

use scenecap::{
    CaptureConfig, CaptureSession, Codec, ColorScheme, FfmpegEncoder, RenderSurface as _, Rgb,
    SequenceSurface, SessionOutcome,
};

#[derive(Parser, Debug)]
#[command(name = "scenecap", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capture an image-sequence animation into a video (requires `ffmpeg` on PATH).
    Capture(CaptureArgs),
    /// Composite a single frame at a given time and write it as a PNG.
    Frame(FrameArgs),
    /// Inspect a document or this host: detected duration/dimensions and codec support.
    Probe(ProbeArgs),
}

#[derive(Parser, Debug)]
struct CaptureArgs {
    /// Directory containing the numbered image sequence.
    #[arg(long)]
    frames: PathBuf,

    /// Native frame rate of the image sequence.
    #[arg(long, default_value_t = 30.0)]
    sequence_fps: f64,

    /// Output path; extension is adjusted to the negotiated container.
    /// Defaults to a timestamped name in the current directory.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Capture config JSON; flags below override individual fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Animation duration in seconds (defaults to the sequence duration).
    #[arg(long)]
    duration: Option<f64>,

    /// Output frame rate.
    #[arg(long)]
    fps: Option<u32>,

    /// Number of loops to record.
    #[arg(long)]
    loops: Option<u32>,

    /// Playback speed multiplier.
    #[arg(long)]
    speed: Option<f64>,

    /// Output width (even). Defaults to the measured source width.
    #[arg(long)]
    width: Option<u32>,

    /// Output height (even). Defaults to the measured source height.
    #[arg(long)]
    height: Option<u32>,

    #[arg(long, default_value_t = 0)]
    crop_top: u32,
    #[arg(long, default_value_t = 0)]
    crop_bottom: u32,
    #[arg(long, default_value_t = 0)]
    crop_left: u32,
    #[arg(long, default_value_t = 0)]
    crop_right: u32,

    /// Background color for letterbox bars, as #rrggbb.
    #[arg(long)]
    background: Option<String>,

    /// Color profile applied to every frame.
    #[arg(long, value_enum)]
    scheme: Option<SchemeChoice>,

    /// Video bitrate in Mbps.
    #[arg(long)]
    bitrate: Option<f64>,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Directory containing the numbered image sequence.
    #[arg(long)]
    frames: PathBuf,

    /// Native frame rate of the image sequence.
    #[arg(long, default_value_t = 30.0)]
    sequence_fps: f64,

    /// Sample time in seconds.
    #[arg(long, default_value_t = 0.0)]
    time: f64,

    /// Capture config JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct ProbeArgs {
    /// Document file to scan for animation duration and scene dimensions.
    #[arg(long)]
    doc: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SchemeChoice {
    None,
    Grayscale,
    Sepia,
    Invert,
    Vhs,
}

impl From<SchemeChoice> for ColorScheme {
    fn from(choice: SchemeChoice) -> Self {
        match choice {
            SchemeChoice::None => ColorScheme::None,
            SchemeChoice::Grayscale => ColorScheme::Grayscale,
            SchemeChoice::Sepia => ColorScheme::Sepia,
            SchemeChoice::Invert => ColorScheme::Invert,
            SchemeChoice::Vhs => ColorScheme::Vhs,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Capture(args) => cmd_capture(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Probe(args) => cmd_probe(args),
    }
}

fn read_config_json(path: &Path) -> anyhow::Result<CaptureConfig> {
    let f = std::fs::File::open(path)
        .with_context(|| format!("open config '{}'", path.display()))?;
    let config: CaptureConfig =
        serde_json::from_reader(std::io::BufReader::new(f)).context("parse config JSON")?;
    Ok(config)
}

fn build_config(
    config_path: Option<&Path>,
    surface: &mut SequenceSurface,
    args: &CaptureArgs,
) -> anyhow::Result<CaptureConfig> {
    let mut config = match config_path {
        Some(p) => read_config_json(p)?,
        None => CaptureConfig::default(),
    };

    let measured = surface.measure(&Default::default())?;
    if config_path.is_none() {
        config.duration_seconds = surface.duration_seconds();
        config.target_width = even(measured.width);
        config.target_height = even(measured.height);
    }

    if let Some(v) = args.duration {
        config.duration_seconds = v;
    }
    if let Some(v) = args.fps {
        config.fps = v;
    }
    if let Some(v) = args.loops {
        config.loop_count = v;
    }
    if let Some(v) = args.speed {
        config.playback_speed = v;
    }
    if let Some(v) = args.width {
        config.target_width = v;
    }
    if let Some(v) = args.height {
        config.target_height = v;
    }
    config.crop_top = args.crop_top;
    config.crop_bottom = args.crop_bottom;
    config.crop_left = args.crop_left;
    config.crop_right = args.crop_right;
    if let Some(bg) = &args.background {
        config.background = Rgb::from_hex(bg)?;
    }
    if let Some(scheme) = args.scheme {
        config.color_scheme = scheme.into();
    }
    if let Some(v) = args.bitrate {
        config.bitrate_mbps = v;
    }

    Ok(config)
}

fn even(v: u32) -> u32 {
    let v = v.max(2);
    if v % 2 == 0 { v } else { v + 1 }
}

fn cmd_capture(args: CaptureArgs) -> anyhow::Result<()> {
    let mut surface = SequenceSurface::open(&args.frames, args.sequence_fps)?;
    surface.ensure_ready()?;

    let config = build_config(args.config.as_deref(), &mut surface, &args)?;
    let backend = FfmpegEncoder::detect()?;

    let mut session = CaptureSession::new(config)?;
    let outcome = session.run(&mut surface, Box::new(backend), |msg| {
        eprintln!("{msg}");
    })?;

    let video = match outcome {
        SessionOutcome::Complete(video) => video,
        SessionOutcome::Aborted => {
            eprintln!("capture aborted");
            return Ok(());
        }
    };

    let out = output_path(args.out, video.container.extension());
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&out, &video.data)
        .with_context(|| format!("write video '{}'", out.display()))?;

    eprintln!(
        "wrote {} ({}, {} bytes)",
        out.display(),
        video.codec.label(),
        video.data.len()
    );
    Ok(())
}

fn output_path(requested: Option<PathBuf>, extension: &str) -> PathBuf {
    match requested {
        Some(mut p) => {
            p.set_extension(extension);
            p
        }
        None => {
            let millis = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or(0);
            PathBuf::from(format!("scenecap-{millis}.{extension}"))
        }
    }
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let mut surface = SequenceSurface::open(&args.frames, args.sequence_fps)?;
    surface.ensure_ready()?;

    let mut config = match args.config.as_deref() {
        Some(p) => read_config_json(p)?,
        None => CaptureConfig::default(),
    };
    let measured = surface.measure(&Default::default())?;
    if args.config.is_none() {
        config.target_width = even(measured.width);
        config.target_height = even(measured.height);
    }
    config.validate()?;

    let geometry = scenecap::SourceGeometry::from_measured(measured);
    scenecap::seek(&mut surface, args.time)?;
    let snapshot = surface.snapshot()?;
    let frame = scenecap::composite(&snapshot, geometry, &config)?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        &args.out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_probe(args: ProbeArgs) -> anyhow::Result<()> {
    if let Some(doc) = &args.doc {
        let code = std::fs::read_to_string(doc)
            .with_context(|| format!("read document '{}'", doc.display()))?;
        match scenecap::scan::extract_animation_duration(&code) {
            Some(d) => eprintln!("animation duration: {d}s"),
            None => eprintln!("animation duration: not declared"),
        }
        match scenecap::scan::extract_dimensions(&code) {
            Some(d) => eprintln!("scene dimensions:   {}x{}", d.width, d.height),
            None => eprintln!("scene dimensions:   not declared"),
        }
    }

    match FfmpegEncoder::detect() {
        Ok(backend) => {
            use scenecap::EncoderBackend as _;
            eprintln!("ffmpeg: available");
            for codec in Codec::CANDIDATES {
                let supported = if backend.supports(codec) { "yes" } else { "no" };
                eprintln!(
                    "  {:<9} ({}): {}",
                    codec.label(),
                    codec.container().extension(),
                    supported
                );
            }
        }
        Err(e) => eprintln!("ffmpeg: {e}"),
    }

    Ok(())
}
