use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use glam::Vec3;
use phonon_bridge::config::AppConfig;
use phonon_bridge::engine::{
    platform_probe, AudioEngineKind, FixedOutputProbe, OutputConfig, OutputProbe,
};
use phonon_bridge::listener::{ListenerContext, ListenerStatus};
use phonon_bridge::mixer::{attenuation, AttenuationTarget, AudioMixer};
use phonon_bridge::runtime::{FailPoint, PhononStatus, SimulatedRuntime};
use phonon_bridge::source::{ManagedSource, SourceId};
use phonon_bridge::telemetry::ListenerEvent;
use phonon_bridge::{init_logging, ErrorCode, ListenerPose, SceneSession};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "phonon_cli",
    about = "Drive the binaural listener binding against the simulated runtime"
)]
struct Cli {
    /// JSON config file (defaults apply when missing or invalid)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory holding the HRTF asset [default: assets/StreamingAssets]
    #[arg(long, global = true)]
    assets_dir: Option<PathBuf>,
    /// Log at debug level to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a scene: activate, tick frames, tear down, print a JSON report
    ///
    /// The listener reads the configured HRTF file (cipic_124.hrtf by
    /// default) from assets/StreamingAssets unless --assets-dir or the
    /// config's listener.streaming_assets_dir points elsewhere. A missing
    /// file fails activation with code 3002 and exit status 2.
    Simulate {
        #[arg(long)]
        engine: Option<AudioEngineKind>,
        #[arg(long, default_value_t = 60)]
        frames: u32,
        #[arg(long, default_value_t = 4)]
        sources: u32,
        #[arg(long)]
        max_sources: Option<u32>,
        /// Make this runtime stage fail during activation
        #[arg(long, value_enum)]
        fail_at: Option<FailStage>,
        /// Read the output configuration from the default device
        #[arg(long)]
        probe_device: bool,
    },
    /// Print the inverse-distance attenuation for a distance
    Attenuate {
        #[arg(long)]
        distance: f32,
        #[arg(long)]
        scale: Option<f32>,
    },
    /// Print the output configuration negotiated with the default device
    ProbeOutput,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FailStage {
    Pipeline,
    Listener,
    Source,
}

impl From<FailStage> for FailPoint {
    fn from(stage: FailStage) -> Self {
        match stage {
            FailStage::Pipeline => FailPoint::Pipeline,
            FailStage::Listener => FailPoint::Listener,
            FailStage::Source => FailPoint::Source,
        }
    }
}

#[derive(Serialize)]
struct SimulationReport {
    engine: AudioEngineKind,
    frames: u64,
    activated: bool,
    activation_error: Option<ErrorSummary>,
    status: ListenerStatus,
    final_phase: phonon_bridge::ListenerPhase,
    attenuation_failures: usize,
    final_attenuation: BTreeMap<String, f32>,
    runtime_calls: BTreeMap<String, usize>,
    events: Vec<ListenerEvent>,
}

#[derive(Serialize)]
struct ErrorSummary {
    code: i32,
    message: String,
}

#[derive(Serialize)]
struct AttenuationReport {
    distance: f32,
    scale: f32,
    min_distance: f32,
    attenuation: f32,
}

#[derive(Serialize)]
struct ProbeReport {
    preferred_frame_size: u32,
    output: OutputConfig,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    });

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::default(),
    };
    if let Some(dir) = cli.assets_dir {
        config.listener.streaming_assets_dir = dir;
    }

    match cli.command {
        Commands::Simulate {
            engine,
            frames,
            sources,
            max_sources,
            fail_at,
            probe_device,
        } => {
            if let Some(engine) = engine {
                config.listener.audio_engine = engine;
            }
            if let Some(max_sources) = max_sources {
                config.listener.max_sources = max_sources;
            }
            run_simulate(&config, frames, sources, fail_at, probe_device)
        }
        Commands::Attenuate { distance, scale } => {
            let scale = scale.unwrap_or(config.mixer.scale);
            let report = AttenuationReport {
                distance,
                scale,
                min_distance: config.mixer.min_distance,
                attenuation: attenuation(distance, scale, config.mixer.min_distance),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(ExitCode::from(0))
        }
        Commands::ProbeOutput => run_probe(&config),
    }
}

fn run_simulate(
    config: &AppConfig,
    frames: u32,
    sources: u32,
    fail_at: Option<FailStage>,
    probe_device: bool,
) -> Result<ExitCode> {
    let runtime = Arc::new(SimulatedRuntime::new());
    if let Some(stage) = fail_at {
        runtime.fail_at(stage.into(), PhononStatus::Failure);
    }

    let probe: Arc<dyn OutputProbe> = if probe_device {
        platform_probe(&config.output)
    } else {
        Arc::new(FixedOutputProbe::new(config.output.fallback_sample_rate))
    };
    let context = Arc::new(
        ListenerContext::new(runtime.clone(), probe)
            .with_preferred_frame_size(config.output.preferred_frame_size),
    );

    let mixer = Arc::new(AudioMixer::new("master"));
    mixer
        .expose(config.mixer.parameter.clone(), 1.0)
        .context("exposing mixer parameter")?;

    let mut targets = Vec::new();
    for id in 1..=SourceId::from(sources) {
        context
            .attach_source(Arc::new(ManagedSource::new(id, runtime.clone())))
            .with_context(|| format!("attaching source {}", id))?;
        let angle = id as f32 * std::f32::consts::TAU / sources.max(1) as f32;
        targets.push(AttenuationTarget::new(
            format!("emitter-{}", id),
            Vec3::new(angle.cos(), 0.0, angle.sin()) * (2.0 + id as f32),
            mixer.clone(),
        ));
    }

    let mut session = SceneSession::start(context.clone(), config);
    for target in targets {
        session.add_target(target);
    }

    let mut attenuation_failures = 0;
    let mut final_attenuation = BTreeMap::new();
    for frame in 0..frames {
        let t = frame as f32 / 60.0;
        let pose = ListenerPose::at(Vec3::new(t.sin(), 0.0, t));
        let report = session.tick(&pose);
        attenuation_failures += report.failures.len();
        for applied in report.applied {
            final_attenuation.insert(applied.emitter, applied.attenuation);
        }
    }

    let activation_error = session.activation().err().map(|err| ErrorSummary {
        code: err.code(),
        message: err.message(),
    });
    let status = context.status();
    let frames_run = session.frames();
    drop(session);

    let report = SimulationReport {
        engine: config.listener.audio_engine,
        frames: frames_run,
        activated: activation_error.is_none(),
        activation_error,
        status,
        final_phase: context.phase(),
        attenuation_failures,
        final_attenuation,
        runtime_calls: count_calls(&runtime)?,
        events: context.telemetry().recent(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(if report.activated {
        ExitCode::from(0)
    } else {
        ExitCode::from(2)
    })
}

fn count_calls(runtime: &SimulatedRuntime) -> Result<BTreeMap<String, usize>> {
    let mut counts = BTreeMap::new();
    for call in runtime.calls() {
        let value = serde_json::to_value(&call)?;
        let name = value["call"].as_str().unwrap_or("unknown").to_string();
        *counts.entry(name).or_insert(0) += 1;
    }
    Ok(counts)
}

fn run_probe(config: &AppConfig) -> Result<ExitCode> {
    let device = platform_probe(&config.output)
        .probe()
        .context("probing output device")?;
    let report = ProbeReport {
        preferred_frame_size: config.output.preferred_frame_size,
        output: OutputConfig::negotiate(device, config.output.preferred_frame_size),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(ExitCode::from(0))
}
