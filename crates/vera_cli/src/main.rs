use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use vera_core::{AvatarEvent, FrameClock, FrameTime, HumanoidBone, RecordingRig, VeraConfig};
use vera_limbic::{AvatarController, BehaviorMode, FrameOutput, SneezePhase};
use vera_voice::{SpeakOutcome, Speaker, SyntheticPlayer};

#[derive(Parser, Debug)]
#[command(name = "vera", author, version, about = "Headless avatar behavior simulator", long_about = None)]
struct Args {
    /// Path to the TOML config (defaults are used if missing)
    #[arg(short, long, env = "VERA_CONFIG", default_value = "vera.toml")]
    config: PathBuf,

    /// Simulated seconds to run
    #[arg(long, default_value_t = 10.0)]
    seconds: f64,

    /// Frames per second
    #[arg(long, default_value_t = 60.0)]
    fps: f32,

    /// RNG seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Click at this time (seconds); repeatable
    #[arg(long = "click-at", value_name = "SECS")]
    click_at: Vec<f64>,

    /// Press a key at this time; repeatable
    #[arg(long = "key-at", value_name = "SECS")]
    key_at: Vec<f64>,

    /// Trigger a sneeze at this time; repeatable
    #[arg(long = "sneeze-at", value_name = "SECS")]
    sneeze_at: Vec<f64>,

    /// Start speaking `--clip` at this time; repeatable
    #[arg(long = "speak-at", value_name = "SECS")]
    speak_at: Vec<f64>,

    /// Clip played by `--speak-at`
    #[arg(long, default_value = "greeting")]
    clip: String,

    /// Leave this humanoid bone out of the rig; repeatable
    #[arg(long = "missing-bone", value_name = "BONE")]
    missing_bone: Vec<HumanoidBone>,

    /// Print one JSON object per frame instead of the timeline
    #[arg(long)]
    json: bool,

    /// Pace frames in real time
    #[arg(long)]
    realtime: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

// ============================================================================
// Schedule
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum Action {
    Click,
    Key,
    Sneeze,
    Speak,
}

struct Schedule {
    /// Sorted by time, consumed from the front
    pending: Vec<(f64, Action)>,
    next: usize,
}

impl Schedule {
    fn from_args(args: &Args) -> Self {
        let mut pending: Vec<(f64, Action)> = args
            .click_at
            .iter()
            .map(|t| (*t, Action::Click))
            .chain(args.key_at.iter().map(|t| (*t, Action::Key)))
            .chain(args.sneeze_at.iter().map(|t| (*t, Action::Sneeze)))
            .chain(args.speak_at.iter().map(|t| (*t, Action::Speak)))
            .collect();
        pending.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { pending, next: 0 }
    }

    /// Actions due at or before `now`.
    fn due(&mut self, now: f64) -> Vec<Action> {
        let mut out = Vec::new();
        while let Some((at, action)) = self.pending.get(self.next) {
            if *at > now {
                break;
            }
            out.push(*action);
            self.next += 1;
        }
        out
    }
}

// ============================================================================
// Output
// ============================================================================

struct Reporter {
    json: bool,
    frames: u64,
    transitions: u64,
    last: Option<(BehaviorMode, Option<SneezePhase>, bool)>,
}

impl Reporter {
    fn new(json: bool) -> Self {
        Self {
            json,
            frames: 0,
            transitions: 0,
            last: None,
        }
    }

    fn frame(&mut self, out: &FrameOutput) -> Result<()> {
        self.frames += 1;
        if self.json {
            println!("{}", serde_json::to_string(out)?);
            return Ok(());
        }

        let state = (out.mode, out.sneeze_phase, out.speaking);
        match self.last {
            None => println!("[{:>7.2}s] {}", out.time, out.mode),
            Some((mode, phase, speaking)) => {
                if mode != out.mode {
                    self.transitions += 1;
                    println!("[{:>7.2}s] {} -> {}", out.time, mode, out.mode);
                }
                if phase != out.sneeze_phase {
                    if let Some(p) = out.sneeze_phase {
                        println!("[{:>7.2}s]   sneeze phase {:?}", out.time, p);
                    }
                }
                if speaking != out.speaking {
                    let what = if out.speaking { "started" } else { "ended" };
                    println!("[{:>7.2}s]   speaking {}", out.time, what);
                }
            }
        }
        self.last = Some(state);
        Ok(())
    }

    fn summary(&self, ctl: &AvatarController, rig: &RecordingRig) {
        if self.json {
            return;
        }
        println!(
            "{} procedural frames, {} behavior transitions, {} rig updates",
            self.frames,
            self.transitions,
            rig.update_calls()
        );
        let missing = ctl.writer().reported_missing();
        if !missing.is_empty() {
            let mut names: Vec<&str> = missing.iter().map(|b| b.as_str()).collect();
            names.sort_unstable();
            println!("skipped bones: {}", names.join(", "));
        }
    }
}

// ============================================================================
// Fixed-step simulation
// ============================================================================

/// Speech on the simulated clock, mirroring what `Speaker` does in real time.
struct ScriptedVoice {
    player: SyntheticPlayer,
    clip: String,
    /// (start, end) of the clip in flight
    active: Option<(f64, f64)>,
}

impl ScriptedVoice {
    fn speak(&mut self, now: f64, ctl: &AvatarController) {
        if self.active.is_some() {
            info!("Already speaking, ignoring clip {}", self.clip);
            return;
        }
        match self.player.clip_duration(&self.clip) {
            Some(d) => {
                self.active = Some((now, now + d.as_secs_f64()));
                ctl.push_event(AvatarEvent::SpeakingStarted);
            }
            None => error!("Playback of {} failed: unknown clip", self.clip),
        }
    }

    /// Amplitude for this frame; ends the clip once it has run out.
    fn poll(&mut self, now: f64, ctl: &AvatarController) -> f32 {
        match self.active {
            Some((_, end)) if now >= end => {
                self.active = None;
                ctl.push_event(AvatarEvent::SpeakingEnded);
                0.0
            }
            Some((start, _)) => self
                .player
                .amplitude_at(Duration::from_secs_f64((now - start).max(0.0))),
            None => 0.0,
        }
    }
}

fn fire(action: Action, now: f64, ctl: &AvatarController, voice: &mut ScriptedVoice) {
    match action {
        Action::Click => ctl.push_event(AvatarEvent::Click),
        Action::Key => ctl.push_event(AvatarEvent::KeyDown(" ".into())),
        Action::Sneeze => ctl.push_event(AvatarEvent::TriggerSneeze),
        Action::Speak => voice.speak(now, ctl),
    }
}

fn simulate(
    args: &Args,
    ctl: &mut AvatarController,
    rig: &mut RecordingRig,
    reporter: &mut Reporter,
) -> Result<()> {
    let mut schedule = Schedule::from_args(args);
    let mut voice = ScriptedVoice {
        player: SyntheticPlayer::demo(),
        clip: args.clip.clone(),
        active: None,
    };
    let mut clock = FrameClock::new();
    let dt = 1.0 / args.fps;
    let frames = (args.seconds * args.fps as f64).round() as u64;

    for _ in 0..frames {
        let frame = clock.advance(dt);
        for action in schedule.due(frame.elapsed) {
            fire(action, frame.elapsed, ctl, &mut voice);
        }
        let amplitude = voice.poll(frame.elapsed, ctl);
        if let Some(out) = ctl.drive(frame, Some(&mut *rig), amplitude) {
            reporter.frame(&out)?;
        }
    }
    Ok(())
}

// ============================================================================
// Real-time run
// ============================================================================

async fn run_realtime(
    args: &Args,
    ctl: &mut AvatarController,
    rig: &mut RecordingRig,
    reporter: &mut Reporter,
) -> Result<()> {
    let mut schedule = Schedule::from_args(args);
    let speaker = Speaker::new(Arc::new(SyntheticPlayer::demo()), ctl.event_sender());
    let mut clock = FrameClock::new();
    let mut interval = tokio::time::interval(Duration::from_secs_f32(1.0 / args.fps));

    loop {
        interval.tick().await;
        let frame: FrameTime = clock.tick();
        if frame.elapsed > args.seconds {
            break;
        }
        for action in schedule.due(frame.elapsed) {
            match action {
                Action::Click => ctl.push_event(AvatarEvent::Click),
                Action::Key => ctl.push_event(AvatarEvent::KeyDown(" ".into())),
                Action::Sneeze => ctl.push_event(AvatarEvent::TriggerSneeze),
                Action::Speak => {
                    if let SpeakOutcome::Started(info) = speaker.speak(&args.clip).await {
                        tracing::debug!("Clip {} started", info.clip_id);
                    }
                }
            }
        }
        if let Some(out) = ctl.drive(frame, Some(&mut *rig), speaker.amplitude()) {
            reporter.frame(&out)?;
        }
    }
    Ok(())
}

fn init_tracing(log_json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    if !(args.fps.is_finite() && args.fps > 0.0) {
        bail!("--fps must be positive, got {}", args.fps);
    }
    if !(args.seconds.is_finite() && args.seconds >= 0.0) {
        bail!("--seconds must be non-negative, got {}", args.seconds);
    }

    let mut config = VeraConfig::load_or_default(&args.config);
    if let Some(seed) = args.seed {
        config.avatar.seed = Some(seed);
    }

    info!(
        "Simulating {:.1}s at {} fps ({})",
        args.seconds,
        args.fps,
        if args.realtime { "real time" } else { "fixed step" }
    );

    let mut rig = RecordingRig::without(&args.missing_bone);
    let mut ctl = AvatarController::new(config);
    ctl.on_avatar_loaded(&mut rig);

    let mut reporter = Reporter::new(args.json);
    if args.realtime {
        run_realtime(&args, &mut ctl, &mut rig, &mut reporter).await?;
    } else {
        simulate(&args, &mut ctl, &mut rig, &mut reporter)?;
    }
    reporter.summary(&ctl, &rig);
    Ok(())
}
