//! Audio player trait and the synthetic in-process player

use crate::spectrum::{mean_bin_amplitude, SyllableEnvelope};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// A clip that started playing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipInfo {
    pub clip_id: String,
    pub duration: Duration,
}

/// Audio playback as the avatar sees it.
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    /// Start playing a clip, replacing whatever was playing.
    async fn play(&self, clip_id: &str) -> Result<ClipInfo>;

    /// Current loudness in [0, 1]; zero when nothing is playing.
    fn amplitude(&self) -> f32;

    /// Get the name of this audio backend
    fn provider_name(&self) -> &'static str;
}

/// Number of analyser bins the synthetic player reports over.
const ANALYSER_BINS: usize = 32;

struct Playback {
    started: Instant,
    duration: Duration,
}

/// Plays registered clips as a deterministic syllable envelope.
/// Unknown clip ids fail like a missing asset would.
pub struct SyntheticPlayer {
    clips: HashMap<String, Duration>,
    envelope: SyllableEnvelope,
    current: Mutex<Option<Playback>>,
}

impl SyntheticPlayer {
    pub fn new(envelope: SyllableEnvelope) -> Self {
        Self {
            clips: HashMap::new(),
            envelope,
            current: Mutex::new(None),
        }
    }

    /// A few stock clips.
    pub fn demo() -> Self {
        Self::new(SyllableEnvelope::default())
            .with_clip("greeting", Duration::from_millis(2400))
            .with_clip("laugh", Duration::from_millis(1200))
            .with_clip("story", Duration::from_secs(6))
    }

    pub fn with_clip(mut self, clip_id: &str, duration: Duration) -> Self {
        self.clips.insert(clip_id.to_string(), duration);
        self
    }

    pub fn clip_duration(&self, clip_id: &str) -> Option<Duration> {
        self.clips.get(clip_id).copied()
    }

    pub fn envelope(&self) -> &SyllableEnvelope {
        &self.envelope
    }

    /// Loudness `offset` into a clip, measured the way a spectrum analyser
    /// would report it.
    pub fn amplitude_at(&self, offset: Duration) -> f32 {
        mean_bin_amplitude(&self.envelope.bins_at(offset.as_secs_f32(), ANALYSER_BINS))
    }
}

#[async_trait]
impl AudioPlayer for SyntheticPlayer {
    async fn play(&self, clip_id: &str) -> Result<ClipInfo> {
        let duration = self
            .clip_duration(clip_id)
            .ok_or_else(|| anyhow::anyhow!("Unknown clip: {}", clip_id))?;
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current = Some(Playback {
            started: Instant::now(),
            duration,
        });
        Ok(ClipInfo {
            clip_id: clip_id.to_string(),
            duration,
        })
    }

    fn amplitude(&self) -> f32 {
        let current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        match current.as_ref() {
            Some(p) => {
                let offset = p.started.elapsed();
                if offset < p.duration {
                    self.amplitude_at(offset)
                } else {
                    0.0
                }
            }
            None => 0.0,
        }
    }

    fn provider_name(&self) -> &'static str {
        "synthetic"
    }
}
