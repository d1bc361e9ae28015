//! Speech playback wired to avatar events
//!
//! `Speaker` starts a clip, announces `SpeakingStarted`, and schedules
//! `SpeakingEnded` for when the clip runs out. Playback failures are logged
//! and leave the avatar silent.

use crate::player::{AudioPlayer, ClipInfo};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use vera_core::{AvatarEvent, EventSender};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeakOutcome {
    Started(ClipInfo),
    /// Already speaking; the request was ignored
    Busy,
    /// Playback failed and was logged
    Failed,
}

pub struct Speaker {
    player: Arc<dyn AudioPlayer>,
    events: EventSender,
    speaking: Arc<AtomicBool>,
}

impl Speaker {
    pub fn new(player: Arc<dyn AudioPlayer>, events: EventSender) -> Self {
        Self {
            player,
            events,
            speaking: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }

    /// Loudness of the clip in flight, for the frame loop to poll.
    pub fn amplitude(&self) -> f32 {
        self.player.amplitude()
    }

    pub async fn speak(&self, clip_id: &str) -> SpeakOutcome {
        if self
            .speaking
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Already speaking, ignoring clip {}", clip_id);
            return SpeakOutcome::Busy;
        }

        let info = match self.player.play(clip_id).await {
            Ok(info) => info,
            Err(e) => {
                self.speaking.store(false, Ordering::SeqCst);
                tracing::error!(
                    "Playback of {} via {} failed: {:#}",
                    clip_id,
                    self.player.provider_name(),
                    e
                );
                return SpeakOutcome::Failed;
            }
        };

        tracing::info!("Speaking {} ({:.2}s)", info.clip_id, info.duration.as_secs_f32());
        self.events.send(AvatarEvent::SpeakingStarted);

        let events = self.events.clone();
        let speaking = Arc::clone(&self.speaking);
        let duration = info.duration;
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            speaking.store(false, Ordering::SeqCst);
            events.send(AvatarEvent::SpeakingEnded);
        });

        SpeakOutcome::Started(info)
    }
}
