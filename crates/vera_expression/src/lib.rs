//! # Vera Expression
//!
//! Facial weights for the avatar: the blink generator, the lip-sync mapper
//! and the overrides a behavior (sneeze) can impose on blink, mouth and
//! sorrow. [`compose`] folds them into one [`ExpressionWeights`] per frame.
//!
//! ```
//! use vera_core::LipSyncConfig;
//! use vera_expression::{compose, ExpressionOverrides, SpeakingState};
//!
//! let speaking = SpeakingState::new(LipSyncConfig::default());
//! let weights = compose(1.0, &ExpressionOverrides::sneeze(1.0, 0.3, 0.0), &speaking);
//! assert_eq!((weights.blink, weights.aa, weights.joy), (1.0, 0.3, 0.0));
//! ```

use serde::Serialize;
use vera_core::ExpressionName;

mod blink;
mod lipsync;
pub use blink::blink_weight;
pub use lipsync::SpeakingState;

/// Facial weights for one frame, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ExpressionWeights {
    pub blink: f32,
    pub sorrow: f32,
    pub aa: f32,
    pub joy: f32,
}

impl ExpressionWeights {
    pub fn get(&self, name: ExpressionName) -> f32 {
        match name {
            ExpressionName::Blink => self.blink,
            ExpressionName::Sorrow => self.sorrow,
            ExpressionName::Aa => self.aa,
            ExpressionName::Joy => self.joy,
        }
    }

    /// Every expression with its weight, in `ExpressionName::ALL` order.
    pub fn iter(&self) -> impl Iterator<Item = (ExpressionName, f32)> + '_ {
        ExpressionName::ALL.iter().map(move |n| (*n, self.get(*n)))
    }
}

/// Weights asserted by the behavior machine on top of the signal generators.
///
/// A `Some` wins over blink/lip-sync. While a sneeze owns the face, all three
/// are `Some` and the speaking smile is suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExpressionOverrides {
    pub blink: Option<f32>,
    pub mouth: Option<f32>,
    pub sorrow: Option<f32>,
}

impl ExpressionOverrides {
    pub const NONE: Self = Self {
        blink: None,
        mouth: None,
        sorrow: None,
    };

    pub fn sneeze(blink: f32, mouth: f32, sorrow: f32) -> Self {
        Self {
            blink: Some(blink),
            mouth: Some(mouth),
            sorrow: Some(sorrow),
        }
    }

    pub fn owns_mouth(&self) -> bool {
        self.mouth.is_some()
    }
}

/// Combine the blink generator, behavior overrides and lip-sync at `time`.
pub fn compose(
    time: f64,
    overrides: &ExpressionOverrides,
    speaking: &SpeakingState,
) -> ExpressionWeights {
    let blink = overrides.blink.unwrap_or_else(|| blink_weight(time));
    let aa = overrides.mouth.unwrap_or_else(|| speaking.mouth_openness());
    let joy = if overrides.owns_mouth() {
        0.0
    } else {
        speaking.joy()
    };

    ExpressionWeights {
        blink: blink.clamp(0.0, 1.0),
        sorrow: overrides.sorrow.unwrap_or(0.0).clamp(0.0, 1.0),
        aa: aa.clamp(0.0, 1.0),
        joy: joy.clamp(0.0, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vera_core::{DecayMode, LipSyncConfig};

    fn talking() -> SpeakingState {
        let mut s = SpeakingState::new(LipSyncConfig {
            decay_mode: DecayMode::PerFrame,
            ..LipSyncConfig::default()
        });
        s.start();
        s.update(0.5, 1.0 / 60.0);
        s
    }

    #[test]
    fn test_idle_face_is_blink_only() {
        let silent = SpeakingState::new(LipSyncConfig::default());
        let w = compose(2.9, &ExpressionOverrides::NONE, &silent);
        assert_eq!(w.blink, 1.0);
        assert_eq!(w.aa, 0.0);
        assert_eq!(w.joy, 0.0);
        assert_eq!(w.sorrow, 0.0);

        let w = compose(1.0, &ExpressionOverrides::NONE, &silent);
        assert_eq!(w.blink, 0.0);
    }

    #[test]
    fn test_speaking_drives_mouth_and_joy() {
        let w = compose(1.0, &ExpressionOverrides::NONE, &talking());
        assert!((w.aa - 0.3).abs() < 1e-6);
        assert!((w.joy - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_sneeze_owns_face_while_speaking() {
        let overrides = ExpressionOverrides::sneeze(1.0, 1.0, 0.0);
        let w = compose(1.0, &overrides, &talking());
        assert_eq!(w.blink, 1.0);
        assert_eq!(w.aa, 1.0);
        assert_eq!(w.joy, 0.0);
    }

    #[test]
    fn test_iter_covers_every_expression() {
        let w = ExpressionWeights {
            blink: 0.1,
            sorrow: 0.2,
            aa: 0.3,
            joy: 0.4,
        };
        let collected: Vec<_> = w.iter().collect();
        assert_eq!(collected.len(), ExpressionName::ALL.len());
        for (name, weight) in collected {
            assert_eq!(weight, w.get(name));
        }
    }
}
