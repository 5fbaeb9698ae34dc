// src/gate.rs
//! Threshold gate: a pure function of the total score.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Admission {
    Discard,
    Admit,
    AdmitStrong,
}

impl Admission {
    pub fn is_admitted(self) -> bool {
        !matches!(self, Admission::Discard)
    }

    pub fn is_strong(self) -> bool {
        matches!(self, Admission::AdmitStrong)
    }
}

/// `total < min_score` discards. A strong match needs both thresholds, so a
/// criteria set with `min_score` above the strong threshold never flags
/// anything it would discard.
pub fn gate(total: f32, min_score: u8, strong_threshold: u8) -> Admission {
    let min = f32::from(min_score);
    let strong = f32::from(strong_threshold.max(min_score));
    if total < min {
        Admission::Discard
    } else if total >= strong {
        Admission::AdmitStrong
    } else {
        Admission::Admit
    }
}
