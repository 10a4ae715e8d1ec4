//! Attribution-based window label: attack when the attacker's share of the
//! window's bytes strictly exceeds the configured fraction.

use crate::features::WindowSnapshot;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ATTACK_BYTE_SHARE: f64 = 0.10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Benign,
    Attack,
}

impl Label {
    pub fn as_u8(self) -> u8 {
        match self {
            Label::Benign => 0,
            Label::Attack => 1,
        }
    }

    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Label::Benign),
            1 => Some(Label::Attack),
            _ => None,
        }
    }

    pub fn is_attack(self) -> bool {
        self == Label::Attack
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

pub struct LabelAssigner {
    attack_byte_share: f64,
}

impl Default for LabelAssigner {
    fn default() -> Self {
        Self::new(DEFAULT_ATTACK_BYTE_SHARE)
    }
}

impl LabelAssigner {
    pub fn new(attack_byte_share: f64) -> Self {
        Self { attack_byte_share }
    }

    pub fn assign(&self, snapshot: &WindowSnapshot) -> Label {
        let limit = snapshot.total_bytes as f64 * self.attack_byte_share;
        if snapshot.attacker_bytes as f64 > limit {
            Label::Attack
        } else {
            Label::Benign
        }
    }
}
