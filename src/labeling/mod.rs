//! Ground-truth labeling for the training dataset (collector mode).

mod assigner;

pub use assigner::{Label, LabelAssigner, DEFAULT_ATTACK_BYTE_SHARE};
