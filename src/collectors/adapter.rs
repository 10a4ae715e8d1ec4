//! Record → observation parsing. Malformed records are dropped and counted,
//! never surfaced as errors.

use super::{CaptureField, CaptureLayout, EcnCodepoint, PacketObservation};
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

pub const FIELD_SEPARATOR: char = ',';

pub struct ObservationAdapter {
    layout: CaptureLayout,
    accepted: AtomicU64,
    discarded: AtomicU64,
}

impl ObservationAdapter {
    pub fn new(layout: CaptureLayout) -> Self {
        Self {
            layout,
            accepted: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        }
    }

    pub fn layout(&self) -> CaptureLayout {
        self.layout
    }

    /// Parse one record; `None` if it cannot be fully parsed.
    pub fn adapt(&self, line: &str) -> Option<PacketObservation> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return None;
        }
        match parse_record(self.layout, line) {
            Some(obs) => {
                self.accepted.fetch_add(1, Ordering::Relaxed);
                Some(obs)
            }
            None => {
                self.discarded.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Like [`adapt`](Self::adapt) for a raw record; bytes that are not
    /// UTF-8 count as a discarded record.
    pub fn adapt_bytes(&self, record: &[u8]) -> Option<PacketObservation> {
        match std::str::from_utf8(record) {
            Ok(line) => self.adapt(line),
            Err(_) => {
                self.discarded.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }
}

fn parse_record(layout: CaptureLayout, line: &str) -> Option<PacketObservation> {
    let fields = layout.fields();
    let cols: Vec<&str> = line.split(FIELD_SEPARATOR).map(str::trim).collect();
    if cols.len() < fields.len() {
        return None;
    }

    let mut obs = PacketObservation::default();
    let mut have_ts = false;
    for (field, raw) in fields.iter().zip(cols) {
        match field {
            CaptureField::Timestamp => {
                obs.ts = raw.parse::<f64>().ok().filter(|t| t.is_finite())?;
                have_ts = true;
            }
            CaptureField::SourceAddr => obs.src = optional::<IpAddr>(raw)?,
            CaptureField::FrameLen => obs.frame_len = optional::<u64>(raw)?.unwrap_or(0),
            CaptureField::PayloadLen => obs.payload_len = optional::<u64>(raw)?.unwrap_or(0),
            CaptureField::AckRtt => {
                let secs = optional::<f64>(raw)?;
                obs.rtt_ms = secs.filter(|s| s.is_finite() && *s > 0.0).map(|s| s * 1000.0);
            }
            CaptureField::Ecn => obs.ecn = EcnCodepoint::parse(raw),
            CaptureField::Retransmission => obs.retransmission = !raw.is_empty(),
            CaptureField::Cwr => obs.cwr = raw == "1" || raw.eq_ignore_ascii_case("true"),
            CaptureField::WindowSize => obs.window_size = optional::<u64>(raw)?,
        }
    }
    have_ts.then_some(obs)
}

/// Empty → `Some(None)`; parses → `Some(Some(v))`; malformed → `None`.
fn optional<T: FromStr>(raw: &str) -> Option<Option<T>> {
    if raw.is_empty() {
        return Some(None);
    }
    raw.parse::<T>().ok().map(Some)
}
