//! Current-window accumulation and interval rotation.
//!
//! Ingestion writes into the active [`WindowAccumulator`] through
//! [`WindowRotator::record`]. At every interval boundary the rotator swaps
//! in a fresh accumulator under a short lock and hands the filled one out
//! as a [`WindowSnapshot`]. The swap moves the accumulator by value, so the
//! critical section does not grow with the number of packets.

use crate::collectors::{EcnCodepoint, PacketObservation};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Write-only counters for the active window.
#[derive(Debug, Default)]
pub struct WindowAccumulator {
    opened_at: DateTime<Utc>,
    packet_count: u64,
    total_bytes: u64,
    useful_bytes: u64,
    retransmissions: u64,
    ce_marks: u64,
    ect1_marks: u64,
    cwr_flags: u64,
    attacker_bytes: u64,
    packet_sizes: Vec<u64>,
    arrival_times: Vec<f64>,
    rtt_samples: Vec<f64>,
    window_sizes: Vec<u64>,
}

impl WindowAccumulator {
    pub fn new(opened_at: DateTime<Utc>) -> Self {
        Self::with_capacity(opened_at, 0)
    }

    /// Pre-size the per-packet lists, e.g. from the previous window's count.
    pub fn with_capacity(opened_at: DateTime<Utc>, packets: usize) -> Self {
        Self {
            opened_at,
            packet_sizes: Vec::with_capacity(packets),
            arrival_times: Vec::with_capacity(packets),
            ..Default::default()
        }
    }

    /// `attributed` marks bytes sent by a known attacker source.
    pub fn record(&mut self, obs: &PacketObservation, attributed: bool) {
        self.packet_count += 1;
        self.total_bytes += obs.frame_len;
        self.useful_bytes += obs.payload_len;
        self.packet_sizes.push(obs.frame_len);
        self.arrival_times.push(obs.ts);

        if let Some(rtt) = obs.rtt_ms {
            self.rtt_samples.push(rtt);
        }
        if let Some(win) = obs.window_size {
            self.window_sizes.push(win);
        }
        if obs.retransmission {
            self.retransmissions += 1;
        }
        if obs.cwr {
            self.cwr_flags += 1;
        }
        match obs.ecn {
            EcnCodepoint::Ce => self.ce_marks += 1,
            EcnCodepoint::Ect1 => self.ect1_marks += 1,
            EcnCodepoint::Ect0 | EcnCodepoint::NotEct => {}
        }
        if attributed {
            self.attacker_bytes += obs.frame_len;
        }
    }

    pub fn packet_count(&self) -> u64 {
        self.packet_count
    }

    pub fn finish(self, closed_at: DateTime<Utc>) -> WindowSnapshot {
        WindowSnapshot {
            opened_at: self.opened_at,
            closed_at,
            packet_count: self.packet_count,
            total_bytes: self.total_bytes,
            useful_bytes: self.useful_bytes,
            retransmissions: self.retransmissions,
            ce_marks: self.ce_marks,
            ect1_marks: self.ect1_marks,
            cwr_flags: self.cwr_flags,
            attacker_bytes: self.attacker_bytes,
            packet_sizes: self.packet_sizes,
            arrival_times: self.arrival_times,
            rtt_samples: self.rtt_samples,
            window_sizes: self.window_sizes,
        }
    }
}

/// A closed window. `packet_count == packet_sizes.len()`.
#[derive(Debug, Clone, Default)]
pub struct WindowSnapshot {
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
    pub packet_count: u64,
    pub total_bytes: u64,
    pub useful_bytes: u64,
    pub retransmissions: u64,
    pub ce_marks: u64,
    pub ect1_marks: u64,
    pub cwr_flags: u64,
    pub attacker_bytes: u64,
    pub packet_sizes: Vec<u64>,
    pub arrival_times: Vec<f64>,
    pub rtt_samples: Vec<f64>,
    pub window_sizes: Vec<u64>,
}

impl WindowSnapshot {
    pub fn is_empty(&self) -> bool {
        self.packet_count == 0
    }
}

/// Owns the active accumulator and replaces it once per interval.
pub struct WindowRotator {
    current: Mutex<WindowAccumulator>,
    attackers: HashSet<IpAddr>,
    last_count: AtomicU64,
    rotations: AtomicU64,
}

impl WindowRotator {
    pub fn new(attackers: impl IntoIterator<Item = IpAddr>) -> Self {
        Self {
            current: Mutex::new(WindowAccumulator::new(Utc::now())),
            attackers: attackers.into_iter().collect(),
            last_count: AtomicU64::new(0),
            rotations: AtomicU64::new(0),
        }
    }

    /// Ingestion side. Safe to call concurrently with [`rotate`](Self::rotate).
    pub fn record(&self, obs: &PacketObservation) {
        let attributed = obs.src.is_some_and(|src| self.attackers.contains(&src));
        self.current.lock().record(obs, attributed);
    }

    /// Detach the active window and install an empty one in its place.
    pub fn rotate(&self) -> WindowSnapshot {
        let now = Utc::now();
        let hint = self.last_count.load(Ordering::Relaxed) as usize;
        let fresh = WindowAccumulator::with_capacity(now, hint);

        let filled = std::mem::replace(&mut *self.current.lock(), fresh);

        self.last_count.store(filled.packet_count(), Ordering::Relaxed);
        self.rotations.fetch_add(1, Ordering::Relaxed);
        filled.finish(now)
    }

    /// Packets recorded into the active window so far.
    pub fn pending(&self) -> u64 {
        self.current.lock().packet_count()
    }

    pub fn rotations(&self) -> u64 {
        self.rotations.load(Ordering::Relaxed)
    }
}
