//! Packet observations from an external capture process.
//! The capture tool emits one delimited text record per packet; the adapter
//! turns each record into a [`PacketObservation`].

mod adapter;
mod capture;

pub use adapter::ObservationAdapter;
pub use capture::CaptureSource;

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// 2-bit ECN marking from the IP header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EcnCodepoint {
    #[default]
    NotEct,
    Ect1,
    Ect0,
    Ce,
}

impl EcnCodepoint {
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b01 => EcnCodepoint::Ect1,
            0b10 => EcnCodepoint::Ect0,
            0b11 => EcnCodepoint::Ce,
            _ => EcnCodepoint::NotEct,
        }
    }

    /// Accepts `0x`-prefixed hex or decimal; anything else is Not-ECT.
    pub fn parse(field: &str) -> Self {
        let field = field.trim();
        let value = match field.strip_prefix("0x").or_else(|| field.strip_prefix("0X")) {
            Some(hex) => u8::from_str_radix(hex, 16).ok(),
            None => field.parse::<u8>().ok(),
        };
        value.map(Self::from_bits).unwrap_or_default()
    }
}

/// One captured packet.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PacketObservation {
    /// Capture time, epoch seconds
    pub ts: f64,
    /// Whole frame length (bytes)
    pub frame_len: u64,
    /// Transport payload length (bytes), 0 when not applicable
    pub payload_len: u64,
    pub ecn: EcnCodepoint,
    pub retransmission: bool,
    pub cwr: bool,
    /// Advertised receive window
    pub window_size: Option<u64>,
    /// ACK round-trip sample (ms)
    pub rtt_ms: Option<f64>,
    pub src: Option<IpAddr>,
}

/// Capture fields the adapter understands, named after their tshark field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureField {
    Timestamp,
    SourceAddr,
    FrameLen,
    PayloadLen,
    AckRtt,
    Ecn,
    Retransmission,
    Cwr,
    WindowSize,
}

impl CaptureField {
    pub fn tshark_name(self) -> &'static str {
        match self {
            CaptureField::Timestamp => "frame.time_epoch",
            CaptureField::SourceAddr => "ip.src",
            CaptureField::FrameLen => "frame.len",
            CaptureField::PayloadLen => "tcp.len",
            CaptureField::AckRtt => "tcp.analysis.ack_rtt",
            CaptureField::Ecn => "ip.dsfield.ecn",
            CaptureField::Retransmission => "tcp.analysis.retransmission",
            CaptureField::Cwr => "tcp.flags.cwr",
            CaptureField::WindowSize => "tcp.window_size",
        }
    }
}

/// Field order of incoming records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureLayout {
    /// Source attribution, payload, RTT and retransmissions
    Collector,
    /// CWR flag and receive window for the classifier inputs
    Detector,
    /// Union of both
    Full,
}

impl CaptureLayout {
    pub fn fields(self) -> &'static [CaptureField] {
        use CaptureField::*;
        match self {
            CaptureLayout::Collector => &[
                Timestamp,
                SourceAddr,
                FrameLen,
                PayloadLen,
                AckRtt,
                Ecn,
                Retransmission,
            ],
            CaptureLayout::Detector => &[Timestamp, FrameLen, Ecn, Cwr, WindowSize],
            CaptureLayout::Full => &[
                Timestamp,
                SourceAddr,
                FrameLen,
                PayloadLen,
                AckRtt,
                Ecn,
                Retransmission,
                Cwr,
                WindowSize,
            ],
        }
    }
}
