//! Line source feeding the adapter: a spawned tshark or an external pipe.

use super::CaptureLayout;
use crate::error::{IdsError, Result};
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::info;

type LineReader = Box<dyn AsyncBufRead + Send + Unpin>;

pub struct CaptureSource {
    reader: LineReader,
    buf: Vec<u8>,
    // Held so the capture process dies with the source.
    _child: Option<Child>,
    name: String,
}

impl CaptureSource {
    /// tshark arguments for a line-buffered, comma-separated field dump.
    pub fn tshark_args(interface: &str, layout: CaptureLayout) -> Vec<String> {
        let mut args: Vec<String> = [
            "-i", interface, "-l", "-n", "-T", "fields", "-E", "separator=,", "-E", "occurrence=f",
        ]
            .iter()
            .map(|s| s.to_string())
            .collect();
        for field in layout.fields() {
            args.push("-e".to_string());
            args.push(field.tshark_name().to_string());
        }
        args
    }

    pub fn tshark(tshark: &Path, interface: &str, layout: CaptureLayout) -> Result<Self> {
        let mut child = Command::new(tshark)
            .args(Self::tshark_args(interface, layout))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| IdsError::Io(std::io::Error::other("tshark stdout not captured")))?;
        info!(interface, pid = ?child.id(), "tshark capture started");
        Ok(Self {
            reader: Box::new(BufReader::new(stdout)),
            buf: Vec::new(),
            _child: Some(child),
            name: format!("tshark:{}", interface),
        })
    }

    pub fn stdin() -> Self {
        Self::from_reader(BufReader::new(tokio::io::stdin()), "stdin")
    }

    pub fn from_reader<R>(reader: R, name: &str) -> Self
    where
        R: AsyncBufRead + Send + Unpin + 'static,
    {
        Self {
            reader: Box::new(reader),
            buf: Vec::new(),
            _child: None,
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Next raw record without its line terminator; `None` once the
    /// upstream process has closed its output. Bytes are not decoded here,
    /// so a record that is not UTF-8 reaches the adapter like any other.
    pub async fn next_record(&mut self) -> Result<Option<&[u8]>> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf).await? == 0 {
            return Ok(None);
        }
        let mut end = self.buf.len();
        while end > 0 && matches!(self.buf[end - 1], b'\n' | b'\r') {
            end -= 1;
        }
        Ok(Some(&self.buf[..end]))
    }
}
