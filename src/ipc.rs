//! Client for i3's IPC interface.
//!
//! Messages are framed as the `i3-ipc` magic string, a payload length and a
//! message type (both native-endian u32), followed by a JSON payload.
//! See <https://i3wm.org/docs/ipc.html>.

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;

use crate::tree::ContainerNode;

const MAGIC: &[u8; 6] = b"i3-ipc";
const HEADER_LEN: usize = MAGIC.len() + 8;
/// Largest reply we are willing to buffer; i3 trees are far smaller
const MAX_PAYLOAD_LEN: usize = 64 * 1024 * 1024;

/// Replies with this bit set are events rather than command replies
const EVENT_MASK: u32 = 1 << 31;

/// Message types we send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MessageType {
    RunCommand = 0,
    Subscribe = 2,
    GetTree = 4,
}

/// Event types we care about (without the event bit)
pub const EVENT_WINDOW: u32 = 3;

/// Locate the i3 socket: `I3SOCK` first, then ask i3 itself
pub fn socket_path() -> std::io::Result<PathBuf> {
    if let Some(path) = std::env::var_os("I3SOCK").filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }

    let output = Command::new("i3").arg("--get-socketpath").output()?;
    if !output.status.success() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "i3 --get-socketpath failed; is i3 running?",
        ));
    }
    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if path.is_empty() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "i3 reported an empty socket path",
        ));
    }
    Ok(PathBuf::from(path))
}

/// What happened to a window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowChange {
    New,
    Close,
    Focus,
    Title,
    FullscreenMode,
    Move,
    Floating,
    Urgent,
    Mark,
    #[serde(other)]
    Other,
}

impl WindowChange {
    /// Changes that can alter which windows live on which workspace
    pub fn triggers_reconcile(self) -> bool {
        matches!(self, Self::New | Self::Close | Self::Move)
    }
}

/// Payload of a window event
#[derive(Debug, Clone, Deserialize)]
pub struct WindowEvent {
    pub change: WindowChange,
    #[serde(default)]
    pub container: Option<ContainerNode>,
}

/// Result of one command in a RUN_COMMAND reply
#[derive(Debug, Clone, Deserialize)]
pub struct CommandOutcome {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubscribeReply {
    success: bool,
}

/// The window manager as seen by the reconciler
pub trait WindowManager {
    fn get_tree(&mut self) -> std::io::Result<ContainerNode>;
    fn run_command(&mut self, command: &str) -> std::io::Result<Vec<CommandOutcome>>;
}

/// Render the command that renames workspace `old` to `new`
pub fn rename_command(old: &str, new: &str) -> String {
    format!("rename workspace {} to {}", quote(old), quote(new))
}

fn quote(name: &str) -> String {
    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push('"');
    for c in name.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

fn invalid_data(e: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, e)
}

/// Write one framed message
pub fn write_message(w: &mut impl Write, kind: u32, payload: &[u8]) -> std::io::Result<()> {
    let len = u32::try_from(payload.len()).map_err(invalid_data)?;
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(MAGIC);
    frame.extend_from_slice(&len.to_ne_bytes());
    frame.extend_from_slice(&kind.to_ne_bytes());
    frame.extend_from_slice(payload);
    w.write_all(&frame)?;
    w.flush()
}

/// Read one framed message, returning its type and payload
pub fn read_message(r: &mut impl Read) -> std::io::Result<(u32, Vec<u8>)> {
    let mut header = [0u8; HEADER_LEN];
    r.read_exact(&mut header)?;
    if &header[..MAGIC.len()] != MAGIC {
        return Err(invalid_data("bad i3-ipc magic"));
    }

    let mut word = [0u8; 4];
    word.copy_from_slice(&header[6..10]);
    let len = u32::from_ne_bytes(word) as usize;
    word.copy_from_slice(&header[10..14]);
    let kind = u32::from_ne_bytes(word);
    if len > MAX_PAYLOAD_LEN {
        return Err(invalid_data(format!(
            "i3-ipc payload of {} bytes exceeds the {} byte limit",
            len, MAX_PAYLOAD_LEN
        )));
    }

    let mut payload = vec![0u8; len];
    r.read_exact(&mut payload)?;
    Ok((kind, payload))
}

/// A connection to the i3 socket
pub struct IpcConnection {
    stream: UnixStream,
}

impl IpcConnection {
    pub fn connect(path: &Path) -> std::io::Result<Self> {
        let stream = UnixStream::connect(path)?;
        log::debug!("Connected to i3 at {:?}", path);
        Ok(Self { stream })
    }

    /// Send a request and wait for its reply, skipping any interleaved events
    fn request(&mut self, kind: MessageType, payload: &[u8]) -> std::io::Result<Vec<u8>> {
        write_message(&mut self.stream, kind as u32, payload)?;
        loop {
            let (reply_kind, reply) = read_message(&mut self.stream)?;
            if reply_kind & EVENT_MASK != 0 {
                log::debug!("Skipping event 0x{:x} while awaiting reply", reply_kind);
                continue;
            }
            if reply_kind != kind as u32 {
                return Err(invalid_data(format!(
                    "expected reply type {}, got {}",
                    kind as u32, reply_kind
                )));
            }
            return Ok(reply);
        }
    }

    /// Subscribe to event kinds (e.g. "window"). Returns whether i3 accepted.
    pub fn subscribe(&mut self, events: &[&str]) -> std::io::Result<bool> {
        let payload = serde_json::to_vec(events)?;
        let reply = self.request(MessageType::Subscribe, &payload)?;
        let reply: SubscribeReply = serde_json::from_slice(&reply).map_err(invalid_data)?;
        Ok(reply.success)
    }

    /// Block until the next window event. Undecodable events are skipped;
    /// errors mean the stream itself is broken.
    pub fn next_event(&mut self) -> std::io::Result<WindowEvent> {
        loop {
            let (kind, payload) = read_message(&mut self.stream)?;
            if kind != EVENT_MASK | EVENT_WINDOW {
                log::debug!("Ignoring message 0x{:x}", kind);
                continue;
            }
            match serde_json::from_slice(&payload) {
                Ok(event) => return Ok(event),
                Err(e) => log::warn!("Ignoring malformed window event: {}", e),
            }
        }
    }
}

impl WindowManager for IpcConnection {
    fn get_tree(&mut self) -> std::io::Result<ContainerNode> {
        let reply = self.request(MessageType::GetTree, b"")?;
        serde_json::from_slice(&reply).map_err(invalid_data)
    }

    fn run_command(&mut self, command: &str) -> std::io::Result<Vec<CommandOutcome>> {
        let reply = self.request(MessageType::RunCommand, command.as_bytes())?;
        serde_json::from_slice(&reply).map_err(invalid_data)
    }
}
