//! Chat protocol definitions
//!
//! Plain-text, newline-terminated protocol. Inbound reads are classified
//! into slash-commands and chat text; outbound messages are rendered to
//! the exact bytes written to the socket. Chat payloads stay raw bytes end
//! to end, so text in any encoding is relayed unchanged.

/// Background used for every broadcast line (ANSI white)
pub const BROADCAST_BACKGROUND: u8 = 47;

/// Reply to `/hello`
pub const HELLO_REPLY: &str = "Hello from BASIC CHATROOM!";

/// Reply to any unrecognized slash-command
pub const UNKNOWN_COMMAND_REPLY: &str = "Unknown command!";

/// Foreground color for an account at a given store index (30..=36)
pub fn color_for_index(index: usize) -> u8 {
    30 + (index % 7) as u8
}

/// Slash-commands understood by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List online users
    Online,
    /// Fixed greeting
    Hello,
    /// Anything else starting with `/`
    Unknown(String),
}

/// Client → Server message
///
/// One read from an admitted connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// A line starting with `/`, answered to the sender only
    Command(Command),
    /// Chat bytes, broadcast to everyone else
    Chat(Vec<u8>),
}

impl ClientMessage {
    /// Classify a read (trailing newline already removed)
    pub fn parse(line: &[u8]) -> Self {
        if !line.starts_with(b"/") {
            return ClientMessage::Chat(line.to_vec());
        }

        let line = String::from_utf8_lossy(line);
        let command = match line.trim_end() {
            "/online" => Command::Online,
            "/hello" => Command::Hello,
            other => Command::Unknown(other.to_string()),
        };
        ClientMessage::Command(command)
    }
}

/// Server → Client message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Broadcast chat line from another user
    Chat { color: u8, text: Vec<u8> },
    /// Direct reply to a command; may span several lines
    Reply(String),
}

impl ServerMessage {
    /// Render the bytes written to the socket, newline-terminated
    pub fn render(&self) -> Vec<u8> {
        match self {
            ServerMessage::Chat { color, text } => {
                let mut out = format!("\x1b[{}m\x1b[{}m", BROADCAST_BACKGROUND, color).into_bytes();
                out.extend_from_slice(text);
                out.extend_from_slice(b"\x1b[0m\n");
                out
            }
            ServerMessage::Reply(text) => format!("{}\n", text).into_bytes(),
        }
    }
}

/// Build the `/online` reply: a count header then one username per line
pub fn online_reply<'a>(usernames: impl IntoIterator<Item = &'a str>) -> String {
    let names: Vec<&str> = usernames.into_iter().collect();
    let mut reply = format!("{} user(s) online:", names.len());
    for name in names {
        reply.push_str("\n  ");
        reply.push_str(name);
    }
    reply
}

/// Strip one trailing `\n` (and a `\r` before it) from a raw read
pub fn strip_newline(raw: &[u8]) -> &[u8] {
    let line = raw.strip_suffix(b"\n").unwrap_or(raw);
    line.strip_suffix(b"\r").unwrap_or(line)
}
