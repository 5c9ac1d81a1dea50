use serde::Serialize;
use std::fmt;

/// Engine event kinds, numbered as libmpv numbers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    Shutdown,
    LogMessage,
    GetPropertyReply,
    SetPropertyReply,
    CommandReply,
    StartFile,
    EndFile,
    FileLoaded,
    ClientMessage,
    VideoReconfig,
    AudioReconfig,
    Seek,
    PlaybackRestart,
    PropertyChange,
    QueueOverflow,
    Hook,
    Other(u32),
}

impl EventKind {
    pub fn from_id(id: u32) -> Self {
        match id {
            1 => Self::Shutdown,
            2 => Self::LogMessage,
            3 => Self::GetPropertyReply,
            4 => Self::SetPropertyReply,
            5 => Self::CommandReply,
            6 => Self::StartFile,
            7 => Self::EndFile,
            8 => Self::FileLoaded,
            16 => Self::ClientMessage,
            17 => Self::VideoReconfig,
            18 => Self::AudioReconfig,
            20 => Self::Seek,
            21 => Self::PlaybackRestart,
            22 => Self::PropertyChange,
            24 => Self::QueueOverflow,
            25 => Self::Hook,
            other => Self::Other(other),
        }
    }

    pub fn id(self) -> u32 {
        match self {
            Self::Shutdown => 1,
            Self::LogMessage => 2,
            Self::GetPropertyReply => 3,
            Self::SetPropertyReply => 4,
            Self::CommandReply => 5,
            Self::StartFile => 6,
            Self::EndFile => 7,
            Self::FileLoaded => 8,
            Self::ClientMessage => 16,
            Self::VideoReconfig => 17,
            Self::AudioReconfig => 18,
            Self::Seek => 20,
            Self::PlaybackRestart => 21,
            Self::PropertyChange => 22,
            Self::QueueOverflow => 24,
            Self::Hook => 25,
            Self::Other(id) => id,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Shutdown => "shutdown",
            Self::LogMessage => "log-message",
            Self::GetPropertyReply => "get-property-reply",
            Self::SetPropertyReply => "set-property-reply",
            Self::CommandReply => "command-reply",
            Self::StartFile => "start-file",
            Self::EndFile => "end-file",
            Self::FileLoaded => "file-loaded",
            Self::ClientMessage => "client-message",
            Self::VideoReconfig => "video-reconfig",
            Self::AudioReconfig => "audio-reconfig",
            Self::Seek => "seek",
            Self::PlaybackRestart => "playback-restart",
            Self::PropertyChange => "property-change",
            Self::QueueOverflow => "event-queue-overflow",
            Self::Hook => "hook",
            Self::Other(_) => "unknown",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(id) => write!(f, "unknown({id})"),
            other => f.write_str(other.name()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogMessage {
    pub prefix: String,
    pub level: String,
    pub text: String,
}

/// One event retrieved from the engine.
///
/// Only log messages carry a decoded payload; everything else is forwarded as
/// kind, status, and reply id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineEvent {
    pub kind: EventKind,
    pub error: i32,
    pub reply_userdata: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<LogMessage>,
}

impl EngineEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            error: 0,
            reply_userdata: 0,
            log: None,
        }
    }

    pub fn log_message(prefix: &str, level: &str, text: &str) -> Self {
        Self {
            log: Some(LogMessage {
                prefix: prefix.to_owned(),
                level: level.to_owned(),
                text: text.to_owned(),
            }),
            ..Self::new(EventKind::LogMessage)
        }
    }
}
