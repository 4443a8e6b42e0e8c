//! Named commands and their typed arguments.
//!
//! Callers address the plugin by command name with a loosely typed argument
//! map (JSON). [`CastCommand::parse`] turns that into a typed command, so
//! every missing or mistyped argument is rejected with
//! [`CastError::InvalidArgument`] before any collaborator is called.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backend::Device;
use crate::error::{CastError, CastResult};
use crate::media::{MediaCommand, MediaDescriptor};
use crate::session::SessionSnapshot;

// ─────────────────────────────────────────────────────────────────────────────
// Arguments
// ─────────────────────────────────────────────────────────────────────────────

/// Arguments of `discoverDevices`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverArgs {
    /// Window length override, clamped to the configured bounds.
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

/// Arguments of `connectToDevice`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectArgs {
    pub device_id: String,
    /// Informational only; the device record from discovery wins.
    #[serde(default)]
    pub device_name: Option<String>,
}

/// Arguments of `shareVideo`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareVideoArgs {
    pub video_url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

impl ShareVideoArgs {
    /// Builds the media descriptor for these arguments.
    pub fn descriptor(&self) -> CastResult<MediaDescriptor> {
        MediaDescriptor::builder(self.video_url.as_str())
            .title(self.title.as_deref())
            .description(self.description.as_deref())
            .thumbnail_url(self.thumbnail_url.as_deref())
            .build()
    }
}

#[derive(Deserialize)]
struct CastVideoArgs {
    url: String,
}

#[derive(Deserialize)]
struct ControlArgs {
    action: String,
    #[serde(default)]
    position: Option<Value>,
}

/// Transport action of `controlPlayback`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackControl {
    Play,
    Pause,
    /// Absolute position, converted from the caller's seconds.
    Seek { position_ms: u64 },
    Stop,
}

impl PlaybackControl {
    pub fn name(self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Seek { .. } => "seek",
            Self::Stop => "stop",
        }
    }

    pub fn to_media_command(self) -> MediaCommand {
        match self {
            Self::Play => MediaCommand::Play,
            Self::Pause => MediaCommand::Pause,
            Self::Seek { position_ms } => MediaCommand::Seek { position_ms },
            Self::Stop => MediaCommand::Stop,
        }
    }

    fn from_args(args: ControlArgs) -> CastResult<Self> {
        match args.action.as_str() {
            "play" => Ok(Self::Play),
            "pause" => Ok(Self::Pause),
            "stop" => Ok(Self::Stop),
            "seek" => {
                let seconds = args
                    .position
                    .as_ref()
                    .and_then(Value::as_f64)
                    .ok_or_else(|| {
                        CastError::InvalidArgument("seek requires a numeric position".to_string())
                    })?;
                if !seconds.is_finite() || seconds < 0.0 {
                    return Err(CastError::InvalidArgument(format!(
                        "position must be a non-negative number of seconds, got {}",
                        seconds
                    )));
                }
                Ok(Self::Seek {
                    position_ms: (seconds * 1000.0) as u64,
                })
            }
            other => Err(CastError::InvalidArgument(format!(
                "unknown playback action '{}'",
                other
            ))),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

/// A parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CastCommand {
    GetPlatformVersion,
    /// `initialize` and its alias `initializeCast`.
    Initialize,
    IsSupported,
    DiscoverDevices(DiscoverArgs),
    ConnectToDevice(ConnectArgs),
    /// `shareVideo`, and `castVideo` with only a URL.
    ShareVideo(ShareVideoArgs),
    ControlPlayback(PlaybackControl),
    Disconnect,
    GetSessionState,
}

impl CastCommand {
    /// Parses a command by name from its argument map.
    ///
    /// `args` may be `null` for commands that take no arguments.
    ///
    /// # Errors
    ///
    /// - [`CastError::NotImplemented`] for unknown names
    /// - [`CastError::InvalidArgument`] for missing, empty or mistyped arguments
    pub fn parse(name: &str, args: &Value) -> CastResult<Self> {
        let command = match name {
            "getPlatformVersion" => Self::GetPlatformVersion,
            "initialize" | "initializeCast" => Self::Initialize,
            "isSupported" => Self::IsSupported,
            "discoverDevices" => Self::DiscoverDevices(decode(name, args)?),
            "connectToDevice" => {
                let args: ConnectArgs = decode(name, args)?;
                if args.device_id.trim().is_empty() {
                    return Err(CastError::InvalidArgument(
                        "deviceId must not be empty".to_string(),
                    ));
                }
                Self::ConnectToDevice(args)
            }
            "shareVideo" => {
                let args: ShareVideoArgs = decode(name, args)?;
                require_url("videoUrl", &args.video_url)?;
                Self::ShareVideo(args)
            }
            "castVideo" => {
                let CastVideoArgs { url } = decode(name, args)?;
                require_url("url", &url)?;
                Self::ShareVideo(ShareVideoArgs {
                    video_url: url,
                    title: None,
                    description: None,
                    thumbnail_url: None,
                })
            }
            "controlPlayback" => {
                Self::ControlPlayback(PlaybackControl::from_args(decode(name, args)?)?)
            }
            "disconnect" => Self::Disconnect,
            "getSessionState" => Self::GetSessionState,
            other => return Err(CastError::NotImplemented(other.to_string())),
        };
        Ok(command)
    }

    /// Canonical command name, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetPlatformVersion => "getPlatformVersion",
            Self::Initialize => "initialize",
            Self::IsSupported => "isSupported",
            Self::DiscoverDevices(_) => "discoverDevices",
            Self::ConnectToDevice(_) => "connectToDevice",
            Self::ShareVideo(_) => "shareVideo",
            Self::ControlPlayback(_) => "controlPlayback",
            Self::Disconnect => "disconnect",
            Self::GetSessionState => "getSessionState",
        }
    }
}

fn decode<T: DeserializeOwned>(command: &str, args: &Value) -> CastResult<T> {
    let value = match args {
        Value::Null => Value::Object(Default::default()),
        other => other.clone(),
    };
    serde_json::from_value(value)
        .map_err(|e| CastError::InvalidArgument(format!("{}: {}", command, e)))
}

fn require_url(key: &str, url: &str) -> CastResult<()> {
    if url.trim().is_empty() {
        return Err(CastError::InvalidArgument(format!(
            "{} must not be empty",
            key
        )));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Replies
// ─────────────────────────────────────────────────────────────────────────────

/// Successful command result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CommandReply {
    Bool(bool),
    Text(String),
    Devices(Vec<Device>),
    Session(SessionSnapshot),
}

impl CommandReply {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_devices(&self) -> Option<&[Device]> {
        match self {
            Self::Devices(devices) => Some(devices),
            _ => None,
        }
    }

    pub fn as_session(&self) -> Option<&SessionSnapshot> {
        match self {
            Self::Session(snapshot) => Some(snapshot),
            _ => None,
        }
    }
}
