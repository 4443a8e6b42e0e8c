//! Protocol constants and defaults.
//!
//! Shared between the orchestrator, the collaborators and the server binary.

// ─────────────────────────────────────────────────────────────────────────────
// Application Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Application name used in logs and the health endpoint.
pub const APP_NAME: &str = "Beamlink";

/// Service identifier returned by the `/health` endpoint.
pub const SERVICE_ID: &str = "beamlink-server";

// ─────────────────────────────────────────────────────────────────────────────
// Discovery
// ─────────────────────────────────────────────────────────────────────────────

/// Default discovery window length.
pub const DEFAULT_DISCOVERY_WINDOW_MS: u64 = 5_000;

/// Shortest window a caller may request via `durationMs`.
pub const MIN_DISCOVERY_WINDOW_MS: u64 = 500;

/// Longest window a caller may request via `durationMs`.
pub const MAX_DISCOVERY_WINDOW_MS: u64 = 60_000;

/// DNS-SD service type advertised by cast receivers.
pub const CAST_SERVICE_TYPE: &str = "_googlecast._tcp.local.";

/// TXT record key carrying the receiver's stable id.
pub const CAST_TXT_ID: &str = "id";

/// TXT record key carrying the receiver's friendly name.
pub const CAST_TXT_FRIENDLY_NAME: &str = "fn";

// ─────────────────────────────────────────────────────────────────────────────
// Session Lifecycle
// ─────────────────────────────────────────────────────────────────────────────

/// Interval between remote media client probes.
pub const DEFAULT_READINESS_INTERVAL_MS: u64 = 500;

/// Probes before a readiness wait gives up.
pub const DEFAULT_READINESS_MAX_ATTEMPTS: u32 = 10;

/// How long a connect may stay in `Connecting` before it fails.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 15_000;

/// How long a disconnect waits for the session-ended callback.
pub const DEFAULT_END_TIMEOUT_MS: u64 = 5_000;

/// How long a suspended session may wait for a resume before it is dropped.
pub const DEFAULT_RESUME_GRACE_MS: u64 = 30_000;

/// Resource name used in readiness errors for the remote media client.
pub const MEDIA_CLIENT_RESOURCE: &str = "remote media client";

// ─────────────────────────────────────────────────────────────────────────────
// Media
// ─────────────────────────────────────────────────────────────────────────────

/// Title used when the caller provides none.
pub const PLACEHOLDER_TITLE: &str = "Untitled video";

/// Content type for HLS playlists.
pub const CONTENT_TYPE_HLS: &str = "application/vnd.apple.mpegurl";

/// Content type for WebM files.
pub const CONTENT_TYPE_WEBM: &str = "video/webm";

/// Fallback content type.
pub const CONTENT_TYPE_MP4: &str = "video/mp4";

// ─────────────────────────────────────────────────────────────────────────────
// Event Channels
// ─────────────────────────────────────────────────────────────────────────────

/// Capacity for the broadcast event channel fanning out to WebSocket clients.
pub const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Default port for the command server.
pub const DEFAULT_SERVER_PORT: u16 = 49_500;
