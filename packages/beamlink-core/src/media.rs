//! Media descriptors handed to the remote media client.
//!
//! A [`MediaDescriptor`] is built once per share request and never changed
//! afterwards. Content type is inferred from the URL text alone; no network
//! request is made to sniff it.

use serde::Serialize;

use crate::error::{CastError, CastResult};
use crate::protocol_constants::{
    CONTENT_TYPE_HLS, CONTENT_TYPE_MP4, CONTENT_TYPE_WEBM, PLACEHOLDER_TITLE,
};

/// How the receiver should treat the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StreamType {
    /// Finite, seekable content.
    #[default]
    Buffered,
}

/// Metadata layout shown by the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaMetadataType {
    #[default]
    Movie,
}

/// Immutable description of the media to load on the receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaDescriptor {
    url: String,
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_url: Option<String>,
    content_type: &'static str,
    stream_type: StreamType,
    metadata_type: MediaMetadataType,
    autoplay: bool,
}

impl MediaDescriptor {
    /// Starts a builder for the given media URL.
    pub fn builder(url: impl Into<String>) -> MediaDescriptorBuilder {
        MediaDescriptorBuilder {
            url: url.into(),
            title: None,
            description: None,
            thumbnail_url: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn subtitle(&self) -> Option<&str> {
        self.subtitle.as_deref()
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    pub fn stream_type(&self) -> StreamType {
        self.stream_type
    }

    pub fn metadata_type(&self) -> MediaMetadataType {
        self.metadata_type
    }

    pub fn autoplay(&self) -> bool {
        self.autoplay
    }
}

/// Builder for [`MediaDescriptor`].
#[derive(Debug, Clone)]
pub struct MediaDescriptorBuilder {
    url: String,
    title: Option<String>,
    description: Option<String>,
    thumbnail_url: Option<String>,
}

impl MediaDescriptorBuilder {
    pub fn title(mut self, title: Option<impl Into<String>>) -> Self {
        self.title = title.map(Into::into);
        self
    }

    pub fn description(mut self, description: Option<impl Into<String>>) -> Self {
        self.description = description.map(Into::into);
        self
    }

    pub fn thumbnail_url(mut self, thumbnail_url: Option<impl Into<String>>) -> Self {
        self.thumbnail_url = thumbnail_url.map(Into::into);
        self
    }

    /// Validates the URL and fills in defaults.
    ///
    /// # Errors
    ///
    /// Returns [`CastError::InvalidArgument`] when the URL is empty.
    pub fn build(self) -> CastResult<MediaDescriptor> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(CastError::InvalidArgument(
                "videoUrl must not be empty".to_string(),
            ));
        }

        let title = non_blank(self.title).unwrap_or_else(|| PLACEHOLDER_TITLE.to_string());

        Ok(MediaDescriptor {
            content_type: infer_content_type(url),
            url: url.to_string(),
            title,
            subtitle: non_blank(self.description),
            image_url: non_blank(self.thumbnail_url),
            stream_type: StreamType::Buffered,
            metadata_type: MediaMetadataType::Movie,
            autoplay: true,
        })
    }
}

/// Infers a content type from the URL text (case-insensitive).
///
/// HLS playlists map to `application/vnd.apple.mpegurl`, WebM to `video/webm`,
/// everything else falls back to `video/mp4`. Matching is by substring so
/// query strings after the extension do not matter.
pub fn infer_content_type(url: &str) -> &'static str {
    let lower = url.to_ascii_lowercase();
    if lower.contains(".m3u8") {
        CONTENT_TYPE_HLS
    } else if lower.contains(".webm") {
        CONTENT_TYPE_WEBM
    } else {
        CONTENT_TYPE_MP4
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// A single call against the remote media client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaCommand {
    Load(MediaDescriptor),
    Play,
    Pause,
    Seek { position_ms: u64 },
    Stop,
}

impl MediaCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Load(_) => "load",
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Seek { .. } => "seek",
            Self::Stop => "stop",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hls_url_is_detected_case_insensitively() {
        assert_eq!(
            infer_content_type("https://cdn.example/Stream.M3U8?token=abc"),
            "application/vnd.apple.mpegurl"
        );
    }

    #[test]
    fn webm_and_fallback() {
        assert_eq!(infer_content_type("http://h/clip.webm"), "video/webm");
        assert_eq!(infer_content_type("http://h/clip.mp4"), "video/mp4");
        assert_eq!(infer_content_type("http://h/clip.mkv"), "video/mp4");
        assert_eq!(infer_content_type("http://h/watch?v=1"), "video/mp4");
    }

    #[test]
    fn missing_title_uses_placeholder() {
        let descriptor = MediaDescriptor::builder("http://h/v.mp4")
            .title(None::<String>)
            .build()
            .unwrap();
        assert_eq!(descriptor.title(), "Untitled video");

        let blank = MediaDescriptor::builder("http://h/v.mp4")
            .title(Some("   "))
            .build()
            .unwrap();
        assert_eq!(blank.title(), "Untitled video");
    }

    #[test]
    fn empty_description_is_omitted() {
        let descriptor = MediaDescriptor::builder("http://h/v.mp4")
            .title(Some("Trailer"))
            .description(Some(""))
            .build()
            .unwrap();
        assert_eq!(descriptor.subtitle(), None);

        let json = serde_json::to_value(&descriptor).unwrap();
        assert!(json.get("subtitle").is_none());
        assert_eq!(json["contentType"], "video/mp4");
        assert_eq!(json["streamType"], "buffered");
        assert_eq!(json["autoplay"], true);
    }

    #[test]
    fn empty_url_is_invalid() {
        let err = MediaDescriptor::builder("").build().unwrap_err();
        assert_eq!(err.code(), "invalid_argument");
        assert!(MediaDescriptor::builder("  ").build().is_err());
    }

    #[test]
    fn full_descriptor_keeps_every_field() {
        let descriptor = MediaDescriptor::builder("http://h/live.m3u8")
            .title(Some("Match"))
            .description(Some("Second half"))
            .thumbnail_url(Some("http://h/poster.jpg"))
            .build()
            .unwrap();

        assert_eq!(descriptor.url(), "http://h/live.m3u8");
        assert_eq!(descriptor.subtitle(), Some("Second half"));
        assert_eq!(descriptor.image_url(), Some("http://h/poster.jpg"));
        assert_eq!(descriptor.content_type(), "application/vnd.apple.mpegurl");
        assert_eq!(descriptor.stream_type(), StreamType::Buffered);
        assert_eq!(descriptor.metadata_type(), MediaMetadataType::Movie);
        assert!(descriptor.autoplay());
    }
}
