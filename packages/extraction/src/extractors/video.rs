//! Video link extraction.
//!
//! Only YouTube has an extraction strategy. Text is assembled from three
//! sources, each optional past the first: the oEmbed endpoint (title and
//! channel, doubling as the availability check), the watch page's player
//! payload (description), and the first caption track (transcript
//! excerpt). Captions being disabled is a degradation, not a failure;
//! the note travels with the content so scoring knows it is working from
//! metadata only.

use std::sync::Arc;

use regex::Regex;
use tracing::debug;
use url::Url;

use crate::content::{ExtractedContent, SourceKind};
use crate::error::{ExtractionError, Result};
use crate::extractors::{clean_text, decode_json_string};
use crate::fetch::PageFetcher;

/// Minimum combined text for a video. Below this there is nothing worth
/// scoring, usually a video with no description and no captions.
pub const MIN_VIDEO_CHARS: usize = 100;

/// Transcript excerpt cap in characters.
pub const MAX_TRANSCRIPT_CHARS: usize = 6000;

pub struct VideoExtractor {
    fetcher: Arc<dyn PageFetcher>,
}

impl VideoExtractor {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }

    /// Extract title, channel, description, and a transcript excerpt for
    /// a video URL.
    pub async fn extract(&self, url: &Url) -> Result<ExtractedContent> {
        let host = url.host_str().unwrap_or("").to_ascii_lowercase();
        if !is_youtube_host(&host) {
            return Err(ExtractionError::unsupported(format!(
                "no extraction strategy for video host {}",
                host
            )));
        }

        let video_id = video_id(url).ok_or_else(|| {
            ExtractionError::unsupported(format!("could not find a video id in {}", url))
        })?;
        let canonical = format!("https://www.youtube.com/watch?v={}", video_id);

        // Private, deleted, and embed-disabled videos all 4xx here.
        let oembed = self.fetcher.fetch(&oembed_url(&canonical)).await?;
        if matches!(oembed.status, 400 | 401 | 403 | 404) {
            return Err(ExtractionError::unsupported(format!(
                "video {} is unavailable (HTTP {}); it may be private or deleted",
                video_id, oembed.status
            )));
        }
        if !oembed.is_success() {
            return Err(ExtractionError::unreachable(format!(
                "HTTP {} from oEmbed for {}",
                oembed.status, canonical
            )));
        }

        let payload: serde_json::Value = serde_json::from_str(&oembed.body).map_err(|e| {
            ExtractionError::unsupported(format!("unexpected oEmbed payload: {}", e))
        })?;
        let title = payload
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let channel = payload
            .get("author_name")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();

        let mut parts: Vec<String> = Vec::new();
        let mut notes: Vec<String> = Vec::new();
        if !title.is_empty() {
            parts.push(format!("Video title: {}.", title));
        }
        if !channel.is_empty() {
            parts.push(format!("Channel: {}.", channel));
        }

        // Description and the caption track URL both live in the watch
        // page's player payload. Failures past this point degrade.
        match self.fetcher.fetch(&canonical).await {
            Ok(page) if page.is_success() => {
                if let Some(description) = player_description(&page.body) {
                    parts.push(format!("Description: {}", description));
                }
                match first_caption_url(&page.body) {
                    Some(track_url) => match self.fetch_transcript(&track_url).await {
                        Some(transcript) => {
                            parts.push(format!("Transcript excerpt: {}", transcript));
                            notes.push("transcript excerpt recovered from captions".to_string());
                        }
                        None => notes.push(
                            "caption track could not be read; scored without a transcript"
                                .to_string(),
                        ),
                    },
                    None => notes.push(
                        "no captions available; scored from title and description only"
                            .to_string(),
                    ),
                }
            }
            Ok(page) => notes.push(format!(
                "watch page returned HTTP {}; using oEmbed metadata only",
                page.status
            )),
            Err(e) => notes.push(format!(
                "watch page fetch failed ({}); using oEmbed metadata only",
                e
            )),
        }

        let body = clean_text(&parts.join(" "));
        if body.chars().count() < MIN_VIDEO_CHARS {
            return Err(ExtractionError::empty(format!(
                "recovered only {} chars for video {}",
                body.chars().count(),
                video_id
            )));
        }

        debug!(video_id = %video_id, chars = body.chars().count(), "video extracted");

        let mut content = ExtractedContent::new(SourceKind::Video, &canonical, body)
            .with_title(title)
            .with_author(channel);
        for note in notes {
            content = content.with_note(note);
        }
        Ok(content)
    }

    async fn fetch_transcript(&self, track_url: &str) -> Option<String> {
        let page = self.fetcher.fetch(track_url).await.ok()?;
        if !page.is_success() {
            return None;
        }
        let transcript = caption_xml_text(&page.body);
        if transcript.is_empty() {
            return None;
        }
        Some(truncate_chars(&transcript, MAX_TRANSCRIPT_CHARS))
    }
}

fn is_youtube_host(host: &str) -> bool {
    host == "youtube.com"
        || host.ends_with(".youtube.com")
        || host == "youtu.be"
        || host.ends_with(".youtu.be")
}

/// Pull the video id out of the URL shapes YouTube actually uses:
/// `youtu.be/{id}`, `watch?v={id}`, and `/shorts|live|embed/{id}`.
fn video_id(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_ascii_lowercase();

    if host == "youtu.be" || host.ends_with(".youtu.be") {
        return url
            .path_segments()?
            .find(|s| !s.is_empty())
            .map(String::from);
    }

    if let Some((_, v)) = url.query_pairs().find(|(k, _)| k == "v") {
        if !v.is_empty() {
            return Some(v.into_owned());
        }
    }

    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    if segments.len() >= 2 && matches!(segments[0], "shorts" | "live" | "embed") {
        return Some(segments[1].to_string());
    }
    None
}

fn oembed_url(watch_url: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("url", watch_url)
        .append_pair("format", "json")
        .finish();
    format!("https://www.youtube.com/oembed?{}", query)
}

/// The `shortDescription` string literal inside the player response.
fn player_description(watch_html: &str) -> Option<String> {
    let pattern = Regex::new(r#""shortDescription":"((?:[^"\\]|\\.)*)""#).unwrap();
    let captured = pattern.captures(watch_html)?.get(1)?.as_str();
    let decoded = clean_text(&decode_json_string(captured));
    if decoded.is_empty() {
        None
    } else {
        Some(decoded)
    }
}

/// Base URL of the first caption track in the player response.
fn first_caption_url(watch_html: &str) -> Option<String> {
    let pattern = Regex::new(r#"(?s)"captionTracks":(\[.*?\])"#).unwrap();
    let raw = pattern.captures(watch_html)?.get(1)?.as_str();
    let tracks: serde_json::Value = serde_json::from_str(raw).ok()?;
    let base_url = tracks.get(0)?.get("baseUrl")?.as_str()?;
    Some(base_url.to_string())
}

/// Joined text nodes of a timedtext XML document.
fn caption_xml_text(xml: &str) -> String {
    let pattern = Regex::new(r"(?s)<text[^>]*>(.*?)</text>").unwrap();
    let mut parts = Vec::new();
    for captures in pattern.captures_iter(xml) {
        if let Some(m) = captures.get(1) {
            // timedtext double-encodes entities ("&amp;#39;")
            parts.push(decode_entities(&decode_entities(m.as_str())));
        }
    }
    clean_text(&parts.join(" "))
}

fn decode_entities(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
