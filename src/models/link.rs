use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::de;

/// What a short link points at, decided once when the link is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Url,
    Text,
}

impl ContentKind {
    /// URL iff the content has an absolute `http(s)://host...` shape.
    pub fn detect(content: &str) -> Self {
        let trimmed = content.trim();
        let lower = trimmed.to_ascii_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return ContentKind::Text;
        }

        match url::Url::parse(trimmed) {
            Ok(parsed) if parsed.host_str().is_some_and(|h| !h.is_empty()) => ContentKind::Url,
            _ => ContentKind::Text,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Url => "url",
            ContentKind::Text => "text",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "url" => Some(ContentKind::Url),
            "text" => Some(ContentKind::Text),
            _ => None,
        }
    }
}

/// Rendering parameters for the QR image of a link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrStyle {
    pub foreground_color: String,
    pub background_color: String,
    /// Pixels per QR module
    pub module_size: u32,
    /// Quiet zone width, in modules
    pub border_width: u32,
}

impl Default for QrStyle {
    fn default() -> Self {
        Self {
            foreground_color: "black".to_string(),
            background_color: "white".to_string(),
            module_size: 10,
            border_width: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortLink {
    pub id: String,
    pub original_content: String,
    pub content_kind: ContentKind,
    pub style: QrStyle,
    pub created_at: DateTime<Utc>,
}

/// Timestamps cross the API boundary as RFC 3339 with millisecond precision.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateLinkRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub bg_color: Option<String>,
    #[serde(default, deserialize_with = "de::opt_u32")]
    pub box_size: Option<u32>,
    #[serde(default, deserialize_with = "de::opt_u32")]
    pub border: Option<u32>,
}

impl CreateLinkRequest {
    /// Style from the request, falling back to defaults for omitted fields
    pub fn style(&self) -> QrStyle {
        let defaults = QrStyle::default();
        QrStyle {
            foreground_color: self
                .color
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .unwrap_or(defaults.foreground_color),
            background_color: self
                .bg_color
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .unwrap_or(defaults.background_color),
            module_size: self.box_size.unwrap_or(defaults.module_size),
            border_width: self.border.unwrap_or(defaults.border_width),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateLinkResponse {
    pub qr_id: String,
    pub qr_image_base64: String,
    pub short_url: String,
    pub redirect_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LinkSummary {
    pub id: String,
    pub original_url: String,
    pub created_at: String,
    pub color: String,
    pub bg_color: String,
    pub box_size: u32,
    pub border: u32,
}

impl From<&ShortLink> for LinkSummary {
    fn from(link: &ShortLink) -> Self {
        Self {
            id: link.id.clone(),
            original_url: link.original_content.clone(),
            created_at: format_timestamp(&link.created_at),
            color: link.style.foreground_color.clone(),
            bg_color: link.style.background_color.clone(),
            box_size: link.style.module_size,
            border: link.style.border_width,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ImageQuery {
    pub redirect: Option<String>,
}

impl ImageQuery {
    pub fn redirect_variant(&self) -> bool {
        self.redirect
            .as_deref()
            .is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImageResponse {
    pub qr_image_base64: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveResponse {
    #[serde(rename = "type")]
    pub kind: ContentKind,
    pub content: String,
}
