// ============================================================================
// AI OPERATIONS: generative canvas expansion
// ============================================================================
//
// The model call itself lives behind `CanvasExpander`.  The shipped backend,
// `HttpExpander`, posts the request as JSON to a configured endpoint and reads
// back the expanded image as a blob URI.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Accepted range for the expansion amount, in pixels.
pub const MIN_EXPAND_AMOUNT: u32 = 10;
pub const MAX_EXPAND_AMOUNT: u32 = 512;
pub const DEFAULT_EXPAND_AMOUNT: u32 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpandDirection {
    Top,
    Bottom,
    Left,
    #[default]
    Right,
}

impl ExpandDirection {
    pub fn label(&self) -> &'static str {
        match self {
            ExpandDirection::Top => "Top",
            ExpandDirection::Bottom => "Bottom",
            ExpandDirection::Left => "Left",
            ExpandDirection::Right => "Right",
        }
    }

    pub fn all() -> &'static [ExpandDirection] {
        &[
            ExpandDirection::Top,
            ExpandDirection::Bottom,
            ExpandDirection::Left,
            ExpandDirection::Right,
        ]
    }
}

/// Settings collected by the expand dialog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpandSettings {
    pub direction: ExpandDirection,
    pub amount: u32,
    /// Optional guidance text; blank means none.
    pub prompt: String,
}

impl Default for ExpandSettings {
    fn default() -> Self {
        Self {
            direction: ExpandDirection::Right,
            amount: DEFAULT_EXPAND_AMOUNT,
            prompt: String::new(),
        }
    }
}

/// Wire request.  Field names follow the expansion service's JSON schema.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandRequest {
    pub photo_data_uri: String,
    pub expand_direction: ExpandDirection,
    pub expand_amount: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandResponse {
    pub expanded_canvas_data_uri: String,
}

/// Errors from building, sending or applying an expansion.
#[derive(Debug)]
pub enum ExpandError {
    InvalidAmount(u32),
    /// The canvas could not be exported for the request.
    NoCanvasData,
    /// An expansion is already running.
    Busy,
    /// No endpoint configured.
    NotConfigured,
    Request(String),
    Response(String),
    /// The service answered without an image.
    EmptyImage,
    /// The returned image could not be loaded into the canvas.
    Load(String),
}

impl std::fmt::Display for ExpandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExpandError::InvalidAmount(n) if *n < MIN_EXPAND_AMOUNT => {
                write!(f, "Minimum expansion is {}px", MIN_EXPAND_AMOUNT)
            }
            ExpandError::InvalidAmount(_) => {
                write!(f, "Maximum expansion is {}px", MAX_EXPAND_AMOUNT)
            }
            ExpandError::NoCanvasData => write!(
                f,
                "Could not get current canvas data. Please draw something first or ensure the canvas is initialized."
            ),
            ExpandError::Busy => write!(f, "An expansion is already in progress"),
            ExpandError::NotConfigured => write!(f, "No canvas expansion endpoint is configured"),
            ExpandError::Request(e) => write!(f, "Expansion request failed: {}", e),
            ExpandError::Response(e) => write!(f, "Invalid expansion response: {}", e),
            ExpandError::EmptyImage => write!(f, "Expansion failed: No image data returned."),
            ExpandError::Load(e) => write!(f, "Failed to load expanded image: {}", e),
        }
    }
}

impl std::error::Error for ExpandError {}

impl ExpandSettings {
    /// Validate and turn into a wire request around `photo_data_uri`.
    pub fn to_request(&self, photo_data_uri: String) -> Result<ExpandRequest, ExpandError> {
        if !(MIN_EXPAND_AMOUNT..=MAX_EXPAND_AMOUNT).contains(&self.amount) {
            return Err(ExpandError::InvalidAmount(self.amount));
        }
        if photo_data_uri.is_empty() {
            return Err(ExpandError::NoCanvasData);
        }
        let prompt = self.prompt.trim();
        Ok(ExpandRequest {
            photo_data_uri,
            expand_direction: self.direction,
            expand_amount: self.amount,
            prompt: (!prompt.is_empty()).then(|| prompt.to_string()),
        })
    }
}

/// Text instruction sent alongside the image.
pub fn expansion_prompt(request: &ExpandRequest) -> String {
    let mut text = format!(
        "Expand the canvas in the {} direction by {} pixels.",
        request.expand_direction.label().to_lowercase(),
        request.expand_amount
    );
    if let Some(prompt) = &request.prompt {
        text.push_str(" Use the following prompt to guide the image generation: ");
        text.push_str(prompt);
    }
    text
}

/// Anything that can turn a canvas image into an expanded one.  Called from a
/// worker thread, never from the event loop.
pub trait CanvasExpander: Send + Sync {
    fn expand(&self, request: &ExpandRequest) -> Result<ExpandResponse, ExpandError>;
}

/// JSON-over-HTTP expansion backend.
pub struct HttpExpander {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl HttpExpander {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ExpandError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(120))
            .user_agent("genesis-canvas expander")
            .build()
            .map_err(|e| ExpandError::Request(e.to_string()))?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Body actually posted: the request plus the rendered instruction text.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExpandPayload<'a> {
    #[serde(flatten)]
    request: &'a ExpandRequest,
    instruction: String,
}

impl CanvasExpander for HttpExpander {
    fn expand(&self, request: &ExpandRequest) -> Result<ExpandResponse, ExpandError> {
        let payload = ExpandPayload {
            request,
            instruction: expansion_prompt(request),
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .map_err(|e| ExpandError::Request(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ExpandError::Request(format!("server returned {}", status)));
        }
        let body: ExpandResponse = resp
            .json()
            .map_err(|e| ExpandError::Response(e.to_string()))?;
        if body.expanded_canvas_data_uri.trim().is_empty() {
            return Err(ExpandError::EmptyImage);
        }
        Ok(body)
    }
}
