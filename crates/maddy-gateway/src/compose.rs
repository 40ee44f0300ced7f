// SPDX-FileCopyrightText: 2026 Maddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat request payloads and message composition.
//!
//! Attachments arrive already extracted by the client: file text, base64
//! images with their pixel size, and a speech transcription. [`compose`]
//! folds them into the single message the orchestrator sees.

use maddy_agent::ImageInput;
use serde::Deserialize;
use serde_json::Value;

/// Note appended to the message whenever images are attached.
pub const IMAGE_NOTE: &str =
    "\n[User has attached images. Please analyze them if the model supports vision.]";

/// Request body for `POST /api/chat`.
#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    /// Continue this session. Absent or blank means the default session.
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub files: Vec<FileUpload>,
    #[serde(default)]
    pub images: Vec<ImageUpload>,
    #[serde(default)]
    pub audio_transcription: Option<String>,
}

/// Text extracted from an uploaded file. Other fields the client sends,
/// such as the file type, are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct FileUpload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub content: String,
    /// Whether extraction succeeded on the client.
    #[serde(default)]
    pub success: bool,
}

/// An uploaded image, base64-encoded.
#[derive(Debug, Default, Deserialize)]
pub struct ImageUpload {
    #[serde(default)]
    pub base64: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub metadata: ImageMetadata,
}

/// Pixel dimensions as reported by the client. Either may be a number or a string.
#[derive(Debug, Default, Deserialize)]
pub struct ImageMetadata {
    #[serde(default)]
    pub width: Option<Value>,
    #[serde(default)]
    pub height: Option<Value>,
}

/// What the orchestrator receives for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedMessage {
    pub text: String,
    /// Images with a payload, ready for the vision path.
    pub images: Vec<ImageInput>,
}

impl ComposedMessage {
    /// True when there is nothing to respond to.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Folds attachments into the user's message.
///
/// Sections are appended after a blank line in the order files, images,
/// audio. A transcription stands in for the message when the user typed
/// nothing.
pub fn compose(request: &ChatRequest) -> ComposedMessage {
    let mut message = request.message.trim().to_string();
    let mut parts: Vec<String> = Vec::new();

    if !request.files.is_empty() {
        parts.push("--- Uploaded Files ---".to_string());
        for file in request
            .files
            .iter()
            .filter(|f| f.success || !f.content.is_empty())
        {
            parts.push(format!(
                "\n[File: {}]\n{}",
                file.name.as_deref().unwrap_or("unknown"),
                file.content
            ));
        }
    }

    if !request.images.is_empty() {
        parts.push("\n--- Uploaded Images ---".to_string());
        for (i, image) in request.images.iter().enumerate() {
            parts.push(format!(
                "\n[Image {} - {}x{} pixels]",
                i + 1,
                dimension(image.metadata.width.as_ref()),
                dimension(image.metadata.height.as_ref()),
            ));
        }
        message.push_str(IMAGE_NOTE);
    }

    let transcription = request
        .audio_transcription
        .as_deref()
        .map(str::trim)
        .unwrap_or_default();
    if !transcription.is_empty() {
        parts.push("\n--- Audio Transcription ---".to_string());
        parts.push(format!("\n[Transcribed audio: {transcription}]"));
        if message.is_empty() {
            message = transcription.to_string();
        }
    }

    let text = if parts.is_empty() {
        message
    } else if message.is_empty() {
        parts.join("\n")
    } else {
        format!("{message}\n\n{}", parts.join("\n"))
    };

    let images = request
        .images
        .iter()
        .filter(|image| !image.base64.is_empty())
        .map(|image| ImageInput::new(image.base64.clone(), image.mime_type.clone()))
        .collect();

    ComposedMessage { text, images }
}

fn dimension(value: Option<&Value>) -> String {
    match value {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => "?".to_string(),
    }
}
