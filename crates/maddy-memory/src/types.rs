// SPDX-FileCopyrightText: 2026 Maddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Document formats and vector helpers for the memory store.

use maddy_core::types::{Document, ProfileFacts};

/// Header of the episodic block injected into the system prompt.
pub const EPISODIC_HEADER: &str = "--- Relevant Past Conversations ---";

/// Separator between episodic documents inside the block.
const EPISODIC_SEPARATOR: &str = "\n\n---\n";

/// Kind tag carried by profile documents.
pub const PROFILE_KIND: &str = "user_info";

/// Builds the transcript document persisted after an exchange.
pub fn episodic_document(user_message: &str, reply: &str, model: &str) -> Document {
    Document::new(format!("User: {user_message}\nAssistant: {reply}")).with_model(model)
}

/// Serializes facts into one `key: value` line each.
pub fn profile_document(facts: &ProfileFacts) -> Document {
    let content = facts
        .iter()
        .map(|(key, value)| format!("{key}: {value}"))
        .collect::<Vec<_>>()
        .join("\n");
    Document::new(content).with_kind(PROFILE_KIND)
}

/// Parses `key: value` lines out of a profile document.
///
/// Lines without a colon, or with an empty key or value, are skipped.
pub fn parse_profile_lines(content: &str) -> impl Iterator<Item = (String, String)> + '_ {
    content.lines().filter_map(|line| {
        let (key, value) = line.split_once(':')?;
        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() || value.is_empty() {
            None
        } else {
            Some((key.to_lowercase(), value.to_string()))
        }
    })
}

/// Formats retrieved transcripts as a labeled block, or `""` when there are none.
pub fn format_episodic_block(documents: &[Document]) -> String {
    if documents.is_empty() {
        return String::new();
    }
    let body = documents
        .iter()
        .map(|d| d.content.as_str())
        .collect::<Vec<_>>()
        .join(EPISODIC_SEPARATOR);
    format!("{EPISODIC_HEADER}\n{body}")
}

/// Convert f32 vector to bytes for SQLite BLOB storage.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert SQLite BLOB back to f32 vector. Trailing partial chunks are ignored.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Scales a vector to unit length in place. Zero vectors are left unchanged.
pub fn l2_normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        vec.iter_mut().for_each(|x| *x /= norm);
    }
}

/// Cosine similarity of two vectors.
///
/// Returns 0.0 for mismatched lengths or zero vectors so a corrupt row
/// ranks last instead of failing the whole search.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
