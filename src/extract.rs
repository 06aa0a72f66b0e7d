//! Locate the image payload inside an arbitrarily shaped response.
//!
//! The generation services have returned several response layouts over
//! time: a `generated_images` list, `candidates → content → parts →
//! inline_data`, predict-style `predictions[].bytesBase64Encoded`, and
//! base64 text embedded directly in text parts. [`extract_image`] walks the
//! whole graph breadth-first and returns the first payload it can decode.

use std::collections::{HashSet, VecDeque};

use base64::Engine;

use crate::response::{Node, NodeId, Response};

/// Minimum length of a bare text node before it is considered base64.
const MIN_BASE64_LEN: usize = 80;

const INLINE_DATA_KEYS: &[&str] = &["inline_data", "inlineData"];
const FILE_DATA_KEYS: &[&str] = &["file_data", "fileData"];

/// Keys whose value, on a mapping, is decoded directly.
const PAYLOAD_KEYS: &[&str] = &["data", "image", "blob"];

/// Image byte slots of the generate-images and predict shapes. Decoded at any
/// length on records and mappings alike.
const IMAGE_SLOT_KEYS: &[&str] = &["image_bytes", "imageBytes", "bytesBase64Encoded"];

/// Keys expanded into the search queue, in this order.
const CONTAINER_KEYS: &[&str] = &[
    "generated_images",
    "generatedImages",
    "candidates",
    "content",
    "parts",
    "generated_content",
    "generatedContent",
    "contents",
    "responses",
    "messages",
    "media",
    "image",
    "images",
    "predictions",
    "text",
];

/// What a single node looks like to the extractor.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Candidate<'a> {
    /// Null, scalar, empty bytes, or empty text.
    Absent,
    RawBytes(&'a [u8]),
    Base64Text(&'a str),
    PlainText,
    /// A record or mapping with an inline-data slot holding a `data` member.
    InlineDataRecord { data: NodeId },
    /// A record or mapping with a file-data slot holding a `data` member.
    FileDataRecord { data: NodeId },
    GenericContainer,
}

/// Return the first image payload found in `response`, or `None`.
///
/// The search is breadth-first from the root and visits each node at most
/// once, so cyclic graphs terminate. Malformed or undecodable values are
/// skipped and never abort the search.
#[must_use]
pub fn extract_image(response: &Response) -> Option<Vec<u8>> {
    let mut queue = VecDeque::from([response.root()]);
    let mut visited = HashSet::new();

    while let Some(id) = queue.pop_front() {
        if !visited.insert(id) {
            continue;
        }

        let candidate = classify(response, id);
        let found = match candidate {
            Candidate::Absent | Candidate::PlainText => None,
            Candidate::RawBytes(data) => Some(data.to_vec()),
            Candidate::Base64Text(text) => decode_base64(text),
            Candidate::InlineDataRecord { data } => decode_member(response, data)
                .or_else(|| {
                    nested_data(response, id, FILE_DATA_KEYS)
                        .and_then(|d| decode_member(response, d))
                })
                .or_else(|| direct_payload(response, id)),
            Candidate::FileDataRecord { data } => {
                decode_member(response, data).or_else(|| direct_payload(response, id))
            }
            Candidate::GenericContainer => direct_payload(response, id),
        };
        if found.is_some() {
            return found;
        }

        if matches!(
            candidate,
            Candidate::InlineDataRecord { .. }
                | Candidate::FileDataRecord { .. }
                | Candidate::GenericContainer
        ) {
            for child in children(response, id) {
                if !visited.contains(&child) {
                    queue.push_back(child);
                }
            }
        }
    }

    None
}

fn classify(response: &Response, id: NodeId) -> Candidate<'_> {
    match response.node(id) {
        None | Some(Node::Null | Node::Scalar(_)) => Candidate::Absent,
        Some(Node::Bytes(data)) if data.is_empty() => Candidate::Absent,
        Some(Node::Bytes(data)) => Candidate::RawBytes(data),
        Some(Node::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                Candidate::Absent
            } else if looks_like_base64(text) {
                Candidate::Base64Text(text)
            } else {
                Candidate::PlainText
            }
        }
        Some(Node::Record(_) | Node::Map(_)) => {
            if let Some(data) = nested_data(response, id, INLINE_DATA_KEYS) {
                Candidate::InlineDataRecord { data }
            } else if let Some(data) = nested_data(response, id, FILE_DATA_KEYS) {
                Candidate::FileDataRecord { data }
            } else {
                Candidate::GenericContainer
            }
        }
        Some(Node::Seq(_)) => Candidate::GenericContainer,
    }
}

/// Heuristic: long enough, and nothing outside the base64 alphabet.
fn looks_like_base64(text: &str) -> bool {
    text.chars().count() >= MIN_BASE64_LEN
        && text.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=') || c.is_ascii_whitespace()
        })
}

fn decode_base64(text: &str) -> Option<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .ok()
        .filter(|data| !data.is_empty())
}

/// Decode an explicit payload slot: raw bytes, or base64 text of any length.
fn decode_member(response: &Response, id: NodeId) -> Option<Vec<u8>> {
    match response.node(id)? {
        Node::Bytes(data) if !data.is_empty() => Some(data.clone()),
        Node::Text(text) => decode_base64(text),
        _ => None,
    }
}

/// Find `<slot>.data` for the first slot key present on `id`.
fn nested_data(response: &Response, id: NodeId, slot_keys: &[&str]) -> Option<NodeId> {
    slot_keys
        .iter()
        .filter_map(|key| response.field(id, key))
        .find_map(|slot| response.field(slot, "data"))
}

/// Image byte slots first, then the keyed entries of a mapping.
fn direct_payload(response: &Response, id: NodeId) -> Option<Vec<u8>> {
    IMAGE_SLOT_KEYS
        .iter()
        .filter_map(|key| response.field(id, key))
        .find_map(|slot| decode_member(response, slot))
        .or_else(|| keyed_payload(response, id))
}

/// On a mapping, decode the first `data`/`image`/`blob` entry that yields bytes.
fn keyed_payload(response: &Response, id: NodeId) -> Option<Vec<u8>> {
    let Some(Node::Map(entries)) = response.node(id) else {
        return None;
    };
    entries
        .iter()
        .filter(|(key, _)| PAYLOAD_KEYS.contains(&key.as_str()))
        .find_map(|&(_, child)| decode_member(response, child))
}

fn children(response: &Response, id: NodeId) -> Vec<NodeId> {
    match response.node(id) {
        Some(Node::Seq(items)) => items.clone(),
        Some(Node::Record(_) | Node::Map(_)) => CONTAINER_KEYS
            .iter()
            .filter_map(|key| response.field(id, key))
            .collect(),
        _ => Vec::new(),
    }
}
