//! Similarity-based chunking.
//!
//! Elements are first cut down to at most `max_characters` (long ones become
//! overlapping windows), then neighbours are merged while they stay on topic:
//! the merged chunk must fit in `max_characters`, the chunk being extended
//! must still be shorter than `new_after_n_chars`, and the incoming element's
//! embedding must be at least `similarity_threshold` similar to its
//! predecessor's. Sizes are counted in characters, not bytes.

use crate::{
    config::ChunkingConfig,
    documents::Element,
    embed::{Embedder, cosine_similarity},
    error::{IngestError, Result},
};

const SEPARATOR: &str = "\n\n";

/// Split every element longer than `max` characters into windows of `max`
/// characters, each starting `max - overlap` characters after the previous one.
pub fn split_oversized(elements: &[Element], max: usize, overlap: usize) -> Vec<String> {
    let max = max.max(1);
    let step = max.saturating_sub(overlap).max(1);
    let mut pieces = Vec::new();

    for element in elements {
        let chars: Vec<char> = element.text.chars().collect();
        if chars.len() <= max {
            pieces.push(element.text.clone());
            continue;
        }

        let mut start = 0;
        loop {
            let end = (start + max).min(chars.len());
            pieces.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += step;
        }
    }

    pieces
}

/// Merge adjacent pieces into chunks. `embeddings[i]` belongs to `pieces[i]`.
pub fn merge_by_similarity(
    pieces: &[String],
    embeddings: &[Vec<f32>],
    config: &ChunkingConfig,
) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut iter = pieces.iter().zip(embeddings.iter());

    let Some((first, first_embedding)) = iter.next() else {
        return chunks;
    };
    let mut current = first.clone();
    let mut current_len = first.chars().count();
    let mut previous = first_embedding;

    for (piece, embedding) in iter {
        let piece_len = piece.chars().count();
        let fits = current_len + SEPARATOR.len() + piece_len <= config.max_characters;
        let room = current_len < config.new_after_n_chars;
        let similar = cosine_similarity(previous, embedding) >= config.similarity_threshold;

        if fits && room && similar {
            current.push_str(SEPARATOR);
            current.push_str(piece);
            current_len += SEPARATOR.len() + piece_len;
        } else {
            chunks.push(std::mem::replace(&mut current, piece.clone()));
            current_len = piece_len;
        }
        previous = embedding;
    }
    chunks.push(current);

    chunks
}

/// Split, embed and merge one document's elements.
pub async fn chunk_elements(
    elements: &[Element],
    embedder: &dyn Embedder,
    config: &ChunkingConfig,
) -> Result<Vec<String>> {
    let pieces = split_oversized(elements, config.max_characters, config.overlap);
    if pieces.is_empty() {
        return Ok(Vec::new());
    }

    let embeddings = embedder.embed_batch(&pieces).await?;
    if embeddings.len() != pieces.len() {
        return Err(IngestError::Embedding {
            reason: format!(
                "expected {} embeddings, got {}",
                pieces.len(),
                embeddings.len()
            ),
        });
    }

    Ok(merge_by_similarity(&pieces, &embeddings, config))
}
