//! Read-side join of the liked set and the loaded feed.

use std::collections::HashMap;

use crate::art::ArtPiece;
use crate::feed::FeedEngine;
use crate::liked::LikedStore;

/// The liked artworks that are currently loaded in the feed, for the
/// collection panel. Pure derivation — recompute whenever either the feed or
/// the liked set changes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LikedCollection {
    /// Liked pieces in liked-set order, filtered to those the feed has
    /// loaded.
    pub pieces: Vec<ArtPiece>,
    /// Liked ids with no loaded piece: the feed hasn't paged far enough, or
    /// they fell out of the loaded window.
    pub missing_count: usize,
}

impl LikedCollection {
    /// Derive the collection from the liked ids (in set order) and the
    /// feed's loaded pieces.
    pub fn derive(liked_ids: &[i64], loaded: &[ArtPiece]) -> Self {
        let by_id: HashMap<i64, &ArtPiece> =
            loaded.iter().map(|piece| (piece.id, piece)).collect();
        let pieces: Vec<ArtPiece> = liked_ids
            .iter()
            .filter_map(|id| by_id.get(id).map(|&piece| piece.clone()))
            .collect();
        let missing_count = liked_ids.len() - pieces.len();
        LikedCollection {
            pieces,
            missing_count,
        }
    }

    /// Derive from the live engine and store.
    pub fn derive_from(feed: &FeedEngine, store: &LikedStore) -> Self {
        Self::derive(&store.liked_ids(), &feed.snapshot().pieces)
    }
}
