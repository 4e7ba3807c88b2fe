//! Core library for ArtTok: an infinite-scrolling feed over the Harvard Art
//! Museums object catalog, with a locally persisted liked collection that
//! stays consistent across concurrently open views.
//!
//! The presentation layer lives elsewhere; this crate owns the feed
//! pagination engine, the catalog client, the liked-set store, and the
//! collection derivation.

pub mod art;
pub mod collection;
pub mod config;
pub mod data_dir;
pub mod feed;
pub mod harvard;
pub mod liked;
