use crate::harvard::ObjectRecord;

/// Placeholder title for records the catalog returns without one.
pub const UNTITLED: &str = "Untitled";
/// Placeholder artist for records with no usable contributor names.
pub const UNKNOWN_ARTIST: &str = "Unknown artist";

/// A single artwork in the feed, mapped from a raw catalog record.
///
/// Immutable once constructed; the feed engine owns the mapped pieces and
/// hands out clones in state snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtPiece {
    pub id: i64,
    pub image_url: String,
    pub title: String,
    /// Contributor names joined with ", " in listed order.
    pub artist: String,
    pub description: Option<String>,
    pub culture: Option<String>,
    pub dated: Option<String>,
    pub classification: Option<String>,
    pub medium: Option<String>,
    pub dimensions: Option<String>,
    /// Museum page for the object.
    pub url: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl ArtPiece {
    /// Map a raw catalog record into a feed piece.
    ///
    /// Returns `None` when the record has no primary image: image-less
    /// records are dropped during mapping rather than rendered as gaps.
    pub fn from_record(record: ObjectRecord) -> Option<Self> {
        let image_url = non_empty(record.primaryimageurl)?;

        let names: Vec<String> = record
            .people
            .unwrap_or_default()
            .into_iter()
            .filter_map(|person| non_empty(person.name))
            .collect();
        let artist = if names.is_empty() {
            UNKNOWN_ARTIST.to_string()
        } else {
            names.join(", ")
        };

        // First non-empty of description, label text, credit line.
        let description = non_empty(record.description)
            .or_else(|| non_empty(record.labeltext))
            .or_else(|| non_empty(record.creditline));

        Some(ArtPiece {
            id: record.objectid,
            image_url,
            title: non_empty(record.title).unwrap_or_else(|| UNTITLED.to_string()),
            artist,
            description,
            culture: non_empty(record.culture),
            dated: non_empty(record.dated),
            classification: non_empty(record.classification),
            medium: non_empty(record.medium).or_else(|| non_empty(record.technique)),
            dimensions: non_empty(record.dimensions),
            url: non_empty(record.url),
        })
    }
}
