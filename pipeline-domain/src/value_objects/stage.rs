// /////////////////////////////////////////////////////////////////////////////
// Document Pipeline Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stage
//!
//! The fifteen canonical processing stages a document moves through
//! (`spec.md` §2), in their fixed run order.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the fifteen canonical pipeline stages.
///
/// Variant order matches run order exactly; [`Stage::ordinal`] and
/// [`Stage::ALL`] both depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Upload,
    TextExtraction,
    TableExtraction,
    SvgProcessing,
    ImageProcessing,
    VisualEmbedding,
    LinkExtraction,
    ChunkPreprocessing,
    Classification,
    MetadataExtraction,
    PartsExtraction,
    SeriesDetection,
    Storage,
    Embedding,
    SearchIndexing,
}

impl Stage {
    /// All stages, in canonical run order.
    pub const ALL: [Stage; 15] = [
        Stage::Upload,
        Stage::TextExtraction,
        Stage::TableExtraction,
        Stage::SvgProcessing,
        Stage::ImageProcessing,
        Stage::VisualEmbedding,
        Stage::LinkExtraction,
        Stage::ChunkPreprocessing,
        Stage::Classification,
        Stage::MetadataExtraction,
        Stage::PartsExtraction,
        Stage::SeriesDetection,
        Stage::Storage,
        Stage::Embedding,
        Stage::SearchIndexing,
    ];

    /// The stage's position in run order, zero-indexed.
    pub fn ordinal(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).expect("ALL is exhaustive")
    }

    /// The stage immediately after this one in run order, if any.
    pub fn next(&self) -> Option<Stage> {
        Self::ALL.get(self.ordinal() + 1).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Upload => "upload",
            Stage::TextExtraction => "text_extraction",
            Stage::TableExtraction => "table_extraction",
            Stage::SvgProcessing => "svg_processing",
            Stage::ImageProcessing => "image_processing",
            Stage::VisualEmbedding => "visual_embedding",
            Stage::LinkExtraction => "link_extraction",
            Stage::ChunkPreprocessing => "chunk_preprocessing",
            Stage::Classification => "classification",
            Stage::MetadataExtraction => "metadata_extraction",
            Stage::PartsExtraction => "parts_extraction",
            Stage::SeriesDetection => "series_detection",
            Stage::Storage => "storage",
            Stage::Embedding => "embedding",
            Stage::SearchIndexing => "search_indexing",
        }
    }

    pub fn parse(name: &str) -> Option<Stage> {
        Self::ALL.iter().copied().find(|s| s.as_str() == name)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_has_fifteen_stages_in_order() {
        assert_eq!(Stage::ALL.len(), 15);
        assert_eq!(Stage::ALL[0], Stage::Upload);
        assert_eq!(Stage::ALL[14], Stage::SearchIndexing);
    }

    #[test]
    fn ordinal_matches_position_in_all() {
        for (i, stage) in Stage::ALL.iter().enumerate() {
            assert_eq!(stage.ordinal(), i);
        }
    }

    #[test]
    fn next_chains_through_the_whole_order() {
        let mut stage = Stage::Upload;
        let mut count = 1;
        while let Some(next) = stage.next() {
            stage = next;
            count += 1;
        }
        assert_eq!(count, 15);
        assert_eq!(stage, Stage::SearchIndexing);
        assert_eq!(stage.next(), None);
    }

    #[test]
    fn parse_round_trips_as_str() {
        for stage in Stage::ALL {
            assert_eq!(Stage::parse(stage.as_str()), Some(stage));
        }
        assert_eq!(Stage::parse("not_a_stage"), None);
    }
}
