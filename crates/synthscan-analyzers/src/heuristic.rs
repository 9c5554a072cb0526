//! Metadata heuristic pre-filter
//!
//! Cheap, deterministic evidence accumulator run before any model inference.
//! Each rule inspects the metadata record independently and contributes a
//! fixed number of points when its condition holds; the total is the
//! heuristic score in `[0, MAX_SCORE]`.

use std::fmt;
use synthscan_core::{keys, MetadataRecord};

/// Dimensions that are a multiple of this are typical of diffusion model output
pub const DIMENSION_ALIGNMENT: i64 = 64;

/// Highest score the rule set can produce
pub const MAX_SCORE: u32 = 70;

/// A single scoring rule
#[derive(Clone, Copy)]
pub struct HeuristicRule {
    /// Stable rule name, reported in breakdowns
    pub name: &'static str,

    /// Points added when the rule fires
    pub points: u32,

    check: fn(&MetadataRecord) -> bool,
}

impl HeuristicRule {
    /// Whether the rule fires for the given record
    pub fn matches(&self, metadata: &MetadataRecord) -> bool {
        (self.check)(metadata)
    }
}

impl fmt::Debug for HeuristicRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeuristicRule")
            .field("name", &self.name)
            .field("points", &self.points)
            .finish()
    }
}

/// The full rule set, in reporting order
pub const RULES: [HeuristicRule; 4] = [
    HeuristicRule {
        name: "missing_exif",
        points: 30,
        check: |m| !m.contains(keys::EXIF),
    },
    HeuristicRule {
        name: "png_block",
        points: 15,
        check: |m| m.contains(keys::PNG),
    },
    HeuristicRule {
        name: "missing_gps",
        points: 5,
        check: |m| !m.contains(keys::GPS),
    },
    HeuristicRule {
        name: "aligned_dimensions",
        points: 20,
        check: has_aligned_dimensions,
    },
];

fn has_aligned_dimensions(metadata: &MetadataRecord) -> bool {
    match (
        metadata.get_integer(keys::PIXEL_WIDTH),
        metadata.get_integer(keys::PIXEL_HEIGHT),
    ) {
        (Some(width), Some(height)) => {
            width % DIMENSION_ALIGNMENT == 0 && height % DIMENSION_ALIGNMENT == 0
        }
        _ => false,
    }
}

/// Score plus the rules that produced it
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct HeuristicBreakdown {
    /// Sum of the points of all matched rules
    pub score: u32,

    /// Names of matched rules, in rule order
    pub matched: Vec<&'static str>,
}

/// Stateless metadata scorer
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicScorer;

impl HeuristicScorer {
    /// Score a metadata record. Never fails; missing or mistyped fields
    /// simply leave their rule unmatched.
    pub fn score(metadata: &MetadataRecord) -> u32 {
        RULES
            .iter()
            .filter(|rule| rule.matches(metadata))
            .map(|rule| rule.points)
            .sum()
    }

    /// Score a metadata record and report which rules fired
    pub fn evaluate(metadata: &MetadataRecord) -> HeuristicBreakdown {
        let mut breakdown = HeuristicBreakdown {
            score: 0,
            matched: Vec::with_capacity(RULES.len()),
        };

        for rule in RULES.iter().filter(|rule| rule.matches(metadata)) {
            breakdown.score += rule.points;
            breakdown.matched.push(rule.name);
        }

        breakdown
    }
}
