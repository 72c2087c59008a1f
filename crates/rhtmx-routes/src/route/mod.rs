/// Route patterns for file-based routing
///
/// - `pattern`: classification of directory names into typed segments
/// - `parser`: canonicalization, tokenization and specificity scoring

pub mod parser;
pub mod pattern;

pub use parser::{
    compose_from_tokens, fill_pattern, specificity, to_canonical_route, tokenize, ParsedRoute,
};
pub use pattern::{classify_segment, PatternToken, SegmentKind};
