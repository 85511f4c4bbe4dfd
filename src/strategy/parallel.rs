//! Parallel batch annotation
//!
//! Uses Rayon to annotate independent documents concurrently. Every input
//! gets its own transformer and its own extractor; nothing is shared between
//! documents except the configuration.

use crate::annotate::mention::CitationExtractor;
use crate::config::TransformConfig;
use crate::error::Result;
use rayon::prelude::*;

/// Annotate every input in parallel
///
/// `make_extractor` is called once per input. Results come back in input
/// order, each succeeding or failing on its own.
pub fn annotate_parallel<F, E>(inputs: &[&[u8]], config: &TransformConfig, make_extractor: F) -> Vec<Result<Vec<u8>>>
where
    F: Fn() -> E + Sync,
    E: CitationExtractor,
{
    inputs
        .par_iter()
        .map(|input| crate::annotate(input, config, make_extractor()))
        .collect()
}
