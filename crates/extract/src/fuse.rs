use std::collections::HashSet;

use crate::schema::{EntityCategory, EntityMention};

/// Join per-chunk summaries in chunk order with single spaces.
pub fn fuse_summaries(summaries: &[String]) -> String {
    summaries.join(" ")
}

/// Flatten per-chunk entities and drop repeats of the same
/// (surface form, category) pair.
///
/// The first occurrence wins, even when a later one scored higher.
pub fn fuse_entities(per_chunk: Vec<Vec<EntityMention>>) -> Vec<EntityMention> {
    let mut seen: HashSet<(String, EntityCategory)> = HashSet::new();
    let mut fused = Vec::new();

    for entity in per_chunk.into_iter().flatten() {
        if seen.insert((entity.surface_form.clone(), entity.category.clone())) {
            fused.push(entity);
        }
    }

    fused
}
