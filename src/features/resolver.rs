//! Team identity resolution.
//!
//! Training rows are keyed by provider-native team ids taken verbatim from
//! the snapshot. Serving receives free-text names, and a `TeamResolver`
//! maps them into that id space. Ids never pass through a resolver.

use std::collections::HashMap;
use tracing::debug;

use crate::types::MatchEvent;

/// Lowercase, trim and collapse internal whitespace runs to one space.
pub fn normalize_team_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Name or alias to canonical team id.
pub trait TeamResolver: Send + Sync {
    fn resolve(&self, name_or_id: &str) -> String;
}

/// Derives the id from the name itself. Provider ids pass through
/// unchanged only if they are already normalised.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticResolver;

impl TeamResolver for SyntheticResolver {
    fn resolve(&self, name_or_id: &str) -> String {
        normalize_team_name(name_or_id)
    }
}

/// Directory of known teams built from stored events. Recognises provider
/// ids and normalised team names; anything else falls back to the
/// synthetic form.
#[derive(Debug, Clone, Default)]
pub struct DirectoryResolver {
    by_key: HashMap<String, String>,
}

impl DirectoryResolver {
    pub fn from_events(events: &[MatchEvent]) -> Self {
        let mut by_key = HashMap::new();
        for ev in events {
            for (id, name) in [
                (&ev.home_team_id, &ev.home_team_name),
                (&ev.away_team_id, &ev.away_team_name),
            ] {
                if id.is_empty() {
                    continue;
                }
                by_key.insert(id.clone(), id.clone());
                if !name.trim().is_empty() {
                    by_key.insert(normalize_team_name(name), id.clone());
                }
            }
        }
        debug!(keys = by_key.len(), "Built team directory");
        Self { by_key }
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

impl TeamResolver for DirectoryResolver {
    fn resolve(&self, name_or_id: &str) -> String {
        if let Some(id) = self.by_key.get(name_or_id.trim()) {
            return id.clone();
        }
        let normalized = normalize_team_name(name_or_id);
        self.by_key.get(&normalized).cloned().unwrap_or(normalized)
    }
}
