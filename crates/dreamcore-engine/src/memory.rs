//! Bounded artifact memory
//!
//! Keeps the most recent artifacts (FIFO eviction), the archetype table
//! loaded at startup, and a pattern index over symbol kinds and archetype
//! tags. An element seen in two or more retained artifacts is a pattern.

use dreamcore_core::{Archetype, Artifact, ArtifactId};
use std::collections::{HashMap, VecDeque};

pub struct ArtifactMemory {
    capacity: usize,
    order: VecDeque<ArtifactId>,
    artifacts: HashMap<ArtifactId, Artifact>,
    archetypes: Vec<Archetype>,
    elements: HashMap<String, usize>,
}

impl ArtifactMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::new(),
            artifacts: HashMap::new(),
            archetypes: Vec::new(),
            elements: HashMap::new(),
        }
    }

    pub fn set_archetypes(&mut self, archetypes: Vec<Archetype>) {
        self.archetypes = archetypes;
    }

    pub fn archetypes(&self) -> &[Archetype] {
        &self.archetypes
    }

    fn element_keys(artifact: &Artifact) -> Vec<String> {
        let mut keys: Vec<String> = artifact
            .symbols
            .iter()
            .map(|s| format!("symbol:{}", s.kind))
            .chain(artifact.archetypes.iter().map(|a| format!("archetype:{}", a.as_str())))
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// Store an artifact, evicting the oldest when full. Returns the evicted id.
    pub fn store(&mut self, artifact: Artifact) -> Option<ArtifactId> {
        if self.artifacts.contains_key(&artifact.id) {
            return None;
        }
        for key in Self::element_keys(&artifact) {
            *self.elements.entry(key).or_insert(0) += 1;
        }
        self.order.push_back(artifact.id.clone());
        self.artifacts.insert(artifact.id.clone(), artifact);

        if self.order.len() <= self.capacity {
            return None;
        }
        let evicted = self.order.pop_front()?;
        if let Some(old) = self.artifacts.remove(&evicted) {
            for key in Self::element_keys(&old) {
                if let Some(count) = self.elements.get_mut(&key) {
                    *count -= 1;
                    if *count == 0 {
                        self.elements.remove(&key);
                    }
                }
            }
        }
        Some(evicted)
    }

    pub fn get(&self, id: &ArtifactId) -> Option<&Artifact> {
        self.artifacts.get(id)
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn pattern_count(&self) -> usize {
        self.elements.values().filter(|&&n| n >= 2).count()
    }

    /// Recurring elements with their counts, most frequent first.
    pub fn patterns(&self) -> Vec<(String, usize)> {
        let mut found: Vec<(String, usize)> = self
            .elements
            .iter()
            .filter(|(_, n)| **n >= 2)
            .map(|(k, n)| (k.clone(), *n))
            .collect();
        found.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dreamcore_core::{ArchetypeKind, ArtifactCategory, ArtifactOutcome, ArtifactSource, Symbol};

    fn artifact(id: &str, symbol: &str) -> Artifact {
        Artifact {
            id: ArtifactId::new(id),
            source: ArtifactSource::Generated,
            category: ArtifactCategory::Normal,
            emotions: vec![],
            symbols: vec![Symbol::new(symbol, vec![], 0.5)],
            archetypes: vec![ArchetypeKind::Shadow],
            narrative: String::new(),
            reality_coefficient: 0.5,
            collective_resonance: 0.5,
            outcome: ArtifactOutcome::Resolved,
        }
    }

    #[test]
    fn evicts_oldest_first() {
        let mut memory = ArtifactMemory::new(2);
        assert_eq!(memory.store(artifact("a", "key")), None);
        assert_eq!(memory.store(artifact("b", "door")), None);
        assert_eq!(memory.store(artifact("c", "owl")), Some(ArtifactId::new("a")));
        assert_eq!(memory.len(), 2);
        assert!(memory.get(&ArtifactId::new("a")).is_none());
    }

    #[test]
    fn patterns_need_two_sightings() {
        let mut memory = ArtifactMemory::new(10);
        memory.store(artifact("a", "key"));
        assert_eq!(memory.pattern_count(), 0);
        memory.store(artifact("b", "key"));
        // symbol:key and archetype:shadow
        assert_eq!(memory.pattern_count(), 2);
        memory.store(artifact("c", "owl"));
        assert_eq!(memory.patterns()[0], ("archetype:shadow".to_string(), 3));
    }

    #[test]
    fn eviction_forgets_patterns() {
        let mut memory = ArtifactMemory::new(1);
        memory.store(artifact("a", "key"));
        memory.store(artifact("b", "key"));
        assert_eq!(memory.pattern_count(), 0);
    }

    #[test]
    fn duplicate_ids_are_ignored() {
        let mut memory = ArtifactMemory::new(5);
        memory.store(artifact("a", "key"));
        memory.store(artifact("a", "key"));
        assert_eq!(memory.len(), 1);
        assert_eq!(memory.pattern_count(), 0);
    }
}
