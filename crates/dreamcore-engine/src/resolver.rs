//! Conflict resolution cache
//!
//! Memoizes one `Resolution` per conflict id, tries strategies in a fixed
//! priority order, and escalates when the active-conflict set outgrows its
//! capacity. Tolerance bookkeeping is left to the caller.

use crate::config::ConflictConfig;
use dreamcore_core::{Conflict, ConflictId, Error, Resolution, Result, StrategyKind};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, error, info, warn};

/// Engine state visible to strategies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolutionContext {
    pub paradox_tolerance: f64,
    pub resolving_threshold: f64,
}

impl Default for ResolutionContext {
    fn default() -> Self {
        Self { paradox_tolerance: 100.0, resolving_threshold: 20.0 }
    }
}

/// One way of answering a conflict.
///
/// `Ok(None)` declines. `Err` means the conflict was malformed for this
/// strategy; the resolver logs it and moves on to the next one.
pub trait ResolutionStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    fn attempt(&self, conflict: &Conflict, ctx: &ResolutionContext) -> Result<Option<Resolution>>;
}

/// Built-in strategies in priority order.
pub fn standard_strategies() -> Vec<Box<dyn ResolutionStrategy>> {
    vec![
        Box::new(AcceptBoth),
        Box::new(CreateHigherOrder),
        Box::new(TemporalResolution),
        Box::new(QuantumSuperposition),
        Box::new(DreamLogicOverride),
    ]
}

pub struct AcceptBoth;

impl ResolutionStrategy for AcceptBoth {
    fn kind(&self) -> StrategyKind {
        StrategyKind::AcceptBoth
    }

    fn attempt(&self, conflict: &Conflict, _ctx: &ResolutionContext) -> Result<Option<Resolution>> {
        if conflict.criticality >= 0.3 {
            return Ok(None);
        }
        Ok(Some(Resolution::new(
            conflict.id.clone(),
            self.kind(),
            format!("both sides of '{}' are allowed to stand", conflict.description),
            0.7,
        )))
    }
}

pub struct CreateHigherOrder;

impl ResolutionStrategy for CreateHigherOrder {
    fn kind(&self) -> StrategyKind {
        StrategyKind::CreateHigherOrder
    }

    fn attempt(&self, conflict: &Conflict, _ctx: &ResolutionContext) -> Result<Option<Resolution>> {
        if conflict.effects.len() < 2 || conflict.criticality >= 0.6 {
            return Ok(None);
        }
        if conflict.effects.iter().any(|e| e.trim().is_empty()) {
            return Err(Error::declined(conflict.id.as_str(), self.kind().as_str(), "empty effect tag"));
        }
        Ok(Some(Resolution::new(
            conflict.id.clone(),
            self.kind(),
            format!("a higher order contains {}", conflict.effects.join(" and ")),
            0.8,
        )))
    }
}

pub struct TemporalResolution;

impl ResolutionStrategy for TemporalResolution {
    fn kind(&self) -> StrategyKind {
        StrategyKind::TemporalResolution
    }

    fn attempt(&self, conflict: &Conflict, _ctx: &ResolutionContext) -> Result<Option<Resolution>> {
        let kind = conflict.kind.to_lowercase();
        if !["temporal", "causal", "sequence"].iter().any(|k| kind.contains(k)) {
            return Ok(None);
        }
        Ok(Some(Resolution::new(
            conflict.id.clone(),
            self.kind(),
            "each side holds in its own moment",
            0.75,
        )))
    }
}

pub struct QuantumSuperposition;

impl ResolutionStrategy for QuantumSuperposition {
    fn kind(&self) -> StrategyKind {
        StrategyKind::QuantumSuperposition
    }

    fn attempt(&self, conflict: &Conflict, _ctx: &ResolutionContext) -> Result<Option<Resolution>> {
        if !conflict.kind.to_lowercase().contains("emotional") || conflict.criticality >= 0.8 {
            return Ok(None);
        }
        Ok(Some(Resolution::new(
            conflict.id.clone(),
            self.kind(),
            "both states held in superposition until observed",
            0.6,
        )))
    }
}

pub struct DreamLogicOverride;

impl ResolutionStrategy for DreamLogicOverride {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DreamLogicOverride
    }

    fn attempt(&self, conflict: &Conflict, ctx: &ResolutionContext) -> Result<Option<Resolution>> {
        if ctx.paradox_tolerance > ctx.resolving_threshold || conflict.criticality >= 0.9 {
            return Ok(None);
        }
        Ok(Some(Resolution::new(
            conflict.id.clone(),
            self.kind(),
            "dream logic overrides the contradiction",
            0.9,
        )))
    }
}

/// What a cascade escalation did.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeReport {
    pub before: usize,
    pub after: usize,
    /// Conflicts removed from the active set, lowest criticality first.
    pub drained: Vec<Conflict>,
}

/// Result of a sweep over every active conflict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub resolved: usize,
    pub unresolved: usize,
}

pub struct ConflictResolver {
    strategies: Vec<Box<dyn ResolutionStrategy>>,
    cache: HashMap<ConflictId, Resolution>,
    active: BTreeMap<ConflictId, Conflict>,
    capacity: usize,
    drain_target: usize,
    critical_criticality: f64,
    context: ResolutionContext,
    invocations: u64,
    cascades: u64,
    pending: Vec<CascadeReport>,
}

impl ConflictResolver {
    pub fn new(strategies: Vec<Box<dyn ResolutionStrategy>>, config: &ConflictConfig) -> Self {
        Self {
            strategies,
            cache: HashMap::new(),
            active: BTreeMap::new(),
            capacity: config.capacity,
            drain_target: config.drain_target.min(config.capacity),
            critical_criticality: config.critical_criticality,
            context: ResolutionContext::default(),
            invocations: 0,
            cascades: 0,
            pending: Vec::new(),
        }
    }

    pub fn standard(config: &ConflictConfig) -> Self {
        Self::new(standard_strategies(), config)
    }

    pub fn set_context(&mut self, context: ResolutionContext) {
        self.context = context;
    }

    pub fn context(&self) -> ResolutionContext {
        self.context
    }

    /// Answer `conflict`, from cache when possible.
    ///
    /// `Ok(None)` leaves the conflict in the active set. An overflowing set
    /// escalates; if draining cannot bring it back under capacity the call
    /// fails with `CascadeUnrecoverable`.
    pub fn resolve(&mut self, conflict: &Conflict) -> Result<Option<Resolution>> {
        if let Some(hit) = self.cache.get(&conflict.id) {
            debug!("Resolution cache hit for {}", conflict.id);
            return Ok(Some(hit.clone()));
        }

        for strategy in &self.strategies {
            self.invocations += 1;
            match strategy.attempt(conflict, &self.context) {
                Ok(Some(resolution)) => {
                    info!(
                        "Resolved {} via {} (stability {:.2})",
                        conflict.id, resolution.strategy, resolution.stability
                    );
                    self.cache.insert(conflict.id.clone(), resolution.clone());
                    self.active.remove(&conflict.id);
                    return Ok(Some(resolution));
                }
                Ok(None) => {}
                Err(e) => warn!("Strategy {} declined {}: {}", strategy.kind(), conflict.id, e),
            }
        }

        debug!("No strategy resolved {}", conflict.id);
        self.active.entry(conflict.id.clone()).or_insert_with(|| conflict.clone());
        if self.active.len() > self.capacity {
            self.escalate()?;
        }
        Ok(None)
    }

    /// Re-run resolution over every active conflict.
    pub fn resolve_all_active(&mut self) -> Result<SweepSummary> {
        let pending: Vec<Conflict> = self.active.values().cloned().collect();
        let mut summary = SweepSummary::default();
        for conflict in &pending {
            match self.resolve(conflict)? {
                Some(_) => summary.resolved += 1,
                None => summary.unresolved += 1,
            }
        }
        Ok(summary)
    }

    fn escalate(&mut self) -> Result<()> {
        self.cascades += 1;
        let before = self.active.len();
        warn!(
            "Paradox cascade: {} active conflicts exceed capacity {}",
            before, self.capacity
        );

        let mut drainable: Vec<&Conflict> = self
            .active
            .values()
            .filter(|c| c.criticality < self.critical_criticality)
            .collect();
        drainable.sort_by(|a, b| a.criticality.total_cmp(&b.criticality).then_with(|| a.id.cmp(&b.id)));
        let ids: Vec<ConflictId> = drainable
            .into_iter()
            .take(before.saturating_sub(self.drain_target))
            .map(|c| c.id.clone())
            .collect();
        let drained: Vec<Conflict> = ids.iter().filter_map(|id| self.active.remove(id)).collect();

        let after = self.active.len();
        info!("Cascade drained {} conflicts ({} -> {})", drained.len(), before, after);
        self.pending.push(CascadeReport { before, after, drained });

        if after > self.capacity {
            error!("Cascade unrecoverable: {} conflicts remain above capacity {}", after, self.capacity);
            return Err(Error::CascadeUnrecoverable { active: after, capacity: self.capacity });
        }
        Ok(())
    }

    /// Cascade reports not yet handed to the caller.
    pub fn take_cascades(&mut self) -> Vec<CascadeReport> {
        std::mem::take(&mut self.pending)
    }

    pub fn cached(&self, id: &ConflictId) -> Option<&Resolution> {
        self.cache.get(id)
    }

    pub fn is_active(&self, id: &ConflictId) -> bool {
        self.active.contains_key(id)
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub fn active_conflicts(&self) -> Vec<Conflict> {
        self.active.values().cloned().collect()
    }

    /// Cached resolutions ordered by conflict id.
    pub fn resolutions(&self) -> Vec<Resolution> {
        let mut all: Vec<Resolution> = self.cache.values().cloned().collect();
        all.sort_by(|a, b| a.conflict_id.cmp(&b.conflict_id));
        all
    }

    /// Total strategy evaluations so far. Cache hits do not count.
    pub fn strategy_invocations(&self) -> u64 {
        self.invocations
    }

    pub fn cascade_count(&self) -> u64 {
        self.cascades
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
