//! Dense agent storage with stable IDs.
//!
//! Agents live contiguously in a `Vec<Agent>` in insertion order, so the hot
//! per-iteration loops (grid rebuild, routing, operational step) are linear
//! scans.  An `AgentId → slot` map provides O(1) lookup by ID.  Removal
//! keeps the remaining agents in insertion order, which keeps iteration order
//! (and therefore every sequential phase) deterministic.

use rustc_hash::FxHashMap;

use ps_core::{AgentId, Point};

use crate::Agent;

/// All live agents.
#[derive(Clone, Debug)]
pub struct AgentStore {
    agents:  Vec<Agent>,
    index:   FxHashMap<AgentId, usize>,
    next_id: u64,
}

impl Default for AgentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentStore {
    pub fn new() -> Self {
        Self { agents: Vec::new(), index: FxHashMap::default(), next_id: 1 }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// The ID the next insertion will receive.
    #[inline]
    pub fn peek_next_id(&self) -> AgentId {
        AgentId(self.next_id)
    }

    /// Issue a fresh ID and store the agent built from it.
    pub fn insert_with(&mut self, make: impl FnOnce(AgentId) -> Agent) -> AgentId {
        let id = AgentId(self.next_id);
        self.next_id += 1;
        let mut agent = make(id);
        agent.id = id;
        self.index.insert(id, self.agents.len());
        self.agents.push(agent);
        id
    }

    #[inline]
    pub fn contains(&self, id: AgentId) -> bool {
        self.index.contains_key(&id)
    }

    #[inline]
    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.index.get(&id).map(|&i| &self.agents[i])
    }

    #[inline]
    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        match self.index.get(&id) {
            Some(&i) => Some(&mut self.agents[i]),
            None => None,
        }
    }

    /// Slot of `id` in [`as_slice`](Self::as_slice).
    #[inline]
    pub fn slot(&self, id: AgentId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Remove one agent.  Its ID is never issued again.
    pub fn remove(&mut self, id: AgentId) -> Option<Agent> {
        let slot = self.index.remove(&id)?;
        let agent = self.agents.remove(slot);
        self.reindex_from(slot);
        Some(agent)
    }

    /// Remove every agent in `ids` (unknown IDs are ignored) in one pass.
    /// Returns the removed agents in storage order.
    pub fn remove_many(&mut self, ids: &[AgentId]) -> Vec<Agent> {
        if ids.is_empty() {
            return Vec::new();
        }
        let doomed: rustc_hash::FxHashSet<AgentId> = ids.iter().copied().collect();
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.agents.len());
        for agent in self.agents.drain(..) {
            if doomed.contains(&agent.id) {
                removed.push(agent);
            } else {
                kept.push(agent);
            }
        }
        self.agents = kept;
        for a in &removed {
            self.index.remove(&a.id);
        }
        self.reindex_from(0);
        removed
    }

    fn reindex_from(&mut self, start: usize) {
        for (i, a) in self.agents.iter().enumerate().skip(start) {
            self.index.insert(a.id, i);
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[Agent] {
        &self.agents
    }

    /// Mutable view for in-place commits.  IDs must not be changed through it.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [Agent] {
        &mut self.agents
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Agent> {
        self.agents.iter()
    }

    #[inline]
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Agent> {
        self.agents.iter_mut()
    }

    pub fn ids(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.agents.iter().map(|a| a.id)
    }

    /// `(id, position)` pairs, the input format of the neighbourhood grid.
    pub fn positions(&self) -> impl Iterator<Item = (AgentId, Point)> + '_ {
        self.agents.iter().map(|a| (a.id, a.pos))
    }
}
