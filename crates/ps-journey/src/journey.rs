//! Journeys and the registry that owns all stages and journeys.

use std::collections::BTreeMap;

use ps_core::{AgentId, JourneyId, StageId};
use tracing::debug;

use crate::stage::{NotifiableQueue, NotifiableWaitingSet, Stage, StageKind, StageSpec};
use crate::{JourneyError, JourneyResult};

// ── Transition ────────────────────────────────────────────────────────────────

/// What happens once an agent completes a stage.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Transition {
    /// Stay on the stage.
    Final,
    Fixed(StageId),
    /// Cycle through the candidates; each is chosen `weight` times per round.
    RoundRobin(Vec<(StageId, u64)>),
    /// The candidate with the fewest agents targeting it; ties pick the
    /// first listed.
    LeastTargeted(Vec<StageId>),
}

impl Transition {
    fn candidates(&self) -> Vec<StageId> {
        match self {
            Transition::Final => Vec::new(),
            Transition::Fixed(s) => vec![*s],
            Transition::RoundRobin(w) => w.iter().map(|(s, _)| *s).collect(),
            Transition::LeastTargeted(c) => c.clone(),
        }
    }
}

// ── JourneyDesc ───────────────────────────────────────────────────────────────

/// Builder-style description of a journey.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JourneyDesc {
    stages:      Vec<StageId>,
    transitions: BTreeMap<StageId, Transition>,
}

impl JourneyDesc {
    pub fn new(stages: impl IntoIterator<Item = StageId>) -> Self {
        Self { stages: stages.into_iter().collect(), transitions: BTreeMap::new() }
    }

    /// A single-stage journey.
    pub fn single(stage: StageId) -> Self {
        Self::new([stage])
    }

    /// Set the rule applied when an agent completes `from`.  Stages without
    /// a rule are final.
    pub fn transition(mut self, from: StageId, transition: Transition) -> Self {
        self.transitions.insert(from, transition);
        self
    }
}

// ── Journey ───────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
struct RoundRobinState {
    /// Stage indices expanded by weight.
    expanded: Vec<StageId>,
    next:     usize,
}

#[derive(Clone, Debug)]
pub struct Journey {
    pub id:      JourneyId,
    stages:      Vec<StageId>,
    transitions: BTreeMap<StageId, Transition>,
    round_robin: BTreeMap<StageId, RoundRobinState>,
}

impl Journey {
    pub fn stages(&self) -> &[StageId] {
        &self.stages
    }

    pub fn contains(&self, stage: StageId) -> bool {
        self.stages.contains(&stage)
    }

    pub fn transition(&self, from: StageId) -> &Transition {
        static FINAL: Transition = Transition::Final;
        self.transitions.get(&from).unwrap_or(&FINAL)
    }
}

// ── JourneyRegistry ───────────────────────────────────────────────────────────

/// Arena of stages and journeys, indexed by their typed IDs.
#[derive(Clone, Debug, Default)]
pub struct JourneyRegistry {
    stages:   Vec<Stage>,
    journeys: Vec<Journey>,
}

impl JourneyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_stage(&mut self, spec: StageSpec) -> JourneyResult<StageId> {
        let id = StageId(self.stages.len() as u32);
        let stage = spec.into_stage(id)?;
        self.stages.push(stage);
        debug!(%id, "stage added");
        Ok(id)
    }

    pub fn add_journey(&mut self, desc: JourneyDesc) -> JourneyResult<JourneyId> {
        if desc.stages.is_empty() {
            return Err(JourneyError::EmptyJourney);
        }
        for &s in &desc.stages {
            self.stage(s)?;
        }
        let id = JourneyId(self.journeys.len() as u32);
        let mut round_robin = BTreeMap::new();
        for (&from, transition) in &desc.transitions {
            if !desc.stages.contains(&from) {
                return Err(JourneyError::StageNotInJourney { stage: from, journey: id });
            }
            let invalid = |reason: &str| JourneyError::InvalidTransition {
                from,
                reason: reason.to_string(),
            };
            match transition {
                Transition::RoundRobin(w) if w.is_empty() => {
                    return Err(invalid("round robin needs a candidate"));
                }
                Transition::RoundRobin(w) if w.iter().any(|&(_, weight)| weight == 0) => {
                    return Err(invalid("round robin weights must be positive"));
                }
                Transition::LeastTargeted(c) if c.is_empty() => {
                    return Err(invalid("least targeted needs a candidate"));
                }
                _ => {}
            }
            for target in transition.candidates() {
                if !desc.stages.contains(&target) {
                    return Err(JourneyError::StageNotInJourney { stage: target, journey: id });
                }
            }
            if let Transition::RoundRobin(w) = transition {
                let expanded = w
                    .iter()
                    .flat_map(|&(s, weight)| std::iter::repeat_n(s, weight as usize))
                    .collect();
                round_robin.insert(from, RoundRobinState { expanded, next: 0 });
            }
        }
        self.journeys.push(Journey {
            id,
            stages: desc.stages,
            transitions: desc.transitions,
            round_robin,
        });
        debug!(%id, "journey added");
        Ok(id)
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn journeys(&self) -> &[Journey] {
        &self.journeys
    }

    pub fn stage(&self, id: StageId) -> JourneyResult<&Stage> {
        self.stages.get(id.index()).ok_or(JourneyError::UnknownStage(id))
    }

    pub fn stage_mut(&mut self, id: StageId) -> JourneyResult<&mut Stage> {
        self.stages.get_mut(id.index()).ok_or(JourneyError::UnknownStage(id))
    }

    pub fn journey(&self, id: JourneyId) -> JourneyResult<&Journey> {
        self.journeys.get(id.index()).ok_or(JourneyError::UnknownJourney(id))
    }

    /// Check that `stage` belongs to `journey`.
    pub fn validate_entry(&self, journey: JourneyId, stage: StageId) -> JourneyResult<()> {
        self.stage(stage)?;
        if self.journey(journey)?.contains(stage) {
            Ok(())
        } else {
            Err(JourneyError::StageNotInJourney { stage, journey })
        }
    }

    pub fn waiting_set_mut(&mut self, id: StageId) -> JourneyResult<&mut NotifiableWaitingSet> {
        match &mut self.stage_mut(id)?.kind {
            StageKind::WaitingSet(set) => Ok(set),
            _ => Err(JourneyError::NotAWaitingSet(id)),
        }
    }

    pub fn queue_mut(&mut self, id: StageId) -> JourneyResult<&mut NotifiableQueue> {
        match &mut self.stage_mut(id)?.kind {
            StageKind::Queue(queue) => Ok(queue),
            _ => Err(JourneyError::NotAQueue(id)),
        }
    }

    /// Count one more agent as targeting `stage`.
    pub fn enter(&mut self, stage: StageId) -> JourneyResult<()> {
        self.stage_mut(stage)?.enter();
        Ok(())
    }

    /// Remove `agent` from `stage`'s bookkeeping.
    pub fn leave(&mut self, agent: AgentId, stage: StageId) -> JourneyResult<()> {
        self.stage_mut(stage)?.leave(agent);
        Ok(())
    }

    /// Stage that follows `current` in `journey`, or `None` if `current` is
    /// final.  Advances the round-robin position when one is consulted.
    pub fn next_stage(
        &mut self,
        journey: JourneyId,
        current: StageId,
    ) -> JourneyResult<Option<StageId>> {
        let idx = journey.index();
        let j = self.journeys.get_mut(idx).ok_or(JourneyError::UnknownJourney(journey))?;
        if !j.contains(current) {
            return Err(JourneyError::StageNotInJourney { stage: current, journey });
        }
        let next = match j.transitions.get(&current) {
            None | Some(Transition::Final) => None,
            Some(Transition::Fixed(s)) => Some(*s),
            Some(Transition::RoundRobin(_)) => j.round_robin.get_mut(&current).map(|rr| {
                let s = rr.expanded[rr.next % rr.expanded.len()];
                rr.next = (rr.next + 1) % rr.expanded.len();
                s
            }),
            Some(Transition::LeastTargeted(candidates)) => {
                let mut best: Option<(StageId, usize)> = None;
                for &c in candidates {
                    let count = self.stages.get(c.index()).map_or(usize::MAX, Stage::targeting);
                    match best {
                        Some((_, b)) if count >= b => {}
                        _ => best = Some((c, count)),
                    }
                }
                best.map(|(s, _)| s)
            }
        };
        Ok(next)
    }

    /// Move `agent` from `current` to the stage its journey prescribes.
    /// Returns the new stage, or `None` when `current` is final.
    pub fn advance(
        &mut self,
        agent: AgentId,
        journey: JourneyId,
        current: StageId,
    ) -> JourneyResult<Option<StageId>> {
        let Some(next) = self.next_stage(journey, current)? else {
            return Ok(None);
        };
        self.leave(agent, current)?;
        self.enter(next)?;
        Ok(Some(next))
    }
}
