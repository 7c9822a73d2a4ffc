//! Agent sources: periodic emitters of new agents.

use std::collections::VecDeque;

use ps_agent::{AgentParams, AgentSpec};
use ps_core::{AgentRng, Iteration, JourneyId, Point, SourceId, StageId};

use crate::{JourneyError, JourneyResult};

/// Static description of a source.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceSpec {
    pub journey:    JourneyId,
    pub stage:      StageId,
    /// Spawn positions, used in order and then cyclically.
    pub positions:  Vec<Point>,
    pub params:     AgentParams,
    /// Emit every `frequency` iterations (at least 1).
    pub frequency:  u64,
    /// Agents per emission.
    pub chunk:      usize,
    /// Total agents this source will ever create.
    pub max_agents: usize,
    pub start:      Iteration,
    /// Desired speed sampled uniformly per agent, if set.
    pub v0_range:   Option<(f64, f64)>,
}

impl SourceSpec {
    pub fn new(journey: JourneyId, stage: StageId, positions: Vec<Point>) -> Self {
        Self {
            journey,
            stage,
            positions,
            params: AgentParams::default(),
            frequency: 1,
            chunk: 1,
            max_agents: usize::MAX,
            start: Iteration::ZERO,
            v0_range: None,
        }
    }

    pub fn frequency(mut self, every: u64) -> Self {
        self.frequency = every;
        self
    }

    pub fn chunk(mut self, n: usize) -> Self {
        self.chunk = n;
        self
    }

    pub fn max_agents(mut self, n: usize) -> Self {
        self.max_agents = n;
        self
    }

    pub fn starting_at(mut self, start: Iteration) -> Self {
        self.start = start;
        self
    }

    pub fn v0_range(mut self, lo: f64, hi: f64) -> Self {
        self.v0_range = Some((lo, hi));
        self
    }

    pub fn with_params(mut self, params: AgentParams) -> Self {
        self.params = params;
        self
    }
}

/// A running source.
///
/// Specs that could not be placed (e.g. the spot was occupied) are handed
/// back with [`AgentSource::give_back`] and re-emitted first on the next due
/// iteration.  Pooled specs already count toward `max_agents`, so the pool
/// never grows past the cap.
#[derive(Clone, Debug)]
pub struct AgentSource {
    pub id:    SourceId,
    spec:      SourceSpec,
    generated: usize,
    pool:      VecDeque<AgentSpec>,
    seed:      u64,
}

impl AgentSource {
    pub fn new(id: SourceId, spec: SourceSpec, seed: u64) -> JourneyResult<Self> {
        if spec.positions.is_empty() {
            return Err(JourneyError::InvalidSource("no spawn positions".into()));
        }
        if spec.frequency == 0 || spec.chunk == 0 {
            return Err(JourneyError::InvalidSource(
                "frequency and chunk must be positive".into(),
            ));
        }
        if let Some((lo, hi)) = spec.v0_range {
            if !(lo > 0.0 && lo <= hi) {
                return Err(JourneyError::InvalidSource(format!(
                    "invalid desired-speed range [{lo}, {hi}]"
                )));
            }
        }
        Ok(Self { id, spec, generated: 0, pool: VecDeque::new(), seed })
    }

    pub fn spec(&self) -> &SourceSpec {
        &self.spec
    }

    /// Agents created so far, including pooled ones.
    pub fn generated(&self) -> usize {
        self.generated
    }

    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.generated >= self.spec.max_agents && self.pool.is_empty()
    }

    pub fn is_due(&self, now: Iteration) -> bool {
        now.0 >= self.spec.start.0 && (now.0 - self.spec.start.0) % self.spec.frequency == 0
    }

    /// Specs to place at `now`: pooled leftovers, then up to `chunk` new ones
    /// within the cap.  Empty when not due.
    pub fn emit(&mut self, now: Iteration) -> Vec<AgentSpec> {
        if !self.is_due(now) {
            return Vec::new();
        }
        let mut out: Vec<AgentSpec> = self.pool.drain(..).collect();
        let fresh = self.spec.chunk.min(self.spec.max_agents.saturating_sub(self.generated));
        for _ in 0..fresh {
            out.push(self.make_spec(self.generated));
            self.generated += 1;
        }
        out
    }

    pub fn give_back(&mut self, specs: impl IntoIterator<Item = AgentSpec>) {
        self.pool.extend(specs);
    }

    fn make_spec(&self, n: usize) -> AgentSpec {
        let position = self.spec.positions[n % self.spec.positions.len()];
        let mut params = self.spec.params;
        if let Some((lo, hi)) = self.spec.v0_range {
            // One stream per ordinal so placement order never changes the
            // sampled values.
            let mut rng = AgentRng::keyed(self.seed, n as u64);
            let v0 = if hi > lo { rng.gen_range(lo..=hi) } else { lo };
            params.speed = params.speed.scaled_to(v0);
        }
        AgentSpec::new(position, self.spec.journey, self.spec.stage).with_params(params)
    }
}
