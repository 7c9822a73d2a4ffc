//! Fluent builder for constructing a [`Sim`].

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use ps_agent::AgentStore;
use ps_core::{SimConfig, SimRng};
use ps_geometry::Building;
use ps_journey::{JourneyRegistry, SourceSpec};
use ps_model::{ModelConfig, OperationalModel};
use ps_routing::{build_router, RouterKind};
use ps_spatial::{NeighborhoodSearch, WallIndex};
use tracing::info;

use crate::event::SimStats;
use crate::schedule::DoorSchedule;
use crate::{Sim, SimResult};

/// Fluent builder for [`Sim`].
///
/// # Required inputs
///
/// - [`SimConfig`]: step length, stop conditions, seed, grid cell size, …
/// - [`Building`]: from [`ps_geometry::BuildingBuilder`]
///
/// # Optional inputs (have defaults)
///
/// | Method             | Default                                    |
/// |--------------------|--------------------------------------------|
/// | `.model(m)`        | `ModelConfig::default()` (CFSM)            |
/// | `.custom_model(m)` | None; when set, replaces `.model`          |
/// | `.router(k)`       | `RouterKind::default()` (navigation graph) |
/// | `.journeys(j)`     | Empty registry; add stages before agents   |
/// | `.source(s)`       | No sources                                 |
///
/// # Example
///
/// ```rust,ignore
/// let mut journeys = JourneyRegistry::new();
/// let exit = journeys.add_stage(StageSpec::Exit { polygon })?;
/// let journey = journeys.add_journey(JourneyDesc::single(exit))?;
///
/// let mut sim = SimBuilder::new(config, building)
///     .model(ModelConfig::Gcfm(GcfmParams::default()))
///     .journeys(journeys)
///     .source(SourceSpec::new(journey, exit, spawn_points).max_agents(100))
///     .build()?;
/// sim.run(&mut NoopObserver)?;
/// ```
pub struct SimBuilder {
    config:   SimConfig,
    building: Building,
    model:    ModelConfig,
    custom:   Option<Box<dyn OperationalModel>>,
    router:   RouterKind,
    journeys: JourneyRegistry,
    sources:  Vec<SourceSpec>,
}

impl SimBuilder {
    pub fn new(config: SimConfig, building: Building) -> Self {
        Self {
            config,
            building,
            model:    ModelConfig::default(),
            custom:   None,
            router:   RouterKind::default(),
            journeys: JourneyRegistry::new(),
            sources:  Vec::new(),
        }
    }

    pub fn model(mut self, model: ModelConfig) -> Self {
        self.model = model;
        self
    }

    /// Use a model implemented outside this workspace.
    pub fn custom_model(mut self, model: Box<dyn OperationalModel>) -> Self {
        self.custom = Some(model);
        self
    }

    pub fn router(mut self, router: RouterKind) -> Self {
        self.router = router;
        self
    }

    /// Stages and journeys agents may follow.  Exit stages are registered
    /// with the router during [`build`](Self::build).
    pub fn journeys(mut self, journeys: JourneyRegistry) -> Self {
        self.journeys = journeys;
        self
    }

    /// Add an agent source.  May be called repeatedly.
    pub fn source(mut self, spec: SourceSpec) -> Self {
        self.sources.push(spec);
        self
    }

    /// Validate inputs, build the model, router, and spatial indices, and
    /// return a ready-to-run [`Sim`].
    pub fn build(self) -> SimResult<Sim> {
        self.config.validate()?;

        let model = match self.custom {
            Some(model) => model,
            None => self.model.build()?,
        };
        let mut router = build_router(self.router, &self.building)?;
        for stage in self.journeys.stages() {
            if let Some(area) = stage.exit_polygon() {
                router.register_stage(&self.building, stage.id, area)?;
            }
        }

        #[cfg(feature = "parallel")]
        let pool = match self.config.num_threads {
            Some(n) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| crate::SimError::Config(e.to_string()))?,
            ),
            None => None,
        };

        let walls = WallIndex::new(self.building.walls().copied());
        let grid = NeighborhoodSearch::new(self.config.cell_size);
        info!(
            subrooms = self.building.subrooms().len(),
            walls = walls.len(),
            stages = self.journeys.stages().len(),
            sources = self.sources.len(),
            "simulation built"
        );

        let mut sim = Sim {
            clock: self.config.make_clock(),
            rng: SimRng::new(self.config.seed),
            config: self.config,
            building: self.building,
            walls,
            grid,
            agents: AgentStore::new(),
            journeys: self.journeys,
            sources: Vec::new(),
            router,
            model,
            schedule: DoorSchedule::new(),
            pending: Vec::new(),
            events: Vec::new(),
            stats: SimStats::default(),
            shutdown: Arc::new(AtomicBool::new(false)),
            #[cfg(feature = "parallel")]
            pool,
        };
        for spec in self.sources {
            sim.add_source(spec)?;
        }
        Ok(sim)
    }
}
