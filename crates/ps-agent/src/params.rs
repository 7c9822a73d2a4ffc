//! Per-agent physical parameters.

/// Velocity-dependent ellipse used by the force-based model.
///
/// The semi-axis `a` lies along the direction of motion and grows with
/// speed; `b` is lateral and shrinks from `b_max` (standing) to `b_min`
/// (walking at desired speed).
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EllipseShape {
    pub a_min: f64,
    pub a_v:   f64,
    pub b_min: f64,
    pub b_max: f64,
}

impl Default for EllipseShape {
    fn default() -> Self {
        Self { a_min: 0.18, a_v: 0.53, b_min: 0.20, b_max: 0.25 }
    }
}

impl EllipseShape {
    /// Semi-axis along the direction of motion.
    #[inline]
    pub fn semi_axis_a(&self, speed: f64) -> f64 {
        self.a_min + self.a_v * speed
    }

    /// Lateral semi-axis.  Clamped to `[b_min, b_max]`.
    #[inline]
    pub fn semi_axis_b(&self, speed: f64, v0: f64) -> f64 {
        if v0 <= 1e-3 {
            return self.b_max;
        }
        (self.b_max - (self.b_max - self.b_min) * speed / v0).clamp(self.b_min, self.b_max)
    }
}

/// Which desired speed applies on the current walking surface.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpeedClass {
    #[default]
    Floor,
    Upstairs,
    Downstairs,
    EscalatorUp,
    EscalatorDown,
}

/// Desired speeds (m/s) by walking surface.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpeedProfile {
    pub v0:                f64,
    pub v0_upstairs:       f64,
    pub v0_downstairs:     f64,
    pub v0_escalator_up:   f64,
    pub v0_escalator_down: f64,
    /// Time constant (s) of the exponential blend after changing surface.
    pub smoothing:         f64,
}

impl Default for SpeedProfile {
    fn default() -> Self {
        Self {
            v0:                1.2,
            v0_upstairs:       0.6,
            v0_downstairs:     0.8,
            v0_escalator_up:   0.8,
            v0_escalator_down: 0.8,
            smoothing:         0.15,
        }
    }
}

impl SpeedProfile {
    /// Same desired speed on every surface.
    pub fn uniform(v0: f64) -> Self {
        Self {
            v0,
            v0_upstairs: v0,
            v0_downstairs: v0,
            v0_escalator_up: v0,
            v0_escalator_down: v0,
            ..Self::default()
        }
    }

    /// Rescale every surface speed so that the floor speed becomes `v0`.
    pub fn scaled_to(&self, v0: f64) -> Self {
        if self.v0 <= 0.0 {
            return Self::uniform(v0);
        }
        let k = v0 / self.v0;
        Self {
            v0,
            v0_upstairs: self.v0_upstairs * k,
            v0_downstairs: self.v0_downstairs * k,
            v0_escalator_up: self.v0_escalator_up * k,
            v0_escalator_down: self.v0_escalator_down * k,
            smoothing: self.smoothing,
        }
    }

    #[inline]
    pub fn for_class(&self, class: SpeedClass) -> f64 {
        match class {
            SpeedClass::Floor => self.v0,
            SpeedClass::Upstairs => self.v0_upstairs,
            SpeedClass::Downstairs => self.v0_downstairs,
            SpeedClass::EscalatorUp => self.v0_escalator_up,
            SpeedClass::EscalatorDown => self.v0_escalator_down,
        }
    }
}

/// Everything that parameterises one agent's motion.
///
/// `shape`, `mass` and `tau` are used by the force-based model; `radius` and
/// `time_gap` by the collision-free speed model.  Both read `speed`.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AgentParams {
    pub shape:    EllipseShape,
    pub speed:    SpeedProfile,
    /// kg
    pub mass:     f64,
    /// Relaxation time (s) of the driving force.
    pub tau:      f64,
    /// Disc radius (m).
    pub radius:   f64,
    /// Time gap (s) kept to the agent ahead.
    pub time_gap: f64,
}

impl Default for AgentParams {
    fn default() -> Self {
        Self {
            shape:    EllipseShape::default(),
            speed:    SpeedProfile::default(),
            mass:     1.0,
            tau:      0.5,
            radius:   0.2,
            time_gap: 1.0,
        }
    }
}
