//! Door state machine and flow regulation.
//!
//! # States
//!
//! ```text
//!            flow above cap / usage at cap
//!   OPEN ───────────────────────────────────▶ TEMP_CLOSE
//!    ▲  ◀───────────────────────────────────     │
//!    │   countdown elapsed AND usage below cap   │
//!    │                                           │
//!    └──────────── command only ──────────▶ CLOSE ◀┘
//! ```
//!
//! `CLOSE` is only ever entered or left by an explicit command; automatic
//! regulation never touches a closed door.
//!
//! # Reopen policy
//!
//! A temporarily closed door reopens when *both* conditions hold:
//!
//! - the closing countdown has reached zero (vacuously true without an
//!   outflow cap), and
//! - the temporary usage is below the max-usage cap (vacuously true without
//!   one).
//!
//! A door closed because it reached its max usage therefore stays closed
//! until [`DoorFlow::reset_usage`] is called.

/// Countdown values at or below this are treated as elapsed.
const COUNTDOWN_EPS: f64 = 1e-9;

/// Traversability of a door.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DoorState {
    #[default]
    Open,
    /// Closed by command; never reopens on its own.
    Close,
    /// Closed by flow regulation.
    TempClose,
}

impl DoorState {
    #[inline]
    pub fn is_open(self) -> bool {
        self == DoorState::Open
    }
}

/// Regulation parameters of one door.  `None` means "no cap".
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DoorLimits {
    /// Maximum sustained outflow, agents per second.
    pub outflow_rate: Option<f64>,
    /// Agents allowed through before the door closes temporarily.
    pub max_usage:    Option<u64>,
    /// Passages between two flow evaluations.
    pub dn:           u64,
}

impl Default for DoorLimits {
    fn default() -> Self {
        Self { outflow_rate: None, max_usage: None, dn: 10 }
    }
}

impl DoorLimits {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_outflow_rate(mut self, rate: f64) -> Self {
        self.outflow_rate = Some(rate);
        self
    }

    pub fn with_max_usage(mut self, max: u64) -> Self {
        self.max_usage = Some(max);
        self
    }

    pub fn with_dn(mut self, dn: u64) -> Self {
        self.dn = dn.max(1);
        self
    }
}

/// One point of a door's flow curve: cumulative usage at `time`.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlowSample {
    pub time:  f64,
    pub usage: u64,
}

/// Usage counters and regulation state of a door.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DoorFlow {
    state:                 DoorState,
    limits:                DoorLimits,
    /// Cumulative passages.  Never decreases.
    usage:                 u64,
    /// Passages counted toward `max_usage`; reset by command.
    temp_usage:            u64,
    /// Passages since the last flow evaluation.
    partial_usage:         u64,
    closing_time:          f64,
    last_flow_measurement: f64,
    last_passing_time:     f64,
    flow_curve:            Vec<FlowSample>,
}

impl DoorFlow {
    pub fn new(limits: DoorLimits) -> Self {
        Self {
            state: DoorState::Open,
            limits,
            usage: 0,
            temp_usage: 0,
            partial_usage: 0,
            closing_time: 0.0,
            last_flow_measurement: 0.0,
            last_passing_time: 0.0,
            flow_curve: Vec::new(),
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    #[inline]
    pub fn state(&self) -> DoorState {
        self.state
    }

    #[inline]
    pub fn limits(&self) -> &DoorLimits {
        &self.limits
    }

    #[inline]
    pub fn usage(&self) -> u64 {
        self.usage
    }

    #[inline]
    pub fn temp_usage(&self) -> u64 {
        self.temp_usage
    }

    #[inline]
    pub fn partial_usage(&self) -> u64 {
        self.partial_usage
    }

    /// Remaining closing countdown in seconds.
    #[inline]
    pub fn closing_time(&self) -> f64 {
        self.closing_time
    }

    #[inline]
    pub fn last_passing_time(&self) -> f64 {
        self.last_passing_time
    }

    #[inline]
    pub fn flow_curve(&self) -> &[FlowSample] {
        &self.flow_curve
    }

    #[inline]
    pub fn is_regulated(&self) -> bool {
        self.limits.outflow_rate.is_some() || self.limits.max_usage.is_some()
    }

    // ── Usage ─────────────────────────────────────────────────────────────

    /// Record `n` passages at `time`.
    pub fn increase_usage(&mut self, n: u64, time: f64) {
        self.usage += n;
        self.temp_usage += n;
        self.partial_usage += n;
        self.last_passing_time = time;
        self.flow_curve.push(FlowSample { time, usage: self.usage });
    }

    /// `true` once enough passages accumulated for a flow evaluation.
    #[inline]
    pub fn evaluation_due(&self) -> bool {
        self.is_regulated() && self.partial_usage >= self.limits.dn
    }

    #[inline]
    pub fn reset_partial_usage(&mut self) {
        self.partial_usage = 0;
    }

    /// Clear the usage counted toward `max_usage`.  A door held closed only
    /// by its usage cap reopens immediately.
    pub fn reset_usage(&mut self) {
        self.temp_usage = 0;
        if self.state == DoorState::TempClose && self.closing_time <= COUNTDOWN_EPS {
            self.state = DoorState::Open;
        }
    }

    // ── Regulation ────────────────────────────────────────────────────────

    /// Evaluate the flow since the last measurement and close the door
    /// temporarily if it exceeds a cap.  Returns `true` if the door closed.
    pub fn regulate_flow(&mut self, time: f64) -> bool {
        if self.state == DoorState::Close {
            return false;
        }
        let number = self.partial_usage as f64;
        let elapsed = time - self.last_flow_measurement;
        let flow = if elapsed > COUNTDOWN_EPS { number / elapsed } else { f64::INFINITY };

        let was_open = self.state.is_open();
        if let Some(rate) = self.limits.outflow_rate {
            if flow > rate {
                self.closing_time = (number / rate - elapsed).max(0.0);
                self.state = DoorState::TempClose;
            }
        }
        if let Some(max) = self.limits.max_usage {
            if self.temp_usage >= max {
                self.state = DoorState::TempClose;
            }
        }
        self.last_flow_measurement = time + self.closing_time;
        was_open && self.state == DoorState::TempClose
    }

    /// Advance the closing countdown by `dt` and reopen once the reopen
    /// conditions hold.  Returns `true` if the door reopened.
    pub fn update_temporary_state(&mut self, dt: f64) -> bool {
        if self.state != DoorState::TempClose {
            return false;
        }
        let countdown_elapsed = match self.limits.outflow_rate {
            Some(_) => {
                self.closing_time = (self.closing_time - dt).max(0.0);
                self.closing_time <= COUNTDOWN_EPS
            }
            None => true,
        };
        let below_cap = self.limits.max_usage.is_none_or(|max| self.temp_usage < max);
        if countdown_elapsed && below_cap {
            self.closing_time = 0.0;
            self.state = DoorState::Open;
            true
        } else {
            false
        }
    }

    // ── Commands ──────────────────────────────────────────────────────────

    /// Force the door into `state`.  Opening clears any pending countdown.
    pub fn set_state(&mut self, state: DoorState) {
        if state == DoorState::Open {
            self.closing_time = 0.0;
        }
        self.state = state;
    }
}
