//! Tick stages and the clock that gates stage-sensitive operations.
//!
//! Every tick walks the stages in declaration order. Operations that are only
//! legal in some stages call [`TickClock::check`]; a mismatch means the
//! scheduler is broken somewhere else, so it panics instead of returning an
//! error.

use std::fmt;
use std::ops::{BitOr, Not};
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TickStage {
    Simulation = 0,
    Lighting = 1,
    PreSnapshot = 2,
    Snapshot = 3,
    Finalize = 4,
}

impl TickStage {
    pub const ALL: [TickStage; 5] = [
        TickStage::Simulation,
        TickStage::Lighting,
        TickStage::PreSnapshot,
        TickStage::Snapshot,
        TickStage::Finalize,
    ];

    #[inline]
    pub const fn mask(self) -> StageMask {
        StageMask(1 << self as u8)
    }

    /// Stage that follows this one; `Finalize` wraps to the next tick.
    #[inline]
    pub fn next(self) -> TickStage {
        Self::ALL[(self as usize + 1) % Self::ALL.len()]
    }

    #[inline]
    fn from_u8(v: u8) -> TickStage {
        Self::ALL[v as usize]
    }

    pub fn name(self) -> &'static str {
        match self {
            TickStage::Simulation => "simulation",
            TickStage::Lighting => "lighting",
            TickStage::PreSnapshot => "pre-snapshot",
            TickStage::Snapshot => "snapshot",
            TickStage::Finalize => "finalize",
        }
    }
}

impl fmt::Display for TickStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Set of stages an operation may run in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct StageMask(u8);

impl StageMask {
    pub const SIMULATION: StageMask = TickStage::Simulation.mask();
    pub const LIGHTING: StageMask = TickStage::Lighting.mask();
    pub const PRESNAPSHOT: StageMask = TickStage::PreSnapshot.mask();
    pub const SNAPSHOT: StageMask = TickStage::Snapshot.mask();
    pub const FINALIZE: StageMask = TickStage::Finalize.mask();
    pub const ALL: StageMask = StageMask(0b1_1111);

    #[inline]
    pub const fn contains(self, stage: TickStage) -> bool {
        self.0 & stage.mask().0 != 0
    }
}

impl BitOr for StageMask {
    type Output = StageMask;

    fn bitor(self, rhs: StageMask) -> StageMask {
        StageMask(self.0 | rhs.0)
    }
}

impl Not for StageMask {
    type Output = StageMask;

    fn not(self) -> StageMask {
        StageMask(!self.0 & Self::ALL.0)
    }
}

impl fmt::Display for StageMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for stage in TickStage::ALL {
            if self.contains(stage) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(stage.name())?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Current stage of one world's tick, shared by the scheduler and every
/// column of that world.
#[derive(Debug)]
pub struct TickClock {
    stage: AtomicU8,
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new(TickStage::Simulation)
    }
}

impl TickClock {
    pub fn new(stage: TickStage) -> Self {
        Self {
            stage: AtomicU8::new(stage as u8),
        }
    }

    #[inline]
    pub fn current(&self) -> TickStage {
        TickStage::from_u8(self.stage.load(Ordering::Acquire))
    }

    pub fn set(&self, stage: TickStage) {
        self.stage.store(stage as u8, Ordering::Release);
    }

    /// Moves to the next stage and returns it.
    pub fn advance(&self) -> TickStage {
        let next = self.current().next();
        self.set(next);
        next
    }

    /// Panics unless the current stage is in `allowed`.
    #[inline]
    #[track_caller]
    pub fn check(&self, allowed: StageMask, op: &str) {
        let current = self.current();
        assert!(
            allowed.contains(current),
            "{op} called during {current} stage, allowed: {allowed}"
        );
    }
}
