// termination.rs - Collective extinction / stasis check

use tracing::{debug, warn};

use crate::comm::Comm;
use crate::error::{CommError, Result};
use crate::evolve::Diagnostics;

pub const DEFAULT_CADENCE: usize = 10;

/// When to run the global check. Off unless asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TerminationPolicy {
    pub enabled: bool,
    /// Check every `cadence` generations, never at generation 0.
    pub cadence: usize,
}

impl Default for TerminationPolicy {
    fn default() -> Self {
        Self { enabled: false, cadence: DEFAULT_CADENCE }
    }
}

impl TerminationPolicy {
    pub fn every(cadence: usize) -> Self {
        Self { enabled: true, cadence }
    }

    pub fn is_due(&self, generation: usize) -> bool {
        self.enabled && self.cadence > 0 && generation != 0 && generation % self.cadence == 0
    }
}

/// Result of a global check. Every rank sees the same verdict.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    /// No live cell anywhere.
    Extinct,
    /// Nothing changed anywhere.
    Stasis,
}

impl Verdict {
    /// Extinction wins when both hold.
    pub fn from_global(any_alive: bool, any_changed: bool) -> Self {
        if !any_alive {
            Verdict::Extinct
        } else if !any_changed {
            Verdict::Stasis
        } else {
            Verdict::Continue
        }
    }
}

/// Reduces this generation's diagnostics across all ranks (logical OR).
pub async fn check(comm: &mut Comm, generation: usize, diag: &Diagnostics) -> Result<Verdict> {
    let local = vec![diag.any_alive() as u8, diag.changed() as u8];
    let global = comm.all_reduce_max(local).await?;
    let &[any_alive, any_changed] = global.as_slice() else {
        return Err(CommError::Protocol(format!("termination reduce returned {} values", global.len())).into());
    };
    let verdict = Verdict::from_global(any_alive != 0, any_changed != 0);
    match verdict {
        Verdict::Continue => debug!(generation, "termination check passed"),
        _ if comm.is_root() => warn!(generation, ?verdict, "run terminated early"),
        _ => {}
    }
    Ok(verdict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::world;

    #[test]
    fn cadence_skips_generation_zero() {
        let policy = TerminationPolicy::every(10);
        let due: Vec<_> = (0..35).filter(|&g| policy.is_due(g)).collect();
        assert_eq!(due, vec![10, 20, 30]);
        assert!(!TerminationPolicy::default().is_due(10));
    }

    #[test]
    fn verdicts() {
        assert_eq!(Verdict::from_global(false, true), Verdict::Extinct);
        assert_eq!(Verdict::from_global(false, false), Verdict::Extinct);
        assert_eq!(Verdict::from_global(true, false), Verdict::Stasis);
        assert_eq!(Verdict::from_global(true, true), Verdict::Continue);
    }

    #[tokio::test]
    async fn one_busy_rank_keeps_everyone_running() {
        let mut handles = Vec::new();
        for mut comm in world(4) {
            handles.push(tokio::spawn(async move {
                let busy = comm.rank() == 3;
                check(&mut comm, 10, &Diagnostics::new(busy, busy)).await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), Verdict::Continue);
        }
    }

    #[tokio::test]
    async fn all_quiet_ranks_agree_on_stasis() {
        let mut handles = Vec::new();
        for mut comm in world(4) {
            handles.push(tokio::spawn(async move {
                check(&mut comm, 20, &Diagnostics::new(true, false)).await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), Verdict::Stasis);
        }
    }
}
