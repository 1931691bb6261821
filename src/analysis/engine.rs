//! Forward fixpoint engine over CHIR basic blocks.
//!
//! The engine owns the worklist iteration; what the analysis actually
//! computes is supplied through [`TransferFunctions`]. A run proceeds in two
//! phases:
//!
//! 1. **Fixpoint phase**: blocks are pulled from a FIFO worklist, the
//!    in-state is cloned and pushed through every expression in order, and
//!    the resulting out-state is joined into each chosen successor. A
//!    successor whose in-state changed is requeued. The terminator hook may
//!    narrow the successor set when the branch condition is abstractly known,
//!    so provably dead edges never pollute the join.
//! 2. **Stable phase**: after convergence, every reachable block is replayed
//!    once with `is_stable = true`. Transfer functions defer all diagnostics
//!    to this phase, which guarantees each finding is reported exactly once
//!    and only from states that survived the fixpoint.
//!
//! Blocks revisited more than [`MAX_BLOCK_VISITS`] times switch from the
//! plain join to the widening join, which bounds iteration on domains with
//! tall lattices such as integer ranges.

use std::collections::{HashMap, VecDeque};

use crate::analysis::domain::{AbstractDomain, DomainPayload};
use crate::analysis::pool::StatePool;
use crate::analysis::state::State;
use crate::chir::{Expression, Func, Terminator};
use crate::{Error, Result};

/// Functions above this block count use the bounded state pool.
pub const USE_ACTIVE_BLOCK_SIZE: usize = 300;

/// Functions above this block count are not analyzed at all.
pub const OVERHEAD_BLOCK_SIZE: usize = 1000;

/// Join count per block before the engine starts widening.
pub const MAX_BLOCK_VISITS: u32 = 16;

/// The analysis half of a fixpoint run.
///
/// Implementations mutate the state expression by expression and may narrow
/// the successor set at terminators. Diagnostics must only be emitted when
/// `is_stable` is true.
pub trait TransferFunctions<P: DomainPayload, S: StatePool<AbstractDomain<P>>> {
    /// Seeds the entry block's in-state. The default starts from the empty
    /// state, where every value reads as Top.
    fn initial_state(&mut self, func: &Func) -> State<P, S> {
        let _ = func;
        State::new()
    }

    /// Applies one expression to `state`.
    fn transfer_expr(&mut self, state: &mut State<P, S>, expr: &Expression, is_stable: bool);

    /// Chooses the successors the out-state flows to.
    ///
    /// The default takes every CFG successor; analyses that can evaluate the
    /// branch condition return the surviving subset instead.
    fn transfer_terminator(
        &mut self,
        state: &State<P, S>,
        terminator: &Terminator,
        is_stable: bool,
    ) -> Vec<usize> {
        let _ = (state, is_stable);
        terminator.successors()
    }

    /// Produces the state that flows along the edge to `succ`.
    ///
    /// The default clones the out-state unchanged. Analyses that understand
    /// the branch condition refine operand values on the taken side here.
    fn transfer_edge(
        &mut self,
        state: &State<P, S>,
        terminator: &Terminator,
        succ: usize,
    ) -> State<P, S> {
        let _ = (terminator, succ);
        state.clone()
    }
}

/// Converged per-block in-states. Blocks never reached are absent.
#[derive(Debug, Clone, Default)]
pub struct EngineResults<P: DomainPayload, S: StatePool<AbstractDomain<P>>> {
    in_states: HashMap<usize, State<P, S>>,
}

impl<P: DomainPayload, S: StatePool<AbstractDomain<P>>> EngineResults<P, S> {
    /// In-state of `block`, when the block is reachable.
    #[must_use]
    pub fn in_state(&self, block: usize) -> Option<&State<P, S>> {
        self.in_states.get(&block)
    }

    /// Returns `true` if the fixpoint ever reached `block`.
    #[must_use]
    pub fn is_reachable(&self, block: usize) -> bool {
        self.in_states.contains_key(&block)
    }

    /// Number of reachable blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.in_states.len()
    }

    /// Returns `true` when nothing was reached (never happens for a valid
    /// function).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.in_states.is_empty()
    }

    /// Iterates over reachable blocks and their in-states.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &State<P, S>)> {
        self.in_states.iter().map(|(b, s)| (*b, s))
    }
}

/// Runs `transfer` to a fixpoint over `func` and replays the stable pass.
pub fn analyze<P, S, T>(func: &Func, transfer: &mut T) -> Result<EngineResults<P, S>>
where
    P: DomainPayload,
    S: StatePool<AbstractDomain<P>>,
    T: TransferFunctions<P, S>,
{
    func.validate()?;

    let mut in_states: HashMap<usize, State<P, S>> = HashMap::new();
    let mut visits: HashMap<usize, u32> = HashMap::new();
    let mut worklist: VecDeque<usize> = VecDeque::new();
    let mut queued: Vec<bool> = vec![false; func.block_count()];

    in_states.insert(func.entry(), transfer.initial_state(func));
    worklist.push_back(func.entry());
    queued[func.entry()] = true;

    while let Some(block_id) = worklist.pop_front() {
        queued[block_id] = false;
        let block = func.block(block_id).ok_or(Error::InvalidBlock {
            block: block_id,
            count: func.block_count(),
        })?;

        let mut state = in_states
            .get(&block_id)
            .cloned()
            .unwrap_or_else(State::new);
        for expr in block.expressions() {
            transfer.transfer_expr(&mut state, expr, false);
        }

        for succ in transfer.transfer_terminator(&state, block.terminator(), false) {
            let edge = transfer.transfer_edge(&state, block.terminator(), succ);
            let changed = match in_states.get_mut(&succ) {
                Some(existing) => {
                    let count = visits.entry(succ).or_insert(0);
                    *count += 1;
                    if *count > MAX_BLOCK_VISITS {
                        existing.widen_join(&edge)
                    } else {
                        existing.join(&edge)
                    }
                }
                None => {
                    in_states.insert(succ, edge);
                    true
                }
            };
            if changed && !queued[succ] {
                queued[succ] = true;
                worklist.push_back(succ);
            }
        }
    }

    // Stable pass: replay reachable blocks so diagnostics fire exactly once.
    let mut reachable: Vec<usize> = in_states.keys().copied().collect();
    reachable.sort_unstable();
    for block_id in reachable {
        let block = func.block(block_id).ok_or(Error::InvalidBlock {
            block: block_id,
            count: func.block_count(),
        })?;
        let mut state = in_states
            .get(&block_id)
            .cloned()
            .unwrap_or_else(State::new);
        for expr in block.expressions() {
            transfer.transfer_expr(&mut state, expr, true);
        }
        let _ = transfer.transfer_terminator(&state, block.terminator(), true);
    }

    Ok(EngineResults { in_states })
}
