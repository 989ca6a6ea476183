//! Headless backends: a hand-driven clock, an in-memory stage and an animator
//! whose completions fire only when told to.
//!
//! They let the engine run without a browser, which is how the native tests
//! drive it. All three are cheap `Clone` handles over shared state so a test
//! can keep one copy while the emitter owns another.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use super::{Animator, Appearance, Clock, Stage, Tween};
use crate::error::EffectsError;

#[derive(Clone, Debug, Default)]
pub struct ManualClock(Rc<Cell<f64>>);

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        Self(Rc::new(Cell::new(start_ms)))
    }

    pub fn set(&self, ms: f64) {
        self.0.set(ms);
    }

    pub fn advance(&self, ms: f64) {
        self.0.set(self.0.get() + ms);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.0.get()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemoryNode(pub u64);

#[derive(Debug, Default)]
struct StageLog {
    next: u64,
    attached: BTreeMap<u64, Appearance>,
    attaches: u64,
    detaches: u64,
    stray_detaches: u64,
    failing: bool,
}

/// Stage that keeps attached nodes in a map.
#[derive(Clone, Debug)]
pub struct MemoryStage {
    log: Rc<RefCell<StageLog>>,
    viewport: (f64, f64),
}

impl MemoryStage {
    pub fn new(viewport: (f64, f64)) -> Self {
        Self { log: Rc::default(), viewport }
    }

    /// Nodes currently attached.
    pub fn attached(&self) -> usize {
        self.log.borrow().attached.len()
    }

    pub fn attaches(&self) -> u64 {
        self.log.borrow().attaches
    }

    pub fn detaches(&self) -> u64 {
        self.log.borrow().detaches
    }

    /// Detach calls for nodes that were not attached (double removals).
    pub fn stray_detaches(&self) -> u64 {
        self.log.borrow().stray_detaches
    }

    pub fn appearance(&self, node: MemoryNode) -> Option<Appearance> {
        self.log.borrow().attached.get(&node.0).cloned()
    }

    /// Makes every following `attach` fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.log.borrow_mut().failing = failing;
    }
}

impl Stage for MemoryStage {
    type Node = MemoryNode;

    fn attach(&self, appearance: &Appearance) -> Result<MemoryNode, EffectsError> {
        let mut log = self.log.borrow_mut();
        if log.failing {
            return Err(EffectsError::Attach("memory stage set to fail".into()));
        }
        let id = log.next;
        log.next += 1;
        log.attaches += 1;
        log.attached.insert(id, appearance.clone());
        Ok(MemoryNode(id))
    }

    fn detach(&self, node: &MemoryNode) {
        let mut log = self.log.borrow_mut();
        if log.attached.remove(&node.0).is_some() {
            log.detaches += 1;
        } else {
            log.stray_detaches += 1;
        }
    }

    fn viewport(&self) -> (f64, f64) {
        self.viewport
    }
}

struct PendingRun<N> {
    node: N,
    tween: Tween,
    started_at: f64,
    on_complete: Box<dyn FnOnce()>,
}

/// Records every tween and completes them on demand.
pub struct ManualAnimator<N> {
    clock: ManualClock,
    runs: Rc<RefCell<Vec<PendingRun<N>>>>,
    history: Rc<RefCell<Vec<Tween>>>,
    instant: bool,
}

impl<N> Clone for ManualAnimator<N> {
    fn clone(&self) -> Self {
        Self {
            clock: self.clock.clone(),
            runs: Rc::clone(&self.runs),
            history: Rc::clone(&self.history),
            instant: self.instant,
        }
    }
}

impl<N: Clone> ManualAnimator<N> {
    pub fn new(clock: ManualClock) -> Self {
        Self { clock, runs: Rc::default(), history: Rc::default(), instant: false }
    }

    /// Completes every non-looping tween synchronously inside `run`.
    pub fn instant(mut self) -> Self {
        self.instant = true;
        self
    }

    /// Runs started but not completed (looping runs stay here forever).
    pub fn pending(&self) -> usize {
        self.runs.borrow().len()
    }

    pub fn last_tween(&self) -> Option<Tween> {
        self.history.borrow().last().cloned()
    }

    pub fn started(&self) -> usize {
        self.history.borrow().len()
    }

    /// Nodes of the runs still pending, oldest first.
    pub fn pending_nodes(&self) -> Vec<N> {
        self.runs.borrow().iter().map(|r| r.node.clone()).collect()
    }

    /// Fires completions whose duration has elapsed on the clock.
    pub fn complete_due(&self) -> usize {
        let now = self.clock.now();
        self.complete_where(|r| !r.tween.looping && r.started_at + r.tween.duration_ms <= now)
    }

    /// Fires every non-looping completion regardless of time.
    pub fn complete_all(&self) -> usize {
        self.complete_where(|r| !r.tween.looping)
    }

    /// Drops pending completions without firing them, as if the animation
    /// system lost them.
    pub fn lose_all(&self) -> usize {
        let lost: Vec<PendingRun<N>> = self.runs.borrow_mut().drain(..).collect();
        lost.len()
    }

    fn complete_where(&self, pred: impl Fn(&PendingRun<N>) -> bool) -> usize {
        // Take callbacks out before running them: a callback may re-enter.
        let due: Vec<PendingRun<N>> = {
            let mut runs = self.runs.borrow_mut();
            let (due, keep): (Vec<_>, Vec<_>) = runs.drain(..).partition(|r| pred(r));
            *runs = keep;
            due
        };
        let n = due.len();
        for run in due {
            (run.on_complete)();
        }
        n
    }
}

impl<N: Clone> Animator<N> for ManualAnimator<N> {
    fn run(&self, node: &N, tween: Tween, on_complete: Box<dyn FnOnce()>) {
        self.history.borrow_mut().push(tween.clone());
        if self.instant && !tween.looping {
            on_complete();
            return;
        }
        self.runs.borrow_mut().push(PendingRun {
            node: node.clone(),
            tween,
            started_at: self.clock.now(),
            on_complete,
        });
    }
}
