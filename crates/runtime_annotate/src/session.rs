//! A page session: one document, its location, the reconciler and the triggers that drive it.
//!
//! Time is virtual. The host advances it; due triggers run passes in firing order, and every
//! child-list change (the host's or the reconciler's own) re-arms the debounce.

use crate::scheduler::TimerQueue;
use crate::triggers::{Trigger, TriggerWiring};
use annotator::{ElementTree, PassOutcome, Reconciler, Settings, Timing};
use dom::{Document, DomError, DomPatch, MutationRecord};
use std::time::Duration;

// Upper bound on passes `settle` runs; a host that mutates on every pass never goes quiet.
const SETTLE_PASS_LIMIT: usize = 64;

/// Source of mutation notifications for the debounce trigger.
pub trait MutationSource {
    /// Drain pending records; true if any of them changed a child list.
    fn take_notification(&mut self) -> bool;
}

impl MutationSource for Document {
    fn take_notification(&mut self) -> bool {
        self.take_mutations()
            .iter()
            .any(|record| matches!(record, MutationRecord::ChildList { .. }))
    }
}

/// One pass that ran.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassRecord {
    pub at: Duration,
    pub trigger: Trigger,
    pub outcome: PassOutcome,
}

pub struct Session<T> {
    tree: T,
    path: String,
    reconciler: Reconciler,
    timers: TimerQueue<Trigger>,
    wiring: TriggerWiring,
    passes: Vec<PassRecord>,
    observing: bool,
}

impl<T: ElementTree + MutationSource> Session<T> {
    pub fn new(tree: T, path: impl Into<String>, settings: Settings, timing: Timing) -> Self {
        Self {
            tree,
            path: path.into(),
            reconciler: Reconciler::new(settings),
            timers: TimerQueue::new(),
            wiring: TriggerWiring::new(timing),
            passes: Vec::new(),
            observing: false,
        }
    }

    /// The page finished loading: arm the settle pass and the interval, start observing.
    pub fn start(&mut self) {
        // Loading the page is not a mutation.
        self.tree.take_notification();
        self.wiring.on_load(&mut self.timers);
        self.observing = true;
        log::debug!(target: "runtime_annotate", "session started on {}", self.path);
    }

    /// Let the host page edit the document, then deliver the resulting notification.
    pub fn host_edit<R>(&mut self, edit: impl FnOnce(&mut T) -> R) -> R {
        let result = edit(&mut self.tree);
        self.observe();
        result
    }

    /// Client-side navigation: the document stays, the location changes, latest state is kept.
    pub fn navigate(&mut self, path: impl Into<String>) {
        self.path = path.into();
        log::debug!(target: "runtime_annotate", "navigated to {}", self.path);
        self.observe();
    }

    /// Advance virtual time by `by`, running every pass that comes due. Returns those passes.
    pub fn advance(&mut self, by: Duration) -> &[PassRecord] {
        let start = self.passes.len();
        let until = self.timers.now() + by;
        while let Some(fired) = self.timers.pop_due(until) {
            self.wiring.on_fired(fired.payload);
            self.run_pass(fired.at, fired.payload);
        }
        self.timers.advance_to(until);
        &self.passes[start..]
    }

    /// Advance until no settle or debounce pass is pending, so the page has been reconciled
    /// and the follow-up pass for the reconciler's own edits has run.
    pub fn settle(&mut self) -> &[PassRecord] {
        let start = self.passes.len();
        while self.wiring.has_pending_one_shot() {
            if self.passes.len() - start >= SETTLE_PASS_LIMIT {
                log::warn!(
                    target: "runtime_annotate",
                    "page did not settle after {SETTLE_PASS_LIMIT} passes"
                );
                break;
            }
            let Some(deadline) = self.timers.next_deadline() else {
                break;
            };
            let by = deadline.saturating_sub(self.timers.now());
            self.advance(by);
        }
        &self.passes[start..]
    }

    /// The page goes away: cancel all timers and stop observing.
    pub fn teardown(&mut self) -> usize {
        self.observing = false;
        let cancelled = self.wiring.teardown(&mut self.timers);
        log::debug!(target: "runtime_annotate", "session torn down, {cancelled} timers cancelled");
        cancelled
    }

    pub fn tree(&self) -> &T {
        &self.tree
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn now(&self) -> Duration {
        self.timers.now()
    }

    pub fn passes(&self) -> &[PassRecord] {
        &self.passes
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    fn run_pass(&mut self, at: Duration, trigger: Trigger) {
        log::debug!(target: "runtime_annotate", "{trigger:?} pass at {}ms", at.as_millis());
        let outcome = self.reconciler.run(&mut self.tree, &self.path);
        self.passes.push(PassRecord {
            at,
            trigger,
            outcome,
        });
        self.observe();
    }

    fn observe(&mut self) {
        let changed = self.tree.take_notification();
        if changed && self.observing {
            self.wiring.on_mutation(&mut self.timers);
        }
    }
}

impl Session<Document> {
    /// Apply a host patch batch. Patches before a failing one stay applied and are observed.
    pub fn host_mutate(&mut self, patches: &[DomPatch]) -> Result<(), DomError> {
        self.host_edit(|doc| doc.apply(patches))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom::NodeKey;

    fn session(html: &str) -> Session<Document> {
        let settings = Settings::defaults().expect("defaults compile");
        Session::new(
            Document::parse_html(html),
            "/o/r/pull/1",
            settings,
            Timing::default(),
        )
    }

    #[test]
    fn nothing_runs_before_the_settle_delay() {
        let mut s = session("<p></p>");
        s.start();
        assert!(s.advance(Duration::from_millis(1999)).is_empty());
        let passes = s.advance(Duration::from_millis(1));
        assert_eq!(passes.len(), 1);
        assert_eq!(passes[0].trigger, Trigger::Settle);
        assert_eq!(passes[0].at, Duration::from_millis(2000));
    }

    #[test]
    fn attribute_only_changes_do_not_trigger() {
        let mut s = session(r#"<p id="x"></p>"#);
        s.start();
        s.advance(Duration::from_millis(2000));
        let p = s.tree().children(s.tree().root())[0];
        s.host_mutate(&[DomPatch::SetAttributes {
            key: p,
            attributes: Vec::new(),
        }])
        .expect("patch applies");
        assert!(s.advance(Duration::from_millis(1000)).is_empty());
    }

    #[test]
    fn failed_patch_still_notifies_for_the_applied_part() {
        let mut s = session("<p></p>");
        s.start();
        let root = s.tree().root();
        let err = s
            .host_mutate(&[
                DomPatch::CreateElement {
                    key: NodeKey(500),
                    name: "div".to_string(),
                    attributes: Vec::new(),
                },
                DomPatch::AppendChild {
                    parent: root,
                    child: NodeKey(500),
                },
                DomPatch::RemoveNode { key: NodeKey(999) },
            ])
            .expect_err("unknown key");
        assert_eq!(err, DomError::MissingKey(NodeKey(999)));
        let passes = s.advance(Duration::from_millis(500));
        assert_eq!(passes.len(), 1);
        assert_eq!(passes[0].trigger, Trigger::Debounce);
    }
}
