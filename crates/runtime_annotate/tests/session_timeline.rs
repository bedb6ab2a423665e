use annotator::{PassOutcome, Settings, SkipReason, Timing};
use css::parse_selector_list;
use dom::{Document, DomPatch, NodeKey};
use runtime_annotate::{Session, Trigger};
use std::time::Duration;

const FIRST: &str = "abcdef0123456789abcdef0123456789abcdef01";
const SECOND: &str = "9876543210fedcba9876543210fedcba98765432";

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn page() -> String {
    format!(
        r#"<html><body><div class="js-navigation-container" id="commits"><div class="TimelineItem"><code><a href="/octo/widgets/commit/{FIRST}">{}</a></code></div></div></body></html>"#,
        &FIRST[..7]
    )
}

fn session() -> Session<Document> {
    let settings = Settings::defaults().expect("defaults compile");
    Session::new(
        Document::parse_html(&page()),
        "/octo/widgets/pull/12",
        settings,
        Timing::default(),
    )
}

fn marker_kinds(doc: &Document, sha: &str) -> Vec<String> {
    let selector = parse_selector_list(&format!(r#".github-diff-icon[data-commit-sha="{sha}"]"#))
        .expect("selector");
    doc.select_all(&selector)
        .into_iter()
        .filter_map(|k| doc.attribute(k, "data-marker-kind").map(str::to_string))
        .collect()
}

// A new timeline item for `sha` at the top of the commit list, as the host renders a push.
fn push_patches(doc: &Document, sha: &str) -> Vec<DomPatch> {
    let list = doc
        .select_first(&parse_selector_list("#commits").expect("selector"))
        .expect("commit list");
    let first_item = doc.children(list)[0];
    let (item, code, anchor, text) = (NodeKey(7001), NodeKey(7002), NodeKey(7003), NodeKey(7004));
    vec![
        DomPatch::CreateElement {
            key: item,
            name: "div".to_string(),
            attributes: vec![("class".to_string(), Some("TimelineItem".to_string()))],
        },
        DomPatch::CreateElement {
            key: code,
            name: "code".to_string(),
            attributes: Vec::new(),
        },
        DomPatch::CreateElement {
            key: anchor,
            name: "a".to_string(),
            attributes: vec![(
                "href".to_string(),
                Some(format!("/octo/widgets/commit/{sha}")),
            )],
        },
        DomPatch::CreateText {
            key: text,
            text: sha[..7].to_string(),
        },
        DomPatch::AppendChild {
            parent: anchor,
            child: text,
        },
        DomPatch::AppendChild {
            parent: code,
            child: anchor,
        },
        DomPatch::AppendChild {
            parent: item,
            child: code,
        },
        DomPatch::InsertBefore {
            parent: list,
            child: item,
            before: first_item,
        },
    ]
}

#[test]
fn settle_pass_then_one_quiet_follow_up() {
    let mut s = session();
    s.start();
    let passes = s.settle().to_vec();
    let summary: Vec<_> = passes
        .iter()
        .map(|p| (p.at.as_millis() as u64, p.trigger))
        .collect();
    assert_eq!(summary, vec![(2000, Trigger::Settle), (2500, Trigger::Debounce)]);

    let settle = passes[0].outcome.report().expect("settle pass reconciled");
    assert_eq!(settle.inserted, 1);
    let follow_up = passes[1].outcome.report().expect("follow-up reconciled");
    assert!(follow_up.is_noop(), "{follow_up:?}");

    assert_eq!(marker_kinds(s.tree(), FIRST), vec!["latest"]);
}

#[test]
fn host_push_is_picked_up_after_the_debounce() {
    let mut s = session();
    s.start();
    s.settle();

    let patches = push_patches(s.tree(), SECOND);
    s.host_mutate(&patches).expect("push applies");
    assert!(s.advance(ms(499)).is_empty(), "debounce still waiting");
    let passes = s.advance(ms(1)).to_vec();
    assert_eq!(passes.len(), 1);
    assert_eq!(passes[0].trigger, Trigger::Debounce);
    let report = passes[0].outcome.report().expect("reconciled");
    assert_eq!(report.latest.as_str(), SECOND);
    assert!(report.transition.is_some());

    assert_eq!(marker_kinds(s.tree(), FIRST), vec!["diff"]);
    assert_eq!(marker_kinds(s.tree(), SECOND), vec!["latest"]);
}

#[test]
fn interval_retries_and_stays_idempotent() {
    let mut s = session();
    s.start();
    s.settle();
    let before = dom::to_html(s.tree());

    let passes = s.advance(ms(20_000)).to_vec();
    assert!(passes.iter().all(|p| p.trigger == Trigger::Interval));
    assert_eq!(passes.len(), 4, "interval at 5s, 10s, 15s, 20s");
    assert!(passes.iter().all(|p| p.outcome.report().is_some_and(|r| r.is_noop())));
    assert_eq!(dom::to_html(s.tree()), before);
}

#[test]
fn navigating_away_skips_passes_but_keeps_latest_state() {
    let mut s = session();
    s.start();
    s.settle();
    s.navigate("/octo/widgets/issues/3");
    let passes = s.advance(ms(5000)).to_vec();
    assert!(!passes.is_empty());
    assert!(
        passes
            .iter()
            .all(|p| p.outcome == PassOutcome::Skipped(SkipReason::NotAPrPage))
    );
    assert_eq!(
        s.reconciler().state().previous_latest().map(|c| c.as_str()),
        Some(FIRST)
    );
    assert_eq!(marker_kinds(s.tree(), FIRST), vec!["latest"]);
}

#[test]
fn teardown_stops_everything() {
    let mut s = session();
    s.start();
    s.settle();
    assert_eq!(s.teardown(), 1, "only the interval was still pending");
    assert_eq!(s.pending_timers(), 0);

    let patches = push_patches(s.tree(), SECOND);
    s.host_mutate(&patches).expect("push applies");
    assert!(s.advance(ms(60_000)).is_empty());
    assert_eq!(marker_kinds(s.tree(), SECOND), Vec::<String>::new());
}
