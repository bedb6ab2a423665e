use annotator::{
    Config, ElementTree, Marker, MarkerKind, Navigator, PassOutcome, activate_marker,
};
use anyhow::{Context, Result, bail};
use clap::Parser;
use dom::Document;
use runtime_annotate::{PassRecord, Session};
use std::fs;
use std::path::PathBuf;
use url::Url;

const OUTLINE_CAP: usize = 2000;

#[derive(Parser)]
#[command(name = "prdiff")]
#[command(about = "Annotate commit hash badges on a saved pull-request page", long_about = None)]
#[command(version)]
struct Cli {
    /// Saved page markup
    page: PathBuf,

    /// Location path the page was served at, e.g. /owner/repo/pull/42
    #[arg(long)]
    path: String,

    /// TOML configuration (host, timing, selector table)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the host diff links point at
    #[arg(long)]
    host: Option<String>,

    /// Override the settle delay after load
    #[arg(long)]
    settle_ms: Option<u64>,

    /// Print an element outline instead of the annotated markup
    #[arg(long)]
    outline: bool,

    /// Click the diff marker of the first commit starting with this prefix
    #[arg(long, value_name = "REF_PREFIX")]
    activate: Option<String>,

    /// Print the effective configuration and exit
    #[arg(long)]
    dump_config: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

struct PrintNavigator;

impl Navigator for PrintNavigator {
    fn open_in_new_context(&mut self, url: &Url) {
        println!("open {url}");
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(host) = &cli.host {
        config.host = host.clone();
    }
    if let Some(ms) = cli.settle_ms {
        config.timing.settle_delay_ms = ms;
    }
    if cli.dump_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }
    let settings = config.compile().context("invalid configuration")?;

    let html = fs::read_to_string(&cli.page)
        .with_context(|| format!("failed to read {}", cli.page.display()))?;
    let mut session = Session::new(
        Document::parse_html(&html),
        cli.path.clone(),
        settings,
        config.timing,
    );
    session.start();
    let passes = session.settle().to_vec();

    if cli.outline {
        for line in dom::outline(session.tree(), OUTLINE_CAP) {
            println!("{line}");
        }
    } else {
        println!("{}", dom::to_html(session.tree()));
    }
    for pass in &passes {
        eprintln!("{}", describe(pass));
    }

    if let Some(prefix) = &cli.activate {
        activate(&session, prefix)?;
    }
    session.teardown();
    Ok(())
}

fn describe(pass: &PassRecord) -> String {
    let when = format!("{:>6}ms {:?}", pass.at.as_millis(), pass.trigger);
    match &pass.outcome {
        PassOutcome::Skipped(reason) => format!("{when}: skipped ({reason})"),
        PassOutcome::Reconciled(report) => {
            let mut line = format!(
                "{when}: latest {} via {}, {} mentions, {} inserted, {} removed",
                report.latest.short(),
                report.source,
                report.mentions,
                report.inserted,
                report.removed
            );
            if let Some(t) = &report.transition {
                line.push_str(&format!(", moved from {}", t.stale.short()));
            }
            line
        }
    }
}

fn activate(session: &Session<Document>, prefix: &str) -> Result<()> {
    let doc = session.tree();
    let markers = &session.reconciler().settings().table.markers;
    let target = ElementTree::select_all(doc, markers).into_iter().find(|&node| {
        Marker::read(doc, node)
            .is_some_and(|m| m.kind == MarkerKind::Diff && m.commit.as_str().starts_with(prefix))
    });
    let Some(node) = target else {
        bail!("no diff marker for a commit starting with `{prefix}`");
    };
    let activation = activate_marker(doc, node, &mut PrintNavigator);
    log::debug!(
        "activation: default prevented {}, propagation stopped {}",
        activation.default_prevented,
        activation.propagation_stopped
    );
    Ok(())
}
