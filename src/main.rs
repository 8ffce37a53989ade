use clap::{Args, Parser, Subcommand};
use glyph2strokes::kurbo::Point;
use glyph2strokes::matcher::Candidate;
use glyph2strokes::{
    analyze_outline, order_strokes, Bridge, CharacterMatcher, Corpus, DecompositionNode,
    ExtractionConfig, MatchParams, Median, OrderConfig, Outline, StrokeOrder,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "glyph2strokes", about = "Glyph outlines to ordered strokes and medians")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Split a glyph into strokes, extract medians, and optionally order them
    Extract(ExtractArgs),
    /// Rank corpus characters against a set of drawn strokes
    Lookup(LookupArgs),
}

#[derive(Args)]
struct ExtractArgs {
    /// Glyph JSON: {"path": "M ... Z", "bridges"?, "decomposition"?, "components"?}
    #[arg(short, long)]
    input: PathBuf,

    /// Output JSON path (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Turn below which an endpoint is a corner, in degrees
    #[arg(long, default_value = "18")]
    corner_angle: f64,

    /// Distance within which bridge endpoints snap to outline endpoints (0 = exact)
    #[arg(long, default_value = "0")]
    bridge_tolerance: f64,

    /// Median simplification tolerance in canvas units
    #[arg(long, default_value = "4.0")]
    simplify: f64,

    /// Ignore bridges in the input and propose new ones
    #[arg(long)]
    propose: bool,

    /// Input is in font units with y up: mirror it about this height
    /// (900 for the usual 1024 em) into the y-down canvas frame
    #[arg(long, value_name = "RISE")]
    flip_y: Option<f64>,
}

#[derive(Args)]
struct LookupArgs {
    /// Binary median corpus
    #[arg(short, long)]
    corpus: PathBuf,

    /// Query JSON: a list of medians, each a list of [x, y] points
    #[arg(short, long)]
    query: PathBuf,

    /// Number of candidates to return
    #[arg(short = 'k', long, default_value = "5")]
    count: usize,

    /// Points each median is resampled to
    #[arg(long, default_value = "4")]
    points: usize,

    /// Score each stroke in its better direction
    #[arg(long)]
    allow_reversal: bool,
}

#[derive(Deserialize)]
struct GlyphInput {
    path: String,
    #[serde(default)]
    bridges: Option<Vec<Bridge>>,
    #[serde(default)]
    decomposition: Option<String>,
    /// Medians of known components, keyed by component character.
    #[serde(default)]
    components: HashMap<char, Vec<Median>>,
}

#[derive(Serialize)]
struct GlyphOutput {
    outline: String,
    bridges: Vec<Bridge>,
    proposed: bool,
    strokes: Vec<String>,
    medians: Vec<Median>,
    #[serde(skip_serializing_if = "Option::is_none")]
    order: Option<StrokeOrder>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Extract(args) => extract(args),
        Command::Lookup(args) => lookup(args),
    }
}

fn extract(args: ExtractArgs) -> Result<(), Box<dyn std::error::Error>> {
    let input: GlyphInput = serde_json::from_str(&std::fs::read_to_string(&args.input)?)?;
    let config = ExtractionConfig {
        corner_angle: args.corner_angle.to_radians(),
        bridge_tolerance: args.bridge_tolerance,
        simplify_tolerance: args.simplify,
        ..ExtractionConfig::default()
    };

    let mut outline = Outline::parse(&input.path)?;
    let mut bridges = input.bridges.clone();
    if let Some(rise) = args.flip_y {
        outline = outline.flip_y(rise);
        let flip = |p: Point| Point::new(p.x, rise - p.y);
        bridges = bridges.map(|bridges| {
            bridges
                .iter()
                .map(|b| {
                    let (p, q) = b.points();
                    Bridge::new(flip(p), flip(q))
                })
                .collect()
        });
    }
    let manual = if args.propose { None } else { bridges.as_deref() };
    let glyph = analyze_outline(&outline, manual, &config)?;

    let order = match &input.decomposition {
        Some(decomposition) => {
            let mut tree: DecompositionNode = decomposition.parse()?;
            let resolved = tree.resolve_medians(&mut |c| input.components.get(&c).cloned());
            tracing::info!(
                components = tree.components().len(),
                resolved,
                "resolved component medians"
            );
            let order = order_strokes(&glyph.medians, &tree, &OrderConfig::default())?;
            for diagnostic in &order.diagnostics {
                tracing::warn!("{diagnostic}");
            }
            Some(order)
        }
        None => None,
    };

    let output = GlyphOutput {
        outline: glyph.outline.to_svg(),
        bridges: glyph.bridges,
        proposed: glyph.proposed,
        strokes: glyph.strokes.iter().map(|s| s.to_svg()).collect(),
        medians: glyph.medians,
        order,
    };
    write_json(&output, args.output.as_deref())
}

fn lookup(args: LookupArgs) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = std::fs::read(&args.corpus)?;
    let params = MatchParams {
        points: args.points,
        allow_reversal: args.allow_reversal,
        ..MatchParams::default()
    };
    let corpus = Corpus::from_bytes(&bytes, params)?;
    tracing::info!(entries = corpus.len(), "loaded corpus");

    let query: Vec<Vec<Point>> = serde_json::from_str(&std::fs::read_to_string(&args.query)?)?;
    let matcher = CharacterMatcher::new(Arc::new(corpus));
    let candidates: Vec<Candidate> = matcher.match_medians(&query, args.count)?;
    write_json(&candidates, None)
}

fn write_json<T: Serialize>(value: &T, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(value)?;
    match path {
        Some(path) => {
            std::fs::write(path, json)?;
            tracing::info!(path = %path.display(), "wrote output");
        }
        None => println!("{json}"),
    }
    Ok(())
}
