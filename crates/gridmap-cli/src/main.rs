use gridmap::wire::{self, NodeList};
use gridmap::{Editor, EditorConfig, LatLng, ManualTimers, RemoteError};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use serde_json::Value;
use std::io::Read;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Json(serde_json::Error),
    Editor(gridmap::Error),
    Remote(RemoteError),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::Editor(err) => write!(f, "{err}"),
            CliError::Remote(err) => write!(f, "node list rejected: {err}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<gridmap::Error> for CliError {
    fn from(value: gridmap::Error) -> Self {
        Self::Editor(value)
    }
}

impl From<RemoteError> for CliError {
    fn from(value: RemoteError) -> Self {
        Self::Remote(value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Command {
    #[default]
    Summary,
    Snapshot,
    Zigzag,
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    config: Option<String>,
    pretty: bool,
    demo: bool,
    random_links: usize,
    seed: u64,
    from: Option<LatLng>,
    to: Option<LatLng>,
    segments: Option<usize>,
    variation: Option<f64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryOut<'a> {
    #[serde(flatten)]
    summary: &'a gridmap::snapshot::Summary,
    skipped_records: usize,
}

fn usage() -> &'static str {
    "gridmap-cli\n\
\n\
USAGE:\n\
  gridmap-cli [summary] [--pretty] [--config <path>] [<path>|-]\n\
  gridmap-cli snapshot [--pretty] [--config <path>] [--demo] [--random-links <n>] [--seed <n>] [<path>|-]\n\
  gridmap-cli zigzag --from <lat,lng> --to <lat,lng> [--segments <n>] [--variation <v>] [--config <path>] [--pretty]\n\
\n\
NOTES:\n\
  - <path> is a node-list export: `{ success, data: [...] }` or a bare array of records.\n\
  - If <path> is omitted or '-', input is read from stdin.\n\
  - snapshot --demo uses the built-in sample providers instead of reading input.\n\
  - --config takes a JSON object merged over the default editor configuration.\n\
  - Logging goes to stderr; set GRIDMAP_LOG (e.g. `debug`) to change the level.\n\
"
}

fn parse_lat_lng(raw: &str) -> Option<LatLng> {
    let (lat, lng) = raw.split_once(',')?;
    let p = LatLng::new(lat.trim().parse().ok()?, lng.trim().parse().ok()?);
    p.is_finite().then_some(p)
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        let mut value = || it.next().ok_or(CliError::Usage(usage()));
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "summary" => args.command = Command::Summary,
            "snapshot" => args.command = Command::Snapshot,
            "zigzag" => args.command = Command::Zigzag,
            "--pretty" => args.pretty = true,
            "--demo" => args.demo = true,
            "--config" => args.config = Some(value()?.clone()),
            "--random-links" => {
                args.random_links = value()?
                    .parse()
                    .map_err(|_| CliError::Usage(usage()))?;
            }
            "--seed" => {
                args.seed = value()?.parse().map_err(|_| CliError::Usage(usage()))?;
            }
            "--from" => {
                args.from = Some(parse_lat_lng(value()?).ok_or(CliError::Usage(usage()))?);
            }
            "--to" => {
                args.to = Some(parse_lat_lng(value()?).ok_or(CliError::Usage(usage()))?);
            }
            "--segments" => {
                args.segments = Some(value()?.parse().map_err(|_| CliError::Usage(usage()))?);
            }
            "--variation" => {
                let v: f64 = value()?.parse().map_err(|_| CliError::Usage(usage()))?;
                if !v.is_finite() {
                    return Err(CliError::Usage(usage()));
                }
                args.variation = Some(v);
            }
            other if other.starts_with('-') && other != "-" => {
                return Err(CliError::Usage(usage()));
            }
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    if args.command == Command::Zigzag && (args.from.is_none() || args.to.is_none()) {
        return Err(CliError::Usage(usage()));
    }
    Ok(args)
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(std::io::stdout().lock(), value)?;
    } else {
        serde_json::to_writer(std::io::stdout().lock(), value)?;
    }
    println!();
    Ok(())
}

fn load_config(path: Option<&str>) -> Result<EditorConfig, CliError> {
    let Some(path) = path else {
        return Ok(EditorConfig::default());
    };
    let overrides: Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    Ok(EditorConfig::from_overrides(&overrides)?)
}

fn load_node_list(input: Option<&str>) -> Result<NodeList, CliError> {
    let text = read_input(input)?;
    let list = wire::parse_node_list_str(&text)?;
    if list.skipped > 0 {
        tracing::warn!(skipped = list.skipped, "skipped malformed node records");
    }
    Ok(list)
}

/// Headless editor with the map already loaded.
fn ready_editor(config: EditorConfig) -> Editor<ManualTimers> {
    let mut editor = Editor::headless(config);
    editor.mark_map_ready();
    editor
}

fn run(args: Args) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Summary => {
            let list = load_node_list(args.input.as_deref())?;
            let mut editor = ready_editor(config);
            editor.reconcile(list.nodes);
            let snapshot = editor.snapshot();
            let out = SummaryOut {
                summary: &snapshot.summary,
                skipped_records: list.skipped,
            };
            write_json(&out, args.pretty)
        }
        Command::Snapshot => {
            let mut editor = ready_editor(config);
            if args.demo {
                editor.seed_demo();
            } else {
                let list = load_node_list(args.input.as_deref())?;
                editor.reconcile(list.nodes);
            }
            let mut rng = StdRng::seed_from_u64(args.seed);
            for _ in 0..args.random_links {
                if editor.connect_random_pair(&mut rng)?.is_none() {
                    break;
                }
            }
            tracing::info!(
                nodes = editor.store().node_count(),
                edges = editor.store().edge_count(),
                "snapshot built"
            );
            write_json(&editor.snapshot(), args.pretty)
        }
        Command::Zigzag => {
            let (Some(from), Some(to)) = (args.from, args.to) else {
                return Err(CliError::Usage(usage()));
            };
            let path = gridmap::geom::zigzag_path(
                from,
                to,
                args.segments.unwrap_or(config.zigzag_segments),
                args.variation.unwrap_or(config.zigzag_variation),
            );
            write_json(&path, args.pretty)
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("GRIDMAP_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    init_logging();

    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = run(args) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
