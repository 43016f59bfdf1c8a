use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use stagehand::{
    AovId, BackendId, BufferData, Orchestrator, OrchestratorConfig, PluginRegistry, RenderBuffer,
    RenderParams, Stage, Viewport,
};

#[derive(Parser, Debug)]
#[command(name = "stagehand", version)]
struct Cli {
    /// Log lifecycle events to stderr.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered backends.
    List,
    /// Render a stage until it converges and summarize the outputs.
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input stage JSON.
    #[arg(long)]
    stage: PathBuf,

    /// Optional orchestrator config JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Backend id (registry default when omitted).
    #[arg(long)]
    backend: Option<String>,

    /// Outputs to request; unsupported ones are dropped.
    #[arg(long = "aov", default_values_t = vec!["color".to_owned()])]
    aovs: Vec<String>,

    /// Viewport width in pixels.
    #[arg(long, default_value_t = 64)]
    width: u32,

    /// Viewport height in pixels.
    #[arg(long, default_value_t = 64)]
    height: u32,

    /// Give up after this many render calls.
    #[arg(long, default_value_t = 64)]
    max_iterations: u32,

    /// Level-of-detail hint (1 = smooth hull, >1 = refined).
    #[arg(long, default_value_t = 1)]
    lod: u32,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    }
    match cli.cmd {
        Command::List => cmd_list(),
        Command::Render(args) => cmd_render(args),
    }
}

fn cmd_list() -> anyhow::Result<()> {
    let orch = Orchestrator::unbound(
        Arc::new(PluginRegistry::with_builtin()),
        OrchestratorConfig::default(),
    );
    for desc in orch.list_backends() {
        println!("{}\t{}", desc.id, desc.display_name);
    }
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let stage = Stage::from_path(&args.stage)?;
    let config = match &args.config {
        Some(p) => OrchestratorConfig::from_path(p)?,
        None => OrchestratorConfig::default(),
    };
    let root_path = config.root_path.clone();

    let mut orch = Orchestrator::unbound(Arc::new(PluginRegistry::with_builtin()), config);
    let backend = BackendId::new(args.backend.unwrap_or_default());
    orch.select_backend(&backend)
        .with_context(|| format!("select backend '{backend}'"))?;

    let aovs: Vec<AovId> = args.aovs.iter().map(|s| AovId::new(s.as_str())).collect();
    orch.set_outputs(&aovs)?;
    orch.set_render_viewport(Viewport::new(
        0.0,
        0.0,
        f64::from(args.width),
        f64::from(args.height),
    ))?;

    let params = RenderParams::default().with_level_of_detail(args.lod);
    let root = stage.prim_at(root_path);
    let mut iterations = 0;
    let converged = loop {
        if iterations >= args.max_iterations {
            break false;
        }
        orch.render(&root, &params)
            .with_context(|| format!("render '{}'", root.path()))?;
        iterations += 1;
        if orch.is_converged()? {
            break true;
        }
    };

    let backend = orch
        .current_backend_id()
        .map(ToString::to_string)
        .unwrap_or_default();
    println!(
        "backend={backend} iterations={iterations} converged={converged} rprims={}",
        orch.render_index().map_or(0, |i| i.len())
    );
    for aov in orch.outputs() {
        if let Some(buf) = orch.output_buffer(aov) {
            println!("{}", summarize(buf));
        }
    }
    Ok(())
}

fn summarize(buf: &RenderBuffer) -> String {
    let stats = match buf.data() {
        BufferData::F32(v) => min_max(v.iter().copied()),
        BufferData::I32(v) => min_max(v.iter().map(|&x| x as f32)),
        BufferData::U8(v) => min_max(v.iter().map(|&x| f32::from(x))),
    };
    let range = match stats {
        Some((lo, hi)) => format!("min={lo:.4} max={hi:.4}"),
        None => "empty".to_owned(),
    };
    format!(
        "{} {}x{} {:?} {range}",
        buf.aov(),
        buf.width(),
        buf.height(),
        buf.format()
    )
}

fn min_max(values: impl Iterator<Item = f32>) -> Option<(f32, f32)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}
