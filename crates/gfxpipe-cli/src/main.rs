#![forbid(unsafe_code)]

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use gfxpipe_core::{compile_compute, compile_graphics, CompileOptions, CompiledPipeline};
use gfxpipe_types::limits::{INVALID_VALUE, MAX_USER_DATA_REGS};
use gfxpipe_types::{NodeData, PipelineDescription, ResourceMappingNode};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Roles, user data layout and fixed-function state as JSON.
    Json,
    /// One `reg = value` line per register.
    Registers,
    /// Binary metadata blob (`GPMD`).
    Bin,
}

/// Merge user data and build hardware register state for a pipeline description.
///
/// Compile options start from `GFXPIPE_*` environment variables; flags override them.
#[derive(Debug, Parser)]
#[command(name = "gfxpipe", version, about)]
struct Args {
    /// Pipeline description (JSON, `{"graphics": {...}}` or `{"compute": {...}}`).
    input: PathBuf,

    #[arg(long, value_enum, default_value_t = Format::Registers)]
    format: Format,

    /// Write output here instead of stdout.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Target GFX IP as `major[.minor[.stepping]]`.
    #[arg(long)]
    gfx_ip: Option<String>,

    /// Keep GS rings on chip (GFX7+).
    #[arg(long)]
    gs_on_chip: bool,

    /// Reject graphics pipelines without a fragment shader.
    #[arg(long)]
    no_null_fragment: bool,

    #[arg(long)]
    max_user_data_regs: Option<u32>,

    /// Log filter (tracing-subscriber EnvFilter syntax). Defaults to `RUST_LOG`, then `warn`.
    #[arg(long)]
    log_level: Option<String>,
}

fn main() {
    let args = Args::parse();
    init_tracing(args.log_level.as_deref());

    if let Err(err) = run(&args) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn options(args: &Args) -> Result<CompileOptions> {
    let base = CompileOptions::from_env().context("reading GFXPIPE_* environment")?;
    apply_overrides(base, args)
}

/// Command-line flags win over whatever the environment configured.
fn apply_overrides(mut options: CompileOptions, args: &Args) -> Result<CompileOptions> {
    if let Some(gfx_ip) = &args.gfx_ip {
        options.gfx_ip = gfx_ip.parse().context("--gfx-ip")?;
    }
    if args.gs_on_chip {
        options.gs_on_chip = true;
    }
    if args.no_null_fragment {
        options.allow_null_fragment = false;
    }
    if let Some(regs) = args.max_user_data_regs {
        if regs == 0 || regs > MAX_USER_DATA_REGS {
            bail!("--max-user-data-regs must be 1..={MAX_USER_DATA_REGS}, got {regs}");
        }
        options.max_user_data_regs = regs;
    }
    Ok(options)
}

fn run(args: &Args) -> Result<()> {
    let options = options(args)?;
    tracing::debug!(?options, "compile options");

    let text = fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let description: PipelineDescription = serde_json::from_str(&text)
        .with_context(|| format!("parsing {}", args.input.display()))?;

    let compiled = match description {
        PipelineDescription::Graphics(mut info) => compile_graphics(&mut info, &options),
        PipelineDescription::Compute(mut info) => compile_compute(&mut info, &options),
    }
    .with_context(|| format!("compiling {}", args.input.display()))?;

    let bytes = match args.format {
        Format::Json => {
            let mut out = serde_json::to_vec_pretty(&compiled)?;
            out.push(b'\n');
            out
        }
        Format::Registers => render_registers(&compiled).into_bytes(),
        Format::Bin => compiled.metadata.to_le_bytes(),
    };

    match &args.output {
        Some(path) => {
            fs::write(path, &bytes).with_context(|| format!("writing {}", path.display()))?
        }
        None => io::stdout().lock().write_all(&bytes)?,
    }
    Ok(())
}

fn render_registers(compiled: &CompiledPipeline) -> String {
    use std::fmt::Write as _;

    let mut out = String::new();
    let _ = writeln!(out, "shape: {:?} ({})", compiled.shape, compiled.stage_mask);
    if let Some(merged) = &compiled.merged {
        let stats = merged.stats();
        let _ = writeln!(
            out,
            "merged: {} nodes ({} in), {} range values, {} duplicate blocks, {} nested tables",
            merged.nodes().len(),
            stats.input_nodes,
            merged.range_values().len(),
            stats.duplicate_blocks,
            stats.nested_tables,
        );
        for node in merged.nodes().iter() {
            render_node(&mut out, node, 1);
        }
        for value in merged.range_values().iter() {
            let _ = writeln!(
                out,
                "  range value (set={}, binding={}): {:?} x{} {:x?}",
                value.set,
                value.binding,
                value.ty,
                value.array_size,
                value.value,
            );
        }
    }
    for stage in &compiled.metadata.hardware_stages {
        let logical = stage.stage.map_or("null", |s| s.name());
        let spill = if stage.spill_threshold == INVALID_VALUE {
            "none".to_owned()
        } else {
            stage.spill_threshold.to_string()
        };
        let _ = writeln!(
            out,
            "{}: {logical}, {} user data regs, limit {}, spill {spill}",
            stage.role, stage.user_data_reg_count, stage.user_data_limit,
        );
    }
    for (reg, value) in &compiled.metadata.registers {
        let _ = writeln!(out, "{reg:#06x} = {value:#010x}");
    }
    out
}

fn render_node(out: &mut String, node: &ResourceMappingNode, indent: usize) {
    use std::fmt::Write as _;

    let start = node.offset_in_dwords;
    let end = start + node.size_in_dwords;
    let _ = write!(out, "{:indent$}[{start}..{end}) ", "", indent = indent * 2);
    let _ = match &node.data {
        NodeData::Descriptor { ty, binding } => writeln!(out, "{ty:?} {binding}"),
        NodeData::PushConst { binding } => writeln!(out, "push const {binding}"),
        NodeData::InlineConst { binding } => writeln!(out, "inline const {binding}"),
        NodeData::DescriptorTable { children } => {
            writeln!(out, "table ({} entries)", children.len())
        }
        NodeData::IndirectTable { table_dwords } => {
            writeln!(out, "indirect table {table_dwords} dwords")
        }
        NodeData::VertexBufferTable { table_dwords } => {
            writeln!(out, "vertex buffer table {table_dwords} dwords")
        }
        NodeData::StreamOutTable { table_dwords } => {
            writeln!(out, "stream-out table {table_dwords} dwords")
        }
    };
    if let Some(children) = node.children() {
        for child in children.iter() {
            render_node(out, child, indent + 1);
        }
    }
}
