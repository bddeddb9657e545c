use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use luy_nodes::nodes::{self, HostManifest, ModuleLoader, NodeLoader, NodeShape, ScanReport};
use luy_nodes::{Config, Discovery, NodeRegistry};

/// Luy Nodes - discover and register nodes for a node-graph host
#[derive(Parser)]
#[command(name = "luy-nodes", version, about)]
struct Cli {
    /// Config file (default: ~/.config/luy/nodes/config.toml)
    #[arg(short, long, env = "LUY_NODES_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct ScanArgs {
    /// Package root to scan (overrides config)
    root: Option<PathBuf>,

    /// Display-name overrides file (TOML table or JSON object)
    #[arg(long)]
    overrides: Option<PathBuf>,

    /// Do not use the bundled display names
    #[arg(long)]
    no_bundled: bool,

    /// Front-end assets directory exported as `WEB_DIRECTORY`
    #[arg(long)]
    web_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Scan the package root and print the registered nodes
    Scan {
        #[command(flatten)]
        args: ScanArgs,

        /// Print the host manifest as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Scan the package root and write the host manifest
    Export {
        #[command(flatten)]
        args: ScanArgs,

        /// Output file
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Load a single node module and show which classes qualify as nodes
    Inspect {
        /// Module file
        file: PathBuf,

        /// Package root for relative imports (default: the file's directory)
        #[arg(long)]
        root: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn,luy_nodes=info",
        1 => "info,luy_nodes=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Command::Scan { args, json } => {
            apply_scan_args(&mut config, args);
            let Discovery { registry, report } = discover(&config)?;
            let registry = nodes::host::install(registry)?;

            if json {
                let manifest = HostManifest::new(registry, config.web_dir.as_deref());
                println!("{}", manifest.to_json_pretty()?);
            } else {
                print_summary(registry, &report);
            }
            Ok(())
        }
        Command::Export { args, out } => {
            apply_scan_args(&mut config, args);
            let discovery = discover(&config)?;
            HostManifest::new(&discovery.registry, config.web_dir.as_deref()).write_to(&out)?;
            println!(
                "Wrote {} nodes to {} ({} modules failed)",
                discovery.registry.len(),
                out.display(),
                discovery.report.failed()
            );
            Ok(())
        }
        Command::Inspect { file, root } => inspect(&config, &file, root.as_deref()),
    }
}

fn apply_scan_args(config: &mut Config, args: ScanArgs) {
    if let Some(root) = args.root {
        config.root_dir = root;
    }
    if let Some(overrides) = args.overrides {
        config.overrides_file = Some(overrides);
    }
    if args.no_bundled {
        config.bundled_overrides = false;
    }
    if let Some(web_dir) = args.web_dir {
        config.web_dir = Some(web_dir);
    }
}

fn discover(config: &Config) -> anyhow::Result<Discovery> {
    let overrides = config.overrides()?;
    let loader = NodeLoader::new(config.scan.clone(), overrides);
    Ok(loader.scan(&config.root_dir)?)
}

fn print_summary(registry: &NodeRegistry, report: &ScanReport) {
    if report.root_missing {
        println!("Node directory {} does not exist", report.root.display());
        return;
    }

    println!(
        "Scanned {}: {} modules, {} loaded, {} failed",
        report.root.display(),
        report.candidates,
        report.loaded,
        report.failed()
    );
    println!("---");

    for (name, class) in registry.class_mappings() {
        println!(
            "{name:<40} {:<40} {}",
            registry.display_name(name).unwrap_or_default(),
            class.module_tag().unwrap_or("-")
        );
    }

    for failure in &report.load_errors {
        println!("FAILED {}: {}", failure.source.path.display(), failure.error);
    }

    for collision in &report.collisions {
        println!(
            "COLLISION {}: {} replaced {}",
            collision.name,
            collision.module,
            collision.displaced_module.as_deref().unwrap_or("<untagged>")
        );
    }
}

fn inspect(config: &Config, file: &Path, root: Option<&Path>) -> anyhow::Result<()> {
    let file = file.canonicalize()?;
    let root = match root {
        Some(root) => root.canonicalize()?,
        None => file
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| anyhow::anyhow!("module file has no parent directory"))?,
    };

    let mut loader = ModuleLoader::new(&root, &config.scan);
    let module = loader.load(&file)?;

    println!("{} ({} top-level names)", module.id, module.len());
    println!("---");

    for class in module.classes() {
        let missing: Vec<&str> = [
            (nodes::INPUT_TYPES, class.input_types().is_some()),
            (nodes::RETURN_TYPES, class.return_types().is_some()),
            (nodes::FUNCTION, class.entry_point().is_some()),
        ]
        .into_iter()
        .filter_map(|(marker, present)| (!present).then_some(marker))
        .collect();

        if missing.is_empty() {
            println!("{:<40} node", class.name());
        } else {
            println!("{:<40} not a node (missing {})", class.name(), missing.join(", "));
        }
    }

    Ok(())
}
