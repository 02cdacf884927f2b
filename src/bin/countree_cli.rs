use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

use countree_rs::build_taxon_tree;
use countree_rs::config::TreeConfig;
use countree_rs::error::TaxonError;
use countree_rs::input::read_records;
use countree_rs::taxdb::Taxonomy;
use countree_rs::types::{Continuity, InfoMode, LayoutKind, ScaleMode, UnknownPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Html,
    Json,
    Tsv,
}

impl OutputFormat {
    fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "html" | "htm" => Some(Self::Html),
            "json" => Some(Self::Json),
            "tsv" | "txt" => Some(Self::Tsv),
            _ => None,
        }
    }
}

/// Draw a taxonomic tree whose labels are sized by abundance.
#[derive(Parser, Debug)]
#[command(name = "countree", version)]
struct Cli {
    /// Input records: `taxid<TAB>value[<TAB>total]` per line, optionally gzipped.
    input: PathBuf,

    /// Output file.
    output: PathBuf,

    /// Taxonomy: a Kraken-style taxDB file or an NCBI taxdump directory.
    #[arg(long)]
    taxdump: PathBuf,

    /// TOML configuration; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format (default: from the output extension, else html).
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    #[arg(long, value_enum)]
    info: Option<InfoMode>,

    #[arg(long, value_enum)]
    scale: Option<ScaleMode>,

    #[arg(long, value_enum)]
    continuity: Option<Continuity>,

    #[arg(long, value_enum)]
    layout: Option<LayoutKind>,

    /// What to do with records whose taxid or value cannot be used.
    #[arg(long, value_enum)]
    on_unknown: Option<UnknownPolicy>,

    /// Root the drawing at the deepest ancestor shared by every input taxon.
    #[arg(long, overrides_with = "no_trim_shared_lineage")]
    trim_shared_lineage: bool,

    /// Keep the full lineage even if the config file enables trimming.
    #[arg(long, overrides_with = "trim_shared_lineage")]
    no_trim_shared_lineage: bool,

    /// Page title for html output (default: input file name).
    #[arg(long)]
    title: Option<String>,
}

impl Cli {
    fn tree_config(&self) -> Result<TreeConfig, TaxonError> {
        let mut config = match &self.config {
            Some(path) => TreeConfig::load(path)?,
            None => TreeConfig::default(),
        };
        if let Some(info) = self.info {
            config.info = info;
        }
        if let Some(scale) = self.scale {
            config.scale = scale;
        }
        if let Some(continuity) = self.continuity {
            config.continuity = continuity;
        }
        if let Some(layout) = self.layout {
            config.layout = layout;
        }
        if let Some(policy) = self.on_unknown {
            config.on_unknown = policy;
        }
        if self.trim_shared_lineage {
            config.trim_shared_lineage = true;
        } else if self.no_trim_shared_lineage {
            config.trim_shared_lineage = false;
        }
        config.validate()?;
        Ok(config)
    }
}

fn spinner(color: &str, message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
        .template(&format!("{{spinner:.{color}}} {{msg}}"))
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message(message);
    spinner
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = cli.tree_config()?;

    // 1. Taxonomy
    let progress = spinner("blue", "Loading taxonomy...");
    let taxonomy = Taxonomy::load(&cli.taxdump)?;
    progress.finish_with_message(format!("Loaded {} taxa.", taxonomy.len()));

    // 2. Records
    let progress = spinner("green", "Reading records...");
    let records = read_records(&cli.input)?;
    progress.finish_with_message(format!("Read {} record(s).", records.len()));
    if records.is_empty() {
        return Err(TaxonError::NoValidTaxa.into());
    }

    // 3. Tree
    let progress = spinner("yellow", "Building tree...");
    let results = build_taxon_tree(&records, &taxonomy, &config)?;
    // Used records always carry a positive value into the root.
    if results.tree.root().aggregated_value <= 0.0 {
        progress.abandon_with_message("No record could be placed on the tree.");
        return Err(TaxonError::NoValidTaxa.into());
    }
    progress.finish_with_message(format!(
        "Tree has {} nodes ({} record(s) skipped).",
        results.node_records.len(),
        results.skipped.len()
    ));

    // 4. Output
    let format = cli
        .format
        .or_else(|| OutputFormat::from_extension(&cli.output))
        .unwrap_or(OutputFormat::Html);
    let progress = spinner("cyan", "Writing output...");
    let text = match format {
        OutputFormat::Html => {
            let title = cli.title.clone().unwrap_or_else(|| {
                cli.input
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "countree".to_string())
            });
            results.get_html(&title)?
        }
        OutputFormat::Json => results.get_json()?,
        OutputFormat::Tsv => results.get_report()?,
    };
    if let Some(parent) = cli.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&cli.output, text)?;
    progress.finish_with_message(format!("Wrote {}.", cli.output.display()));

    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
