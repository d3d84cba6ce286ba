use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args as ClapArgs, Parser, Subcommand};
use msc_core::errors::{ErrorInfo, MscError};
use msc_core::{RngHandle, TimeTree};
use msc_mcmc::{
    run, CoordinatedExponential, RootHeightPrior, RunConfig, RunSummary, ShiftProposal,
};
use msc_tree::{
    check_heights, leaf_descendants, newick, tree_from_json, tree_to_json, trees_from_json,
    trees_to_json, TaxonMap, TreeImpl,
};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "msc-sim", about = "Coordinated species-root height sampler CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the sampler against the root-height prior.
    Run(RunArgs),
    /// Apply a single coordinated shift and report it.
    Propose(ProposeArgs),
}

#[derive(ClapArgs, Debug)]
struct TreeInputs {
    /// Species tree in Newick format, or in the JSON tree format for `.json` files.
    #[arg(long)]
    species: PathBuf,
    /// Gene trees in Newick format, one `;`-terminated tree per line, or a JSON
    /// array of trees for `.json` files.
    #[arg(long)]
    genes: PathBuf,
    /// JSON object mapping each species to its gene-tree taxa.
    #[arg(long)]
    taxa: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
struct RunArgs {
    /// YAML configuration describing the run.
    #[arg(long)]
    config: PathBuf,
    #[command(flatten)]
    trees: TreeInputs,
    /// Output JSON file for the run summary and final trees.
    #[arg(long)]
    out: PathBuf,
    /// Directory receiving the final trees as `species.json` and `genes.json`.
    #[arg(long)]
    trees_out: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
struct ProposeArgs {
    /// YAML configuration providing the operator settings.
    #[arg(long)]
    config: PathBuf,
    #[command(flatten)]
    trees: TreeInputs,
    /// Exponential draw to use instead of sampling one.
    #[arg(long)]
    draw: Option<f64>,
    /// Output JSON file for the proposal and shifted trees.
    #[arg(long)]
    out: PathBuf,
    /// Directory receiving the shifted trees as `species.json` and `genes.json`.
    #[arg(long)]
    trees_out: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct RunReport {
    summary: RunSummary,
    species_tree: String,
    gene_trees: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ProposeReport {
    proposal: ShiftProposal,
    species_tree: String,
    gene_trees: Vec<String>,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run_sampler(args),
        Command::Propose(args) => run_propose(args),
    }
}

fn run_sampler(args: RunArgs) -> Result<(), Box<dyn Error>> {
    let config = RunConfig::load(&args.config)?;
    let (mut species, mut genes, taxa) = load_trees(&args.trees)?;
    let prior = RootHeightPrior::from_config(&config.root_prior)?;

    let summary = run(&config, &mut species, &mut genes, &taxa, prior)?;
    let report = RunReport {
        summary,
        species_tree: newick::write(&species),
        gene_trees: genes.iter().map(newick::write).collect(),
    };
    write_json(&args.out, &report)?;
    if let Some(dir) = &args.trees_out {
        write_trees(dir, &species, &genes)?;
    }
    info!(out = %args.out.display(), "wrote run report");
    Ok(())
}

fn run_propose(args: ProposeArgs) -> Result<(), Box<dyn Error>> {
    let config = RunConfig::load(&args.config)?;
    let (mut species, mut genes, taxa) = load_trees(&args.trees)?;
    let operator = CoordinatedExponential::new(&config.coordinated)?;

    let proposal = match args.draw {
        Some(draw) => operator.propose_with_draw(&mut species, &mut genes, &taxa, draw)?,
        None => {
            let mut rng = RngHandle::from_seed(config.seed_policy.master_seed);
            operator.propose(&mut species, &mut genes, &taxa, &mut rng)?
        }
    };
    let report = ProposeReport {
        proposal,
        species_tree: newick::write(&species),
        gene_trees: genes.iter().map(newick::write).collect(),
    };
    write_json(&args.out, &report)?;
    if let Some(dir) = &args.trees_out {
        write_trees(dir, &species, &genes)?;
    }
    Ok(())
}

fn load_trees(inputs: &TreeInputs) -> Result<(TreeImpl, Vec<TreeImpl>, TaxonMap), Box<dyn Error>> {
    let species_text = fs::read_to_string(&inputs.species)?;
    let species = if is_json(&inputs.species) {
        tree_from_json(&species_text)?
    } else {
        newick::parse(species_text.trim())?
    };
    let genes_text = fs::read_to_string(&inputs.genes)?;
    let genes = if is_json(&inputs.genes) {
        trees_from_json(&genes_text)?
    } else {
        newick::parse_many(&genes_text)?
    };
    check_heights(&species)?;
    for gene in &genes {
        check_heights(gene)?;
    }
    let taxa = match &inputs.taxa {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => TaxonMap::new(),
    };
    check_coverage(&species, &genes, &taxa)?;
    info!(
        species_leaves = species.leaf_count(),
        gene_trees = genes.len(),
        "loaded trees"
    );
    Ok((species, genes, taxa))
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Every gene-tree tip must belong to some species of the species tree.
fn check_coverage(
    species: &TreeImpl,
    genes: &[TreeImpl],
    taxa: &TaxonMap,
) -> Result<(), MscError> {
    let covered = leaf_descendants(species, species.root(), taxa);
    for (index, gene) in genes.iter().enumerate() {
        let unmapped = gene
            .leaf_labels()
            .into_iter()
            .find(|label| !covered.contains(*label));
        if let Some(taxon) = unmapped {
            return Err(MscError::Tree(
                ErrorInfo::new("unmapped-taxon", "gene-tree taxon belongs to no species")
                    .with_context("taxon", taxon)
                    .with_context("tree_index", index.to_string())
                    .with_hint("list the taxon under its species in the --taxa file"),
            ));
        }
    }
    Ok(())
}

fn write_trees(
    dir: &Path,
    species: &TreeImpl,
    genes: &[TreeImpl],
) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(dir)?;
    fs::write(dir.join("species.json"), tree_to_json(species)?)?;
    fs::write(dir.join("genes.json"), trees_to_json(genes)?)?;
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}
