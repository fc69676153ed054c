use std::process;

use clap::Parser;
use located_error::prelude::*;
use parser::{Cli, Commands};
use registry::{Registry, Service};

#[macro_use]
extern crate log;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

fn main() {
    // ----------------------------- Run CLI Parser
    let cli = Cli::parse();

    // ----------------------------- Init logger.
    logger::Logger::init(cli.verbose + u8::from(!cli.quiet));

    // ----------------------------- Serialize command line arguments
    cli.serialize();

    if let Err(e) = run(&cli) {
        error!("{e:?}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.commands {
        Commands::Gather { gather } => {
            gather::parse_genome(&gather.input, &gather.output, gather.species_id, &gather.pam)?;
            Ok(())
        }
        Commands::Index { index } => run_index(index),
        Commands::Search { search } => run_search(search),
        Commands::Align { align } => run_align(align),
    }
}

fn run_index(args: &parser::Index) -> Result<()> {
    let template = index_store::Metadata::new(
        args.seq_length,
        args.offset,
        args.species_id,
        &args.species,
        &args.assembly,
    )?;
    index_store::IndexStore::build(&args.inputs, &args.output, &template)?;
    Ok(())
}

/// Load the requested index (or every configured one) into a fresh
/// registry and wrap it in the service adapter.
fn load_service(source: &parser::IndexSource) -> Result<Service> {
    let registry = match (&source.config, &source.index) {
        (Some(config), _) => Registry::from_config(config)?,
        (None, Some(index)) => {
            let registry = Registry::new();
            registry.load(&source.species, index)?;
            registry
        }
        (None, None) => bail!("Please provide either --index or --config"),
    };
    Ok(Service::new(registry))
}

fn run_search(args: &parser::Search) -> Result<()> {
    let service = load_service(&args.source)?;
    let matches = service.search(&args.source.species, &args.seq, args.pam_right)?;
    println!("{}", serde_json::to_string(&matches)?);
    Ok(())
}

fn run_align(args: &parser::Align) -> Result<()> {
    let service = load_service(&args.source)?;
    let species = &args.source.species;

    if let Some(seq) = &args.seq {
        let record = service.off_targets_by_seq(species, seq, args.pam_right)?;
        println!("{}", serde_json::to_string(&record)?);
        return Ok(());
    }

    if args.ids.is_empty() {
        bail!("Please provide ids or a sequence");
    }

    // One JSON object keyed by id, entries in request order.
    let records = service.off_targets_by_ids(species, &args.ids, !args.summary_only)?;
    let entries = records
        .iter()
        .map(|record| Ok(format!("\"{}\":{}", record.id, serde_json::to_string(record)?)))
        .collect::<Result<Vec<String>>>()?;
    println!("{{{}}}", entries.join(","));
    Ok(())
}
