use std::{fs, io::Write, path::Path, rc::Rc};

use anyhow::Context;
use bibsync::{
    identifier::Identifiers,
    output,
    pipeline::{Outcome, Pipeline},
    seed::{BibtexSeedFile, JsonSeedFile, Seed, collect_seeds},
    source::http::{HttpClient, Offline, Transport},
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, ResolveArgs, Source};

mod cli;

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_tracing(args.verbose);
    match args.command {
        Command::Resolve(args) => resolve(&args),
        Command::Identify { text } => {
            identify(&text);
            Ok(())
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve(args: &ResolveArgs) -> anyhow::Result<()> {
    let config = args.config()?;
    let seeds = load_seeds(&args.from)?;
    info!(author = ?config.author_id, seeds = seeds.len(), "starting run");

    let transport: Rc<dyn Transport> = if args.offline {
        Rc::new(Offline)
    } else {
        Rc::new(HttpClient::new(config.timeout, config.mailto.as_deref()))
    };
    let pipeline = Pipeline::new(config, transport);

    let pb = ProgressBar::new(seeds.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {wide_bar:.cyan/blue} {pos}/{len} {msg}")
            .context("invalid progress template")?,
    );
    let run = pipeline.run(&seeds, |seed, outcome| {
        if let Outcome::Resolved { key, .. } = outcome {
            pb.set_message(key.clone());
        } else {
            pb.set_message(seed.title.chars().take(40).collect::<String>());
        }
        pb.inc(1);
    })?;
    pb.finish_and_clear();

    let config = pipeline.config();
    let rendered = output::render(&run.records, config.format, chrono::Utc::now());
    match &config.out {
        Some(path) => write_output(path, &rendered)?,
        None => std::io::stdout()
            .write_all(rendered.as_bytes())
            .context("failed to write to stdout")?,
    }

    let mut summary = format!(
        "{} {}",
        format!("✓ {}", run.resolved).green(),
        format!("✗ {}", run.failed).red()
    );
    if run.skipped > 0 {
        summary.push_str(&format!(" {}", format!("skipped {}", run.skipped).dimmed()));
    }
    if let Some(path) = &config.out {
        summary.push_str(&format!(" -> {}", path.display()));
    }
    eprintln!("{summary}");
    Ok(())
}

fn load_seeds(from: &[Source]) -> anyhow::Result<Vec<Seed>> {
    let mut seeds = Vec::new();
    for src in from {
        match src {
            Source::Identifier(id) => seeds.push(Seed::from_argument(id)),
            Source::File(path) => {
                let found = match path.extension().and_then(|e| e.to_str()) {
                    Some(ext) if ext.eq_ignore_ascii_case("bib") => {
                        collect_seeds(&mut BibtexSeedFile::new(path))
                    }
                    _ => collect_seeds(&mut JsonSeedFile::new(path)),
                };
                seeds.extend(found.with_context(|| format!("failed to load {}", path.display()))?);
            }
        }
    }
    Ok(seeds)
}

fn write_output(path: &Path, rendered: &str) -> anyhow::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }
    fs::write(path, rendered).with_context(|| format!("failed to write {}", path.display()))
}

fn identify(texts: &[String]) {
    for text in texts {
        let ids = Identifiers::scan(&Seed {
            link: text.clone(),
            ..Seed::default()
        });
        let doi = ids.doi.as_deref().unwrap_or("-");
        let preprint = ids.preprint.as_deref().unwrap_or("-");
        println!("{text}\tdoi={doi}\tarxiv={preprint}");
    }
}
