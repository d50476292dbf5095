use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufWriter, Write};

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use octree_engine::config::{AppConfig, CliArgs};
use octree_engine::session::{Command, Reply, Session};
use octree_engine::{Octree, Point, ingestion, render};

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // Init tracing
    let filter = if args.verbose {
        EnvFilter::new("octree_engine=debug")
    } else {
        EnvFilter::new("octree_engine=info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config: AppConfig = args.into();

    let mut tree = Octree::with_config(Point::default(), config.octree.clone())
        .context("Invalid octree configuration")?;

    if let Some(input) = &config.input {
        let stats = ingestion::load_points(input, &mut tree)
            .with_context(|| format!("Failed to load points from {}", input.display()))?;
        println!(
            "Loaded {} points from {} lines ({} duplicates skipped, {} rejected)",
            stats.inserted, stats.lines, stats.duplicates, stats.rejected
        );
    }

    write_tree_dump(&config, &tree)?;
    println!(
        "Octree structure has been written to {}",
        config.tree_out.display()
    );

    if let Some(addr) = &config.serve {
        return serve(addr, tree, &config);
    }

    match run_session(&config, tree) {
        Ok(tree) => {
            println!(
                "Done: {} points in {} nodes, {} leaves (depth {})",
                tree.len(),
                tree.node_count(),
                tree.leaf_count(),
                tree.max_depth_reached()
            );
            Ok(())
        }
        Err(e) => {
            error!(%e, "Session failed");
            Err(e).context("octree-engine session failed")
        }
    }
}

/// Read commands from stdin until `q` or end of input.
fn run_session(config: &AppConfig, tree: Octree) -> anyhow::Result<Octree> {
    let mut session = Session::new(tree, config.session.clone());
    if let Some(p) = config.select {
        println!("{}", session.select(p));
    }

    let mut range_out = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.range_out)
        .with_context(|| format!("Failed to open {}", config.range_out.display()))?;

    prompt()?;
    for line in io::stdin().lock().lines() {
        let line = line.context("Failed to read command")?;
        if line.trim().is_empty() {
            prompt()?;
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                println!("Invalid command: {e}");
                prompt()?;
                continue;
            }
        };

        let reply = session.apply(command);
        println!("{reply}");

        match &reply {
            Reply::Range(points) => {
                render::write_range_query(points, &mut range_out)?;
                println!(
                    "Points within the specified cube have been written to {}",
                    config.range_out.display()
                );
            }
            Reply::Print => write_tree_dump(config, session.tree())?,
            Reply::Quit => break,
            _ => {}
        }
        if reply.mutated() {
            write_tree_dump(config, session.tree())?;
        }
        prompt()?;
    }

    Ok(session.into_tree())
}

fn prompt() -> io::Result<()> {
    print!("> ");
    io::stdout().flush()
}

/// Rewrite the tree dump file (text or JSON).
fn write_tree_dump(config: &AppConfig, tree: &Octree) -> anyhow::Result<()> {
    let file = File::create(&config.tree_out)
        .with_context(|| format!("Failed to create {}", config.tree_out.display()))?;
    let mut w = BufWriter::new(file);
    if config.json {
        render::write_tree_json(tree, &mut w)?;
    } else {
        render::write_tree(tree, &mut w)?;
    }
    w.flush()?;
    Ok(())
}

#[cfg(feature = "server")]
fn serve(addr: &str, tree: Octree, config: &AppConfig) -> anyhow::Result<()> {
    info!(addr, "Starting HTTP service");
    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    runtime
        .block_on(octree_engine::server::serve(addr, tree, config.session.clone()))
        .context("HTTP service failed")
}

#[cfg(not(feature = "server"))]
fn serve(addr: &str, _tree: Octree, _config: &AppConfig) -> anyhow::Result<()> {
    info!(addr, "HTTP service requested");
    anyhow::bail!("--serve requires a build with the `server` feature")
}
