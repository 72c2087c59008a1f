use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use rhtmx_routes::{BuildOutput, Entry};

pub fn execute(out_dir: &Path) -> Result<()> {
    let output = BuildOutput::read_from(out_dir)
        .with_context(|| format!("No route manifest in {:?}; run `rhtmx-routes build` first", out_dir))?;

    if output.manifest.is_empty() {
        println!("{}", "No routes".yellow());
        return Ok(());
    }

    println!(
        "{:<32} {:<9} {:<8} {:<20} {}",
        "PATH".bold(),
        "KIND".bold(),
        "METHOD".bold(),
        "ID".bold(),
        "FLAGS".bold()
    );

    for entry in output.manifest.entries() {
        let (kind, flags) = match entry {
            Entry::Page(page) => {
                let mut flags = Vec::new();
                if page.page.is_none() {
                    flags.push("layout-only");
                }
                if page.prerender {
                    flags.push("prerender");
                }
                if page.catch_all {
                    flags.push("catch-all");
                } else if page.dynamic {
                    flags.push("dynamic");
                }
                ("page", flags.join(","))
            }
            Entry::Endpoint(_) => ("endpoint", String::new()),
        };

        println!(
            "{:<32} {:<9} {:<8} {:<20} {}",
            entry.path().cyan(),
            kind,
            entry.method().to_string(),
            entry.id().dimmed(),
            flags
        );
    }

    println!();
    println!(
        "{} routes, {} prerender paths",
        output.manifest.len(),
        output.prerender.len()
    );

    Ok(())
}
