use anyhow::{Context, Result};
use colored::Colorize;
use rhtmx_routes::{Config, ManifestBuilder, Scanner};

pub async fn execute(config: &Config) -> Result<()> {
    let app_dir = &config.routing.app_dir;
    let out_dir = &config.build.out_dir;

    println!("{}", "Building routes...".green().bold());
    println!();
    println!("App: {}", app_dir.display().to_string().cyan());
    println!(
        "Prerender all: {}",
        if config.build.prerender_all { "Yes" } else { "No" }
    );
    println!();

    let scanned = Scanner::new(app_dir.clone(), config.routing.clone())
        .scan()
        .with_context(|| format!("Failed to scan app directory {:?}", app_dir))?;

    let output = ManifestBuilder::from_config(&config.build)
        .build(&scanned)
        .await
        .context("Failed to build route manifest")?;

    output
        .validate()
        .context("Route manifest references unknown modules")?;

    output
        .write_to(out_dir)
        .with_context(|| format!("Failed to write route output to {:?}", out_dir))?;

    println!("  {} {} routes", "✓".green(), output.manifest.len());
    println!(
        "  {} {} modules ({} eager, {} deferred)",
        "✓".green(),
        output.imports.len(),
        output.imports.static_imports.len(),
        output.imports.dynamic_imports.len()
    );
    println!("  {} {} prerender paths", "✓".green(), output.prerender.len());
    println!();
    println!(
        "{} {}",
        "Wrote".green().bold(),
        out_dir.display().to_string().cyan()
    );

    Ok(())
}
