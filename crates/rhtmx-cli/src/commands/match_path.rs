use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use rhtmx_routes::{BuildOutput, MatchStatus, Matcher, Method};

pub fn execute(out_dir: &Path, path: &str, method: Method) -> Result<()> {
    let output = BuildOutput::read_from(out_dir)
        .with_context(|| format!("No route manifest in {:?}; run `rhtmx-routes build` first", out_dir))?;
    let matcher = Matcher::new(&output.manifest);

    let Some(found) = matcher.match_path(path, method) else {
        println!("{} {} {}", "✗".red(), method, path);
        println!("No route and no not-found boundary matches");
        return Ok(());
    };

    let status = match found.status {
        MatchStatus::Found => found.status.code().to_string().green(),
        MatchStatus::NotFound => found.status.code().to_string().yellow(),
    };

    println!("{} {} {}", status, method, path);
    println!("  Route: {}", found.entry.path().cyan());
    println!("  Entry: {}", found.entry.id());

    if !found.params.is_empty() {
        let mut params: Vec<_> = found.params.iter().collect();
        params.sort();
        println!("  Params:");
        for (name, value) in params {
            println!("    {} = {}", name, value);
        }
    }

    if let Some(page) = found.entry.as_page() {
        let boundaries = page.not_found.iter().flatten().count();
        println!("  Layouts: {}", page.layouts.iter().flatten().count());
        println!("  Not-found boundaries: {}", boundaries);
    }

    Ok(())
}
