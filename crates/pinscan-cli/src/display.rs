use colored::*;
use pinscan_core::scanner::ScanSummary;
use pinscan_core::{Dependency, DependencyKind, HygieneGrade};
use std::collections::BTreeMap;

/// Print a full scan report to the terminal.
pub fn print_scan_report(summary: &ScanSummary, show_errors: bool) {
    println!();
    println!(
        "{}",
        format!(
            " pinscan v{} — Scanning {}",
            env!("CARGO_PKG_VERSION"),
            summary.root
        )
        .bold()
    );
    println!();

    println!(" {}", "Repository Surface".bold().underline());
    println!(" {} {} files analyzed", "|-".dimmed(), summary.files_scanned);
    println!(
        " {} {} external dependencies ({} pinned, {} unpinned)",
        "|-".dimmed(),
        summary.report.dependencies.len(),
        summary.report.pinned_count(),
        summary.report.unpinned_count()
    );
    println!();

    println!(" {}", "=".repeat(60).dimmed());
    println!();

    if summary.report.dependencies.is_empty() {
        println!(
            " {} No external dependencies detected in build, CI, or container files.",
            "OK".green().bold()
        );
    } else {
        for (path, deps) in by_file(&summary.report.dependencies) {
            println!(" {}", path.bold());
            for dep in deps {
                print_dependency(dep);
            }
            println!();
        }
    }

    if show_errors && !summary.report.errors.is_empty() {
        println!(" {}", "Skipped files".bold().underline());
        for error in &summary.report.errors {
            println!(" {} {}: {}", "|-".dimmed(), error.path, error.reason.dimmed());
        }
        println!();
    }

    println!(" {}", "=".repeat(60).dimmed());
    println!();
    print_score(summary);
}

fn by_file(dependencies: &[Dependency]) -> BTreeMap<&str, Vec<&Dependency>> {
    let mut grouped: BTreeMap<&str, Vec<&Dependency>> = BTreeMap::new();
    for dep in dependencies {
        grouped.entry(dep.location.path.as_str()).or_default().push(dep);
    }
    grouped
}

fn print_dependency(dep: &Dependency) {
    let status = if dep.kind.is_insecure_fetch() {
        " INSECURE ".on_red().white().bold().to_string()
    } else if dep.pinned {
        " pinned ".green().to_string()
    } else {
        " UNPINNED ".on_yellow().black().bold().to_string()
    };

    let reference = match (&dep.name, &dep.pinned_at) {
        (Some(name), Some(at)) => format!("{name}@{at}"),
        (Some(name), None) => name.clone(),
        _ => dep.location.snippet.clone(),
    };

    println!(
        "   {} L{:<4} {} {} {}",
        "|".dimmed(),
        dep.location.start_line,
        status,
        dep.kind.label().cyan(),
        reference
    );
}

/// Print the hygiene score block.
pub fn print_score(summary: &ScanSummary) {
    let score = &summary.score;
    let total = format!("{:.0}", score.total_score);
    let total = match score.grade {
        HygieneGrade::Excellent | HygieneGrade::Good => total.green().bold(),
        HygieneGrade::Fair => total.yellow().bold(),
        HygieneGrade::Poor | HygieneGrade::Critical => total.red().bold(),
    };

    println!(" {}", "Hygiene Score".bold().underline());
    println!(
        " {} {}/100 ({})",
        "|-".dimmed(),
        total,
        score.grade.label().cyan()
    );
    println!(
        " {} Pinning: {:.0}/100 | Insecure downloads: {:.0}/100",
        "|-".dimmed(),
        score.pinning_score,
        score.insecure_download_score
    );
    for recommendation in &score.recommendations {
        println!(" {} {}", "|-".dimmed(), recommendation.dimmed());
    }

    let insecure = summary.report.count_of(DependencyKind::DownloadThenRun);
    if insecure > 0 {
        println!();
        println!(
            " {} {} download-then-run pattern(s) execute remote code unverified",
            "!".red().bold(),
            insecure.to_string().red().bold()
        );
    }
    println!();
}
