// Colored terminal output for similarity reports.
//
// This module handles all terminal-specific formatting: colors, tables,
// summary lines. The main.rs display paths delegate here.

use colored::Colorize;

use crate::table::similarity::SimilarityMatrix;

/// Display the most similar source pairs from a scored matrix.
pub fn display_similarity_report(matrix: &SimilarityMatrix, limit: usize) {
    if matrix.is_empty() {
        println!("Similarity matrix is empty; nothing to report.");
        return;
    }

    let pairs = matrix.top_pairs(limit);
    println!(
        "\n{}",
        format!(
            "=== Similarity Report ({} sources, top {} pairs) ===",
            matrix.len(),
            pairs.len()
        )
        .bold()
    );
    println!();

    // Header
    println!(
        "  {:>4}  {:<34} {:<34} {:>7}",
        "Rank".dimmed(),
        "Source".dimmed(),
        "Closest match".dimmed(),
        "Score".dimmed(),
    );
    println!("  {}", "-".repeat(84).dimmed());

    for (i, (a, b, score)) in pairs.iter().enumerate() {
        println!(
            "  {:>4}. {:<34} {:<34} {:>7}",
            i + 1,
            super::truncate_chars(a, 32),
            super::truncate_chars(b, 32),
            colorize_score(*score),
        );
    }

    println!();

    let strong = pairs.iter().filter(|(_, _, s)| *s >= 0.75).count();
    let moderate = pairs
        .iter()
        .filter(|(_, _, s)| *s >= 0.40 && *s < 0.75)
        .count();
    if strong > 0 {
        println!("  {} {} strongly similar pairs (>= 0.75)", "*".green().bold(), strong);
    }
    if moderate > 0 {
        println!("  {} {} moderately similar pairs (>= 0.40)", "~".yellow(), moderate);
    }
}

/// Colorize a cosine similarity score.
fn colorize_score(score: f64) -> colored::ColoredString {
    let text = format!("{score:.4}");
    if score >= 0.75 {
        text.green().bold()
    } else if score >= 0.40 {
        text.yellow()
    } else {
        text.dimmed()
    }
}
