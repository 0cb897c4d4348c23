use application::compare_service::CompareReport;
use application::embed_service::EmbedReport;
use colored::Colorize;
use domain::metrics::BenchmarkResult;
use domain::similarity::MatchResult;
use std::fmt::Write;

const PREVIEW_LEN: usize = 5;
pub const CHUNK_SEPARATOR: &str = "****************";

fn preview(vector: &[f32], verbose: bool) -> String {
    if verbose || vector.len() <= PREVIEW_LEN {
        return format!("{vector:?}");
    }
    let head: Vec<String> = vector[..PREVIEW_LEN].iter().map(|v| format!("{v:?}")).collect();
    format!("[{}, ...]", head.join(", "))
}

pub fn render_embeddings(report: &EmbedReport, verbose: bool) -> String {
    let mut out = String::new();
    for (i, vector) in report.vectors.iter().enumerate() {
        let _ = writeln!(
            out,
            "{} {} dimensions {}",
            format!("[{i}]").blue(),
            vector.len(),
            preview(vector, verbose)
        );
    }
    let _ = writeln!(out, "request took {:?}", report.elapsed);
    out
}

fn render_match(result: &MatchResult) -> String {
    match result {
        MatchResult::Exact(report) if report.matched => "Embeddings match".green().to_string(),
        MatchResult::Exact(report) => format!(
            "{} ({} values differ, first at index {})",
            "Embeddings match fail".red(),
            report.differing,
            report
                .first_difference
                .map(|i| i.to_string())
                .unwrap_or_else(|| "-".into())
        ),
        MatchResult::Cosine { similarity } => {
            format!("{} {similarity:.6}", "Cosine similarity:".yellow())
        }
    }
}

pub fn render_comparison(report: &CompareReport, verbose: bool) -> String {
    let mut out = String::new();
    if verbose {
        for rows in &report.embeddings {
            for (row, embedding) in rows.iter().enumerate() {
                let _ = writeln!(
                    out,
                    "{} row {row}: {}",
                    embedding.source.bold(),
                    preview(&embedding.vector, true)
                );
            }
        }
    }
    for comparison in &report.comparisons {
        let _ = writeln!(
            out,
            "{} {} vs {}: {}",
            format!("[row {}]", comparison.row).blue(),
            comparison.reference,
            comparison.candidate,
            render_match(&comparison.result)
        );
    }
    match report.verdict() {
        Some(true) => {
            let _ = writeln!(out, "{}", "Embeddings match".green().bold());
        }
        Some(false) => {
            let _ = writeln!(out, "{}", "Embeddings match fail".red().bold());
        }
        None => {}
    }
    out
}

/// Timing summary. Streamed content was already printed chunk by chunk.
pub fn render_benchmark(result: &BenchmarkResult) -> String {
    let mut out = String::new();
    if !result.streaming {
        let _ = writeln!(out, "{}", "Chat completion results:".green());
        let _ = writeln!(out, "{}", result.content);
    } else {
        let _ = writeln!(out);
        let _ = writeln!(out, "Tokens received: {}", result.chunk_count.unwrap_or(0));
        if let Some(first) = result.first_response_time {
            let _ = writeln!(
                out,
                "First response received {:.2} seconds after request",
                first.as_secs_f64()
            );
        }
    }
    let _ = writeln!(
        out,
        "Full response received {:.2} seconds after request",
        result.response_time.as_secs_f64()
    );
    if let Some(rate) = result.tokens_per_second {
        let _ = writeln!(out, "{} {rate:.2}", "Tokens per second:".green().bold());
    }
    out
}

pub fn render_models(models: &[String]) -> String {
    let mut out = String::new();
    for model in models {
        let _ = writeln!(out, "{model}");
    }
    out
}
