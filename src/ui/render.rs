//! Plain-text renderers for panel content.

use crate::client::{
    CollectionInfo, HealthStatus, QueryResponse, ReadinessStatus, SearchResults, Source,
    UploadResponse,
};
use serde_json::Value;
use std::fmt::Write as _;

const PROGRESS_WIDTH: usize = 30;
const SNIPPET_CHARS: usize = 280;

/// Inline error alert.
pub fn alert(message: &str) -> String {
    format!("[error] {message}")
}

/// Textual progress bar, e.g. `[#######.......] 50%`.
pub fn progress_bar(percent: f64) -> String {
    let percent = percent.clamp(0.0, 100.0);
    let filled = ((percent / 100.0) * PROGRESS_WIDTH as f64).round() as usize;
    format!(
        "[{}{}] {:.0}%",
        "#".repeat(filled),
        ".".repeat(PROGRESS_WIDTH - filled),
        percent
    )
}

/// Success summary of an upload.
pub fn upload_summary(response: &UploadResponse) -> String {
    let mut out = format!("Uploaded {}\n", response.filename);
    for (key, value) in &response.details {
        let _ = writeln!(out, "  {}: {}", humanize(key), display_value(value));
    }
    out
}

/// Collection statistics.
pub fn collection_info(info: &CollectionInfo) -> String {
    format!(
        "Collection: {}\nDocuments:  {}\nStatus:     {}\n",
        info.collection_name, info.total_documents, info.status
    )
}

/// Answer with its optional sources and evaluation blocks.
pub fn answer(response: &QueryResponse) -> String {
    let mut out = format!("Answer\n{}\n", response.answer.trim());

    if let Some(sources) = response.sources.as_ref().filter(|sources| !sources.is_empty()) {
        let _ = writeln!(out, "\nSources ({})", sources.len());
        write_sources(&mut out, sources);
    }

    if let Some(evaluation) = response.evaluation.as_ref().filter(|eval| !eval.is_empty()) {
        out.push_str("\nEvaluation\n");
        for (metric, value) in evaluation {
            let _ = writeln!(out, "  {}: {}", humanize(metric), display_value(value));
        }
    }

    out
}

/// Hits of a search-only request.
pub fn search_results(results: &SearchResults) -> String {
    if results.results.is_empty() {
        return "No matching documents found\n".to_string();
    }
    let mut out = format!("Results ({})\n", results.results.len());
    write_sources(&mut out, &results.results);
    out
}

fn write_sources(out: &mut String, sources: &[Source]) {
    for (index, source) in sources.iter().enumerate() {
        let _ = write!(out, "  [{}]", index + 1);
        if let Some(origin) = source.origin() {
            let _ = write!(out, " {origin}");
        }
        if let Some(score) = source.score {
            let _ = write!(out, " (score {score:.3})");
        }
        let _ = writeln!(out, "\n      {}", snippet(&source.content));
    }
}

/// Liveness details.
pub fn health(status: &HealthStatus) -> String {
    let mut out = format!("Status:    {}\n", status.status);
    if let Some(version) = &status.version {
        let _ = writeln!(out, "Version:   {version}");
    }
    if let Some(timestamp) = &status.timestamp {
        let _ = writeln!(out, "Timestamp: {timestamp}");
    }
    out
}

/// Readiness details.
pub fn readiness(status: &ReadinessStatus) -> String {
    let mut out = format!(
        "Status:    {}\nQdrant:    {}\n",
        status.status,
        if status.qdrant_connected {
            "connected"
        } else {
            "disconnected"
        }
    );
    if let Some(collection) = &status.collection_info {
        let _ = writeln!(
            out,
            "Collection: {} ({} points)",
            collection.name, collection.points_count
        );
    }
    if let Some(timestamp) = &status.timestamp {
        let _ = writeln!(out, "Timestamp: {timestamp}");
    }
    out
}

fn snippet(text: &str) -> String {
    let flattened = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flattened.chars().count() <= SNIPPET_CHARS {
        return flattened;
    }
    let cut: String = flattened.chars().take(SNIPPET_CHARS).collect();
    format!("{}...", cut.trim_end())
}

fn humanize(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => match number.as_f64() {
            Some(float) if number.is_f64() => format!("{float:.3}"),
            _ => number.to_string(),
        },
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn progress_bar_is_clamped() {
        assert_eq!(progress_bar(0.0), format!("[{}] 0%", ".".repeat(30)));
        assert_eq!(progress_bar(150.0), format!("[{}] 100%", "#".repeat(30)));
        assert!(progress_bar(50.0).ends_with("] 50%"));
    }

    #[test]
    fn answer_lists_sources_and_evaluation() {
        let response: QueryResponse = serde_json::from_value(json!({
            "answer": "Y",
            "sources": [
                { "content": "first passage", "score": 0.91, "metadata": { "source": "a.pdf" } },
                { "content": "second passage" }
            ],
            "evaluation": { "faithfulness": 0.8, "verdict": "grounded" }
        }))
        .expect("response");

        let text = answer(&response);
        assert!(text.starts_with("Answer\nY\n"));
        assert!(text.contains("Sources (2)"));
        assert!(text.contains("[1] a.pdf (score 0.910)"));
        assert!(text.contains("Evaluation"));
        assert!(text.contains("Faithfulness: 0.800"));
        assert!(text.contains("Verdict: grounded"));
    }

    #[test]
    fn empty_sources_are_omitted() {
        let response: QueryResponse =
            serde_json::from_value(json!({ "answer": "Y", "sources": [] })).expect("response");
        assert!(!answer(&response).contains("Sources"));
    }

    #[test]
    fn long_snippets_are_truncated() {
        let long = "word ".repeat(200);
        let cut = snippet(&long);
        assert!(cut.ends_with("..."));
        assert!(cut.chars().count() <= SNIPPET_CHARS + 3);
    }

    #[test]
    fn upload_summary_humanizes_keys() {
        let response: UploadResponse = serde_json::from_value(json!({
            "filename": "a.md",
            "chunks_created": 3
        }))
        .expect("upload");
        let text = upload_summary(&response);
        assert!(text.starts_with("Uploaded a.md"));
        assert!(text.contains("Chunks created: 3"));
    }
}
