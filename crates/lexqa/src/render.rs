//! Plain and JSON renderings of CLI results.

use std::fmt::Write;

use lexqa_core::corpus::Passage;
use lexqa_core::{Answer, QueryOutcome};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Plain,
    Json,
}

/// The answer page: heading, then one block per passage.
pub fn answers_plain(answers: &[Answer]) -> String {
    let mut out = String::from("Answer\n\n");
    for answer in answers {
        let _ = writeln!(out, "**{}**", answer.reference);
        let _ = writeln!(out, "{}", answer.text);
        let _ = writeln!(out, "View full law: {}", answer.url);
        let _ = writeln!(out, "---");
    }
    out
}

pub fn outcome_plain(outcome: &QueryOutcome) -> String {
    match outcome {
        QueryOutcome::Results { answers } => answers_plain(answers),
        QueryOutcome::NoQuery => "Please enter a question.\n".to_string(),
        QueryOutcome::NoResults => "No relevant passages found.\n".to_string(),
        QueryOutcome::Failed { message, .. } => {
            format!("Something went wrong: {message}. Please try again.\n")
        }
    }
}

#[derive(Serialize)]
struct PassageRow<'a> {
    index: usize,
    reference: &'a str,
    text: &'a str,
    url: &'a str,
}

pub fn passages_plain(passages: &[Passage]) -> String {
    let mut out = String::new();
    for (index, passage) in passages.iter().enumerate() {
        let _ = writeln!(out, "[{index}] {}", passage.reference);
        let _ = writeln!(out, "    {}", passage.text);
    }
    out
}

pub fn passages_json(passages: &[Passage]) -> serde_json::Result<String> {
    let rows: Vec<PassageRow<'_>> = passages
        .iter()
        .enumerate()
        .map(|(index, p)| PassageRow {
            index,
            reference: &p.reference,
            text: &p.text,
            url: &p.url,
        })
        .collect();
    serde_json::to_string_pretty(&rows)
}

#[derive(Debug, Serialize)]
pub struct Stats {
    pub laws: usize,
    pub articles: usize,
    pub passages: usize,
    pub embedder: String,
    pub tier: String,
    pub dimension: usize,
    pub default_k: usize,
}

pub fn stats_plain(stats: &Stats) -> String {
    format!(
        "laws:      {}\narticles:  {}\npassages:  {}\nembedder:  {} ({})\ndimension: {}\ntop_k:     {}\n",
        stats.laws,
        stats.articles,
        stats.passages,
        stats.embedder,
        stats.tier,
        stats.dimension,
        stats.default_k
    )
}
