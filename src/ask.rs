//! `pdfqa ask`: retrieve context and answer a question.

use anyhow::Result;

use pdfqa_core::models::Answer;

use crate::app::App;
use crate::config::Config;
use crate::preview::one_line;

/// Longest passage excerpt printed with `--show-sources`.
const SOURCE_PREVIEW_CHARS: usize = 240;

pub async fn run_ask(
    config: &Config,
    question: &str,
    doc_id: Option<&str>,
    k: Option<usize>,
    show_sources: bool,
) -> Result<()> {
    let app = App::open(config).await?;
    let k = k.unwrap_or(config.retrieval.top_k);
    let answer = app.pipeline.answer_query(question, doc_id, k).await?;
    print!("{}", render_answer(&answer, show_sources));
    Ok(())
}

pub fn render_answer(answer: &Answer, show_sources: bool) -> String {
    let mut out = format!("{}\n", answer.answer);
    if show_sources && !answer.sources.is_empty() {
        out.push_str("\nSources:\n");
        for (i, source) in answer.sources.iter().enumerate() {
            out.push_str(&format!(
                "  {}. [{}#{}] distance={:.4}\n     {}\n",
                i + 1,
                source.passage.source_doc_id,
                source.passage.ordinal,
                source.score,
                one_line(&source.passage.text, SOURCE_PREVIEW_CHARS)
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfqa_core::models::{Passage, ScoredPassage};

    fn answer() -> Answer {
        Answer {
            answer: "Twelve months.".to_string(),
            sources: vec![ScoredPassage {
                passage: Passage {
                    text: "The warranty\nlasts twelve months.".to_string(),
                    source_doc_id: "1a2b3c4d_manual.pdf".to_string(),
                    ordinal: 2,
                },
                score: 0.25,
            }],
        }
    }

    #[test]
    fn test_render_without_sources() {
        assert_eq!(render_answer(&answer(), false), "Twelve months.\n");
    }

    #[test]
    fn test_render_with_sources() {
        let out = render_answer(&answer(), true);
        assert!(out.contains("Sources:"));
        assert!(out.contains("[1a2b3c4d_manual.pdf#2] distance=0.2500"));
        assert!(out.contains("The warranty lasts twelve months."));
    }
}
