//! Prompt templates for grounded answering and for document summaries.

use docqa_core::types::ScoredChunk;

/// Grounded QA prompt: retrieved chunk texts, in rank order, then the question.
pub fn qa_prompt(context: &[ScoredChunk], question: &str) -> String {
    let context = context.iter().map(|c| c.chunk.text.as_str()).collect::<Vec<_>>().join("\n\n");
    format!(
        "Use the following pieces of context to answer the question at the end.\n\
         If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\
         \n\
         {context}\n\
         \n\
         Question: {question}\n\
         Answer:"
    )
}

pub fn summary_prompt(text: &str) -> String {
    format!(
        "Write a concise summary of the following in passive voice no more than 150 words.\n\
         Example of a passive voice sentence: The package was delivered by the courier to the recipient's address.\n\
         Include key details such as the main findings and implications of the text.\n\
         \n\
         {text}\n\
         \n\
         Example response:\n\
         A pipeline was proposed to generate a high-quality multi-turn chat corpus using ChatGPT to converse with itself. \
         The resulting Baize model demonstrated good performance in multi-turn dialogues with guardrails that minimize potential risks. \
         Baize model and data were released for research purposes only.\n"
    )
}
