use std::fmt::Write;

use crate::models::ScoredChunk;

/// The exact reply the model is told to give when the context has no answer.
pub const NOT_AVAILABLE_ANSWER: &str = "Answer not available in the document.";

pub const RAG_PROMPT_TEMPLATE: &str = "\
You are a precise document assistant. Answer using ONLY the context below.

Rules:
1. Start with the answer itself, no preamble.
2. Do not comment on what the context does or does not contain.
3. Use plain language; use bullets (•) for lists.
4. When quoting numbers, say what they mean.
5. Mention which source supports the answer.
6. Keep it complete but short, typically 3-5 sentences.
7. If the context does not contain the answer, reply with exactly: \"Answer not available in the document.\"

CONTEXT:
{context}

QUESTION: {question}

ANSWER:";

/// Fill the RAG template. The context is inserted before the question so a
/// question containing `{context}` cannot inject text into the template.
pub fn render_rag_prompt(context: &str, question: &str) -> String {
    let (head, tail) = RAG_PROMPT_TEMPLATE
        .split_once("{context}")
        .unwrap_or((RAG_PROMPT_TEMPLATE, ""));
    let tail = tail.replacen("{question}", &sanitize_for_prompt(question), 1);
    format!("{head}{context}{tail}")
}

/// Render retrieved chunks as numbered, whitespace-normalised sources.
pub fn format_context(hits: &[ScoredChunk]) -> String {
    if hits.is_empty() {
        return "No relevant information found.".to_string();
    }

    let mut ctx = String::new();
    for (i, hit) in hits.iter().enumerate() {
        if i > 0 {
            ctx.push_str("\n---\n");
        }
        let content = sanitize_for_prompt(&hit.chunk.text);
        let content = content.split_whitespace().collect::<Vec<_>>().join(" ");
        // Writing to a String cannot fail
        let _ = write!(
            ctx,
            "[Source {}] {} (chunk {}):\n{}",
            i + 1,
            hit.chunk.source,
            hit.chunk.index,
            content
        );
    }
    ctx
}

/// Strip chat-template control tokens so document text or questions cannot
/// open a new message turn.
pub fn sanitize_for_prompt(text: &str) -> String {
    const CONTROL_TOKENS: &[&str] = &[
        "<|im_start|>",
        "<|im_end|>",
        "<|endoftext|>",
        "<|begin_of_text|>",
        "<|start_header_id|>",
        "<|end_header_id|>",
        "<|eot_id|>",
    ];
    let mut out = text.to_string();
    for token in CONTROL_TOKENS {
        if out.contains(token) {
            out = out.replace(token, "");
        }
    }
    out
}

/// Cut `s` to at most `max_chars` characters.
pub fn truncate_to_char_boundary(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
