//! Prompt building
//!
//! Three prompts: answer from knowledge-base chunks, answer from web snippets,
//! and rewrite a question into a short web search query.

use docqa_config::{constants::web::MAX_EXCERPT_CHARS, GenerationConfig};
use docqa_core::{GenerateRequest, RetrievalCandidate, WebSnippet};

const KB_SYSTEM_PROMPT: &str = r#"You are a knowledgeable assistant that answers questions from the provided document context.

Rules:
1. Answer using ONLY the information in the context below
2. Be accurate and refer to page numbers when possible
3. If the context does not contain enough information to answer, say so plainly
4. Do not make up information or use outside knowledge
5. Be concise but complete"#;

const WEB_SYSTEM_PROMPT: &str = r#"You are a helpful assistant that synthesizes information from web search results.

Rules:
1. Answer the question using the search results provided
2. Combine information from several sources when relevant
3. If sources conflict, say so
4. Cite sources by their number, as [1], [2], etc."#;

const REFORMULATION_SYSTEM_PROMPT: &str = r#"You turn user questions into web search queries.

Rules:
- Drop filler words
- Use keywords likely to appear in relevant pages
- Keep it to 3-7 words
- Return ONLY the search query, nothing else"#;

/// Builds generation requests for each answer path
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    temperature: f32,
    max_tokens: u32,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::from_settings(&GenerationConfig::default())
    }
}

impl PromptBuilder {
    pub fn new(temperature: f32, max_tokens: u32) -> Self {
        Self {
            temperature,
            max_tokens,
        }
    }

    pub fn from_settings(settings: &GenerationConfig) -> Self {
        Self::new(settings.temperature, settings.max_tokens)
    }

    /// Request for an answer grounded in knowledge-base chunks
    pub fn knowledge_base(
        &self,
        question: &str,
        candidates: &[RetrievalCandidate],
    ) -> GenerateRequest {
        let user = format!(
            "Context from knowledge base:\n{}\n\nQuestion: {}\n\n\
             Answer based on the context above and include page references.",
            format_kb_context(candidates),
            question
        );

        GenerateRequest::new(KB_SYSTEM_PROMPT)
            .with_user_message(user)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
    }

    /// Request for an answer synthesized from web snippets
    pub fn web(&self, question: &str, snippets: &[WebSnippet]) -> GenerateRequest {
        let user = format!(
            "Web search results:\n{}\n\nQuestion: {}\n\n\
             Answer based on the web results above and cite sources.",
            format_web_context(snippets),
            question
        );

        GenerateRequest::new(WEB_SYSTEM_PROMPT)
            .with_user_message(user)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
    }

    /// Request for a short search query
    pub fn reformulation(&self, question: &str) -> GenerateRequest {
        GenerateRequest::new(REFORMULATION_SYSTEM_PROMPT)
            .with_user_message(format!(
                "Original question: {}\n\nSearch query:",
                question
            ))
            .with_temperature(0.0)
            .with_max_tokens(32)
    }
}

/// `[Document i - Page p]` blocks, in ranking order
pub fn format_kb_context(candidates: &[RetrievalCandidate]) -> String {
    candidates
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let page = c
                .source
                .page
                .map(|p| p.to_string())
                .unwrap_or_else(|| "Unknown".to_string());
            format!("[Document {} - Page {}]\n{}\n", i + 1, page, c.text.trim())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `[i] title / URL / Content` blocks with excerpts cut to a fixed length
pub fn format_web_context(snippets: &[WebSnippet]) -> String {
    snippets
        .iter()
        .enumerate()
        .map(|(i, s)| {
            format!(
                "[{}] {}\nURL: {}\nContent: {}\n",
                i + 1,
                s.title,
                s.url,
                truncate_chars(&s.excerpt, MAX_EXCERPT_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_core::Role;

    #[test]
    fn test_kb_context_format() {
        let candidates = vec![
            RetrievalCandidate::new(" Two year warranty. ", 0.9, "manual.pdf").with_page(12),
            RetrievalCandidate::new("No page here", 0.8, "faq"),
        ];
        assert_eq!(
            format_kb_context(&candidates),
            "[Document 1 - Page 12]\nTwo year warranty.\n\n[Document 2 - Page Unknown]\nNo page here\n"
        );
    }

    #[test]
    fn test_web_context_truncates_excerpt() {
        let long = "é".repeat(600);
        let snippets = vec![WebSnippet::new("wikipedia", "Title", long, "https://x.test")];
        let context = format_web_context(&snippets);
        assert!(context.starts_with("[1] Title\nURL: https://x.test\nContent: "));
        assert!(context.contains(&format!("{}...", "é".repeat(500))));
        assert!(!context.contains(&"é".repeat(501)));
    }

    #[test]
    fn test_short_excerpt_untouched() {
        assert_eq!(truncate_chars("short", 500), "short");
    }

    #[test]
    fn test_kb_request_shape() {
        let builder = PromptBuilder::new(0.1, 512);
        let request = builder.knowledge_base(
            "What is the warranty?",
            &[RetrievalCandidate::new("Two years.", 0.9, "manual.pdf").with_page(3)],
        );
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::System);
        let user = request.last_user_message().unwrap();
        assert!(user.contains("[Document 1 - Page 3]"));
        assert!(user.contains("Question: What is the warranty?"));
        assert_eq!(request.max_tokens, Some(512));
    }

    #[test]
    fn test_reformulation_request_is_deterministic() {
        let request = PromptBuilder::default().reformulation("Who wrote Dune?");
        assert_eq!(request.temperature, Some(0.0));
        assert!(request.last_user_message().unwrap().contains("Who wrote Dune?"));
    }
}
