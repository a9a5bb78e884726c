//! Lexical retriever over a Tantivy BM25 index
//!
//! Knowledge chunks are indexed once into RAM and only read afterwards, so
//! concurrent queries share the index without locking.
//!
//! BM25 scores are unbounded. Each hit is divided by the summed IDF of the
//! query terms the index knows, i.e. the score of a chunk matching every term
//! once at average length, and clamped into [0, 1].

use async_trait::async_trait;
use std::path::Path;
use tantivy::{
    collector::TopDocs,
    query::BooleanQuery,
    schema::{
        Field, IndexRecordOption, OwnedValue, Schema, TextFieldIndexing, TextOptions, STORED,
        STRING,
    },
    tokenizer::{
        Language, LowerCaser, RemoveLongFilter, SimpleTokenizer, Stemmer, StopWordFilter,
        TextAnalyzer, TokenStream,
    },
    Index, IndexReader, Searcher, TantivyDocument, Term,
};

use docqa_core::{RetrievalCandidate, RetrievalError, Retriever};

use crate::knowledge::{KnowledgeDocument, KnowledgeLoader};
use crate::RagError;

const TOKENIZER: &str = "knowledge";

/// Writer heap for the one-shot bulk load
const WRITER_HEAP_BYTES: usize = 50_000_000;

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
    "do", "does", "did", "will", "would", "could", "should", "may", "might", "must", "shall",
    "can", "to", "of", "in", "for", "on", "with", "at", "by", "from", "as", "into", "through",
    "during", "before", "after", "above", "below", "between", "under", "again", "then", "once",
    "here", "there", "when", "where", "why", "how", "what", "which", "who", "whom", "this",
    "that", "these", "those", "it", "its", "and", "but", "or", "nor", "not", "so", "than", "too",
    "very", "just", "about", "all", "any", "both", "each", "few", "more", "most", "other", "some",
    "such", "only", "own", "same", "i", "me", "my", "we", "our", "you", "your", "he", "him",
    "his", "she", "her", "they", "them", "their", "please", "tell",
];

fn index_err(err: tantivy::TantivyError) -> RagError {
    RagError::Index(err.to_string())
}

fn build_analyzer() -> TextAnalyzer {
    TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(RemoveLongFilter::limit(40))
        .filter(LowerCaser)
        .filter(StopWordFilter::remove(STOPWORDS.iter().map(|w| w.to_string())))
        .filter(Stemmer::new(Language::English))
        .build()
}

fn stored_str(doc: &TantivyDocument, field: Field) -> Option<&str> {
    match doc.get_first(field) {
        Some(OwnedValue::Str(s)) => Some(s.as_str()),
        _ => None,
    }
}

fn stored_u64(doc: &TantivyDocument, field: Field) -> Option<u64> {
    match doc.get_first(field) {
        Some(OwnedValue::U64(v)) => Some(*v),
        _ => None,
    }
}

/// BM25 inverse document frequency, as Tantivy computes it
fn idf(doc_freq: u64, num_docs: u64) -> f32 {
    let n = doc_freq as f32;
    (1.0 + (num_docs as f32 - n + 0.5) / (n + 0.5)).ln()
}

struct Fields {
    document_id: Field,
    content: Field,
    page: Field,
    offset: Field,
}

struct KnowledgeIndex {
    index: Index,
    reader: IndexReader,
    fields: Fields,
}

impl KnowledgeIndex {
    fn build(documents: &[KnowledgeDocument]) -> Result<Self, RagError> {
        let mut schema_builder = Schema::builder();
        let content_options = TextOptions::default()
            .set_indexing_options(
                TextFieldIndexing::default()
                    .set_tokenizer(TOKENIZER)
                    .set_index_option(IndexRecordOption::WithFreqsAndPositions),
            )
            .set_stored();

        let fields = Fields {
            document_id: schema_builder.add_text_field("document_id", STRING | STORED),
            content: schema_builder.add_text_field("content", content_options),
            page: schema_builder.add_u64_field("page", STORED),
            offset: schema_builder.add_u64_field("offset", STORED),
        };
        let schema = schema_builder.build();

        let index = Index::create_in_ram(schema);
        index.tokenizers().register(TOKENIZER, build_analyzer());

        let mut writer = index
            .writer_with_num_threads::<TantivyDocument>(1, WRITER_HEAP_BYTES)
            .map_err(index_err)?;
        for doc in documents {
            let mut indexed = TantivyDocument::default();
            indexed.add_text(fields.document_id, doc.document_id());
            indexed.add_text(fields.content, &doc.content);
            if let Some(page) = doc.page {
                indexed.add_u64(fields.page, u64::from(page));
            }
            if let Some(offset) = doc.offset {
                indexed.add_u64(fields.offset, offset as u64);
            }
            writer.add_document(indexed).map_err(index_err)?;
        }
        writer.commit().map_err(index_err)?;

        let reader = index.reader().map_err(index_err)?;
        reader.reload().map_err(index_err)?;

        Ok(Self {
            index,
            reader,
            fields,
        })
    }

    /// Distinct analysed query terms, in query order
    fn query_terms(&self, query: &str) -> Result<Vec<Term>, RagError> {
        let mut analyzer = self
            .index
            .tokenizer_for_field(self.fields.content)
            .map_err(index_err)?;

        let mut terms: Vec<Term> = Vec::new();
        let mut stream = analyzer.token_stream(query);
        stream.process(&mut |token| {
            let term = Term::from_field_text(self.fields.content, &token.text);
            if !terms.contains(&term) {
                terms.push(term);
            }
        });
        Ok(terms)
    }

    fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievalCandidate>, RagError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let searcher: Searcher = self.reader.searcher();
        let num_docs = searcher.num_docs();

        let mut known = Vec::new();
        let mut ceiling = 0.0f32;
        for term in self.query_terms(query)? {
            let doc_freq = searcher.doc_freq(&term).map_err(index_err)?;
            if doc_freq > 0 {
                ceiling += idf(doc_freq, num_docs);
                known.push(term);
            }
        }
        if known.is_empty() || ceiling <= 0.0 {
            return Ok(Vec::new());
        }

        let query = BooleanQuery::new_multiterms_query(known);
        let hits = searcher
            .search(&query, &TopDocs::with_limit(top_k))
            .map_err(index_err)?;

        let mut candidates = Vec::with_capacity(hits.len());
        for (bm25, address) in hits {
            let doc: TantivyDocument = searcher.doc(address).map_err(index_err)?;
            let score = (bm25 / ceiling).clamp(0.0, 1.0);

            let mut candidate = RetrievalCandidate::new(
                stored_str(&doc, self.fields.content).unwrap_or_default(),
                score,
                stored_str(&doc, self.fields.document_id).unwrap_or_default(),
            );
            if let Some(page) = stored_u64(&doc, self.fields.page) {
                candidate = candidate.with_page(page as u32);
            }
            if let Some(offset) = stored_u64(&doc, self.fields.offset) {
                candidate = candidate.with_offset(offset as usize);
            }
            candidates.push(candidate);
        }

        Ok(candidates)
    }
}

/// Retriever over knowledge documents held in a RAM index
pub struct LexicalRetriever {
    index: Option<KnowledgeIndex>,
    len: usize,
}

impl LexicalRetriever {
    /// A retriever with nothing loaded (web-only mode)
    pub fn empty() -> Self {
        Self {
            index: None,
            len: 0,
        }
    }

    /// Build the index
    pub fn from_documents(documents: Vec<KnowledgeDocument>) -> Result<Self, RagError> {
        if documents.is_empty() {
            return Ok(Self::empty());
        }
        Ok(Self {
            index: Some(KnowledgeIndex::build(&documents)?),
            len: documents.len(),
        })
    }

    /// Load knowledge from a file or directory and index it
    pub fn load(path: &Path) -> Result<Self, RagError> {
        let documents = KnowledgeLoader::load_path(path)?;
        let retriever = Self::from_documents(documents)?;
        tracing::info!(chunks = retriever.len(), "Lexical index built");
        Ok(retriever)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Best chunks first; chunks sharing no term with the query are not returned
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievalCandidate>, RagError> {
        match &self.index {
            Some(index) => index.search(query, top_k),
            None => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl Retriever for LexicalRetriever {
    async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievalCandidate>, RetrievalError> {
        if self.is_empty() {
            return Err(RetrievalError::IndexUnavailable(
                "no knowledge documents loaded".to_string(),
            ));
        }
        Ok(self.search(query, top_k)?)
    }

    fn name(&self) -> &str {
        "lexical"
    }

    fn is_ready(&self) -> bool {
        !self.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<KnowledgeDocument> {
        vec![
            KnowledgeDocument::new(
                "p12",
                "The warranty covers manufacturing defects for two years from purchase.",
            )
            .with_source("manual.pdf")
            .with_page(12),
            KnowledgeDocument::new(
                "p13",
                "To claim the warranty, contact support with your purchase receipt.",
            )
            .with_source("manual.pdf")
            .with_page(13),
            KnowledgeDocument::new("p40", "Clean the filter monthly with warm water.")
                .with_source("manual.pdf")
                .with_page(40),
        ]
    }

    fn retriever() -> LexicalRetriever {
        LexicalRetriever::from_documents(corpus()).unwrap()
    }

    #[test]
    fn test_analyzer_drops_stopwords_and_stems() {
        let mut analyzer = build_analyzer();
        let mut tokens = Vec::new();
        analyzer
            .token_stream("What is the warranty period?")
            .process(&mut |t| tokens.push(t.text.clone()));
        assert_eq!(tokens, vec!["warranti".to_string(), "period".to_string()]);
    }

    #[test]
    fn test_search_ranks_relevant_chunks_first() {
        let results = retriever().search("How long is the warranty?", 5).unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|c| c.source.page != Some(40)));
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(results.iter().all(|c| (0.0..=1.0).contains(&c.score)));
        assert_eq!(results[0].source.document_id, "manual.pdf");
    }

    #[test]
    fn test_search_respects_top_k() {
        let retriever = retriever();
        assert_eq!(retriever.search("warranty purchase", 1).unwrap().len(), 1);
        assert!(retriever.search("warranty purchase", 0).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_terms_return_nothing() {
        let retriever = retriever();
        assert!(retriever.search("quantum chromodynamics", 5).unwrap().is_empty());
        assert!(retriever.search("what is the", 5).unwrap().is_empty());
    }

    #[test]
    fn test_full_match_scores_near_one() {
        let results = retriever()
            .search("Clean the filter monthly with warm water.", 1)
            .unwrap();
        assert_eq!(results[0].source.page, Some(40));
        assert!(results[0].score > 0.9);
    }

    #[test]
    fn test_partial_match_scores_lower() {
        let retriever = retriever();
        let full = retriever.search("clean filter warm water", 1).unwrap();
        let partial = retriever.search("filter", 1).unwrap();
        let diluted = retriever.search("filter warranty receipt", 3).unwrap();

        assert_eq!(partial[0].source.page, Some(40));
        let filter_hit = diluted.iter().find(|c| c.source.page == Some(40)).unwrap();
        assert!(filter_hit.score < full[0].score);
    }

    #[test]
    fn test_page_and_offset_are_stored() {
        let mut doc = KnowledgeDocument::new("intro", "Unpack the unit and remove the tape.")
            .with_source("quickstart.pdf")
            .with_page(2);
        doc.offset = Some(128);
        let retriever = LexicalRetriever::from_documents(vec![doc]).unwrap();

        let results = retriever.search("unpack tape", 1).unwrap();
        assert_eq!(results[0].source.page, Some(2));
        assert_eq!(results[0].source.offset, Some(128));
        assert_eq!(results[0].source.document_id, "quickstart.pdf");
    }

    #[tokio::test]
    async fn test_empty_index_is_unavailable() {
        let retriever = LexicalRetriever::from_documents(Vec::new()).unwrap();
        assert!(!retriever.is_ready());
        let err = retriever.retrieve("warranty", 5).await.unwrap_err();
        assert_eq!(err.kind(), "index_unavailable");
    }

    #[tokio::test]
    async fn test_retrieve_through_trait() {
        let retriever: std::sync::Arc<dyn Retriever> = std::sync::Arc::new(retriever());
        let results = retriever.retrieve("filter cleaning water", 3).await.unwrap();
        assert_eq!(results[0].source.page, Some(40));
    }
}
