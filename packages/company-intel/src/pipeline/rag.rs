//! Retrieval-augmented question answering over stored company summaries.
//!
//! Ingest turns scraped text into a keyword summary, splits it into
//! storage-sized chunks and writes them to the company's vector collection.
//! Questions are refined, embedded, matched against that collection, and
//! answered from the retrieved chunks only.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{IntelError, Result};
use crate::pipeline::chain::{bounded, Chain, ChainStage, ChainState};
use crate::pipeline::normalize::parse_domain_bullets;
use crate::pipeline::prompts::{Persona, KEYWORD_QUESTION, RAG_ANSWER, RAG_QUERY};
use crate::pipeline::split::TokenSplitter;
use crate::pipeline::summarize::{summary_fingerprint, Summarizer};
use crate::traits::ai::AI;
use crate::traits::store::{collection_for, DocumentStore, IntelStore, VectorStore};
use crate::types::chunk::EmbeddedChunk;
use crate::types::config::IntelConfig;
use crate::types::record::CompanyRecord;
use crate::types::summary::StructuredSummary;

/// Marker the answer prompt asks for when the context has no answer.
pub const NO_ANSWER: &str = "<no answer>";

const CONTEXT_SEPARATOR: &str = "\n\n";

/// What one ingest wrote.
#[derive(Debug, Clone)]
pub struct IngestReport {
    /// The reduced summary text that was chunked and stored
    pub summary: String,

    /// Number of chunks upserted
    pub chunks: usize,

    /// The company record after the merge
    pub record: CompanyRecord,
}

/// Summarizes scraped text and stores it for retrieval.
pub struct RagIngestor<A: AI + ?Sized, S: IntelStore + ?Sized> {
    ai: Arc<A>,
    store: Arc<S>,
    config: Arc<IntelConfig>,
    summarizer: Summarizer<A>,
}

impl<A: AI + ?Sized, S: IntelStore + ?Sized> RagIngestor<A, S> {
    pub fn new(ai: Arc<A>, store: Arc<S>, config: Arc<IntelConfig>) -> Self {
        Self {
            summarizer: Summarizer::new(ai.clone(), config.clone()),
            ai,
            store,
            config,
        }
    }

    /// Summarize `text` for `keywords` and store the result for `company`.
    ///
    /// Both the chunks and the record write are last-writer-wins: two
    /// concurrent ingests for one company interleave without any check.
    #[instrument(skip(self, text, keywords), fields(company = %company, keywords = keywords.len(), text_len = text.len()))]
    pub async fn ingest(
        &self,
        text: &str,
        company: &str,
        keywords: &[String],
    ) -> Result<IngestReport> {
        let summary = self.summarizer.summarize_text(text, company, keywords).await?;
        let chunks = TokenSplitter::for_storage(&self.config)?.split_documents(&summary, company)?;

        if chunks.len() > self.config.storage_chunk_warning {
            warn!(
                chunks = chunks.len(),
                limit = self.config.storage_chunk_warning,
                "Summary split into more chunks than expected"
            );
        }

        let collection = collection_for(company);
        if self.config.replace_collection_on_ingest {
            let removed = self.store.delete_collection(&collection).await?;
            debug!(removed, "Cleared previous chunks");
        }

        let written = if chunks.is_empty() {
            0
        } else {
            let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
            let embeddings = bounded(
                "embed_chunks",
                self.config.completion_timeout(),
                self.ai.embed_batch(&texts),
            )
            .await?;

            if embeddings.len() != chunks.len() {
                return Err(IntelError::ai(format!(
                    "expected {} embeddings, got {}",
                    chunks.len(),
                    embeddings.len()
                )));
            }

            let embedded: Vec<EmbeddedChunk> = chunks
                .into_iter()
                .zip(embeddings)
                .map(|(chunk, embedding)| EmbeddedChunk::new(chunk, embedding))
                .collect();
            self.store.upsert(&collection, &embedded).await?
        };

        let structured = StructuredSummary::from_sections(&summary, keywords);
        let record = self
            .store
            .put(
                company,
                CompanyRecord::from_summary(company, &structured)
                    .with_fingerprint(summary_fingerprint()),
            )
            .await?;

        info!(chunks = written, "Ingested company summary");
        Ok(IngestReport {
            summary,
            chunks: written,
            record,
        })
    }
}

/// Turns a bare keyword into a natural question about the company.
pub struct KeywordEnhancer<A: AI + ?Sized> {
    ai: Arc<A>,
    config: Arc<IntelConfig>,
    chain: Chain,
}

impl<A: AI + ?Sized> KeywordEnhancer<A> {
    pub fn new(ai: Arc<A>, config: Arc<IntelConfig>) -> Self {
        Self {
            ai,
            config,
            chain: Chain::new("keyword_question", Persona::RagQuery)
                .stage(ChainStage::new(KEYWORD_QUESTION, "question")),
        }
    }

    /// Question for `keyword`, or `None` when the backend gave none.
    pub async fn enhance(&self, company: &str, keyword: &str) -> Option<String> {
        let result = self
            .chain
            .run(
                &*self.ai,
                &[("company", company), ("keyword", keyword)],
                self.config.completion_timeout(),
            )
            .await;

        let question = result
            .text("question")?
            .trim_start_matches("<QUERY>:")
            .trim()
            .trim_matches('"')
            .trim();

        if question.is_empty() {
            None
        } else {
            Some(question.to_string())
        }
    }
}

/// Answers questions from a company's stored chunks.
pub struct QueryEngine<A: AI + ?Sized, S: VectorStore + ?Sized> {
    ai: Arc<A>,
    store: Arc<S>,
    config: Arc<IntelConfig>,
    answer_chain: Chain,
}

impl<A: AI + ?Sized, S: VectorStore + ?Sized> QueryEngine<A, S> {
    pub fn new(ai: Arc<A>, store: Arc<S>, config: Arc<IntelConfig>) -> Self {
        Self {
            ai,
            store,
            config,
            answer_chain: Chain::new("rag_answer", Persona::RagQuery)
                .stage(ChainStage::new(RAG_ANSWER, "answer")),
        }
    }

    /// Answer `question` about `company`.
    ///
    /// `None` when nothing is stored for the company, the model has no
    /// answer, or a backend call fails.
    #[instrument(skip(self), fields(company = %company))]
    pub async fn query(&self, company: &str, question: &str) -> Option<String> {
        match self.try_query(company, question).await {
            Ok(answer) => answer,
            Err(e) => {
                error!(error = %e, "Query failed");
                None
            }
        }
    }

    async fn try_query(&self, company: &str, question: &str) -> Result<Option<String>> {
        let refined = RAG_QUERY.render(&[("company", company), ("question", question)])?;
        let timeout = self.config.completion_timeout();

        let embedding = bounded("embed_query", timeout, self.ai.embed(&refined)).await?;
        let hits = self
            .store
            .search(&collection_for(company), &embedding, self.config.retrieval_k)
            .await?;

        if hits.is_empty() {
            debug!("No stored chunks for company");
            return Ok(None);
        }

        let context = hits
            .iter()
            .map(|hit| hit.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);
        debug!(hits = hits.len(), best_score = hits[0].score, "Retrieved context");

        let result = self
            .answer_chain
            .run(
                &*self.ai,
                &[("context", context.as_str()), ("query", refined.as_str())],
                timeout,
            )
            .await;

        if let ChainState::Failed { reason, .. } = &result.state {
            return Err(IntelError::ai(reason.clone()));
        }

        Ok(result
            .text("answer")
            .filter(|answer| !answer.is_empty() && !is_no_answer(answer))
            .map(str::to_string))
    }
}

fn is_no_answer(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case(NO_ANSWER)
}

/// Ingest, keyword enhancement and querying behind one handle.
pub struct Rag<A: AI + ?Sized, S: IntelStore + ?Sized> {
    ingestor: RagIngestor<A, S>,
    enhancer: KeywordEnhancer<A>,
    engine: QueryEngine<A, S>,
}

impl<A: AI + ?Sized, S: IntelStore + ?Sized> Rag<A, S> {
    pub fn new(ai: Arc<A>, store: Arc<S>, config: Arc<IntelConfig>) -> Self {
        Self {
            ingestor: RagIngestor::new(ai.clone(), store.clone(), config.clone()),
            enhancer: KeywordEnhancer::new(ai.clone(), config.clone()),
            engine: QueryEngine::new(ai, store, config),
        }
    }

    pub async fn ingest(
        &self,
        text: &str,
        company: &str,
        keywords: &[String],
    ) -> Result<IngestReport> {
        self.ingestor.ingest(text, company, keywords).await
    }

    pub async fn query(&self, company: &str, question: &str) -> Option<String> {
        self.engine.query(company, question).await
    }

    /// One answer per keyword, in keyword order.
    ///
    /// A keyword the enhancer cannot phrase as a question is asked as is.
    #[instrument(skip(self, keywords), fields(company = %company, keywords = keywords.len()))]
    pub async fn ask_keywords(
        &self,
        company: &str,
        keywords: &[String],
    ) -> IndexMap<String, Option<String>> {
        let mut answers = IndexMap::with_capacity(keywords.len());
        for keyword in keywords {
            let question = match self.enhancer.enhance(company, keyword).await {
                Some(question) => question,
                None => {
                    warn!(keyword = %keyword, "No question for keyword, asking it directly");
                    keyword.clone()
                }
            };
            let answer = self.engine.query(company, &question).await;
            answers.insert(keyword.clone(), answer);
        }
        answers
    }

    /// Email domains mentioned in the company's stored summaries.
    pub async fn email_domains(&self, company: &str) -> Vec<String> {
        let question = "List every email domain the company uses, one per line, each line starting with - :";
        self.engine
            .query(company, question)
            .await
            .map(|answer| parse_domain_bullets(&answer))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryStore;
    use crate::testing::MockAI;

    const MAP_NEEDLE: &str = "The following documents are about";
    const REDUCE_NEEDLE: &str = "partial summaries";
    const ANSWER_NEEDLE: &str = "Use the following pieces of context";
    const QUESTION_NEEDLE: &str = "I was given the keyword phrase";

    fn keywords() -> Vec<String> {
        vec!["production sites".to_string(), "email domains".to_string()]
    }

    fn rag(ai: &MockAI, store: &Arc<MemoryStore>) -> Rag<MockAI, MemoryStore> {
        Rag::new(
            Arc::new(ai.clone()),
            store.clone(),
            Arc::new(IntelConfig::default()),
        )
    }

    fn ingesting_ai() -> MockAI {
        MockAI::new()
            .with_response(MAP_NEEDLE, "1. Sites:\nLinz")
            .with_response(
                REDUCE_NEEDLE,
                "1. Information about production sites for Acme:\nLinz and Graz\n2. Information about email domains for Acme:\n- acme.com\n- @acme.at",
            )
    }

    #[tokio::test]
    async fn test_ingest_stores_chunks_and_record() {
        let ai = ingesting_ai();
        let store = Arc::new(MemoryStore::new());

        let report = rag(&ai, &store)
            .ingest("Acme runs mills in Linz and Graz.", "Acme", &keywords())
            .await
            .unwrap();

        assert_eq!(report.chunks, 1);
        assert_eq!(store.chunk_count("acme"), 1);
        assert_eq!(ai.embed_count(), 1);

        let record = store.get("Acme").await.unwrap().unwrap();
        assert_eq!(record.fields["production sites"], "Linz and Graz");
        assert!(record.is_current(&summary_fingerprint()));
    }

    #[tokio::test]
    async fn test_ingest_replaces_collection_when_configured() {
        let later_ai = MockAI::new()
            .with_response(MAP_NEEDLE, "1. Sites:\nWels")
            .with_response(REDUCE_NEEDLE, "1. Sites:\nWels");

        for (replace, expected) in [(false, 2), (true, 1)] {
            let store = Arc::new(MemoryStore::new());
            let config = Arc::new(IntelConfig::default().with_replace_collection_on_ingest(replace));
            let first = RagIngestor::new(Arc::new(ingesting_ai()), store.clone(), config.clone());
            let later = RagIngestor::new(Arc::new(later_ai.clone()), store.clone(), config);

            first.ingest("Acme text", "Acme", &keywords()).await.unwrap();
            later.ingest("Acme text", "Acme", &keywords()).await.unwrap();

            assert_eq!(store.chunk_count("acme"), expected);
        }
    }

    #[tokio::test]
    async fn test_query_answers_from_context() {
        let ai = ingesting_ai().with_response(ANSWER_NEEDLE, "Acme produces in Linz and Graz.");
        let store = Arc::new(MemoryStore::new());
        let rag = rag(&ai, &store);
        rag.ingest("Acme text", "Acme", &keywords()).await.unwrap();

        let answer = rag.query("Acme", "Where does Acme produce?").await;

        assert_eq!(answer.as_deref(), Some("Acme produces in Linz and Graz."));
        let prompt = ai.prompts().last().cloned().unwrap();
        assert!(prompt.contains("Linz and Graz"));
        assert!(prompt.contains("<no answer>"));
    }

    #[tokio::test]
    async fn test_no_answer_marker_is_none() {
        let ai = ingesting_ai().with_response(ANSWER_NEEDLE, " <No Answer> ");
        let store = Arc::new(MemoryStore::new());
        let rag = rag(&ai, &store);
        rag.ingest("Acme text", "Acme", &keywords()).await.unwrap();

        assert!(rag.query("Acme", "Does Acme own a furnace?").await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_company_skips_completion() {
        let ai = MockAI::new();
        let store = Arc::new(MemoryStore::new());

        assert!(rag(&ai, &store).query("Globex", "Anything?").await.is_none());
        assert_eq!(ai.completion_count(), 0);
        assert_eq!(ai.embed_count(), 1);
    }

    #[tokio::test]
    async fn test_ask_keywords_keeps_order() {
        let ai = ingesting_ai()
            .with_response(QUESTION_NEEDLE, "<QUERY>: \"Where are the company's production sites?\"")
            .with_response(ANSWER_NEEDLE, "Linz and Graz");
        let store = Arc::new(MemoryStore::new());
        let rag = rag(&ai, &store);
        rag.ingest("Acme text", "Acme", &keywords()).await.unwrap();

        let answers = rag.ask_keywords("Acme", &keywords()).await;

        assert_eq!(answers.keys().collect::<Vec<_>>(), vec!["production sites", "email domains"]);
        assert_eq!(answers["production sites"].as_deref(), Some("Linz and Graz"));
        assert!(ai
            .prompts()
            .iter()
            .any(|p| p.contains("<QUERY>: Where are the company's production sites?")));
    }

    #[tokio::test]
    async fn test_email_domains_from_answer() {
        let ai = ingesting_ai().with_response(
            ANSWER_NEEDLE,
            "The company uses these domains:\n- acme.com\n- @acme.at\n- none",
        );
        let store = Arc::new(MemoryStore::new());
        let rag = rag(&ai, &store);
        rag.ingest("Acme text", "Acme", &keywords()).await.unwrap();

        assert_eq!(rag.email_domains("Acme").await, vec!["acme.com", "acme.at"]);
    }
}
