//! Qdrant-backed search.
//!
//! The vector side is a cosine `search_points`. The lexical side is a second
//! `search_points` restricted to points whose `text` matches a query term, so lexical
//! candidates carry a cosine score as well; their lexical rank is computed locally from
//! the payload text. Both lists are merged with [`fuse`].

use std::collections::HashMap;

use qdrant_client::Qdrant;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::vectors_output::VectorsOptions;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, CreateFieldIndexCollection,
    CreateFieldIndexCollectionBuilder, Distance, FieldType, Filter, PayloadSchemaType, PointId,
    ScrollPointsBuilder, SearchPointsBuilder, TextIndexParamsBuilder, TokenizerType, Value,
    VectorParamsBuilder, VectorsOutput,
};
use tracing::{debug, instrument};

use crate::constants::DimConfig;

use super::backend::SearchBackend;
use super::error::RetrievalError;
use super::fusion::fuse;
use super::lexical::LexicalQuery;
use super::types::{Chunk, HybridQuery, ScoredCandidate, SearchHit};

pub const DEFAULT_COLLECTION_NAME: &str = "knowledge_chunks";

pub const PAYLOAD_CHUNK_ID: &str = "chunk_id";
pub const PAYLOAD_DOCUMENT_ID: &str = "document_id";
pub const PAYLOAD_POSITION: &str = "position";
pub const PAYLOAD_TEXT: &str = "text";

/// Points fetched per `scroll` page on the lexical-only path.
const SCROLL_PAGE_SIZE: u32 = 256;

#[derive(Clone)]
pub struct QdrantSearchBackend {
    client: Qdrant,
    url: String,
    collection: String,
    dimension: usize,
}

impl std::fmt::Debug for QdrantSearchBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantSearchBackend")
            .field("url", &self.url)
            .field("collection", &self.collection)
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl QdrantSearchBackend {
    /// Builds a client for `url`. Does not contact the server.
    pub fn new(url: &str, collection: &str, dimension: usize) -> Result<Self, RetrievalError> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| RetrievalError::Unavailable {
                backend: url.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            url: url.to_string(),
            collection: collection.to_string(),
            dimension,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Creates the collection with cosine distance if it does not exist yet, then makes sure
    /// `text` carries a lowercased full-text index.
    ///
    /// Without that index Qdrant's text match is a case-sensitive substring test, which
    /// misses capitalised words against the lowercased query terms.
    pub async fn ensure_collection(&self) -> Result<(), RetrievalError> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| self.unavailable(e))?;

        if !exists {
            let dims = DimConfig::new(self.dimension);
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection)
                        .vectors_config(VectorParamsBuilder::new(dims.as_u64(), Distance::Cosine)),
                )
                .await
                .map_err(|e| self.create_failed(e))?;
            debug!(collection = %self.collection, dim = self.dimension, "Created collection");
        }

        self.ensure_text_index().await
    }

    async fn ensure_text_index(&self) -> Result<(), RetrievalError> {
        let info = self
            .client
            .collection_info(&self.collection)
            .await
            .map_err(|e| self.unavailable(e))?;

        let indexed = info
            .result
            .and_then(|info| info.payload_schema.get(PAYLOAD_TEXT).cloned())
            .is_some_and(|schema| schema.data_type == PayloadSchemaType::Text as i32);
        if indexed {
            return Ok(());
        }

        self.client
            .create_field_index(text_index_request(&self.collection))
            .await
            .map_err(|e| self.create_failed(e))?;
        debug!(collection = %self.collection, field = PAYLOAD_TEXT, "Created full-text index");
        Ok(())
    }

    fn create_failed(&self, err: impl std::fmt::Display) -> RetrievalError {
        RetrievalError::CreateCollectionFailed {
            collection: self.collection.clone(),
            message: err.to_string(),
        }
    }

    fn unavailable(&self, err: impl std::fmt::Display) -> RetrievalError {
        RetrievalError::Unavailable {
            backend: self.url.clone(),
            message: err.to_string(),
        }
    }

    fn search_failed(&self, err: impl std::fmt::Display) -> RetrievalError {
        RetrievalError::SearchFailed {
            collection: self.collection.clone(),
            message: err.to_string(),
        }
    }

    async fn vector_hits(
        &self,
        vector: &[f32],
        limit: usize,
        filter: Option<Filter>,
        lexical: &LexicalQuery,
    ) -> Result<Vec<SearchHit>, RetrievalError> {
        let mut builder =
            SearchPointsBuilder::new(&self.collection, vector.to_vec(), limit as u64)
                .with_payload(true)
                .with_vectors(true);
        if let Some(filter) = filter {
            builder = builder.filter(filter);
        }

        let response = self
            .client
            .search_points(builder)
            .await
            .map_err(|e| self.search_failed(e))?;

        Ok(response
            .result
            .into_iter()
            .filter_map(|point| {
                let chunk = chunk_from_payload(point.id, point.payload, point.vectors)?;
                let lexical_rank = lexical.score(&chunk.text);
                Some(SearchHit {
                    chunk,
                    cosine_similarity: Some(point.score),
                    lexical_rank,
                })
            })
            .collect())
    }
}

/// Lowercased word-tokenised index on the chunk text, matching how query terms are split.
fn text_index_request(collection: &str) -> CreateFieldIndexCollection {
    CreateFieldIndexCollectionBuilder::new(collection, PAYLOAD_TEXT, FieldType::Text)
        .field_index_params(TextIndexParamsBuilder::new(TokenizerType::Word).lowercase(true))
        .wait(true)
        .build()
}

/// Sorts by lexical rank (ties by chunk id) and keeps the best `k`.
fn keep_best_lexical(hits: &mut Vec<SearchHit>, k: usize) {
    hits.sort_by(|a, b| {
        b.lexical_rank
            .partial_cmp(&a.lexical_rank)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.chunk.id.cmp(&b.chunk.id))
    });
    hits.truncate(k);
}

/// `should` over one text-match condition per query term.
fn text_filter(lexical: &LexicalQuery) -> Option<Filter> {
    if lexical.is_empty() {
        return None;
    }
    Some(Filter::should(
        lexical
            .terms()
            .iter()
            .map(|term| Condition::matches_text(PAYLOAD_TEXT, term.clone())),
    ))
}

fn chunk_from_payload(
    id: Option<PointId>,
    payload: HashMap<String, Value>,
    vectors: Option<VectorsOutput>,
) -> Option<Chunk> {
    let text = payload.get(PAYLOAD_TEXT)?.as_str()?.to_string();

    let chunk_id = payload
        .get(PAYLOAD_CHUNK_ID)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .or_else(|| match id.and_then(|pid| pid.point_id_options)? {
            PointIdOptions::Num(n) => Some(n.to_string()),
            PointIdOptions::Uuid(u) => Some(u),
        })?;

    let document_id = payload
        .get(PAYLOAD_DOCUMENT_ID)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .unwrap_or_default();

    let position = payload
        .get(PAYLOAD_POSITION)
        .and_then(|v| v.as_integer())
        .and_then(|i| u32::try_from(i).ok())
        .unwrap_or(0);

    Some(Chunk {
        id: chunk_id,
        document_id,
        position,
        text,
        vector: vector_from_output(vectors),
    })
}

#[allow(deprecated)]
fn vector_from_output(vectors: Option<VectorsOutput>) -> Option<Vec<f32>> {
    match vectors?.vectors_options? {
        VectorsOptions::Vector(v) if !v.data.is_empty() => Some(v.data),
        _ => None,
    }
}

impl SearchBackend for QdrantSearchBackend {
    #[instrument(
        skip(self, query),
        fields(collection = %self.collection, k = query.k, oversample = query.oversample)
    )]
    async fn hybrid_search(
        &self,
        query: &HybridQuery,
    ) -> Result<Vec<ScoredCandidate>, RetrievalError> {
        if query.vector.len() != self.dimension {
            return Err(RetrievalError::InvalidDimension {
                expected: self.dimension,
                actual: query.vector.len(),
            });
        }

        let lexical = LexicalQuery::parse(&query.text);

        let mut hits = self
            .vector_hits(&query.vector, query.oversample, None, &lexical)
            .await?;
        if let Some(filter) = text_filter(&lexical) {
            hits.extend(
                self.vector_hits(&query.vector, query.oversample, Some(filter), &lexical)
                    .await?,
            );
        }

        let candidates = fuse(hits, query);
        debug!(results = candidates.len(), "Qdrant hybrid search");
        Ok(candidates)
    }

    #[instrument(skip(self, text), fields(collection = %self.collection))]
    async fn lexical_search(&self, text: &str, k: usize) -> Result<Vec<SearchHit>, RetrievalError> {
        let lexical = LexicalQuery::parse(text);
        let Some(filter) = text_filter(&lexical) else {
            return Ok(Vec::new());
        };

        // Scroll has no relevance order, so every matching page is ranked locally.
        let mut hits: Vec<SearchHit> = Vec::new();
        let mut offset: Option<PointId> = None;
        loop {
            let mut request = ScrollPointsBuilder::new(&self.collection)
                .filter(filter.clone())
                .limit(SCROLL_PAGE_SIZE)
                .with_payload(true)
                .with_vectors(true);
            if let Some(offset) = offset.take() {
                request = request.offset(offset);
            }

            let page = self
                .client
                .scroll(request)
                .await
                .map_err(|e| self.search_failed(e))?;

            hits.extend(page.result.into_iter().filter_map(|point| {
                let chunk = chunk_from_payload(point.id, point.payload, point.vectors)?;
                let lexical_rank = lexical.score(&chunk.text);
                (lexical_rank > 0.0).then_some(SearchHit {
                    chunk,
                    cosine_similarity: None,
                    lexical_rank,
                })
            }));
            keep_best_lexical(&mut hits, k);

            match page.next_page_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        Ok(hits)
    }

    async fn is_ready(&self) -> bool {
        if self.client.health_check().await.is_err() {
            return false;
        }
        self.client
            .collection_exists(&self.collection)
            .await
            .unwrap_or(false)
    }

    fn name(&self) -> &'static str {
        "qdrant"
    }
}
