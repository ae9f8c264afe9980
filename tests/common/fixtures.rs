//! Knowledge-base fixtures embedded with the offline hash embedder.

use groundline::embedding::HashEmbedder;
use groundline::retrieval::Chunk;

pub const TEST_EMBEDDING_DIM: usize = 64;

pub const WITHDRAW_QUESTION: &str = "How do I withdraw funds?";

/// `(id, document_id, text)` rows of a small FAQ corpus.
const FAQ_ROWS: &[(&str, &str, &str)] = &[
    ("withdraw-1", "faq-withdraw", "How do I withdraw funds"),
    (
        "withdraw-2",
        "faq-withdraw",
        "Withdrawals to a bank card take up to three business days",
    ),
    (
        "deposit-1",
        "faq-deposit",
        "Deposited funds are credited within one hour",
    ),
    (
        "account-1",
        "faq-account",
        "Reset your password from the login screen",
    ),
    (
        "account-2",
        "faq-account",
        "Two-factor authentication protects your account",
    ),
];

pub fn embedder() -> HashEmbedder {
    HashEmbedder::new(TEST_EMBEDDING_DIM)
}

/// A chunk whose vector is the hash embedding of its own text.
pub fn embedded_chunk(embedder: &HashEmbedder, id: &str, document_id: &str, text: &str) -> Chunk {
    let vector = embedder
        .embed_sync(text)
        .expect("fixture text should embed");
    Chunk::new(id, document_id, 0, text).with_vector(vector)
}

pub fn faq_corpus() -> Vec<Chunk> {
    let embedder = embedder();
    FAQ_ROWS
        .iter()
        .map(|(id, document_id, text)| embedded_chunk(&embedder, id, document_id, text))
        .collect()
}

/// The same corpus without vectors, so only lexical search can find anything.
pub fn lexical_only_corpus() -> Vec<Chunk> {
    FAQ_ROWS
        .iter()
        .map(|(id, document_id, text)| Chunk::new(*id, *document_id, 0, *text))
        .collect()
}
