use std::{cell::RefCell, rc::Rc};

use crate::{
    embedding::{Embedder, EmbeddingMatrix},
    error::{Error, Result},
    llm::LanguageModel,
};

const DIMENSION: usize = 64;

/// Deterministic bag-of-words embedder: every lowercase word is hashed
/// (FNV-1a) into one of 64 buckets.
pub struct BagOfWords;

impl BagOfWords {
    pub fn vector(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; DIMENSION];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
            for byte in word.to_lowercase().bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(0x0100_0000_01b3);
            }
            vector[(hash % DIMENSION as u64) as usize] += 1.0;
        }
        vector
    }
}

impl Embedder for BagOfWords {
    fn model_id(&self) -> String {
        "test:bag-of-words".to_string()
    }

    fn embed_documents(
        &mut self,
        texts: &[String],
    ) -> Result<Vec<EmbeddingMatrix>> {
        texts
            .iter()
            .map(|t| EmbeddingMatrix::from_flat(DIMENSION, &Self::vector(t)))
            .collect()
    }

    fn embed_query(&mut self, query: &str) -> Result<EmbeddingMatrix> {
        EmbeddingMatrix::from_flat(DIMENSION, &Self::vector(query))
    }
}

/// Language model returning a fixed answer and recording every prompt.
#[derive(Clone, Default)]
pub struct CannedModel {
    pub answer: String,
    pub prompts: Rc<RefCell<Vec<String>>>,
    pub fail: bool,
}

impl CannedModel {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }
}

impl LanguageModel for CannedModel {
    fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.borrow_mut().push(prompt.to_string());
        if self.fail {
            return Err(Error::Config("model unavailable".into()));
        }
        Ok(self.answer.clone())
    }

    fn name(&self) -> &str {
        "canned"
    }
}
