//! Feature-hashing bag-of-words encoder.
//!
//! Lowercased alphanumeric tokens are hashed with SHA-256 into one of
//! `dims` signed buckets and the result is L2-normalized. It captures
//! word overlap only, not meaning, but it is deterministic, needs no model
//! download, and produces vectors with the same contract as a real encoder.

use anyhow::Result;
use async_trait::async_trait;
use sha2::{Digest, Sha256};

use quote_search_core::embedding::{EmbedRole, EmbeddingProvider};

use crate::config::EmbeddingConfig;

use super::with_prefix;

const DEFAULT_DIMS: usize = 256;

pub struct HashProvider {
    model: String,
    dims: usize,
    config: EmbeddingConfig,
}

impl HashProvider {
    pub fn new(config: &EmbeddingConfig) -> Self {
        let dims = config.dims.unwrap_or(DEFAULT_DIMS);
        Self {
            model: config.model.clone().unwrap_or_else(|| "hash".to_string()),
            dims,
            config: config.clone(),
        }
    }

    fn encode(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dims];
        let lower = text.to_lowercase();
        for token in lower
            .split(|c: char| !c.is_alphanumeric() && c != '\'')
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(token.as_bytes());
            let mut word = [0u8; 8];
            word.copy_from_slice(&digest[..8]);
            let h = u64::from_le_bytes(word);
            let bucket = (h % self.dims as u64) as usize;
            let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
            v[bucket] += sign;
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

#[async_trait]
impl EmbeddingProvider for HashProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed(&self, texts: &[String], role: EmbedRole) -> Result<Vec<Vec<f32>>> {
        Ok(with_prefix(&self.config, texts, role)
            .iter()
            .map(|t| self.encode(t))
            .collect())
    }
}
