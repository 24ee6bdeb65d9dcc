//! FNV-1a feature-hashing embedder, the default provider.
//!
//! Each lowercase word contributes its own feature plus the character n-grams
//! of the word padded with `<` and `>`, so "Article" and "articles" share most
//! of their mass. Buckets are signed to keep collisions unbiased, and the final
//! vector is L2-normalized.
use super::embedder::{EmbedError, Embedder, EmbedderInfo, EmbedderTier};

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x00000100000001B3;

#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
    ngram_range: (usize, usize),
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        assert!(dimension > 0, "dimension must be > 0");
        Self {
            dimension,
            ngram_range: (3, 4),
        }
    }

    #[must_use]
    pub fn with_ngram_range(mut self, min: usize, max: usize) -> Self {
        assert!(min > 0 && min <= max);
        self.ngram_range = (min, max);
        self
    }

    fn add_feature(&self, vector: &mut [f32], feature: &[u8], weight: f32) {
        let h = fnv1a(feature);
        let bucket = (h % self.dimension as u64) as usize;
        let sign = if (h >> 32) & 1 == 0 { 1.0f32 } else { -1.0f32 };
        vector[bucket] += sign * weight;
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

fn l2_normalize(v: &mut [f32]) -> f32 {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
    norm
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

impl Embedder for HashEmbedder {
    fn info(&self) -> EmbedderInfo {
        EmbedderInfo {
            name: format!("fnv1a-hash-{}", self.dimension),
            dimension: self.dimension,
            tier: EmbedderTier::Hash,
        }
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut vector = vec![0.0f32; self.dimension];
        let mut padded = String::new();
        for word in words(text) {
            self.add_feature(&mut vector, word.as_bytes(), 1.0);

            padded.clear();
            padded.push('<');
            padded.push_str(&word);
            padded.push('>');
            let chars: Vec<char> = padded.chars().collect();
            for n in self.ngram_range.0..=self.ngram_range.1 {
                if n > chars.len() {
                    continue;
                }
                for window in chars.windows(n) {
                    let ngram: String = window.iter().collect();
                    self.add_feature(&mut vector, ngram.as_bytes(), 0.5);
                }
            }
        }
        l2_normalize(&mut vector);
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn basic_embedding() {
        let emb = HashEmbedder::new(64);
        let v = emb.embed("hello world").unwrap();
        assert_eq!(v.len(), 64);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01);
    }

    #[test]
    fn deterministic() {
        let emb = HashEmbedder::new(64);
        assert_eq!(emb.embed("test").unwrap(), emb.embed("test").unwrap());
    }

    #[test]
    fn empty_input() {
        let emb = HashEmbedder::new(32);
        let v = emb.embed("").unwrap();
        assert!(v.iter().all(|&x| x == 0.0));
        let v = emb.embed(" \t\n ").unwrap();
        assert!(v.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn case_and_punctuation_insensitive() {
        let emb = HashEmbedder::new(64);
        assert_eq!(
            emb.embed("Data Act").unwrap(),
            emb.embed("data, act!").unwrap()
        );
    }

    #[test]
    fn single_char_word_still_embeds() {
        // "<a>" is exactly one trigram long
        let emb = HashEmbedder::new(64);
        let v = emb.embed("a").unwrap();
        assert!(v.iter().any(|&x| x != 0.0));
    }

    #[test]
    fn batch_matches_single() {
        let emb = HashEmbedder::new(64);
        let results = emb.embed_batch(&["hello", "world"]).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1], emb.embed("world").unwrap());
    }

    #[test]
    fn default_dimension_matches_minilm() {
        assert_eq!(HashEmbedder::default().dimension(), 384);
    }

    #[test]
    fn info_name_format() {
        let emb = HashEmbedder::new(512);
        let info = emb.info();
        assert_eq!(info.name, "fnv1a-hash-512");
        assert_eq!(info.tier, EmbedderTier::Hash);
    }

    #[test]
    fn custom_ngram_range() {
        let emb = HashEmbedder::new(64).with_ngram_range(2, 5);
        let v = emb.embed("municipalities").unwrap();
        assert_eq!(v.len(), 64);
    }

    #[test]
    fn fnv1a_known_values() {
        assert_eq!(fnv1a(b""), FNV_OFFSET);
        assert_ne!(fnv1a(b"a"), fnv1a(b"b"));
    }

    #[test]
    fn l2_normalize_unit() {
        let mut v = vec![3.0, 4.0];
        let norm = l2_normalize(&mut v);
        assert!((norm - 5.0).abs() < 0.001);
        assert!((v[0] - 0.6).abs() < 0.001);
        assert!((v[1] - 0.8).abs() < 0.001);
    }

    #[test]
    #[should_panic(expected = "dimension must be > 0")]
    fn zero_dimension_panics() {
        HashEmbedder::new(0);
    }

    #[test]
    fn related_legal_text_correlates() {
        let emb = HashEmbedder::new(256);
        let q = emb.embed("personal data processing by controllers").unwrap();
        let near = emb
            .embed("The controller shall process personal data lawfully.")
            .unwrap();
        let far = emb
            .embed("Member States shall lay down rules on penalties.")
            .unwrap();
        assert!(
            dot(&q, &near) > dot(&q, &far),
            "related={} should > unrelated={}",
            dot(&q, &near),
            dot(&q, &far)
        );
    }
}
