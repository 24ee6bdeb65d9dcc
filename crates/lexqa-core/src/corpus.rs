//! Legal corpus records and the passage flattener.
//!
//! The input is a JSON array of laws:
//!
//! ```json
//! [
//!   {
//!     "title": "Data Act",
//!     "url": "https://eur-lex.europa.eu/eli/reg/2023/2854/oj",
//!     "articles": [
//!       { "article": 5, "paragraphs": [ { "number": 1, "text": "..." } ] }
//!     ]
//!   }
//! ]
//! ```
//!
//! Deserialization is typed: a missing field or a wrong type fails at load
//! time with [`CorpusError::Malformed`], pointing at the offending line.
//!
//! [`flatten`] walks law → article → paragraph in input order and emits one
//! passage per paragraph. The position of a passage in the output is the key
//! the vector index uses to refer back to it.

use std::collections::HashSet;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("malformed corpus at line {line}, column {column}: {message}")]
    Malformed {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("failed to read corpus {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<serde_json::Error> for CorpusError {
    fn from(e: serde_json::Error) -> Self {
        Self::Malformed {
            line: e.line(),
            column: e.column(),
            message: e.to_string(),
        }
    }
}

/// Article or paragraph number. Sources use both `5` and `"5a"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    Number(i64),
    Text(String),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Identifier {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    pub number: Identifier,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    #[serde(rename = "article")]
    pub number: Identifier,
    pub paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Law {
    pub title: String,
    pub url: String,
    pub articles: Vec<Article>,
}

/// An ordered collection of laws.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Corpus {
    pub laws: Vec<Law>,
}

impl Corpus {
    pub fn new(laws: Vec<Law>) -> Self {
        Self { laws }
    }

    pub fn from_json_str(json: &str) -> Result<Self, CorpusError> {
        let corpus: Self = serde_json::from_str(json)?;
        corpus.warn_duplicate_titles();
        Ok(corpus)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CorpusError> {
        let corpus: Self = serde_json::from_reader(reader)?;
        corpus.warn_duplicate_titles();
        Ok(corpus)
    }

    /// Load a corpus file from disk.
    pub fn load(path: &Path) -> Result<Self, CorpusError> {
        let file = std::fs::File::open(path).map_err(|source| CorpusError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let corpus = Self::from_reader(std::io::BufReader::new(file))?;
        tracing::debug!(
            path = %path.display(),
            laws = corpus.laws.len(),
            "Corpus loaded"
        );
        Ok(corpus)
    }

    pub fn article_count(&self) -> usize {
        self.laws.iter().map(|law| law.articles.len()).sum()
    }

    pub fn paragraph_count(&self) -> usize {
        self.laws
            .iter()
            .flat_map(|law| &law.articles)
            .map(|article| article.paragraphs.len())
            .sum()
    }

    /// Titles identify laws; a repeat is allowed but makes citations ambiguous.
    fn warn_duplicate_titles(&self) {
        let mut seen = HashSet::new();
        for law in &self.laws {
            if !seen.insert(law.title.as_str()) {
                tracing::warn!(title = %law.title, "Duplicate law title in corpus");
            }
        }
    }
}

/// One retrievable paragraph with its citation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    pub text: String,
    pub reference: String,
    pub url: String,
}

/// `"<title>, Article <n>, Paragraph <m>"`.
pub fn reference(law: &Law, article: &Article, paragraph: &Paragraph) -> String {
    format!(
        "{}, Article {}, Paragraph {}",
        law.title, article.number, paragraph.number
    )
}

/// Parallel, equal-length passage texts and metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlattenedCorpus {
    pub passages: Vec<String>,
    pub metadata: Vec<Passage>,
}

impl FlattenedCorpus {
    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }
}

/// Flatten `laws` depth-first, in input order, one passage per paragraph.
pub fn flatten(laws: &[Law]) -> FlattenedCorpus {
    let mut out = FlattenedCorpus::default();
    for law in laws {
        for article in &law.articles {
            for paragraph in &article.paragraphs {
                out.passages.push(paragraph.text.clone());
                out.metadata.push(Passage {
                    text: paragraph.text.clone(),
                    reference: reference(law, article, paragraph),
                    url: law.url.clone(),
                });
            }
        }
    }
    out
}
