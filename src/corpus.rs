use crate::difficulty::Difficulty;
use crate::error::CorpusError;
use include_dir::{include_dir, Dir};
use itertools::Itertools;
use serde::Deserialize;
use std::path::{Path, PathBuf};

static TEXT_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/texts");

/// One bundled passage with its display title
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct PassageEntry {
    #[serde(default)]
    pub title: String,
    pub text: String,
}

/// On-disk shape of a tier's passage file
#[derive(Deserialize, Clone, Debug)]
pub struct PassageSet {
    pub name: String,
    pub passages: Vec<PassageEntry>,
}

impl PassageSet {
    pub fn from_json(name: &str, json: &str) -> Result<Self, CorpusError> {
        serde_json::from_str(json).map_err(|source| CorpusError::Parse {
            name: name.to_string(),
            source,
        })
    }

    /// Passage texts in file order, trimmed, de-duplicated and without blanks
    pub fn texts(&self) -> Vec<String> {
        self.passages
            .iter()
            .map(|p| p.text.trim().to_string())
            .filter(|t| !t.is_empty())
            .unique()
            .collect()
    }
}

/// Source of candidate passages for each difficulty tier
pub trait CorpusProvider {
    fn passages(&self, difficulty: Difficulty) -> Result<Vec<String>, CorpusError>;
}

fn non_empty(difficulty: Difficulty, texts: Vec<String>) -> Result<Vec<String>, CorpusError> {
    if texts.is_empty() {
        Err(CorpusError::Empty(difficulty.key().to_string()))
    } else {
        Ok(texts)
    }
}

/// Passages compiled into the binary
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedCorpus;

impl CorpusProvider for EmbeddedCorpus {
    fn passages(&self, difficulty: Difficulty) -> Result<Vec<String>, CorpusError> {
        let file_name = format!("{}.json", difficulty.key());
        let file = TEXT_DIR
            .get_file(&file_name)
            .ok_or_else(|| CorpusError::Missing(file_name.clone()))?;
        let contents = file
            .contents_utf8()
            .ok_or_else(|| CorpusError::Missing(file_name.clone()))?;
        let set = PassageSet::from_json(difficulty.key(), contents)?;
        non_empty(difficulty, set.texts())
    }
}

/// Passages read from `<dir>/<tier>.json` at runtime
#[derive(Debug, Clone)]
pub struct DirectoryCorpus {
    dir: PathBuf,
}

impl DirectoryCorpus {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

impl CorpusProvider for DirectoryCorpus {
    fn passages(&self, difficulty: Difficulty) -> Result<Vec<String>, CorpusError> {
        let path = self.dir.join(format!("{}.json", difficulty.key()));
        if !path.exists() {
            return Err(CorpusError::Missing(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(&path)?;
        let set = PassageSet::from_json(difficulty.key(), &contents)?;
        non_empty(difficulty, set.texts())
    }
}

/// Fixed in-memory passage lists, handy for tests and custom prompts
#[derive(Debug, Clone, Default)]
pub struct StaticCorpus {
    pub easy: Vec<String>,
    pub medium: Vec<String>,
    pub hard: Vec<String>,
}

impl StaticCorpus {
    /// Same list for every tier
    pub fn uniform(texts: Vec<String>) -> Self {
        Self {
            easy: texts.clone(),
            medium: texts.clone(),
            hard: texts,
        }
    }
}

impl CorpusProvider for StaticCorpus {
    fn passages(&self, difficulty: Difficulty) -> Result<Vec<String>, CorpusError> {
        let texts = match difficulty {
            Difficulty::Easy => &self.easy,
            Difficulty::Medium => &self.medium,
            Difficulty::Hard => &self.hard,
        };
        non_empty(difficulty, texts.iter().cloned().unique().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_embedded_corpus_has_every_tier() {
        for tier in Difficulty::ALL {
            let texts = EmbeddedCorpus.passages(tier).unwrap();
            assert!(!texts.is_empty(), "{tier} should have passages");
            assert!(texts.iter().all(|t| !t.trim().is_empty()));
        }
    }

    #[test]
    fn test_passage_set_deserialization() {
        let json = r#"
        {
            "name": "test",
            "passages": [
                { "title": "One", "text": "hello world" },
                { "text": "  hello world  " },
                { "title": "Blank", "text": "   " },
                { "title": "Two", "text": "goodbye world" }
            ]
        }
        "#;

        let set = PassageSet::from_json("test", json).expect("valid json");
        assert_eq!(set.name, "test");
        assert_eq!(set.passages.len(), 4);
        assert_eq!(set.texts(), vec!["hello world", "goodbye world"]);
    }

    #[test]
    fn test_bad_json_is_parse_error() {
        let err = PassageSet::from_json("broken", "{").unwrap_err();
        assert!(matches!(err, CorpusError::Parse { .. }));
    }

    #[test]
    fn test_directory_corpus_reads_tier_file() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("hard.json"),
            r#"{ "name": "hard", "passages": [{ "title": "x", "text": "custom passage" }] }"#,
        )
        .unwrap();

        let corpus = DirectoryCorpus::new(dir.path());
        assert_eq!(corpus.passages(Difficulty::Hard).unwrap(), vec!["custom passage"]);
        assert!(matches!(
            corpus.passages(Difficulty::Easy),
            Err(CorpusError::Missing(_))
        ));
    }

    #[test]
    fn test_static_corpus_rejects_empty_tier() {
        let corpus = StaticCorpus {
            easy: vec!["a b c".into()],
            ..Default::default()
        };
        assert!(corpus.passages(Difficulty::Easy).is_ok());
        assert!(matches!(
            corpus.passages(Difficulty::Medium),
            Err(CorpusError::Empty(_))
        ));
    }
}
