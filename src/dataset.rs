use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub id: String,
    pub question: String,
    pub expected: String,
}

#[derive(Debug, Clone)]
pub struct Dataset {
    pub name: String,
    pub sha256: String,
    pub questions: Vec<Question>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DatasetDocument {
    Wrapped { questions: Vec<RawQuestion> },
    Bare(Vec<RawQuestion>),
}

#[derive(Debug, Deserialize)]
struct RawQuestion {
    #[serde(default)]
    id: Option<serde_json::Value>,
    question: String,
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    expected: Option<String>,
}

impl RawQuestion {
    fn into_question(self, index: usize) -> Result<Question> {
        let id = match self.id {
            Some(serde_json::Value::String(s)) => s,
            Some(serde_json::Value::Null) | None => format!("q_{}", index),
            Some(other) => other.to_string(),
        };
        let expected = self
            .answer
            .or(self.expected)
            .with_context(|| format!("Question {} ({}) has no answer/expected field", index, id))?;
        Ok(Question {
            id,
            question: self.question,
            expected,
        })
    }
}

/// A name ending in `.json` is a path; anything else names
/// `<datasets_dir>/<name>.json`.
pub fn resolve_path(dataset: &str, datasets_dir: &Path) -> PathBuf {
    if dataset.ends_with(".json") {
        PathBuf::from(dataset)
    } else {
        datasets_dir.join(format!("{}.json", dataset))
    }
}

pub fn parse_questions(content: &str) -> Result<Vec<Question>> {
    let document: DatasetDocument =
        serde_json::from_str(content).context("Invalid dataset JSON")?;
    let raw = match document {
        DatasetDocument::Wrapped { questions } => questions,
        DatasetDocument::Bare(questions) => questions,
    };
    raw.into_iter()
        .enumerate()
        .map(|(i, q)| q.into_question(i))
        .collect()
}

pub fn load(dataset: &str, datasets_dir: &Path, limit: usize) -> Result<Dataset> {
    let path = resolve_path(dataset, datasets_dir);
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read dataset {}", path.display()))?;
    let mut questions = parse_questions(&content)
        .with_context(|| format!("Failed to parse dataset {}", path.display()))?;
    questions.truncate(limit);

    let sha256 = hex::encode(Sha256::digest(content.as_bytes()));
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| dataset.to_string());

    info!(
        dataset = %name,
        questions = questions.len(),
        path = %path.display(),
        "Loaded dataset"
    );

    Ok(Dataset {
        name,
        sha256,
        questions,
    })
}
