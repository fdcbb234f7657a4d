use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::model::{BoardDocument, Category, Goal, Project, assemble_board};

#[derive(Debug)]
pub struct DataStore {
    pub data_dir: PathBuf,
    pub categories_path: PathBuf,
    pub projects_path: PathBuf,
    pub goals_path: PathBuf,
}

impl DataStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let categories_path = data_dir.join("categories.data");
        let projects_path = data_dir.join("projects.data");
        let goals_path = data_dir.join("goals.data");

        for path in [&categories_path, &projects_path, &goals_path] {
            if !path.exists() {
                fs::write(path, "").with_context(|| format!("failed to create {}", path.display()))?;
            }
        }

        info!(
            data_dir = %data_dir.display(),
            categories = %categories_path.display(),
            projects = %projects_path.display(),
            goals = %goals_path.display(),
            "opened datastore"
        );

        Ok(Self {
            data_dir,
            categories_path,
            projects_path,
            goals_path,
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn load_categories(&self) -> anyhow::Result<Vec<Category>> {
        load_jsonl(&self.categories_path).context("failed to load categories.data")
    }

    #[tracing::instrument(skip(self))]
    pub fn load_projects(&self) -> anyhow::Result<Vec<Project>> {
        load_jsonl(&self.projects_path).context("failed to load projects.data")
    }

    #[tracing::instrument(skip(self))]
    pub fn load_goals(&self) -> anyhow::Result<Vec<Goal>> {
        load_jsonl(&self.goals_path).context("failed to load goals.data")
    }

    /// The stored records exactly as persisted, without assembly.
    #[tracing::instrument(skip(self))]
    pub fn load_document(&self) -> anyhow::Result<BoardDocument> {
        Ok(BoardDocument {
            categories: self.load_categories()?,
            projects: self.load_projects()?,
            goals: self.load_goals()?,
        })
    }

    /// Projects with categories resolved and goals attached.
    #[tracing::instrument(skip(self))]
    pub fn load_board(&self) -> anyhow::Result<Vec<Project>> {
        let doc = self.load_document()?;
        Ok(assemble_board(&doc.categories, doc.projects, doc.goals))
    }

    #[tracing::instrument(skip(self, doc), fields(
        categories = doc.categories.len(),
        projects = doc.projects.len(),
        goals = doc.goals.len()
    ))]
    pub fn save_document(&self, doc: &BoardDocument) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.categories_path, &doc.categories).context("failed to save categories.data")?;
        save_jsonl_atomic(&self.projects_path, &doc.projects).context("failed to save projects.data")?;
        save_jsonl_atomic(&self.goals_path, &doc.goals).context("failed to save goals.data")?;
        Ok(())
    }
}

#[tracing::instrument(skip(path))]
fn load_jsonl<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    debug!(file = %path.display(), "loading jsonl");
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let record: T = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        out.push(record);
    }

    debug!(count = out.len(), "loaded records from jsonl");
    Ok(out)
}

#[tracing::instrument(skip(path, records))]
fn save_jsonl_atomic<T: Serialize>(path: &Path, records: &[T]) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = records.len(), "saving jsonl atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    for record in records {
        let serialized = serde_json::to_string(record)?;
        writeln!(temp, "{serialized}")?;
    }
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}
