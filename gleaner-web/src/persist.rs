//! Flat-file output: one text file per page, a CSV mapping, and the URL list.

use gleaner_common::GleanerError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const MAPPING_FILE: &str = "url_to_file_map.csv";
pub const URL_LIST_FILE: &str = "url_list.json";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("CSV error at {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("JSON error at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl PersistError {
    pub fn path(&self) -> &Path {
        match self {
            PersistError::Io { path, .. }
            | PersistError::Csv { path, .. }
            | PersistError::Json { path, .. } => path,
        }
    }
}

impl From<PersistError> for GleanerError {
    fn from(err: PersistError) -> Self {
        GleanerError::Output {
            path: err.path().to_path_buf(),
            message: err.to_string(),
        }
    }
}

/// File-name conventions under one output directory.
///
/// ```
/// use gleaner_web::OutputLayout;
/// use std::path::PathBuf;
///
/// let layout = OutputLayout::new("data");
/// assert_eq!(layout.page_path(3), PathBuf::from("data/webpage_3.txt"));
/// assert_eq!(layout.mapping_path(), PathBuf::from("data/url_to_file_map.csv"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub dir: PathBuf,
}

impl OutputLayout {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `idx` is the URL's position in the full sitemap list.
    pub fn page_path(&self, idx: usize) -> PathBuf {
        self.dir.join(format!("webpage_{idx}.txt"))
    }

    pub fn mapping_path(&self) -> PathBuf {
        self.dir.join(MAPPING_FILE)
    }

    pub fn url_list_path(&self) -> PathBuf {
        self.dir.join(URL_LIST_FILE)
    }

    pub fn ensure_dir(&self) -> Result<(), PersistError> {
        fs::create_dir_all(&self.dir).map_err(|source| PersistError::Io {
            path: self.dir.clone(),
            source,
        })
    }
}

impl Default for OutputLayout {
    fn default() -> Self {
        OutputLayout::new("data")
    }
}

/// Insertion-ordered URL to file mapping.
///
/// Re-inserting a URL keeps its original position and replaces the path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlFileMap {
    entries: Vec<(String, PathBuf)>,
}

impl UrlFileMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: impl Into<String>, path: impl Into<PathBuf>) {
        let url = url.into();
        let path = path.into();
        match self.entries.iter_mut().find(|(u, _)| *u == url) {
            Some((_, existing)) => *existing = path,
            None => self.entries.push((url, path)),
        }
    }

    pub fn get(&self, url: &str) -> Option<&Path> {
        self.entries
            .iter()
            .find(|(u, _)| u == url)
            .map(|(_, p)| p.as_path())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries.iter().map(|(u, p)| (u.as_str(), p.as_path()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Write the URL list as a JSON array of strings.
pub fn write_url_list(layout: &OutputLayout, urls: &[String]) -> Result<PathBuf, PersistError> {
    let path = layout.url_list_path();
    let json = serde_json::to_vec_pretty(urls).map_err(|source| PersistError::Json {
        path: path.clone(),
        source,
    })?;
    fs::write(&path, json).map_err(|source| PersistError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Write one page's text, replacing any previous file.
pub fn write_page(layout: &OutputLayout, idx: usize, text: &str) -> Result<PathBuf, PersistError> {
    let path = layout.page_path(idx);
    fs::write(&path, text).map_err(|source| PersistError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Write the `URL,Document` mapping CSV.
pub fn write_mapping(layout: &OutputLayout, map: &UrlFileMap) -> Result<PathBuf, PersistError> {
    let path = layout.mapping_path();
    let csv_err = |source| PersistError::Csv {
        path: path.clone(),
        source,
    };

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_path(&path)
        .map_err(csv_err)?;
    writer.write_record(["URL", "Document"]).map_err(csv_err)?;
    for (url, file) in map.iter() {
        writer
            .write_record([url, &*file.to_string_lossy()])
            .map_err(csv_err)?;
    }
    writer.flush().map_err(|source| PersistError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
