//! Manuscript files
//!
//! A manuscript is stored as TOML:
//!
//! ```toml
//! [manuscript]
//! title = "Talk"
//! created = "2024-05-01T09:00:00+00:00"
//!
//! [[slides]]
//! key_binding = "1"
//!
//! [[slides.segments]]
//! type = "ruby"
//! base = "漢字"
//! reading = "かんじ"
//! ```
//!
//! Loading repairs malformed documents instead of rejecting them.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Manuscript, Segment, Slide};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("file access failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Decode(#[from] toml::de::Error),

    #[error("failed to serialize TOML: {0}")]
    Encode(#[from] toml::ser::Error),
}

/// On-disk layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManuscriptFile {
    pub manuscript: ManuscriptMeta,
    #[serde(default)]
    pub slides: Vec<SlideEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManuscriptMeta {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub created: String,
}

/// Scalars come before `segments` so the entry encodes as a TOML table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_binding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_color: Option<String>,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

impl From<&Manuscript> for ManuscriptFile {
    fn from(manuscript: &Manuscript) -> Self {
        Self {
            manuscript: ManuscriptMeta {
                title: manuscript.title.clone(),
                created: manuscript.created.clone(),
            },
            slides: manuscript
                .slides
                .iter()
                .map(|slide| SlideEntry {
                    key_binding: slide.key_binding.clone(),
                    font_size: slide.font_size,
                    font_color: slide.font_color.clone(),
                    segments: slide.segments.clone(),
                })
                .collect(),
        }
    }
}

impl From<ManuscriptFile> for Manuscript {
    fn from(file: ManuscriptFile) -> Self {
        let mut manuscript = Manuscript {
            title: file.manuscript.title,
            created: file.manuscript.created,
            slides: file
                .slides
                .into_iter()
                .map(|entry| Slide {
                    segments: entry.segments,
                    key_binding: entry.key_binding,
                    font_size: entry.font_size,
                    font_color: entry.font_color,
                })
                .collect(),
        };
        let repairs = manuscript.normalize();
        if repairs > 0 {
            log::warn!("manuscript file repaired on load ({} fixes)", repairs);
        }
        manuscript
    }
}

pub fn from_toml_str(content: &str) -> Result<Manuscript, PersistError> {
    let file: ManuscriptFile = toml::from_str(content)?;
    Ok(file.into())
}

pub fn to_toml_string(manuscript: &Manuscript) -> Result<String, PersistError> {
    Ok(toml::to_string_pretty(&ManuscriptFile::from(manuscript))?)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<Manuscript, PersistError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let manuscript = from_toml_str(&content)?;
    log::info!("loaded {} ({} slides)", path.display(), manuscript.slides.len());
    Ok(manuscript)
}

pub fn save_to_path(path: impl AsRef<Path>, manuscript: &Manuscript) -> Result<(), PersistError> {
    let path = path.as_ref();
    let content = to_toml_string(manuscript)?;
    fs::write(path, content)?;
    log::info!("saved {}", path.display());
    Ok(())
}

/// Raw text of a file to import
pub fn read_text_file(path: impl AsRef<Path>) -> Result<String, PersistError> {
    Ok(fs::read_to_string(path)?)
}
