use std::path::Path;

use crate::error::FillError;
use crate::package::OfficePackage;
use crate::zip_util::canonical_part_name;

const WORD_MAIN_PART: &str = "word/document.xml";
const SLIDE_PREFIX: &str = "ppt/slides/slide";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Word,
    PowerPoint,
}

impl DocumentKind {
    /// Pick the kind from a file extension (case-insensitive, with or without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.strip_prefix('.').unwrap_or(ext);
        if ext.eq_ignore_ascii_case("docx") {
            Some(DocumentKind::Word)
        } else if ext.eq_ignore_ascii_case("pptx") {
            Some(DocumentKind::PowerPoint)
        } else {
            None
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, FillError> {
        let ext = path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_extension(&ext).ok_or_else(|| FillError::UnsupportedFileType(format!(".{ext}")))
    }

    pub fn extension(self) -> &'static str {
        match self {
            DocumentKind::Word => "docx",
            DocumentKind::PowerPoint => "pptx",
        }
    }

    /// Whether rewritten text elements get `xml:space="preserve"` when needed.
    pub(crate) fn preserves_space(self) -> bool {
        matches!(self, DocumentKind::Word)
    }

    /// Names of the parts to fill, in processing order.
    ///
    /// Word fills only the main document body. PowerPoint fills every slide, ordered by slide
    /// number rather than by name (`slide10` after `slide9`).
    pub fn template_parts(self, package: &OfficePackage<'_>) -> Vec<String> {
        match self {
            DocumentKind::Word => package.resolve_part_name(WORD_MAIN_PART).into_iter().collect(),
            DocumentKind::PowerPoint => {
                let mut slides: Vec<(u32, String)> = package
                    .part_names()
                    .filter_map(|name| slide_number(name).map(|n| (n, name.to_string())))
                    .collect();
                slides.sort();
                slides.into_iter().map(|(_, name)| name).collect()
            }
        }
    }

    pub(crate) fn main_part(self) -> Option<&'static str> {
        match self {
            DocumentKind::Word => Some(WORD_MAIN_PART),
            DocumentKind::PowerPoint => None,
        }
    }
}

/// `ppt/slides/slide12.xml` → `12`.
fn slide_number(name: &str) -> Option<u32> {
    let canonical = canonical_part_name(name);
    let digits = canonical
        .strip_prefix(SLIDE_PREFIX)?
        .strip_suffix(".xml")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
