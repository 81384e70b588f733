use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use luz_calendar::TimeLookup;
use luz_expr::{Diagnostic, Evaluator, NameTable};
use serde::Serialize;

use crate::document::DocumentKind;
use crate::error::{FillError, PackageError};
use crate::fs::atomic_write_bytes;
use crate::package::OfficePackage;
use crate::scanner::scan;
use crate::xml::XmlTextPart;
use crate::zip_util::PackageLimits;

/// Prefix of every output file name ("Shabbat schedule, portion …").
pub const OUTPUT_NAME_PREFIX: &str = "לוז שבת פרשת";

#[derive(Debug, Clone)]
pub struct FillOptions {
    pub limits: PackageLimits,
    /// Add `xml:space="preserve"` to Word text whose edges became whitespace.
    pub preserve_space: bool,
    /// Checked before each part; once set the fill stops with [`FillError::Cancelled`].
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for FillOptions {
    fn default() -> Self {
        Self {
            limits: PackageLimits::default(),
            preserve_space: true,
            cancel: None,
        }
    }
}

impl FillOptions {
    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FillStats {
    /// Template parts scanned.
    pub parts: usize,
    /// Parts whose text changed and were rewritten.
    pub parts_changed: usize,
    pub tokens: usize,
    pub cross_element_tokens: usize,
}

#[derive(Debug)]
pub struct FillOutcome {
    pub path: PathBuf,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: FillStats,
}

/// Fill the template at `source` with `names` and write the result into `output_dir`.
pub fn fill_template(
    source: &Path,
    output_dir: &Path,
    names: NameTable,
    options: &FillOptions,
) -> Result<FillOutcome, FillError> {
    let kind = DocumentKind::from_path(source)?;
    fill_kind(kind, source, output_dir, names, options)
}

/// Look up the times for `place` and fill the template with them.
///
/// The file type is checked before the lookup, so unsupported templates never cost a request.
pub fn fill_template_for_place<L>(
    lookup: &L,
    place: &str,
    source: &Path,
    output_dir: &Path,
    options: &FillOptions,
) -> Result<FillOutcome, FillError>
where
    L: TimeLookup + ?Sized,
{
    let kind = DocumentKind::from_path(source)?;
    let names = lookup.lookup(place)?.to_name_table();
    fill_kind(kind, source, output_dir, names, options)
}

fn fill_kind(
    kind: DocumentKind,
    source: &Path,
    output_dir: &Path,
    mut names: NameTable,
    options: &FillOptions,
) -> Result<FillOutcome, FillError> {
    let bytes = std::fs::read(source).map_err(|source_err| FillError::Io {
        path: source.to_path_buf(),
        source: source_err,
    })?;

    let mut evaluator = Evaluator::new(&mut names);
    let (filled, stats) = fill_package_bytes_with_options(kind, &bytes, &mut evaluator, options)?;
    let diagnostics = evaluator.into_diagnostics();

    let portion = names
        .get("parasha")
        .map(ToString::to_string)
        .ok_or(FillError::MissingPortionName)?;
    let path = output_dir.join(output_file_name(&portion, kind));

    if options.is_cancelled() {
        return Err(FillError::Cancelled);
    }
    atomic_write_bytes(&path, &filled).map_err(|source| FillError::Io {
        path: path.clone(),
        source,
    })?;

    log::info!(
        "filled {} -> {} ({} tokens in {} of {} parts, {} warnings)",
        source.display(),
        path.display(),
        stats.tokens,
        stats.parts_changed,
        stats.parts,
        diagnostics.len()
    );
    Ok(FillOutcome {
        path,
        diagnostics,
        stats,
    })
}

/// Fill an archive already held in memory.
pub fn fill_package_bytes(
    kind: DocumentKind,
    bytes: &[u8],
    evaluator: &mut Evaluator<'_>,
) -> Result<(Vec<u8>, FillStats), FillError> {
    fill_package_bytes_with_options(kind, bytes, evaluator, &FillOptions::default())
}

pub fn fill_package_bytes_with_options(
    kind: DocumentKind,
    bytes: &[u8],
    evaluator: &mut Evaluator<'_>,
    options: &FillOptions,
) -> Result<(Vec<u8>, FillStats), FillError> {
    let mut package = OfficePackage::from_bytes_limited(bytes, options.limits)?;
    let parts = kind.template_parts(&package);
    if parts.is_empty() {
        if let Some(main) = kind.main_part() {
            return Err(PackageError::MissingPart(main.to_string()).into());
        }
        log::warn!("presentation has no slides; nothing to fill");
    }

    let mut stats = FillStats::default();
    for part in &parts {
        if options.is_cancelled() {
            return Err(FillError::Cancelled);
        }

        let xml = package.read_part(part)?;
        let mut nodes = XmlTextPart::parse(&xml)
            .map_err(|source| PackageError::Xml {
                part: part.clone(),
                source,
            })?
            .with_space_preserve(options.preserve_space && kind.preserves_space());

        let scanned = scan(&mut nodes, evaluator).map_err(|source| FillError::Expression {
            part: part.clone(),
            source,
        })?;
        stats.parts += 1;
        stats.tokens += scanned.tokens;
        stats.cross_element_tokens += scanned.cross_element_tokens;

        if nodes.is_modified() {
            let rewritten = nodes.to_bytes().map_err(|source| PackageError::Xml {
                part: part.clone(),
                source,
            })?;
            package.set_part(part.clone(), rewritten);
            stats.parts_changed += 1;
        }
        log::debug!(
            "{part}: {} tokens ({} across elements)",
            scanned.tokens,
            scanned.cross_element_tokens
        );
    }

    Ok((package.write_to_bytes()?, stats))
}

/// `לוז שבת פרשת <portion>.<ext>`, with path separators and control characters in the portion
/// replaced by `_`.
pub fn output_file_name(portion: &str, kind: DocumentKind) -> String {
    let portion: String = portion
        .trim()
        .chars()
        .map(|c| {
            if matches!(c, '/' | '\\') || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    format!("{OUTPUT_NAME_PREFIX} {portion}.{}", kind.extension())
}
