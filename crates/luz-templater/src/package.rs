use std::collections::BTreeMap;
use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::PackageError;
use crate::zip_util::{canonical_part_name, InflateBudget, PackageLimits};

/// An Office (OPC) package held in memory.
///
/// Parts are only inflated on request. Writing the package copies every part that was not
/// replaced as raw compressed bytes, in its original position, so only replaced parts differ
/// from the source archive.
pub struct OfficePackage<'a> {
    source: &'a [u8],
    archive: ZipArchive<Cursor<&'a [u8]>>,
    budget: InflateBudget,
    replaced: BTreeMap<String, Vec<u8>>,
}

impl<'a> OfficePackage<'a> {
    pub fn from_bytes(bytes: &'a [u8]) -> Result<Self, PackageError> {
        Self::from_bytes_limited(bytes, PackageLimits::default())
    }

    pub fn from_bytes_limited(bytes: &'a [u8], limits: PackageLimits) -> Result<Self, PackageError> {
        let archive = ZipArchive::new(Cursor::new(bytes))?;
        Ok(Self {
            source: bytes,
            archive,
            budget: InflateBudget::new(limits),
            replaced: BTreeMap::new(),
        })
    }

    /// Entry names in archive order.
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.archive.file_names()
    }

    /// Find the stored name of a part, tolerating leading `/`, `\` separators and case
    /// differences. An exact match wins.
    pub fn resolve_part_name(&self, name: &str) -> Option<String> {
        if self.archive.index_for_name(name).is_some() {
            return Some(name.to_string());
        }
        let wanted = canonical_part_name(name);
        self.archive
            .file_names()
            .find(|entry| canonical_part_name(entry) == wanted)
            .map(str::to_string)
    }

    /// Inflate a part, counting it against the package limits.
    pub fn read_part(&mut self, name: &str) -> Result<Vec<u8>, PackageError> {
        if let Some(bytes) = self.replaced.get(name) {
            return Ok(bytes.clone());
        }
        let idx = self
            .archive
            .index_for_name(name)
            .ok_or_else(|| PackageError::MissingPart(name.to_string()))?;
        let mut file = self.archive.by_index(idx)?;
        self.budget.read(&mut file, name)
    }

    pub fn set_part(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        self.replaced.insert(name.into(), bytes);
    }

    pub fn is_modified(&self) -> bool {
        !self.replaced.is_empty()
    }

    /// Serialize the package. Returns the source bytes unchanged when nothing was replaced.
    pub fn write_to_bytes(&mut self) -> Result<Vec<u8>, PackageError> {
        if self.replaced.is_empty() {
            return Ok(self.source.to_vec());
        }

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for idx in 0..self.archive.len() {
            let file = self.archive.by_index_raw(idx)?;
            match self.replaced.get(file.name()) {
                Some(bytes) => {
                    let options = SimpleFileOptions::default()
                        .compression_method(CompressionMethod::Deflated);
                    let name = file.name().to_string();
                    drop(file);
                    zip.start_file(name, options)?;
                    zip.write_all(bytes)?;
                }
                None => zip.raw_copy_file(file)?,
            }
        }

        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }
}
