use std::io::Read;

use zip::read::ZipFile;

use crate::error::PackageError;

/// Default cap on the inflated size of any single part.
pub const DEFAULT_MAX_PART_BYTES: u64 = 256 * 1024 * 1024; // 256MiB

/// Default cap on the inflated bytes read from one package.
pub const DEFAULT_MAX_TOTAL_BYTES: u64 = 512 * 1024 * 1024; // 512MiB

/// Inflate limits applied while reading a package. Guards against ZIP bombs and forged size
/// fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageLimits {
    pub max_part_bytes: u64,
    pub max_total_bytes: u64,
}

impl Default for PackageLimits {
    fn default() -> Self {
        Self {
            max_part_bytes: DEFAULT_MAX_PART_BYTES,
            max_total_bytes: DEFAULT_MAX_TOTAL_BYTES,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct InflateBudget {
    limits: PackageLimits,
    used_bytes: u64,
}

impl InflateBudget {
    pub(crate) fn new(limits: PackageLimits) -> Self {
        Self {
            limits,
            used_bytes: 0,
        }
    }

    fn remaining_bytes(&self) -> u64 {
        self.limits.max_total_bytes.saturating_sub(self.used_bytes)
    }

    fn too_large(&self, extra: u64) -> PackageError {
        PackageError::PackageTooLarge {
            total: self.used_bytes.saturating_add(extra),
            max: self.limits.max_total_bytes,
        }
    }

    /// Read one entry into memory, charging its inflated size against the budget.
    ///
    /// The declared size is checked first, but the read itself is capped at one byte past the
    /// limit so a forged size field cannot smuggle more data through.
    pub(crate) fn read<R: Read>(&mut self, file: &mut ZipFile<'_, R>, part: &str) -> Result<Vec<u8>, PackageError> {
        let max_part = self.limits.max_part_bytes;
        let remaining = self.remaining_bytes();
        let effective_max = max_part.min(remaining);
        let limit_is_total = effective_max < max_part;

        let declared = file.size();
        if declared > max_part {
            return Err(PackageError::PartTooLarge {
                part: part.to_string(),
                size: declared,
                max: max_part,
            });
        }
        if limit_is_total && declared > effective_max {
            return Err(self.too_large(declared));
        }

        let mut buf = Vec::new();
        file.take(effective_max.saturating_add(1))
            .read_to_end(&mut buf)?;

        let observed = buf.len() as u64;
        if observed > effective_max {
            if limit_is_total {
                return Err(self.too_large(observed));
            }
            return Err(PackageError::PartTooLarge {
                part: part.to_string(),
                size: observed,
                max: max_part,
            });
        }

        self.used_bytes = self.used_bytes.saturating_add(observed);
        Ok(buf)
    }
}

/// Canonical form of an entry name for lookups: no leading separators, `/` separators, ASCII
/// lowercase. Some producers write `\` separators or odd casing.
pub(crate) fn canonical_part_name(name: &str) -> String {
    name.trim_start_matches(['/', '\\'])
        .replace('\\', "/")
        .to_ascii_lowercase()
}
