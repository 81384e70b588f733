use std::path::PathBuf;

use luz_calendar::LookupError;
use luz_expr::ExprError;
use thiserror::Error;

use crate::xml::XmlPartError;

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed XML in {part}: {source}")]
    Xml {
        part: String,
        #[source]
        source: XmlPartError,
    },
    #[error("part {part} is too large ({size} bytes, limit {max})")]
    PartTooLarge { part: String, size: u64, max: u64 },
    #[error("package inflates to more than {max} bytes (at least {total})")]
    PackageTooLarge { total: u64, max: u64 },
    #[error("package has no {0} part")]
    MissingPart(String),
}

#[derive(Debug, Error)]
pub enum FillError {
    #[error("unsupported file type `{0}` (expected .docx or .pptx)")]
    UnsupportedFileType(String),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error("{part}: {source}")]
    Expression {
        part: String,
        #[source]
        source: ExprError,
    },
    #[error(transparent)]
    Package(#[from] PackageError),
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no `parasha` value to name the output file")]
    MissingPortionName,
    #[error("fill cancelled")]
    Cancelled,
}
