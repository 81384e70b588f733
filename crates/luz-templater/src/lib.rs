#![forbid(unsafe_code)]

//! Fill Word (`.docx`) and PowerPoint (`.pptx`) templates whose text contains `{{…}}` tokens.
//!
//! Each token body is a [`luz_expr`] statement evaluated against a per-fill name table, usually
//! seeded from [`luz_calendar`]. The filled archive is written atomically into the output
//! directory under a name built from the weekly portion.

pub mod document;
pub mod error;
pub mod fill;
pub mod fs;
pub mod package;
pub mod scanner;
pub mod xml;
pub mod zip_util;

pub use document::DocumentKind;
pub use error::{FillError, PackageError};
pub use fill::{
    fill_package_bytes, fill_package_bytes_with_options, fill_template, fill_template_for_place,
    output_file_name, FillOptions, FillOutcome, FillStats,
};
pub use package::OfficePackage;
pub use scanner::{scan, ScanStats, TextNodes};
pub use xml::{XmlPartError, XmlTextPart};
pub use zip_util::PackageLimits;
