//! ZIP package access for Office Open XML documents.
//!
//! Every part read goes through size accounting so a crafted archive cannot
//! expand past [`PackageLimits`].

use std::io::{Cursor, Read, Seek};
use thiserror::Error;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error_codes;

#[derive(Debug, Clone, Copy)]
pub struct PackageLimits {
    pub max_entries: usize,
    pub max_part_bytes: u64,
    pub max_total_bytes: u64,
}

impl Default for PackageLimits {
    fn default() -> Self {
        Self {
            max_entries: 5_000,
            max_part_bytes: 64 * 1024 * 1024,
            max_total_bytes: 256 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContainerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ZIP error: {0}")]
    Zip(String),
    #[error("not a ZIP container")]
    NotZipContainer,
    #[error("not an OPC package (missing [Content_Types].xml)")]
    NotOpcPackage,
    #[error("archive has too many entries: {entries} (limit: {max_entries})")]
    TooManyEntries { entries: usize, max_entries: usize },
    #[error("part '{path}' is too large: {size} bytes (limit: {limit} bytes)")]
    PartTooLarge { path: String, size: u64, limit: u64 },
    #[error("total uncompressed size exceeds limit: would exceed {limit} bytes")]
    TotalTooLarge { limit: u64 },
    #[error("part not found in package: {path}")]
    PartNotFound { path: String },
}

impl ContainerError {
    pub fn code(&self) -> &'static str {
        match self {
            ContainerError::Io(_) => error_codes::CONTAINER_IO,
            ContainerError::Zip(_) | ContainerError::PartNotFound { .. } => {
                error_codes::CONTAINER_ZIP
            }
            ContainerError::NotZipContainer => error_codes::CONTAINER_NOT_ZIP,
            ContainerError::NotOpcPackage => error_codes::CONTAINER_NOT_OPC,
            ContainerError::TooManyEntries { .. } => error_codes::CONTAINER_TOO_MANY_ENTRIES,
            ContainerError::PartTooLarge { .. } => error_codes::CONTAINER_PART_TOO_LARGE,
            ContainerError::TotalTooLarge { .. } => error_codes::CONTAINER_TOTAL_TOO_LARGE,
        }
    }
}

fn open_error(err: ZipError) -> ContainerError {
    match err {
        ZipError::InvalidArchive(_) | ZipError::UnsupportedArchive(_) => {
            ContainerError::NotZipContainer
        }
        ZipError::Io(e) => ContainerError::Io(e),
        other => ContainerError::Zip(other.to_string()),
    }
}

pub struct OpcPackage<R: Read + Seek> {
    archive: ZipArchive<R>,
    limits: PackageLimits,
    total_read: u64,
}

impl OpcPackage<Cursor<Vec<u8>>> {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ContainerError> {
        Self::open_with_limits(Cursor::new(bytes), PackageLimits::default())
    }
}

impl<R: Read + Seek> OpcPackage<R> {
    pub fn open_with_limits(reader: R, limits: PackageLimits) -> Result<Self, ContainerError> {
        let archive = ZipArchive::new(reader).map_err(open_error)?;
        if archive.len() > limits.max_entries {
            return Err(ContainerError::TooManyEntries {
                entries: archive.len(),
                max_entries: limits.max_entries,
            });
        }

        let mut package = OpcPackage {
            archive,
            limits,
            total_read: 0,
        };
        if !package.has_part("[Content_Types].xml") {
            return Err(ContainerError::NotOpcPackage);
        }
        Ok(package)
    }

    pub fn has_part(&mut self, name: &str) -> bool {
        self.archive.by_name(name).is_ok()
    }

    pub fn read_part(&mut self, name: &str) -> Result<Vec<u8>, ContainerError> {
        let mut file = self.archive.by_name(name).map_err(|e| match e {
            ZipError::FileNotFound => ContainerError::PartNotFound {
                path: name.to_string(),
            },
            other => ContainerError::Zip(format!("{name}: {other}")),
        })?;

        let size = file.size();
        if size > self.limits.max_part_bytes {
            return Err(ContainerError::PartTooLarge {
                path: name.to_string(),
                size,
                limit: self.limits.max_part_bytes,
            });
        }
        let new_total = self.total_read.saturating_add(size);
        if new_total > self.limits.max_total_bytes {
            return Err(ContainerError::TotalTooLarge {
                limit: self.limits.max_total_bytes,
            });
        }

        let mut buf = Vec::with_capacity(size as usize);
        file.read_to_end(&mut buf)?;
        self.total_read = new_total;
        Ok(buf)
    }
}
