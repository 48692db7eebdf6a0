use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::document::codec::{LAYOUT_MAGIC, PDF_MAGIC};
use crate::language_utils::validate_language_code;

// @module: File and directory utilities

/// Extension of the layout container
pub const LAYOUT_EXTENSION: &str = "dtl";
/// Extension of PDF documents
pub const PDF_EXTENSION: &str = "pdf";

/// `<stem>.<lang>.<ext>`: candidate output of an earlier run
static TRANSLATED_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(.+)\.([a-z]{2,3})\.(dtl|pdf)$").unwrap()
});

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    // @generates: Output path for a translated document
    // @params: input_file, output_dir, target_language, extension
    pub fn generate_output_path<P1: AsRef<Path>, P2: AsRef<Path>>(
        input_file: P1,
        output_dir: P2,
        target_language: &str,
        extension: &str,
    ) -> PathBuf {
        let stem = input_file.as_ref().file_stem().unwrap_or_default();
        let output_filename = format!("{}.{}.{}", stem.to_string_lossy(), target_language, extension);
        output_dir.as_ref().join(output_filename)
    }

    // @generates: Report path next to the output, `<stem>.<lang>.report.json`
    pub fn generate_report_path<P1: AsRef<Path>, P2: AsRef<Path>>(
        input_file: P1,
        output_dir: P2,
        target_language: &str,
    ) -> PathBuf {
        Self::generate_output_path(input_file, output_dir, target_language, "report.json")
    }

    /// Whether a file is the output of an earlier run: its name carries a
    /// known language code before the extension, and that run's report or
    /// the untranslated source sits in the same directory.
    pub fn is_translated_output<P: AsRef<Path>>(path: P) -> bool {
        let path = path.as_ref();
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            return false;
        };
        let Some(caps) = TRANSLATED_NAME.captures(&name) else {
            return false;
        };
        let (stem, language, extension) = (&caps[1], &caps[2], &caps[3]);
        if validate_language_code(language).is_err() {
            return false;
        }

        let dir = path.parent().unwrap_or(Path::new(""));
        dir.join(format!("{}.{}.report.json", stem, language)).is_file()
            || dir.join(format!("{}.{}", stem, extension)).is_file()
    }

    /// Find files with a specific extension in a directory
    pub fn find_files<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();
        let extension = extension.trim_start_matches('.');

        for entry in WalkDir::new(dir.as_ref()).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_file() {
                if let Some(ext) = path.extension() {
                    if ext.to_string_lossy().eq_ignore_ascii_case(extension) {
                        result.push(path.to_path_buf());
                    }
                }
            }
        }

        result.sort();
        Ok(result)
    }

    /// Layout and PDF documents under `dir`, skipping outputs of earlier runs
    pub fn find_documents<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        let mut documents = Self::find_files(dir, LAYOUT_EXTENSION)?;
        documents.extend(Self::find_files(dir, PDF_EXTENSION)?);
        documents.retain(|p| !Self::is_translated_output(p));
        documents.sort();
        Ok(documents)
    }

    /// Read a file into memory
    pub fn read_bytes<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
        fs::read(&path).with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write bytes to a file
    pub fn write_bytes<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content).with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))
    }

    /// Detect the container of a file from its leading bytes
    pub fn detect_file_type<P: AsRef<Path>>(path: P) -> Result<FileType> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(anyhow::anyhow!("File does not exist: {:?}", path));
        }

        let mut head = [0u8; 8];
        let read = {
            use std::io::Read;
            let mut file = fs::File::open(path).with_context(|| format!("Failed to open file: {:?}", path))?;
            file.read(&mut head)?
        };

        Ok(file_type_of(&head[..read]))
    }
}

/// Container type of a byte prefix
pub fn file_type_of(bytes: &[u8]) -> FileType {
    if bytes.starts_with(LAYOUT_MAGIC) {
        FileType::Layout
    } else if bytes.starts_with(PDF_MAGIC) {
        FileType::Pdf
    } else {
        FileType::Unknown
    }
}

/// Enum representing different file types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// `%DTL-` layout container
    Layout,
    /// PDF document
    Pdf,
    /// Unknown file type
    Unknown,
}

impl FileType {
    /// Extension used for translated outputs of this type
    pub fn output_extension(&self) -> &'static str {
        match self {
            FileType::Pdf => PDF_EXTENSION,
            FileType::Layout | FileType::Unknown => LAYOUT_EXTENSION,
        }
    }
}
