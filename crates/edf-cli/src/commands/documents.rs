//! Input discovery and per-document text extraction.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
#[cfg(feature = "native")]
use std::sync::Mutex;

use glob::glob;
use tracing::debug;
#[cfg(feature = "native")]
use tracing::warn;

use edf_core::models::config::{BatchConfig, OcrConfig};
use edf_core::validation::IdentifierKey;
use edf_core::{PlainTextExtractor, TextExtractor};

/// How a document's text is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Pre-extracted OCR transcript.
    Transcript,
    /// Image sent through the OCR engine.
    Image,
}

/// A document to evaluate.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub identifier: String,
    pub kind: DocumentKind,
}

/// Find documents under a directory or matching a glob pattern.
///
/// Documents are sorted by path; this order is the encounter order used in
/// reports. Identifiers must be unique.
pub fn discover(
    input: &str,
    batch: &BatchConfig,
    key: IdentifierKey,
) -> anyhow::Result<Vec<Document>> {
    let input_path = Path::new(input);
    let (pattern, root) = if input_path.is_dir() {
        let pattern = input_path.join("**").join("*");
        (pattern.to_string_lossy().into_owned(), input_path.to_path_buf())
    } else {
        (input.to_string(), literal_root(input))
    };

    let mut paths: Vec<PathBuf> = glob(&pattern)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file())
        .collect();
    paths.sort();

    let mut seen = HashSet::new();
    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let Some(kind) = classify(&path, batch) else {
            debug!("Skipping {}", path.display());
            continue;
        };

        let identifier = key.for_document(&path, Some(&root));
        if !seen.insert(identifier.clone()) {
            anyhow::bail!(
                "Duplicate document identifier {} ({}). Use --key path to tell them apart.",
                identifier,
                path.display()
            );
        }

        documents.push(Document {
            path,
            identifier,
            kind,
        });
    }

    Ok(documents)
}

/// Directory part of a glob pattern before the first wildcard.
fn literal_root(pattern: &str) -> PathBuf {
    let mut root = PathBuf::new();
    for component in Path::new(pattern).components() {
        let part = component.as_os_str().to_string_lossy();
        if part.contains(['*', '?', '[']) {
            return root;
        }
        root.push(component);
    }
    root.parent().map(Path::to_path_buf).unwrap_or_default()
}

fn classify(path: &Path, batch: &BatchConfig) -> Option<DocumentKind> {
    let extension = path.extension()?.to_str()?.to_lowercase();
    if batch.text_extensions.iter().any(|e| e.eq_ignore_ascii_case(&extension)) {
        Some(DocumentKind::Transcript)
    } else if batch.image_extensions.iter().any(|e| e.eq_ignore_ascii_case(&extension)) {
        Some(DocumentKind::Image)
    } else {
        None
    }
}

/// Reads document text, sharing one OCR engine across every image.
pub struct TextReader {
    #[cfg(feature = "native")]
    engine: Option<Result<Mutex<edf_core::PureOcrEngine>, String>>,
}

impl TextReader {
    /// Load the OCR models once, and only if some document is an image.
    ///
    /// A model load failure is kept and reported on each image document.
    pub fn new(documents: &[Document], ocr: &OcrConfig) -> Self {
        let needs_ocr = documents.iter().any(|d| d.kind == DocumentKind::Image);

        #[cfg(feature = "native")]
        {
            let engine = needs_ocr.then(|| {
                edf_core::PureOcrEngine::from_config(ocr)
                    .map(Mutex::new)
                    .map_err(|e| {
                        warn!("OCR engine unavailable: {}", e);
                        e.to_string()
                    })
            });
            Self { engine }
        }

        #[cfg(not(feature = "native"))]
        {
            let _ = (needs_ocr, ocr);
            Self {}
        }
    }

    /// Read a document and return its text.
    pub fn read(&self, document: &Document) -> anyhow::Result<String> {
        let bytes = fs::read(&document.path)?;
        let text = match document.kind {
            DocumentKind::Transcript => PlainTextExtractor.extract_text(&bytes)?,
            DocumentKind::Image => self.ocr_image(&bytes)?,
        };
        debug!(
            "{}: {} characters of text",
            document.identifier,
            text.chars().count()
        );
        Ok(text)
    }

    #[cfg(feature = "native")]
    fn ocr_image(&self, bytes: &[u8]) -> anyhow::Result<String> {
        match &self.engine {
            Some(Ok(engine)) => {
                let engine = engine
                    .lock()
                    .map_err(|_| anyhow::anyhow!("OCR engine lock poisoned"))?;
                Ok(engine.extract_text(bytes)?)
            }
            Some(Err(e)) => anyhow::bail!("{}", e),
            None => anyhow::bail!("OCR engine was not loaded"),
        }
    }

    #[cfg(not(feature = "native"))]
    fn ocr_image(&self, _bytes: &[u8]) -> anyhow::Result<String> {
        anyhow::bail!("edf was built without OCR support (feature \"native\")")
    }
}
