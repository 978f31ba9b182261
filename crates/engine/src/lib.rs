//! PDF engine: positioned text extraction and timetable parsing.

use std::cell::{Cell, OnceCell};
use std::io::Read as _;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use pdfium_render::prelude::{PdfDocument, PdfPageObjectCommon, PdfPageObjectsCommon, Pdfium};
use timetable_core::{LayoutConfig, TextFragment, TimetableEntry};

pub mod layout;
mod pdf_text;

pub use layout::{PageLayout, analyze_page, parse_page};

/// How far into the file the `%PDF-` marker may appear.
const PDF_HEADER_SEARCH_LEN: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum TimetableError {
    #[error("rejected {}: {reason}", path.display())]
    InputRejected { path: PathBuf, reason: String },
    #[error("failed to {context}")]
    Processing {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

impl TimetableError {
    fn rejected(path: &Path, reason: impl Into<String>) -> Self {
        Self::InputRejected {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    fn processing(context: impl Into<String>, err: anyhow::Error) -> Self {
        Self::Processing {
            context: context.into(),
            source: err.into(),
        }
    }
}

/// Supplies the positioned text of a document, one page at a time.
pub trait FragmentSource {
    fn page_count(&self) -> anyhow::Result<u32>;

    /// Fragments of the page at `page_index` (0-based), in no particular order.
    fn page_fragments(&self, page_index: u32) -> anyhow::Result<Vec<TextFragment>>;
}

/// Everything extracted from one document, in page order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedDocument {
    pub entries: Vec<TimetableEntry>,
    pub pages: u32,
    pub pages_with_entries: u32,
}

impl ParsedDocument {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parses every page in order. Pages that are not timetable grids contribute nothing; any
/// extraction failure aborts the whole document.
pub fn parse_document(
    source: &impl FragmentSource,
    config: &LayoutConfig,
) -> Result<ParsedDocument, TimetableError> {
    let pages = source
        .page_count()
        .map_err(|err| TimetableError::processing("count pages", err))?;

    let mut doc = ParsedDocument {
        pages,
        ..ParsedDocument::default()
    };
    for page_index in 0..pages {
        let page_number = page_index + 1;
        let fragments = source
            .page_fragments(page_index)
            .map_err(|err| TimetableError::processing(format!("read page {page_number}"), err))?;
        let entries = parse_page(&fragments, page_number, config);
        if !entries.is_empty() {
            doc.pages_with_entries += 1;
        }
        doc.entries.extend(entries);
    }

    log::info!(
        "parsed {} entries from {}/{} pages",
        doc.entries.len(),
        doc.pages_with_entries,
        doc.pages
    );
    Ok(doc)
}

/// Rejects anything that is not a readable file declaring itself a PDF.
pub fn check_pdf_input(path: &Path) -> Result<(), TimetableError> {
    if !path.is_file() {
        return Err(TimetableError::rejected(path, "file not found"));
    }
    if !has_pdf_extension(path) {
        return Err(TimetableError::rejected(path, "expected a .pdf file"));
    }

    let mut head = Vec::with_capacity(PDF_HEADER_SEARCH_LEN);
    std::fs::File::open(path)
        .and_then(|file| file.take(PDF_HEADER_SEARCH_LEN as u64).read_to_end(&mut head))
        .map_err(|err| TimetableError::rejected(path, format!("unreadable: {err}")))?;
    if !head.windows(5).any(|w| w == b"%PDF-") {
        return Err(TimetableError::rejected(path, "missing %PDF- header"));
    }
    Ok(())
}

pub fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

#[derive(Debug, Default)]
pub struct Engine {
    pdfium: OnceCell<Result<Pdfium, String>>,
    fallback_logged: Cell<bool>,
}

/// An open PDF document. The file is loaded once and every page is read from memory.
pub struct PdfSource<'a> {
    backend: Backend<'a>,
}

enum Backend<'a> {
    Pdfium(PdfDocument<'a>),
    ContentStream(pdf_text::ContentStreamFile),
}

impl PdfSource<'_> {
    /// Name of the backend serving fragments.
    pub fn backend_name(&self) -> &'static str {
        match &self.backend {
            Backend::Pdfium(_) => "pdfium",
            Backend::ContentStream(_) => "content-stream",
        }
    }
}

impl FragmentSource for PdfSource<'_> {
    fn page_count(&self) -> anyhow::Result<u32> {
        match &self.backend {
            Backend::Pdfium(document) => Ok(u32::from(document.pages().len())),
            Backend::ContentStream(file) => Ok(file.page_count()),
        }
    }

    fn page_fragments(&self, page_index: u32) -> anyhow::Result<Vec<TextFragment>> {
        match &self.backend {
            Backend::Pdfium(document) => pdfium_page_fragments(document, page_index),
            Backend::ContentStream(file) => file.page_fragments(page_index),
        }
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens `path` with the best available backend.
    pub fn open(&self, path: &Path) -> anyhow::Result<PdfSource<'_>> {
        let backend = match self.usable_pdfium() {
            Some(pdfium) => {
                let document = pdfium
                    .load_pdf_from_file(path, None)
                    .map_err(|err| anyhow::anyhow!(err))
                    .with_context(|| format!("open pdf {}", path.display()))?;
                Backend::Pdfium(document)
            }
            None => Backend::ContentStream(pdf_text::ContentStreamFile::open(path)?),
        };
        Ok(PdfSource { backend })
    }

    /// Validates `path` and parses every page of it.
    pub fn parse_pdf(
        &self,
        path: &Path,
        config: &LayoutConfig,
    ) -> Result<ParsedDocument, TimetableError> {
        check_pdf_input(path)?;
        log::info!("parsing {}", path.display());
        let source = self
            .open(path)
            .map_err(|err| TimetableError::processing("open document", err))?;
        log::debug!("reading {} with {}", path.display(), source.backend_name());
        parse_document(&source, config)
    }

    fn usable_pdfium(&self) -> Option<&Pdfium> {
        if pdfium_disabled() {
            return None;
        }
        match self.pdfium() {
            Ok(pdfium) => Some(pdfium),
            Err(err) => {
                if !self.fallback_logged.replace(true) {
                    log::warn!("pdfium unavailable, reading content streams instead: {err}");
                }
                None
            }
        }
    }

    fn pdfium(&self) -> anyhow::Result<&Pdfium> {
        self.pdfium
            .get_or_init(|| bind_pdfium().map_err(|err| err.to_string()))
            .as_ref()
            .map_err(|err| anyhow::anyhow!(err.clone()))
    }
}

fn pdfium_disabled() -> bool {
    std::env::var("TIMETABLE_DISABLE_PDFIUM")
        .map(|v| !v.trim().is_empty() && v.trim() != "0")
        .unwrap_or(false)
}

fn pdfium_page_fragments(
    document: &PdfDocument<'_>,
    page_index: u32,
) -> anyhow::Result<Vec<TextFragment>> {
    let page_index =
        u16::try_from(page_index).map_err(|_| anyhow::anyhow!("page index out of range"))?;
    let page = document
        .pages()
        .get(page_index)
        .map_err(|err| anyhow::anyhow!(err))?;

    let mut out = Vec::new();
    for object in page.objects().iter() {
        let Some(text_object) = object.as_text_object() else {
            continue;
        };
        let text = text_object.text();
        if text.trim().is_empty() {
            continue;
        }
        let bounds = object.bounds().map_err(|err| anyhow::anyhow!(err))?;
        let left = bounds.left().value;
        let bottom = bounds.bottom().value;
        out.push(TextFragment {
            text,
            x: left,
            y: bottom,
            width: (bounds.right().value - left).max(0.0),
            height: (bounds.top().value - bottom).max(0.0),
        });
    }
    Ok(out)
}

fn bind_pdfium() -> anyhow::Result<Pdfium> {
    let mut candidates: Vec<PathBuf> = Vec::new();

    if let Ok(path) = std::env::var("TIMETABLE_PDFIUM_LIB_PATH") {
        let path = PathBuf::from(path);
        let bindings = Pdfium::bind_to_library(&path)
            .map_err(|err| anyhow::anyhow!(err))
            .map_err(|err| {
                anyhow::anyhow!(
                    "{err}\n\nFailed to load Pdfium from TIMETABLE_PDFIUM_LIB_PATH={}.",
                    path.display()
                )
            })?;
        return Ok(Pdfium::new(bindings));
    }

    if let Ok(dir) = std::env::var("TIMETABLE_PDFIUM_DIR") {
        candidates.push(Pdfium::pdfium_platform_library_name_at_path(Path::new(
            &dir,
        )));
    }

    if let Ok(exe) = std::env::current_exe()
        && let Some(dir) = exe.parent()
    {
        candidates.push(Pdfium::pdfium_platform_library_name_at_path(dir));
    }

    candidates.push(Pdfium::pdfium_platform_library_name_at_path(Path::new(
        ".pdfium",
    )));
    candidates.push(Pdfium::pdfium_platform_library_name_at_path(Path::new(".")));

    for path in candidates {
        if let Ok(bindings) = Pdfium::bind_to_library(&path) {
            return Ok(Pdfium::new(bindings));
        }
    }

    let bindings = Pdfium::bind_to_system_library()
        .map_err(|err| anyhow::anyhow!(err))
        .map_err(|err| {
            let lib_name = Pdfium::pdfium_platform_library_name();
            anyhow::anyhow!(
                "{err}\n\nPdfium library not found.\n- Install it system-wide, or\n- Place {} next to the executable.\n",
                lib_name.to_string_lossy()
            )
        })?;

    Ok(Pdfium::new(bindings))
}
