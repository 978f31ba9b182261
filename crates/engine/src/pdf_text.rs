//! Positioned text extraction by walking page content streams.
//!
//! Used when the Pdfium library is unavailable. Glyph metrics are not read, so fragment widths
//! are estimated from the character count and the effective font size.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context as _;
use pdf::content::{Matrix, Op, TextDrawAdjusted};
use pdf::file::{CachedFile, FileOptions};
use pdf::font::ToUnicodeMap;
use pdf::object::{Resolve, Resources};
use pdf::primitive::{Name, PdfString};
use timetable_core::TextFragment;

const TJ_INSERT_SPACE_THRESHOLD: f32 = -200.0;

/// Average glyph advance as a fraction of the font size.
const ESTIMATED_GLYPH_WIDTH: f32 = 0.5;

/// A PDF file read fully into memory.
pub(crate) struct ContentStreamFile {
    file: CachedFile<Vec<u8>>,
}

impl ContentStreamFile {
    pub(crate) fn open(path: &Path) -> anyhow::Result<Self> {
        let file = FileOptions::cached()
            .open(path)
            .with_context(|| format!("open pdf {}", path.display()))?;
        Ok(Self { file })
    }

    pub(crate) fn page_count(&self) -> u32 {
        self.file.num_pages()
    }

    pub(crate) fn page_fragments(&self, page_index: u32) -> anyhow::Result<Vec<TextFragment>> {
        let resolver = self.file.resolver();
        let page = self
            .file
            .get_page(page_index)
            .with_context(|| format!("get pdf page {page_index}"))?;
        let resources = page.resources()?;
        let Some(content) = &page.contents else {
            return Ok(Vec::new());
        };
        let ops = content.operations(&resolver)?;
        Ok(ops_to_fragments(&ops, &resolver, resources))
    }
}

/// Row-vector affine transform, as used by PDF matrices.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Affine {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Affine {
    const IDENTITY: Affine = Affine {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn translation(tx: f32, ty: f32) -> Self {
        Self {
            e: tx,
            f: ty,
            ..Self::IDENTITY
        }
    }

    fn from_matrix(m: &Matrix) -> Self {
        Self {
            a: m.a,
            b: m.b,
            c: m.c,
            d: m.d,
            e: m.e,
            f: m.f,
        }
    }

    /// `self` followed by `next`.
    fn then(&self, next: &Affine) -> Affine {
        Affine {
            a: self.a * next.a + self.b * next.c,
            b: self.a * next.b + self.b * next.d,
            c: self.c * next.a + self.d * next.c,
            d: self.c * next.b + self.d * next.d,
            e: self.e * next.a + self.f * next.c + next.e,
            f: self.e * next.b + self.f * next.d + next.f,
        }
    }

    fn horizontal_scale(&self) -> f32 {
        (self.a * self.a + self.b * self.b).sqrt()
    }

    fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

#[derive(Debug)]
struct TextState {
    ctm: Affine,
    ctm_stack: Vec<Affine>,
    text_matrix: Affine,
    line_matrix: Affine,
    leading: f32,
    font: Option<Name>,
    font_size: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            ctm: Affine::IDENTITY,
            ctm_stack: Vec::new(),
            text_matrix: Affine::IDENTITY,
            line_matrix: Affine::IDENTITY,
            leading: 0.0,
            font: None,
            font_size: 0.0,
        }
    }
}

impl TextState {
    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Affine::translation(tx, ty).then(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    /// Emits a fragment for `text` drawn at the current position and advances past it.
    fn draw(&mut self, text: String, advance: f32, out: &mut Vec<TextFragment>) {
        let rendering = self.text_matrix.then(&self.ctm);
        if !text.trim().is_empty() {
            out.push(TextFragment {
                text,
                x: rendering.e,
                y: rendering.f,
                width: (advance * rendering.horizontal_scale()).abs(),
                height: (self.font_size * rendering.vertical_scale()).abs(),
            });
        }
        self.text_matrix = Affine::translation(advance, 0.0).then(&self.text_matrix);
    }

    fn glyph_advance(&self, text: &str) -> f32 {
        text.chars().count() as f32 * self.font_size * ESTIMATED_GLYPH_WIDTH
    }
}

fn ops_to_fragments(ops: &[Op], resolver: &impl Resolve, resources: &Resources) -> Vec<TextFragment> {
    let mut tounicode_cache: HashMap<Name, Option<ToUnicodeMap>> = HashMap::new();
    let mut state = TextState::default();
    let mut out = Vec::new();

    for op in ops {
        match op {
            Op::Save => state.ctm_stack.push(state.ctm),
            Op::Restore => {
                if let Some(ctm) = state.ctm_stack.pop() {
                    state.ctm = ctm;
                }
            }
            Op::Transform { matrix } => {
                state.ctm = Affine::from_matrix(matrix).then(&state.ctm);
            }
            Op::BeginText => {
                state.text_matrix = Affine::IDENTITY;
                state.line_matrix = Affine::IDENTITY;
            }
            Op::SetTextMatrix { matrix } => {
                state.line_matrix = Affine::from_matrix(matrix);
                state.text_matrix = state.line_matrix;
            }
            Op::MoveTextPosition { translation } => {
                state.move_line(translation.x, translation.y);
            }
            Op::Leading { leading } => state.leading = *leading,
            Op::TextNewline => {
                let leading = state.leading;
                state.move_line(0.0, -leading);
            }
            Op::TextFont { name, size } => {
                state.font = Some(name.clone());
                state.font_size = *size;
            }
            Op::TextDraw { text } => {
                let s = decode_pdf_string(
                    text,
                    state.font.as_ref(),
                    resolver,
                    resources,
                    &mut tounicode_cache,
                );
                let s = sanitize_extracted_text(&s);
                let advance = state.glyph_advance(&s);
                state.draw(s, advance, &mut out);
            }
            Op::TextDrawAdjusted { array } => {
                let mut text = String::new();
                let mut advance = 0.0f32;
                let mut pending_space = false;
                for item in array {
                    match item {
                        TextDrawAdjusted::Text(piece) => {
                            let s = decode_pdf_string(
                                piece,
                                state.font.as_ref(),
                                resolver,
                                resources,
                                &mut tounicode_cache,
                            );
                            advance += state.glyph_advance(&s);
                            append_text_piece(&mut text, &s, &mut pending_space);
                        }
                        TextDrawAdjusted::Spacing(spacing) => {
                            advance -= spacing / 1000.0 * state.font_size;
                            if *spacing <= TJ_INSERT_SPACE_THRESHOLD {
                                pending_space = true;
                            }
                        }
                    }
                }
                state.draw(text, advance, &mut out);
            }
            _ => {}
        }
    }

    out
}

fn append_text_piece(out: &mut String, s: &str, pending_space: &mut bool) {
    let sanitized = sanitize_extracted_text(s);
    let trimmed = sanitized.trim_matches('\0');
    if trimmed.is_empty() {
        return;
    }

    if *pending_space {
        if !out.is_empty() && !out.ends_with(' ') && !trimmed.starts_with(char::is_whitespace) {
            out.push(' ');
        }
        *pending_space = false;
    }
    out.push_str(trimmed);
}

fn decode_pdf_string(
    text: &PdfString,
    font_name: Option<&Name>,
    resolver: &impl Resolve,
    resources: &Resources,
    tounicode_cache: &mut HashMap<Name, Option<ToUnicodeMap>>,
) -> String {
    let Some(font_name) = font_name else {
        return text.to_string_lossy();
    };

    let map = tounicode_for_font(font_name, resolver, resources, tounicode_cache);
    let Some(map) = map else {
        return text.to_string_lossy();
    };

    decode_with_tounicode(text.as_bytes(), map).unwrap_or_else(|| text.to_string_lossy())
}

fn tounicode_for_font<'a>(
    font_name: &Name,
    resolver: &impl Resolve,
    resources: &Resources,
    cache: &'a mut HashMap<Name, Option<ToUnicodeMap>>,
) -> Option<&'a ToUnicodeMap> {
    if !cache.contains_key(font_name) {
        let map = resources
            .fonts
            .get(font_name)
            .and_then(|lazy| lazy.load(resolver).ok())
            .and_then(|font| font.to_unicode(resolver))
            .and_then(|res| res.ok());
        cache.insert(font_name.clone(), map);
    }
    cache.get(font_name).and_then(|opt| opt.as_ref())
}

/// Tries one- and two-byte codes and keeps whichever maps more of the string.
fn decode_with_tounicode(bytes: &[u8], map: &ToUnicodeMap) -> Option<String> {
    let (s1, m1, t1) = decode_bytes(bytes, 1, map);
    let mut best = (s1, m1, t1);

    if bytes.len().is_multiple_of(2) {
        let (s2, m2, t2) = decode_bytes(bytes, 2, map);
        if m2 > best.1 || (m2 == best.1 && s2.len() > best.0.len()) {
            best = (s2, m2, t2);
        }
    }

    if best.2 == 0 {
        return None;
    }

    let match_ratio = best.1 as f32 / best.2 as f32;
    if best.1 < 2 && match_ratio < 0.3 {
        return None;
    }
    if match_ratio < 0.05 {
        return None;
    }

    Some(best.0)
}

fn decode_bytes(bytes: &[u8], width: usize, map: &ToUnicodeMap) -> (String, usize, usize) {
    let mut out = String::new();
    let mut matches = 0usize;
    let mut total = 0usize;

    let codes: Box<dyn Iterator<Item = u16>> = match width {
        1 => Box::new(bytes.iter().map(|&b| b as u16)),
        2 => Box::new(
            bytes
                .chunks_exact(2)
                .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]])),
        ),
        _ => return (String::new(), 0, 0),
    };

    for code in codes {
        total += 1;
        if let Some(s) = map.get(code) {
            out.push_str(s);
            matches += 1;
        } else {
            out.push('\u{FFFD}');
        }
    }

    (out, matches, total)
}

fn sanitize_extracted_text(s: &str) -> String {
    s.chars()
        .filter(|&ch| {
            let code = ch as u32;
            ch != '\u{FFFD}'
                && !ch.is_control()
                && !is_private_use(code)
                && !is_noncharacter(code)
        })
        .collect()
}

fn is_private_use(code: u32) -> bool {
    (0xE000..=0xF8FF).contains(&code)
        || (0xF0000..=0xFFFFD).contains(&code)
        || (0x100000..=0x10FFFD).contains(&code)
}

fn is_noncharacter(code: u32) -> bool {
    (0xFDD0..=0xFDEF).contains(&code) || (code & 0xFFFF == 0xFFFE) || (code & 0xFFFF == 0xFFFF)
}

/// Writes a minimal PDF whose pages carry the given content streams.
#[cfg(test)]
pub(crate) fn pdf_with_pages(contents: &[&str]) -> Vec<u8> {
    let page_ids: Vec<usize> = (0..contents.len()).map(|i| 3 + 2 * i).collect();
    let kids = page_ids
        .iter()
        .map(|id| format!("{id} 0 R"))
        .collect::<Vec<_>>()
        .join(" ");

    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!("<< /Type /Pages /Kids [{kids}] /Count {} >>", contents.len()),
    ];
    for (page_id, content) in page_ids.iter().zip(contents) {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 842 842] /Resources << >> /Contents {} 0 R >>",
            page_id + 1
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{content}\nendstream",
            content.len()
        ));
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (idx, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", idx + 1).as_bytes());
    }

    let xref_offset = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
            objects.len() + 1
        )
        .as_bytes(),
    );
    out
}
