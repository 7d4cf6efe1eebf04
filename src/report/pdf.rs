//! A minimal PDF 1.4 writer: text lines, automatic pages.
//!
//! Latin-1 text is set in Helvetica. Anything else goes through a Type0 font
//! addressed by UTF-16 code units, so names in any script keep their
//! characters.

use chrono::offset::Utc;
use chrono::DateTime;

use super::{Alignment, DocumentInfo, DocumentWriter, EncodedDocument};

/// Page dimensions in PostScript points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

/// US Legal, 8.5 × 14 in.
pub const LEGAL: PageSize = PageSize {
    width: 612.0,
    height: 1008.0,
};

const MARGIN: f32 = 72.0;
const FONT_SIZE: f32 = 12.0;
const LEADING: f32 = 14.0;
const PRODUCER: &str = concat!("s3-acl-report ", env!("CARGO_PKG_VERSION"));

// Object numbers of the fixed objects; pages follow from 8 on.
const CATALOG: usize = 1;
const PAGES: usize = 2;
const FONT: usize = 3;
const INFO: usize = 4;
const UNICODE_FONT: usize = 5;
const CID_FONT: usize = 6;
const CID_DESCRIPTOR: usize = 7;
const FIRST_PAGE: usize = 8;

const UNICODE_FONT_NAME: &str = "KozMinPr6N-Regular";

/// Helvetica advance widths for WinAnsi codes 32..=126, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' ' .. '/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0' .. '?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@' .. 'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P' .. '_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`' .. 'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p' .. '~'
];
const DEFAULT_WIDTH: u16 = 556;
/// Advance of every glyph in the Type0 font.
const CID_WIDTH: u16 = 1000;

/// A PDF being laid out, page by page.
#[derive(Debug, Clone)]
pub struct PdfDocument {
    info: DocumentInfo,
    created: DateTime<Utc>,
    page_size: PageSize,
    pages: Vec<Vec<u8>>,
    /// Top of the next line on the current page.
    line_top: f32,
}

impl PdfDocument {
    pub fn new(info: DocumentInfo) -> PdfDocument {
        PdfDocument::with_page_size(info, LEGAL)
    }

    pub fn with_page_size(info: DocumentInfo, page_size: PageSize) -> PdfDocument {
        PdfDocument {
            info,
            created: Utc::now(),
            page_size,
            pages: vec![Vec::new()],
            line_top: page_size.height - MARGIN,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn text_width(&self) -> f32 {
        self.page_size.width - 2.0 * MARGIN
    }

    fn new_page(&mut self) {
        self.pages.push(Vec::new());
        self.line_top = self.page_size.height - MARGIN;
    }

    fn place(&mut self, line: &str, alignment: Alignment) {
        if self.line_top - LEADING < MARGIN {
            self.new_page();
        }
        let x = match alignment {
            Alignment::Left => MARGIN,
            Alignment::Center => MARGIN + (self.text_width() - string_width(line)) / 2.0,
        };
        let baseline = self.line_top - FONT_SIZE;

        let mut op = b"BT".to_vec();
        for (i, run) in runs(line).iter().enumerate() {
            let font = match run {
                Run::Latin(_) => "F1",
                Run::Unicode(_) => "F2",
            };
            op.extend(format!(" /{} {} Tf", font, FONT_SIZE).into_bytes());
            if i == 0 {
                op.extend(format!(" {:.2} {:.2} Td", x, baseline).into_bytes());
            }
            op.push(b' ');
            op.extend(run.encode());
            op.extend_from_slice(b" Tj");
        }
        op.extend_from_slice(b" ET\n");
        if let Some(page) = self.pages.last_mut() {
            page.extend(op);
        }
        self.line_top -= LEADING;
    }

    fn info_dictionary(&self) -> Vec<u8> {
        let mut dict = b"<< /Title ".to_vec();
        dict.extend(text_string(&self.info.title));
        dict.extend_from_slice(b" /Author ");
        dict.extend(text_string(&self.info.author));
        dict.extend_from_slice(b" /Producer ");
        dict.extend(text_string(PRODUCER));
        dict.extend_from_slice(
            format!(" /CreationDate (D:{}Z) >>", self.created.format("%Y%m%d%H%M%S")).as_bytes(),
        );
        dict
    }
}

impl DocumentWriter for PdfDocument {
    fn text(&mut self, text: &str, alignment: Alignment) {
        for line in wrap(text, self.text_width()) {
            self.place(&line, alignment);
        }
    }

    fn finish(self) -> EncodedDocument {
        let mut out = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
        let mut offsets = Vec::new();

        let page_ids: Vec<usize> = (0..self.pages.len()).map(|i| FIRST_PAGE + 2 * i).collect();
        let kids = page_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");

        push_object(
            &mut out,
            &mut offsets,
            format!("<< /Type /Catalog /Pages {} 0 R >>", PAGES).as_bytes(),
        );
        push_object(
            &mut out,
            &mut offsets,
            format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids, page_ids.len()).as_bytes(),
        );
        push_object(
            &mut out,
            &mut offsets,
            b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>",
        );
        push_object(&mut out, &mut offsets, &self.info_dictionary());
        push_object(
            &mut out,
            &mut offsets,
            format!(
                "<< /Type /Font /Subtype /Type0 /BaseFont /{} /Encoding /UniJIS-UTF16-H /DescendantFonts [{} 0 R] >>",
                UNICODE_FONT_NAME, CID_FONT
            )
            .as_bytes(),
        );
        push_object(
            &mut out,
            &mut offsets,
            format!(
                "<< /Type /Font /Subtype /CIDFontType0 /BaseFont /{} /CIDSystemInfo << /Registry (Adobe) /Ordering (Japan1) /Supplement 6 >> /FontDescriptor {} 0 R /DW {} >>",
                UNICODE_FONT_NAME, CID_DESCRIPTOR, CID_WIDTH
            )
            .as_bytes(),
        );
        push_object(
            &mut out,
            &mut offsets,
            format!(
                "<< /Type /FontDescriptor /FontName /{} /Flags 6 /FontBBox [-437 -340 1147 1317] /ItalicAngle 0 /Ascent 880 /Descent -120 /CapHeight 742 /StemV 80 >>",
                UNICODE_FONT_NAME
            )
            .as_bytes(),
        );

        for (content, page_id) in self.pages.iter().zip(&page_ids) {
            let page = format!(
                "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {} {}] /Resources << /Font << /F1 {} 0 R /F2 {} 0 R >> >> /Contents {} 0 R >>",
                PAGES,
                self.page_size.width,
                self.page_size.height,
                FONT,
                UNICODE_FONT,
                page_id + 1
            );
            push_object(&mut out, &mut offsets, page.as_bytes());

            let mut stream = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
            stream.extend_from_slice(content);
            stream.extend_from_slice(b"\nendstream");
            push_object(&mut out, &mut offsets, &stream);
        }

        let xref = out.len();
        out.extend(format!("xref\n0 {}\n0000000000 65535 f \n", offsets.len() + 1).into_bytes());
        for offset in &offsets {
            out.extend(format!("{:010} 00000 n \n", offset).into_bytes());
        }
        out.extend(
            format!(
                "trailer\n<< /Size {} /Root {} 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
                offsets.len() + 1,
                CATALOG,
                INFO,
                xref
            )
            .into_bytes(),
        );

        EncodedDocument {
            bytes: out,
            pages: self.pages.len(),
        }
    }
}

fn push_object(out: &mut Vec<u8>, offsets: &mut Vec<usize>, body: &[u8]) {
    offsets.push(out.len());
    out.extend(format!("{} 0 obj\n", offsets.len()).into_bytes());
    out.extend_from_slice(body);
    out.extend_from_slice(b"\nendobj\n");
}

/// WinAnsi byte for a character, if Helvetica can show it.
fn win_ansi(ch: char) -> Option<u8> {
    match ch as u32 {
        code @ 32..=126 | code @ 160..=255 => Some(code as u8),
        _ => None,
    }
}

/// A stretch of a line set in one font.
#[derive(Debug, Clone, PartialEq)]
enum Run {
    Latin(String),
    Unicode(String),
}

impl Run {
    /// The run as a PDF string operand.
    fn encode(&self) -> Vec<u8> {
        match self {
            Run::Latin(text) => {
                let mut bytes = vec![b'('];
                bytes.extend(pdf_string(text));
                bytes.push(b')');
                bytes
            }
            Run::Unicode(text) => utf16_hex(text, false),
        }
    }
}

/// Split a line where it switches between Helvetica and the Type0 font.
/// An empty line is a single empty Latin run.
fn runs(line: &str) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for ch in line.chars() {
        let latin = win_ansi(ch).is_some();
        let extends = matches!(
            (runs.last(), latin),
            (Some(Run::Latin(_)), true) | (Some(Run::Unicode(_)), false)
        );
        if !extends {
            runs.push(if latin {
                Run::Latin(String::new())
            } else {
                Run::Unicode(String::new())
            });
        }
        if let Some(Run::Latin(text) | Run::Unicode(text)) = runs.last_mut() {
            text.push(ch);
        }
    }
    if runs.is_empty() {
        runs.push(Run::Latin(String::new()));
    }
    runs
}

/// Encode Latin-1 text as the body of a PDF literal string.
fn pdf_string(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len());
    for byte in text.chars().map(|ch| win_ansi(ch).unwrap_or(b'?')) {
        if matches!(byte, b'(' | b')' | b'\\') {
            bytes.push(b'\\');
        }
        bytes.push(byte);
    }
    bytes
}

/// UTF-16BE hex string, optionally with a byte-order mark.
fn utf16_hex(text: &str, bom: bool) -> Vec<u8> {
    let mut units = Vec::new();
    if bom {
        units.push(0xFEFF);
    }
    units.extend(text.encode_utf16());
    let bytes: Vec<u8> = units.iter().flat_map(|unit| unit.to_be_bytes()).collect();
    format!("<{}>", hex::encode_upper(bytes)).into_bytes()
}

/// A document-info text string: literal when Latin-1, UTF-16 otherwise.
fn text_string(text: &str) -> Vec<u8> {
    if text.chars().all(|ch| win_ansi(ch).is_some()) {
        Run::Latin(text.to_string()).encode()
    } else {
        utf16_hex(text, true)
    }
}

fn char_width(ch: char) -> f32 {
    let units = match win_ansi(ch) {
        Some(byte @ 32..=126) => HELVETICA_WIDTHS[(byte - 32) as usize],
        Some(_) => DEFAULT_WIDTH,
        None => CID_WIDTH,
    };
    units as f32 * FONT_SIZE / 1000.0
}

/// Rendered width of a string in points.
pub(crate) fn string_width(text: &str) -> f32 {
    text.chars().map(char_width).sum()
}

/// Break text into lines no wider than `max`, at spaces where possible.
/// Runs of spaces are kept; words wider than a line are split by character.
pub(crate) fn wrap(text: &str, max: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for (i, word) in text.split(' ').enumerate() {
        let candidate = if i == 0 {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if string_width(&candidate) <= max {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        for ch in word.chars() {
            current.push(ch);
            if string_width(&current) > max && current.chars().count() > 1 {
                current.pop();
                lines.push(std::mem::replace(&mut current, ch.to_string()));
            }
        }
    }
    lines.push(current);
    lines
}
