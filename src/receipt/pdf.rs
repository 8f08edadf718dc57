use std::io::Write;

use crate::errors::{PortalError, Result};
use crate::receipt::{ReceiptLine, ReceiptRenderer};

/// A4 in points
const PAGE_WIDTH: f32 = 595.28;
const PAGE_HEIGHT: f32 = 841.89;
const MARGIN_X: f32 = 24.0;
const BODY_TOP: f32 = 740.0;
const BODY_BOTTOM: f32 = 40.0;
const HEADER_Y: f32 = 800.0;

/// single-page PDF writer using the built-in Helvetica font
///
/// no layout beyond one line per entry; lines past the bottom margin are an
/// error rather than a silent truncation
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfRenderer;

impl PdfRenderer {
    pub fn new() -> Self {
        Self
    }

    fn content_stream(&self, title: &str, lines: &[ReceiptLine]) -> Result<Vec<u8>> {
        let mut content = Vec::new();

        // header bar
        writeln!(content, "1 0.333 0 rg 0 {:.2} {:.2} 40 re f", HEADER_Y - 20.0, PAGE_WIDTH)?;
        write!(content, "BT /F1 16 Tf 1 1 1 rg {:.2} {:.2} Td (", MARGIN_X, HEADER_Y - 6.0)?;
        push_escaped(&mut content, title);
        content.extend_from_slice(b") Tj ET\n");

        let mut y = BODY_TOP;
        for line in lines {
            if y < BODY_BOTTOM {
                return Err(PortalError::Render {
                    message: format!("{} lines do not fit on one page", lines.len()),
                });
            }
            write!(content, "BT /F1 {} Tf 0 0 0 rg {:.2} {:.2} Td (", line.size, MARGIN_X, y)?;
            push_escaped(&mut content, &line.text);
            content.extend_from_slice(b") Tj ET\n");
            y -= line.advance;
        }

        Ok(content)
    }
}

impl ReceiptRenderer for PdfRenderer {
    fn render(&self, title: &str, lines: &[ReceiptLine]) -> Result<Vec<u8>> {
        let content = self.content_stream(title, lines)?;

        let mut objects: Vec<Vec<u8>> = vec![
            b"<< /Type /Catalog /Pages 2 0 R >>".to_vec(),
            b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_vec(),
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH:.2} {PAGE_HEIGHT:.2}] \
                 /Resources << /Font << /F1 4 0 R >> >> /Contents 5 0 R >>"
            )
            .into_bytes(),
            b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
                .to_vec(),
        ];
        let mut stream = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
        stream.extend_from_slice(&content);
        stream.extend_from_slice(b"\nendstream");
        objects.push(stream);

        let mut out = Vec::new();
        out.extend_from_slice(b"%PDF-1.4\n");
        let mut offsets = Vec::with_capacity(objects.len());
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            writeln!(out, "{} 0 obj", i + 1)?;
            out.extend_from_slice(body);
            out.extend_from_slice(b"\nendobj\n");
        }

        let xref_at = out.len();
        writeln!(out, "xref\n0 {}\n0000000000 65535 f ", objects.len() + 1)?;
        for offset in offsets {
            writeln!(out, "{offset:010} 00000 n ")?;
        }
        writeln!(
            out,
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF",
            objects.len() + 1,
            xref_at
        )?;

        Ok(out)
    }
}

/// escape a string for a PDF literal, mapping to WinAnsi
fn push_escaped(out: &mut Vec<u8>, text: &str) {
    for c in text.chars() {
        let byte = match c {
            '€' => 0x80,
            '—' => 0x97,
            c if (c as u32) < 0x20 => b' ',
            // C1 controls sit where WinAnsi has unrelated glyphs
            '\u{7F}'..='\u{9F}' => b'?',
            c if (c as u32) <= 0xFF => c as u32 as u8,
            _ => b'?',
        };
        if matches!(byte, b'(' | b')' | b'\\') {
            out.push(b'\\');
        }
        out.push(byte);
    }
}
