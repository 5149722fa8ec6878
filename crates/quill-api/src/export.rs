use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use docx_rs::{Docx, Paragraph, Run};
use printpdf::{BuiltinFont, Mm, PdfDocument};
use scraper::Html;
use std::io::{BufWriter, Cursor};
use std::str::FromStr;

const PAGE_WIDTH: Mm = Mm(210.0);
const PAGE_HEIGHT: Mm = Mm(297.0);
const MARGIN_LEFT: Mm = Mm(15.0);
const MARGIN_TOP: Mm = Mm(282.0);
const MARGIN_BOTTOM: Mm = Mm(15.0);
const LINE_HEIGHT: Mm = Mm(5.0);
const FONT_SIZE: f32 = 11.0;
const MAX_LINE_CHARS: usize = 95;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Pdf,
    Docx,
    Txt,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Txt => "txt",
        }
    }

    pub fn media_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Txt => "text/plain; charset=utf-8",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            "txt" => Ok(Self::Txt),
            other => Err(format!("Unsupported export format: {}", other)),
        }
    }
}

/// Text nodes of an HTML fragment, joined by newlines
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    fragment.root_element().text().collect::<Vec<_>>().join("\n")
}

/// `document_<id>_<UTC timestamp>.<ext>`
pub fn export_filename(document_id: &str, format: ExportFormat, at: DateTime<Utc>) -> String {
    format!(
        "document_{}_{}.{}",
        document_id,
        at.format("%Y%m%dT%H%M%SZ"),
        format.extension()
    )
}

/// Renders plain text in the requested format. PDF and DOCX run on the blocking pool.
pub async fn render(format: ExportFormat, title: String, text: String) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Txt => Ok(render_txt(&text)),
        ExportFormat::Docx => tokio::task::spawn_blocking(move || render_docx(&text))
            .await
            .context("docx render task failed")?,
        ExportFormat::Pdf => tokio::task::spawn_blocking(move || render_pdf(&title, &text))
            .await
            .context("pdf render task failed")?,
    }
}

pub fn render_txt(text: &str) -> Vec<u8> {
    text.as_bytes().to_vec()
}

/// One paragraph per line
pub fn render_docx(text: &str) -> Result<Vec<u8>> {
    let docx = text.split('\n').fold(Docx::new(), |docx, line| {
        docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(line)))
    });

    let mut bytes = Vec::new();
    docx.build()
        .pack(&mut Cursor::new(&mut bytes))
        .map_err(|e| anyhow!("failed to write DOCX: {}", e))?;
    Ok(bytes)
}

/// A4 pages of wrapped Helvetica text, new page when the current one is full
pub fn render_pdf(title: &str, text: &str) -> Result<Vec<u8>> {
    let (doc, page, layer) = PdfDocument::new(title, PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| anyhow!("failed to load PDF font: {}", e))?;

    let mut current_layer = doc.get_page(page).get_layer(layer);
    let mut y = MARGIN_TOP;

    for line in text.split('\n').flat_map(|l| wrap_line(l, MAX_LINE_CHARS)) {
        if y < MARGIN_BOTTOM {
            let (page, layer) = doc.add_page(PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
            current_layer = doc.get_page(page).get_layer(layer);
            y = MARGIN_TOP;
        }
        current_layer.use_text(line, FONT_SIZE, MARGIN_LEFT, y, &font);
        y -= LINE_HEIGHT;
    }

    let mut bytes = Vec::new();
    doc.save(&mut BufWriter::new(&mut bytes))
        .map_err(|e| anyhow!("failed to write PDF: {}", e))?;
    Ok(bytes)
}

/// Greedy word wrap on character count; words longer than `width` are split
fn wrap_line(line: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in line.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.push(word.drain(..width).collect());
        }
        if word.is_empty() {
            continue;
        }

        let current_len = current.chars().count();
        if current_len > 0 && current_len + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.extend(word);
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}
