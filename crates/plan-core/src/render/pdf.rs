//! Image-based PDF export.
//!
//! Each page is drawn onto an RGBA canvas (watermark first, then headings,
//! title and table), JPEG-encoded, and placed full-bleed on an A4 page.
//! Text runs are put into visual order word by word; glyphs are not shaped.

use ab_glyph::{FontArc, PxScale};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::Path;

use super::{DocumentFormat, DocumentRenderer, PlanDocument, Watermark};
use crate::error::RenderError;

const A4_WIDTH_PT: i64 = 595;
const A4_HEIGHT_PT: i64 = 842;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// A centred line above the title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadingLine {
    pub text: String,
    /// `#rrggbb`
    pub color: String,
    pub size: f32,
}

impl HeadingLine {
    pub fn new(text: impl Into<String>, color: impl Into<String>, size: f32) -> Self {
        Self {
            text: text.into(),
            color: color.into(),
            size,
        }
    }

    fn rgba(&self) -> Rgba<u8> {
        parse_hex_color(&self.color).unwrap_or(BLACK)
    }
}

pub fn default_heading_lines() -> Vec<HeadingLine> {
    vec![
        HeadingLine::new("بسم الله الرحمن الرحيم", "#1f497d", 28.0),
        HeadingLine::new("ملتقى الأقصى القرآني", "#984806", 34.0),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfLayout {
    pub page_width: u32,
    pub page_height: u32,
    pub margin: u32,
    pub heading_lines: Vec<HeadingLine>,
    pub title_size: f32,
    pub cell_text_size: f32,
    pub header_row_height: u32,
    pub row_height: u32,
    /// `#rrggbb`
    pub header_fill: String,
    pub watermark_opacity: f32,
    /// Watermark width relative to the page width.
    pub watermark_scale: f32,
    /// Vertical shift of the watermark from the page centre, in pixels.
    pub watermark_offset_y: i64,
    pub jpeg_quality: u8,
}

impl Default for PdfLayout {
    fn default() -> Self {
        Self {
            page_width: 1000,
            page_height: 1414,
            margin: 40,
            heading_lines: default_heading_lines(),
            title_size: 30.0,
            cell_text_size: 22.0,
            header_row_height: 52,
            row_height: 38,
            header_fill: "#cccccc".to_string(),
            watermark_opacity: 0.5,
            watermark_scale: 0.92,
            watermark_offset_y: -58,
            jpeg_quality: 90,
        }
    }
}

/// DejaVu Sans, used when no other font is configured.
pub const BUNDLED_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

pub fn bundled_font() -> Option<FontArc> {
    match FontArc::try_from_slice(BUNDLED_FONT) {
        Ok(font) => Some(font),
        Err(err) => {
            tracing::warn!(error = %err, "bundled font is unreadable");
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct PdfRenderer {
    layout: PdfLayout,
    font: Option<FontArc>,
}

impl Default for PdfRenderer {
    fn default() -> Self {
        Self::new(PdfLayout::default())
    }
}

impl PdfRenderer {
    /// Renderer using the bundled font.
    pub fn new(layout: PdfLayout) -> Self {
        Self {
            layout,
            font: bundled_font(),
        }
    }

    /// Grid, shading and watermark only.
    pub fn without_font(mut self) -> Self {
        self.font = None;
        self
    }

    pub fn with_font(mut self, font: FontArc) -> Self {
        self.font = Some(font);
        self
    }

    pub fn with_font_file(self, path: impl AsRef<Path>) -> Result<Self, RenderError> {
        let data = std::fs::read(path.as_ref())?;
        let font = FontArc::try_from_vec(data).map_err(|err| {
            RenderError::Font(format!("{}: {err}", path.as_ref().display()))
        })?;
        Ok(self.with_font(font))
    }

    pub fn layout(&self) -> &PdfLayout {
        &self.layout
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Number of body rows that fit on each page: (first page, later pages).
    pub fn rows_per_page(&self) -> (usize, usize) {
        let layout = &self.layout;
        let usable = layout.page_height.saturating_sub(layout.margin * 2);
        let table_rows =
            |height: u32| (height.saturating_sub(layout.header_row_height) / layout.row_height.max(1)).max(1) as usize;
        let first = usable.saturating_sub(self.preamble_height());
        (table_rows(first), table_rows(usable))
    }

    fn preamble_height(&self) -> u32 {
        let headings: f32 = self
            .layout
            .heading_lines
            .iter()
            .map(|line| line.size * 1.4)
            .sum();
        (headings + self.layout.title_size * 1.8) as u32
    }

    /// Raster pages of the document, header row repeated on each.
    pub fn render_pages(&self, document: &PlanDocument) -> Result<Vec<RgbaImage>, RenderError> {
        let header = document.header()?;
        let body = document.body();
        if self.font.is_none() {
            tracing::warn!("no font configured, pdf text will be omitted");
        }

        let (first_capacity, later_capacity) = self.rows_per_page();
        let mut chunks: Vec<&[Vec<String>]> = Vec::new();
        let split = first_capacity.min(body.len());
        chunks.push(&body[..split]);
        chunks.extend(body[split..].chunks(later_capacity));

        let watermark = document
            .watermark
            .as_ref()
            .map(|wm| self.prepare_watermark(wm));

        let mut pages = Vec::with_capacity(chunks.len());
        for (page_idx, rows) in chunks.into_iter().enumerate() {
            let mut canvas = RgbaImage::from_pixel(self.layout.page_width, self.layout.page_height, WHITE);
            if let Some((image, x, y)) = &watermark {
                imageops::overlay(&mut canvas, image, *x, *y);
            }

            let mut y = self.layout.margin as i32;
            if page_idx == 0 {
                for line in &self.layout.heading_lines {
                    self.draw_centered_line(&mut canvas, &line.text, line.size, line.rgba(), y);
                    y += (line.size * 1.4) as i32;
                }
                self.draw_centered_line(&mut canvas, &document.title, self.layout.title_size, BLACK, y);
                y += (self.layout.title_size * 1.8) as i32;
            }

            self.draw_table(&mut canvas, header, rows, y);
            pages.push(canvas);
        }
        Ok(pages)
    }

    fn prepare_watermark(&self, watermark: &Watermark) -> (RgbaImage, i64, i64) {
        let source = watermark.image();
        let target_width = ((self.layout.page_width as f32) * self.layout.watermark_scale).max(1.0) as u32;
        let ratio = target_width as f32 / source.width().max(1) as f32;
        let target_height = ((source.height() as f32) * ratio).max(1.0) as u32;
        let mut scaled = imageops::resize(source, target_width, target_height, FilterType::Triangle);

        let opacity = self.layout.watermark_opacity.clamp(0.0, 1.0);
        for pixel in scaled.pixels_mut() {
            pixel[3] = (pixel[3] as f32 * opacity).round() as u8;
        }

        let x = (self.layout.page_width as i64 - target_width as i64) / 2;
        let y = (self.layout.page_height as i64 - target_height as i64) / 2
            + self.layout.watermark_offset_y;
        (scaled, x, y)
    }

    fn draw_centered_line(&self, canvas: &mut RgbaImage, text: &str, size: f32, color: Rgba<u8>, y: i32) {
        let Some(font) = &self.font else {
            return;
        };
        let visual = visual_order(text);
        let scale = PxScale::from(size);
        let (width, _) = text_size(scale, font, &visual);
        let x = (self.layout.page_width as i32 - width as i32) / 2;
        draw_text_mut(canvas, color, x, y, scale, font, &visual);
    }

    fn draw_table(&self, canvas: &mut RgbaImage, header: &[String], rows: &[Vec<String>], top: i32) {
        let layout = &self.layout;
        let columns = header.len().max(1) as u32;
        let table_width = layout.page_width - layout.margin * 2;
        let column_width = table_width / columns;
        let header_fill = parse_hex_color(&layout.header_fill).unwrap_or(WHITE);

        let mut y = top;
        let all_rows = std::iter::once(header).chain(rows.iter().map(Vec::as_slice));
        for (row_idx, row) in all_rows.enumerate() {
            let height = if row_idx == 0 {
                layout.header_row_height
            } else {
                layout.row_height
            };
            for column in 0..columns {
                // First column on the right.
                let x = (layout.margin + (columns - 1 - column) * column_width) as i32;
                let rect = Rect::at(x, y).of_size(column_width, height);
                if row_idx == 0 {
                    draw_filled_rect_mut(canvas, rect, header_fill);
                }
                draw_hollow_rect_mut(canvas, rect, BLACK);
                if let Some(text) = row.get(column as usize) {
                    self.draw_cell_text(canvas, text, rect);
                }
            }
            y += height as i32;
        }
    }

    fn draw_cell_text(&self, canvas: &mut RgbaImage, text: &str, rect: Rect) {
        let Some(font) = &self.font else {
            return;
        };
        if text.is_empty() {
            return;
        }
        let visual = visual_order(text);
        let scale = PxScale::from(self.layout.cell_text_size);
        let (width, height) = text_size(scale, font, &visual);
        let x = rect.left() + (rect.width() as i32 - width as i32) / 2;
        let y = rect.top() + (rect.height() as i32 - height as i32) / 2;
        draw_text_mut(canvas, BLACK, x, y, scale, font, &visual);
    }

    /// Wrap raster pages into a PDF, one A4 page per image.
    pub fn assemble(&self, pages: &[RgbaImage]) -> Result<Vec<u8>, RenderError> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids = Vec::with_capacity(pages.len());

        for page in pages {
            let rgb = DynamicImage::ImageRgba8(page.clone()).to_rgb8();
            let mut jpeg = Cursor::new(Vec::new());
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
                &mut jpeg,
                self.layout.jpeg_quality,
            );
            rgb.write_with_encoder(encoder)?;

            let image = Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => rgb.width() as i64,
                    "Height" => rgb.height() as i64,
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8,
                    "Filter" => "DCTDecode",
                },
                jpeg.into_inner(),
            );
            let image_id = doc.add_object(image);
            let resources_id = doc.add_object(dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            });

            let content = Content {
                operations: vec![
                    Operation::new("q", vec![]),
                    Operation::new(
                        "cm",
                        vec![
                            A4_WIDTH_PT.into(),
                            0.into(),
                            0.into(),
                            A4_HEIGHT_PT.into(),
                            0.into(),
                            0.into(),
                        ],
                    ),
                    Operation::new("Do", vec!["Im0".into()]),
                    Operation::new("Q", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), A4_WIDTH_PT.into(), A4_HEIGHT_PT.into()],
            });
            kids.push(Object::from(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)?;
        Ok(bytes)
    }
}

impl DocumentRenderer for PdfRenderer {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Pdf
    }

    fn render(&self, document: &PlanDocument) -> Result<Vec<u8>, RenderError> {
        let pages = self.render_pages(document)?;
        let bytes = self.assemble(&pages)?;
        tracing::debug!(pages = pages.len(), bytes = bytes.len(), "rendered pdf");
        Ok(bytes)
    }
}

fn parse_hex_color(value: &str) -> Option<Rgba<u8>> {
    let hex = value.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    Some(Rgba([channel(0..2)?, channel(2..4)?, channel(4..6)?, 255]))
}

fn is_rtl(c: char) -> bool {
    matches!(c as u32, 0x0590..=0x08FF | 0xFB1D..=0xFDFF | 0xFE70..=0xFEFF)
}

/// Left-to-right drawing order for a right-to-left line: words are reversed,
/// and so are the letters of right-to-left words. Numbers stay as written.
pub fn visual_order(text: &str) -> String {
    if !text.chars().any(is_rtl) {
        return text.to_string();
    }
    text.split(' ')
        .rev()
        .map(|word| {
            if word.chars().any(is_rtl) {
                word.chars().rev().collect::<String>()
            } else {
                word.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visual_order_keeps_numbers() {
        assert_eq!(visual_order("ab 4-5"), "ab 4-5");
        assert_eq!(visual_order("البقرة 4-5"), "4-5 ةرقبلا");
    }

    #[test]
    fn hex_colors() {
        assert_eq!(parse_hex_color("#1f497d"), Some(Rgba([0x1f, 0x49, 0x7d, 255])));
        assert_eq!(parse_hex_color("zzz"), None);
        assert_eq!(parse_hex_color("#aééa"), None);
        assert_eq!(HeadingLine::new("t", "#aééa", 10.0).rgba(), BLACK);
    }
}
