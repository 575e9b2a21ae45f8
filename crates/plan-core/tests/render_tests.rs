use std::io::Read;
use std::sync::Arc;

use image::{Rgba, RgbaImage};
use study_plan::calendar::COLUMN_MEMORIZATION;
use study_plan::catalog::{Catalog, Chapter};
use study_plan::render::{
    DocumentFormat, DocumentRenderer, DocxRenderer, PdfLayout, PdfRenderer, PlanDocument,
    Watermark,
};
use study_plan::{PlanMetadata, PlanSession, RenderError};

fn document() -> PlanDocument {
    let catalog = Catalog::new(vec![Chapter::new(2, "البقرة", 2, 49)]).unwrap();
    let mut session =
        PlanSession::new(Arc::new(catalog), PlanMetadata::new("سارة", 1, 2024)).unwrap();
    session.select_chapter(2).unwrap();
    session.document(None)
}

fn zip_entry(bytes: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut content = String::new();
    entry.read_to_string(&mut content).unwrap();
    content
}

#[test]
fn docx_contains_rtl_document_part() {
    let renderer = DocxRenderer::default();
    assert_eq!(renderer.format(), DocumentFormat::Docx);
    let bytes = renderer.render(&document()).unwrap();

    let xml = zip_entry(&bytes, "word/document.xml");
    assert!(xml.contains("<w:bidi/>"));
    assert!(xml.contains("w:fill=\"CCCCCC\""));
    assert!(xml.contains("Simplified Arabic"));
    assert!(xml.contains("خطة المشترك/ة : سارة"));
    assert!(xml.contains("البقرة 2"));
    assert_eq!(xml.matches("<w:tr>").count(), 30);

    let types = zip_entry(&bytes, "[Content_Types].xml");
    assert!(types.contains("/word/document.xml"));
}

#[test]
fn rendering_requires_a_header_row() {
    let empty = PlanDocument {
        title: String::new(),
        table: Vec::new(),
        watermark: None,
    };
    assert!(matches!(
        DocxRenderer::default().render(&empty),
        Err(RenderError::MissingHeader)
    ));
    assert!(matches!(
        PdfRenderer::default().render(&empty),
        Err(RenderError::MissingHeader)
    ));
}

#[test]
fn pdf_parses_and_paginates() {
    let renderer = PdfRenderer::default();
    let document = document();
    let (first, later) = renderer.rows_per_page();
    let body = document.body().len();
    let expected_pages = if body <= first {
        1
    } else {
        1 + (body - first).div_ceil(later)
    };

    let bytes = renderer.render(&document).unwrap();
    let parsed = lopdf::Document::load_mem(&bytes).unwrap();
    assert_eq!(parsed.get_pages().len(), expected_pages);
}

#[test]
fn small_pages_repeat_the_header() {
    let layout = PdfLayout {
        page_height: 600,
        ..PdfLayout::default()
    };
    let renderer = PdfRenderer::new(layout);
    let document = document();
    let pages = renderer.render_pages(&document).unwrap();
    assert!(pages.len() > 1);

    // Header fill is drawn at the top of the table on every later page.
    let margin = renderer.layout().margin;
    for page in &pages[1..] {
        let pixel = page.get_pixel(margin + 10, margin + 10);
        assert_eq!(*pixel, Rgba([0xcc, 0xcc, 0xcc, 255]));
    }
}

fn dark_pixels_in_first_memorization_cell(renderer: &PdfRenderer, document: &PlanDocument) -> usize {
    let layout = renderer.layout();
    let columns = document.header().unwrap().len() as u32;
    let column_width = (layout.page_width - layout.margin * 2) / columns;
    let left = layout.margin + (columns - 1 - COLUMN_MEMORIZATION as u32) * column_width;
    let top = layout.margin + (layout.title_size * 1.8) as u32 + layout.header_row_height;

    let pages = renderer.render_pages(document).unwrap();
    let page = &pages[0];
    let mut dark = 0;
    for x in left + 3..left + column_width - 3 {
        for y in top + 3..top + layout.row_height - 3 {
            if page.get_pixel(x, y)[0] < 128 {
                dark += 1;
            }
        }
    }
    dark
}

#[test]
fn body_cells_carry_text_with_the_default_font() {
    let layout = PdfLayout {
        heading_lines: Vec::new(),
        ..PdfLayout::default()
    };
    let document = document();
    assert_eq!(document.body()[0][COLUMN_MEMORIZATION], "البقرة 2");

    let renderer = PdfRenderer::new(layout);
    assert!(renderer.has_font());
    assert!(dark_pixels_in_first_memorization_cell(&renderer, &document) > 0);

    let grid_only = renderer.without_font();
    assert_eq!(dark_pixels_in_first_memorization_cell(&grid_only, &document), 0);
}

#[test]
fn watermark_is_blended_at_half_opacity() {
    let layout = PdfLayout {
        heading_lines: Vec::new(),
        ..PdfLayout::default()
    };
    let renderer = PdfRenderer::new(layout);
    let mut document = document();
    document.table.truncate(1);
    document.watermark = Some(Watermark::new(RgbaImage::from_pixel(
        10,
        10,
        Rgba([0, 0, 0, 255]),
    )));

    let pages = renderer.render_pages(&document).unwrap();
    let page = &pages[0];
    let center = page.get_pixel(page.width() / 2, page.height() / 2 - 58);
    assert!(center[0] > 100 && center[0] < 155, "got {:?}", center);
}

#[test]
fn rows_are_not_mutated_by_rendering() {
    let document = document();
    let before = document.table.clone();
    DocxRenderer::default().render(&document).unwrap();
    assert_eq!(document.table, before);
}
