//! Document export of the plan table.

pub mod docx;
pub mod pdf;
pub mod watermark;

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::RenderError;

pub use docx::DocxRenderer;
pub use pdf::{PdfLayout, PdfRenderer};
pub use watermark::{WatermarkSource, load_watermark};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Docx,
    Pdf,
}

impl DocumentFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            DocumentFormat::Docx => "docx",
            DocumentFormat::Pdf => "pdf",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            DocumentFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            DocumentFormat::Pdf => "application/pdf",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "docx" => Some(DocumentFormat::Docx),
            "pdf" => Some(DocumentFormat::Pdf),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Decoded watermark image, shared between renders.
#[derive(Debug, Clone)]
pub struct Watermark {
    image: Arc<RgbaImage>,
}

impl Watermark {
    pub fn new(image: RgbaImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

/// Everything a renderer needs. `table[0]` is the header row.
#[derive(Debug, Clone)]
pub struct PlanDocument {
    pub title: String,
    pub table: Vec<Vec<String>>,
    pub watermark: Option<Watermark>,
}

impl PlanDocument {
    pub fn header(&self) -> Result<&[String], RenderError> {
        self.table
            .first()
            .map(Vec::as_slice)
            .ok_or(RenderError::MissingHeader)
    }

    pub fn body(&self) -> &[Vec<String>] {
        self.table.get(1..).unwrap_or(&[])
    }
}

pub trait DocumentRenderer {
    fn format(&self) -> DocumentFormat;
    fn render(&self, document: &PlanDocument) -> Result<Vec<u8>, RenderError>;
}

pub fn plan_title(participant_name: &str, month: u32) -> String {
    format!(
        "خطة المشترك/ة : {}    خلال شهر {}",
        participant_name,
        month + 1
    )
}

/// Month stays 0-based in file names, matching previously exported files.
/// Path separators in the participant name become underscores.
pub fn export_file_name(
    participant_name: &str,
    month: u32,
    year: i32,
    format: DocumentFormat,
) -> String {
    let name = participant_name.replace(['/', '\\'], "_");
    format!(
        "خطة_الحفظ_{}_{}_{}.{}",
        name,
        month,
        year,
        format.extension()
    )
}
