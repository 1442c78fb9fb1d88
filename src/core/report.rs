//! The exported report: a fixed layout drawn onto a tall virtual canvas, then
//! paginated across A4 pages.

use crate::core::aggregation::SummaryStats;
use crate::core::charts::ChartSpec;
use crate::core::pdf_backend::{PageTransform, PdfBackend};
use crate::core::render::draw_chart;
use crate::utils::error::Result;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{FontDesc, FontFamily, FontStyle};
use printpdf::{BuiltinFont, Mm, PdfDocument};

pub const REPORT_FILENAME: &str = "equipment_report.pdf";
pub const REPORT_TITLE: &str = "Equipment Analytics Report";

pub const PAGE_WIDTH_MM: f64 = 210.0;
pub const PAGE_HEIGHT_MM: f64 = 297.0;
pub const IMAGE_WIDTH_MM: f64 = 190.0;
pub const MARGIN_MM: f64 = 10.0;

const CONTENT_WIDTH_PX: u32 = 1000;
const PADDING_PX: i32 = 30;
const CHART_HEIGHT_PX: i32 = 300;
const CHART_GAP_PX: i32 = 20;
const TITLE_LINE_PX: i32 = 48;
const HEADING_LINE_PX: i32 = 38;
const TEXT_LINE_PX: i32 = 26;

/// Everything the report shows. Charts are drawn in the given order.
#[derive(Debug, Clone)]
pub struct ReportModel {
    pub user: String,
    pub generated_at: String,
    pub data: Option<ReportData>,
}

#[derive(Debug, Clone)]
pub struct ReportData {
    pub summary: SummaryStats,
    pub charts: Vec<ChartSpec>,
}

impl ReportModel {
    pub fn new(user: impl Into<String>, data: Option<ReportData>) -> Self {
        Self {
            user: user.into(),
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            data,
        }
    }

    pub fn canvas_size(&self) -> (u32, u32) {
        (
            CONTENT_WIDTH_PX + 2 * PADDING_PX as u32,
            (header_height(self) + charts_height(self) + 2 * PADDING_PX) as u32,
        )
    }

    pub fn summary_lines(&self) -> Vec<String> {
        match &self.data {
            Some(data) => vec![
                format!("Total Equipment: {}", data.summary.total),
                format!("Average Flow: {:.2}", data.summary.avg_flow),
                format!("Average Pressure: {:.2}", data.summary.avg_pressure),
                format!("Average Temperature: {:.2}", data.summary.avg_temperature),
            ],
            None => Vec::new(),
        }
    }
}

fn header_height(model: &ReportModel) -> i32 {
    let mut height = TITLE_LINE_PX + 2 * TEXT_LINE_PX;
    if model.data.is_some() {
        height += HEADING_LINE_PX + 4 * TEXT_LINE_PX + HEADING_LINE_PX;
    }
    height
}

fn charts_height(model: &ReportModel) -> i32 {
    model
        .data
        .as_ref()
        .map(|d| d.charts.len() as i32 * (CHART_HEIGHT_PX + CHART_GAP_PX))
        .unwrap_or(0)
}

/// Vertical placement of the content on each page.
#[derive(Debug, Clone, PartialEq)]
pub struct Pagination {
    pub image_height_mm: f64,
    /// Top edge of the content relative to each page's top edge, in mm.
    pub offsets_mm: Vec<f64>,
}

impl Pagination {
    /// Scales a `width_px` x `height_px` canvas to the image width and lays it
    /// out page by page: the first page at the top margin, each following page
    /// shifted up by one more page height until the content is exhausted.
    pub fn plan(width_px: u32, height_px: u32) -> Self {
        let image_height_mm = if width_px == 0 {
            0.0
        } else {
            height_px as f64 * IMAGE_WIDTH_MM / width_px as f64
        };

        // Page 1 is shifted down by the margin but page k starts at content
        // k * 297 mm, so the last 10 mm before each page break is not shown.
        let mut offsets_mm = vec![MARGIN_MM];
        let mut height_left = image_height_mm - PAGE_HEIGHT_MM;
        while height_left > 0.0 {
            offsets_mm.push(height_left - image_height_mm);
            height_left -= PAGE_HEIGHT_MM;
        }

        Self {
            image_height_mm,
            offsets_mm,
        }
    }

    pub fn page_count(&self) -> usize {
        self.offsets_mm.len()
    }
}

fn font(size: f64, style: FontStyle) -> FontDesc<'static> {
    FontDesc::new(FontFamily::SansSerif, size, style)
}

/// Draws the whole report layout onto `root`.
pub fn draw_report<DB>(root: &DrawingArea<DB, Shift>, model: &ReportModel) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let area = root.margin(PADDING_PX, PADDING_PX, PADDING_PX, PADDING_PX);

    let mut y = 0;
    area.draw(&Text::new(
        REPORT_TITLE,
        (0, y),
        font(32.0, FontStyle::Bold).color(&BLACK),
    ))?;
    y += TITLE_LINE_PX;

    for line in [
        format!("User: {}", model.user),
        format!("Date: {}", model.generated_at),
    ] {
        area.draw(&Text::new(line, (0, y), font(16.0, FontStyle::Normal).color(&BLACK)))?;
        y += TEXT_LINE_PX;
    }

    let data = match &model.data {
        Some(data) => data,
        None => return Ok(()),
    };

    area.draw(&Text::new(
        "Summary Statistics",
        (0, y + 8),
        font(24.0, FontStyle::Bold).color(&BLACK),
    ))?;
    y += HEADING_LINE_PX;
    for line in model.summary_lines() {
        area.draw(&Text::new(line, (0, y), font(16.0, FontStyle::Normal).color(&BLACK)))?;
        y += TEXT_LINE_PX;
    }

    area.draw(&Text::new(
        "Charts",
        (0, y + 8),
        font(24.0, FontStyle::Bold).color(&BLACK),
    ))?;
    y += HEADING_LINE_PX;

    let (_, mut rest) = area.split_vertically(y);
    for chart in &data.charts {
        let (block, remaining) = rest.split_vertically(CHART_HEIGHT_PX + CHART_GAP_PX);
        let (chart_area, _) = block.split_vertically(CHART_HEIGHT_PX);
        draw_chart(&chart_area, chart)?;
        rest = remaining;
    }

    Ok(())
}

/// Renders the report as a multi-page A4 PDF and returns the file bytes.
pub fn export_pdf(model: &ReportModel) -> Result<Vec<u8>> {
    let size = model.canvas_size();
    let pagination = Pagination::plan(size.0, size.1);
    let mm_per_px = IMAGE_WIDTH_MM / size.0 as f64;

    tracing::debug!(
        "Report canvas {}x{} px, {:.1} mm tall, {} page(s)",
        size.0,
        size.1,
        pagination.image_height_mm,
        pagination.page_count()
    );

    let (doc, first_page, first_layer) = PdfDocument::new(
        REPORT_TITLE,
        Mm(PAGE_WIDTH_MM as f32),
        Mm(PAGE_HEIGHT_MM as f32),
        "Report",
    );
    let font = doc.add_builtin_font(BuiltinFont::Helvetica)?;

    for (index, offset) in pagination.offsets_mm.iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page, layer) = doc.add_page(
                Mm(PAGE_WIDTH_MM as f32),
                Mm(PAGE_HEIGHT_MM as f32),
                "Report",
            );
            doc.get_page(page).get_layer(layer)
        };

        let transform = PageTransform {
            left_mm: MARGIN_MM,
            top_mm: *offset,
            mm_per_px,
            page_height_mm: PAGE_HEIGHT_MM,
        };
        let root = PdfBackend::new(layer, font.clone(), transform, size).into_drawing_area();
        draw_report(&root, model)?;
        root.present()?;
    }

    Ok(doc.save_to_bytes()?)
}

/// Same layout as a single SVG, handy for previewing the report.
pub fn render_report_svg(model: &ReportModel) -> Result<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, model.canvas_size()).into_drawing_area();
        draw_report(&root, model)?;
        root.present()?;
    }
    Ok(svg)
}
