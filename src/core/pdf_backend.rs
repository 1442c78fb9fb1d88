//! A plotters drawing backend that emits vector operations onto a printpdf
//! page layer.
//!
//! The backend works in "canvas pixels" like any other plotters backend and
//! maps them onto the page through a [`PageTransform`]: pixels are scaled to
//! millimetres, shifted by the page's vertical offset and flipped into PDF's
//! bottom-up coordinate system.

use plotters_backend::{
    text_anchor, BackendColor, BackendCoord, BackendStyle, BackendTextStyle, DrawingBackend,
    DrawingErrorKind,
};
use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{Color, IndirectFontRef, Line, Mm, PdfLayerReference, Point, Polygon, Rgb};
use std::convert::Infallible;

const PT_PER_MM: f64 = 72.0 / 25.4;
const CIRCLE_SEGMENTS: usize = 24;

/// Placement of the virtual canvas on one PDF page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageTransform {
    /// Left edge of the canvas on the page, in mm.
    pub left_mm: f64,
    /// Top edge of the canvas measured down from the top of the page, in mm.
    /// Negative for continuation pages.
    pub top_mm: f64,
    pub mm_per_px: f64,
    pub page_height_mm: f64,
}

impl PageTransform {
    pub fn x(&self, px: i32) -> f64 {
        self.left_mm + px as f64 * self.mm_per_px
    }

    /// Distance from the bottom of the page, in mm.
    pub fn y(&self, px: i32) -> f64 {
        self.page_height_mm - (self.top_mm + px as f64 * self.mm_per_px)
    }

    pub fn point(&self, (x, y): BackendCoord) -> Point {
        Point::new(Mm(self.x(x) as f32), Mm(self.y(y) as f32))
    }

    /// Whether any part of the vertical pixel span lands on the page.
    pub fn overlaps_page(&self, min_px: i32, max_px: i32) -> bool {
        let top = self.y(min_px);
        let bottom = self.y(max_px);
        bottom <= self.page_height_mm && top >= 0.0
    }
}

pub struct PdfBackend {
    layer: PdfLayerReference,
    font: IndirectFontRef,
    transform: PageTransform,
    size: (u32, u32),
}

impl PdfBackend {
    pub fn new(
        layer: PdfLayerReference,
        font: IndirectFontRef,
        transform: PageTransform,
        size: (u32, u32),
    ) -> Self {
        Self {
            layer,
            font,
            transform,
            size,
        }
    }

    fn visible<I: IntoIterator<Item = BackendCoord>>(&self, points: I) -> bool {
        let (min, max) = points
            .into_iter()
            .fold((i32::MAX, i32::MIN), |(lo, hi), (_, y)| (lo.min(y), hi.max(y)));
        min <= max && self.transform.overlaps_page(min, max)
    }

    fn set_stroke(&self, color: BackendColor, width: u32) {
        self.layer.set_outline_color(pdf_color(color));
        let width_pt = width.max(1) as f64 * self.transform.mm_per_px * PT_PER_MM;
        self.layer.set_outline_thickness(width_pt as f32);
    }

    fn stroke(&self, points: &[BackendCoord], closed: bool) {
        self.layer.add_line(Line {
            points: points
                .iter()
                .map(|p| (self.transform.point(*p), false))
                .collect(),
            is_closed: closed,
        });
    }

    fn fill(&self, points: &[BackendCoord], color: BackendColor) {
        self.layer.set_fill_color(pdf_color(color));
        self.layer.add_polygon(Polygon {
            rings: vec![points
                .iter()
                .map(|p| (self.transform.point(*p), false))
                .collect()],
            mode: PaintMode::Fill,
            winding_order: WindingOrder::NonZero,
        });
    }
}

fn pdf_color(color: BackendColor) -> Color {
    let (r, g, b) = color.rgb;
    // PDF has no per-path alpha without extended graphics states; blend
    // against the white page instead.
    let blend = |c: u8| {
        let c = c as f64 / 255.0;
        (c * color.alpha + (1.0 - color.alpha)) as f32
    };
    Color::Rgb(Rgb::new(blend(r), blend(g), blend(b), None))
}

impl DrawingBackend for PdfBackend {
    type ErrorType = Infallible;

    fn get_size(&self) -> (u32, u32) {
        self.size
    }

    fn ensure_prepared(&mut self) -> Result<(), DrawingErrorKind<Infallible>> {
        Ok(())
    }

    fn present(&mut self) -> Result<(), DrawingErrorKind<Infallible>> {
        Ok(())
    }

    fn draw_pixel(
        &mut self,
        point: BackendCoord,
        color: BackendColor,
    ) -> Result<(), DrawingErrorKind<Infallible>> {
        if color.alpha == 0.0 || !self.visible([point]) {
            return Ok(());
        }
        let (x, y) = point;
        self.fill(&[(x, y), (x + 1, y), (x + 1, y + 1), (x, y + 1)], color);
        Ok(())
    }

    fn draw_line<S: BackendStyle>(
        &mut self,
        from: BackendCoord,
        to: BackendCoord,
        style: &S,
    ) -> Result<(), DrawingErrorKind<Infallible>> {
        if style.color().alpha == 0.0 || !self.visible([from, to]) {
            return Ok(());
        }
        self.set_stroke(style.color(), style.stroke_width());
        self.stroke(&[from, to], false);
        Ok(())
    }

    fn draw_rect<S: BackendStyle>(
        &mut self,
        upper_left: BackendCoord,
        bottom_right: BackendCoord,
        style: &S,
        fill: bool,
    ) -> Result<(), DrawingErrorKind<Infallible>> {
        if style.color().alpha == 0.0 || !self.visible([upper_left, bottom_right]) {
            return Ok(());
        }
        let (x0, y0) = upper_left;
        let (x1, y1) = bottom_right;
        let corners = [(x0, y0), (x1, y0), (x1, y1), (x0, y1)];
        if fill {
            self.fill(&corners, style.color());
        } else {
            self.set_stroke(style.color(), style.stroke_width());
            self.stroke(&corners, true);
        }
        Ok(())
    }

    fn draw_path<S: BackendStyle, I: IntoIterator<Item = BackendCoord>>(
        &mut self,
        path: I,
        style: &S,
    ) -> Result<(), DrawingErrorKind<Infallible>> {
        let points: Vec<BackendCoord> = path.into_iter().collect();
        if points.len() < 2 || style.color().alpha == 0.0 || !self.visible(points.iter().copied()) {
            return Ok(());
        }
        self.set_stroke(style.color(), style.stroke_width());
        self.stroke(&points, false);
        Ok(())
    }

    fn draw_circle<S: BackendStyle>(
        &mut self,
        center: BackendCoord,
        radius: u32,
        style: &S,
        fill: bool,
    ) -> Result<(), DrawingErrorKind<Infallible>> {
        let r = radius as i32;
        if style.color().alpha == 0.0
            || !self.visible([(center.0, center.1 - r), (center.0, center.1 + r)])
        {
            return Ok(());
        }
        let points: Vec<BackendCoord> = (0..CIRCLE_SEGMENTS)
            .map(|i| {
                let a = i as f64 / CIRCLE_SEGMENTS as f64 * std::f64::consts::TAU;
                (
                    center.0 + (radius as f64 * a.cos()).round() as i32,
                    center.1 + (radius as f64 * a.sin()).round() as i32,
                )
            })
            .collect();
        if fill {
            self.fill(&points, style.color());
        } else {
            self.set_stroke(style.color(), style.stroke_width());
            self.stroke(&points, true);
        }
        Ok(())
    }

    fn fill_polygon<S: BackendStyle, I: IntoIterator<Item = BackendCoord>>(
        &mut self,
        vert: I,
        style: &S,
    ) -> Result<(), DrawingErrorKind<Infallible>> {
        let points: Vec<BackendCoord> = vert.into_iter().collect();
        if points.len() < 3 || style.color().alpha == 0.0 || !self.visible(points.iter().copied())
        {
            return Ok(());
        }
        self.fill(&points, style.color());
        Ok(())
    }

    fn draw_text<TStyle: BackendTextStyle>(
        &mut self,
        text: &str,
        style: &TStyle,
        pos: BackendCoord,
    ) -> Result<(), DrawingErrorKind<Infallible>> {
        let color = style.color();
        if color.alpha == 0.0 || text.trim().is_empty() {
            return Ok(());
        }

        let size_px = style.size();
        let (width, height) = estimate_text_px(text, size_px);
        let dx = match style.anchor().h_pos {
            text_anchor::HPos::Left => 0,
            text_anchor::HPos::Center => -width / 2,
            text_anchor::HPos::Right => -width,
        };
        let top = match style.anchor().v_pos {
            text_anchor::VPos::Top => pos.1,
            text_anchor::VPos::Center => pos.1 - height / 2,
            text_anchor::VPos::Bottom => pos.1 - height,
        };
        if !self.visible([(pos.0, top), (pos.0, top + height)]) {
            return Ok(());
        }

        // printpdf positions text by its baseline.
        let baseline = top + (size_px * 0.8).round() as i32;
        let font_pt = size_px * self.transform.mm_per_px * PT_PER_MM;
        self.layer.set_fill_color(pdf_color(color));
        self.layer.use_text(
            text,
            font_pt as f32,
            Mm(self.transform.x(pos.0 + dx) as f32),
            Mm(self.transform.y(baseline) as f32),
            &self.font,
        );
        Ok(())
    }

    fn estimate_text_size<TStyle: BackendTextStyle>(
        &self,
        text: &str,
        style: &TStyle,
    ) -> Result<(u32, u32), DrawingErrorKind<Infallible>> {
        let (w, h) = estimate_text_px(text, style.size());
        Ok((w.max(0) as u32, h.max(0) as u32))
    }
}

/// Helvetica-ish metrics: average glyph width a bit over half the size.
fn estimate_text_px(text: &str, size_px: f64) -> (i32, i32) {
    let width = text.chars().count() as f64 * size_px * 0.55;
    (width.round() as i32, size_px.round() as i32)
}
