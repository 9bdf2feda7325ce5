//! PDF rendering of a laid-out Report

use printpdf::{BuiltinFont, Color as PdfColor, IndirectFontRef, Mm, PdfDocument, PdfLayerReference, Rect, Rgb};
use tracing::debug;

use super::ReportError;
use super::layout::{Color, Element, MARGIN_MM, MUTED, PAGE_HEIGHT_MM, PAGE_WIDTH_MM, Page, Report};

const LAYER: &str = "Layer 1";
const FOOTER_SIZE: f32 = 8.0;
const RULE_MM: f32 = 0.2;

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

/// Render the report to PDF bytes
pub fn render(report: &Report) -> Result<Vec<u8>, ReportError> {
    debug!(pages = report.page_count(), title = %report.title, "render: called");

    let (doc, first_page, first_layer) = PdfDocument::new(&report.title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), LAYER);
    let fonts = Fonts {
        regular: doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ReportError::Pdf(e.to_string()))?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ReportError::Pdf(e.to_string()))?,
    };

    for (i, page) in report.pages.iter().enumerate() {
        let (page_index, layer_index) = if i == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), LAYER)
        };
        let layer = doc.get_page(page_index).get_layer(layer_index);
        draw_page(&layer, page, &fonts);
    }

    let bytes = doc.save_to_bytes().map_err(|e| ReportError::Pdf(e.to_string()))?;
    debug!(bytes = bytes.len(), "render: done");
    Ok(bytes)
}

fn fill(layer: &PdfLayerReference, (r, g, b): Color) {
    layer.set_fill_color(PdfColor::Rgb(Rgb::new(r, g, b, None)));
}

/// Layout y runs down from the top edge; PDF y runs up from the bottom
fn flip(y: f32) -> f32 {
    PAGE_HEIGHT_MM - y
}

fn draw_page(layer: &PdfLayerReference, page: &Page, fonts: &Fonts) {
    for element in &page.elements {
        match element {
            Element::Band { y, height, color } => {
                fill(layer, *color);
                layer.add_rect(Rect::new(Mm(0.0), Mm(flip(y + height)), Mm(PAGE_WIDTH_MM), Mm(flip(*y))));
            }
            Element::Text {
                x,
                y,
                size,
                bold,
                color,
                text,
            } => {
                fill(layer, *color);
                let font = if *bold { &fonts.bold } else { &fonts.regular };
                layer.use_text(text.as_str(), *size, Mm(*x), Mm(flip(*y)), font);
            }
            Element::Rule { y, color } => {
                fill(layer, *color);
                layer.add_rect(Rect::new(
                    Mm(MARGIN_MM),
                    Mm(flip(y + RULE_MM)),
                    Mm(PAGE_WIDTH_MM - MARGIN_MM),
                    Mm(flip(*y)),
                ));
            }
        }
    }

    if let Some(footer) = &page.footer {
        fill(layer, MUTED);
        layer.use_text(
            footer.as_str(),
            FOOTER_SIZE,
            Mm(PAGE_WIDTH_MM - MARGIN_MM - 22.0),
            Mm(MARGIN_MM / 2.0),
            &fonts.regular,
        );
    }
}
