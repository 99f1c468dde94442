// Minimal page canvas on top of lopdf.
//
// Reports only need text, filled/stroked boxes, JPEG images and a paginated
// table, so that is all this provides. Text uses the standard Helvetica faces
// (no embedding) with WinAnsiEncoding; characters outside Latin-1 print as `?`.
use crate::error::Result;
use image::{DynamicImage, ImageOutputFormat};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::io::Cursor;

pub const A4_PORTRAIT: (f32, f32) = (595.0, 842.0);
pub const A4_LANDSCAPE: (f32, f32) = (842.0, 595.0);

const FOOTER_SIZE: f32 = 8.0;
const FOOTER_Y: f32 = 20.0;
const MARGIN_X: f32 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Regular,
    Bold,
}

impl Face {
    fn resource_name(self) -> &'static str {
        match self {
            Face::Regular => "F1",
            Face::Bold => "F2",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// Approximate Helvetica advance widths, in 1/1000 em.
fn glyph_width(c: char) -> f32 {
    match c {
        ' ' | '.' | ',' | ':' | ';' | '!' | '\'' | '|' | 'i' | 'j' | 'l' => 278.0,
        'f' | 't' | 'I' | '/' | '(' | ')' | '[' | ']' | '-' => 333.0,
        'r' => 333.0,
        '0'..='9' | '$' | '?' => 556.0,
        '%' => 889.0,
        'm' | 'M' => 833.0,
        'w' | 'W' => 900.0,
        'a'..='z' => 520.0,
        'A'..='Z' => 680.0,
        _ => 556.0,
    }
}

/// Rendered width of `text` in points.
pub fn text_width(text: &str, size: f32, face: Face) -> f32 {
    let em: f32 = text.chars().map(glyph_width).sum();
    let bold = if face == Face::Bold { 1.05 } else { 1.0 };
    em * size / 1000.0 * bold
}

/// Truncate `text` with an ellipsis so it fits in `max_width` points.
pub fn fit_text(text: &str, max_width: f32, size: f32, face: Face) -> String {
    if text_width(text, size, face) <= max_width {
        return text.to_string();
    }
    let mut out: String = text.to_string();
    while !out.is_empty() && text_width(&format!("{}...", out), size, face) > max_width {
        out.pop();
    }
    format!("{}...", out.trim_end())
}

fn latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if (c as u32) < 256 { c as u8 } else { b'?' })
        .collect()
}

fn text_ops(x: f32, y: f32, size: f32, face: Face, align: Align, text: &str) -> Vec<Operation> {
    let w = text_width(text, size, face);
    let x = match align {
        Align::Left => x,
        Align::Center => x - w / 2.0,
        Align::Right => x - w,
    };
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![face.resource_name().into(), size.into()]),
        Operation::new("Td", vec![x.into(), y.into()]),
        Operation::new("Tj", vec![Object::string_literal(latin1(text))]),
        Operation::new("ET", vec![]),
    ]
}

/// An image already embedded in the document, ready to be placed.
#[derive(Debug, Clone)]
pub struct PlacedImage {
    name: String,
    pub width: u32,
    pub height: u32,
}

impl PlacedImage {
    /// Height that keeps the aspect ratio at the given drawn width.
    pub fn height_for(&self, width: f32) -> f32 {
        if self.width == 0 {
            return 0.0;
        }
        width * self.height as f32 / self.width as f32
    }

    /// Drawn size that fits inside `max_w` x `max_h` without distortion.
    pub fn fit_within(&self, max_w: f32, max_h: f32) -> (f32, f32) {
        if self.width == 0 || self.height == 0 {
            return (0.0, 0.0);
        }
        let scale = (max_w / self.width as f32).min(max_h / self.height as f32);
        (self.width as f32 * scale, self.height as f32 * scale)
    }
}

/// Column layout for `PdfCanvas::table`.
#[derive(Debug, Clone)]
pub struct TableLayout {
    pub x: f32,
    pub col_widths: Vec<f32>,
    pub row_height: f32,
    pub font_size: f32,
    /// Where the table restarts after a page break.
    pub top: f32,
    /// Rows are never drawn below this line.
    pub bottom: f32,
}

#[derive(Debug, Clone)]
struct Footer {
    prepared_by: String,
    date: String,
}

pub struct PdfCanvas {
    doc: Document,
    size: (f32, f32),
    pages: Vec<Vec<Operation>>,
    xobjects: Dictionary,
    footer: Option<Footer>,
}

impl PdfCanvas {
    /// A document with one empty page of the given size.
    pub fn new(size: (f32, f32)) -> Self {
        Self {
            doc: Document::with_version("1.5"),
            size,
            pages: vec![Vec::new()],
            xobjects: Dictionary::new(),
            footer: None,
        }
    }

    /// Print "Prepared by", the report date and a page number on every page.
    pub fn with_footer(mut self, prepared_by: &str, date: &str) -> Self {
        self.footer = Some(Footer {
            prepared_by: prepared_by.to_string(),
            date: date.to_string(),
        });
        self
    }

    pub fn width(&self) -> f32 {
        self.size.0
    }

    pub fn height(&self) -> f32 {
        self.size.1
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn new_page(&mut self) {
        self.pages.push(Vec::new());
    }

    fn ops(&mut self) -> &mut Vec<Operation> {
        if self.pages.is_empty() {
            self.pages.push(Vec::new());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    pub fn text(&mut self, x: f32, y: f32, size: f32, face: Face, align: Align, text: &str) {
        let ops = text_ops(x, y, size, face, align, text);
        self.ops().extend(ops);
    }

    /// Rectangle with an optional RGB fill (0..1 components) and a thin border.
    pub fn rect(&mut self, x: f32, y: f32, w: f32, h: f32, fill: Option<(f32, f32, f32)>) {
        let ops = self.ops();
        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new("w", vec![0.5f32.into()]));
        ops.push(Operation::new("RG", vec![0.6f32.into(), 0.6f32.into(), 0.6f32.into()]));
        let rect = vec![x.into(), y.into(), w.into(), h.into()];
        match fill {
            Some((r, g, b)) => {
                ops.push(Operation::new("rg", vec![r.into(), g.into(), b.into()]));
                ops.push(Operation::new("re", rect));
                ops.push(Operation::new("B", vec![]));
            }
            None => {
                ops.push(Operation::new("re", rect));
                ops.push(Operation::new("S", vec![]));
            }
        }
        ops.push(Operation::new("Q", vec![]));
    }

    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        let ops = self.ops();
        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new("w", vec![0.5f32.into()]));
        ops.push(Operation::new("m", vec![x1.into(), y1.into()]));
        ops.push(Operation::new("l", vec![x2.into(), y2.into()]));
        ops.push(Operation::new("S", vec![]));
        ops.push(Operation::new("Q", vec![]));
    }

    /// Decode any supported image and embed it as a baseline JPEG.
    pub fn embed_image(&mut self, bytes: &[u8]) -> Result<PlacedImage> {
        let img = image::load_from_memory(bytes)?;
        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();
        let mut jpeg = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(rgb).write_to(&mut jpeg, ImageOutputFormat::Jpeg(85))?;

        let stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => Object::Integer(width as i64),
                "Height" => Object::Integer(height as i64),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => Object::Integer(8),
                "Filter" => "DCTDecode",
            },
            jpeg.into_inner(),
        )
        .with_compression(false);
        let id = self.doc.add_object(stream);
        let name = format!("Im{}", self.xobjects.len() + 1);
        self.xobjects.set(name.as_bytes().to_vec(), id);
        Ok(PlacedImage {
            name,
            width,
            height,
        })
    }

    pub fn draw_image(&mut self, image: &PlacedImage, x: f32, y: f32, w: f32, h: f32) {
        let name = image.name.clone();
        let ops = self.ops();
        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new(
            "cm",
            vec![w.into(), 0f32.into(), 0f32.into(), h.into(), x.into(), y.into()],
        ));
        ops.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
        ops.push(Operation::new("Q", vec![]));
    }

    fn table_row(&mut self, layout: &TableLayout, y: f32, cells: &[String], header: bool) {
        let face = if header { Face::Bold } else { Face::Regular };
        let fill = if header { Some((0.85, 0.85, 0.85)) } else { None };
        let mut x = layout.x;
        for (i, w) in layout.col_widths.iter().enumerate() {
            self.rect(x, y, *w, layout.row_height, fill);
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            let shown = fit_text(cell, w - 8.0, layout.font_size, face);
            let baseline = y + (layout.row_height - layout.font_size) / 2.0 + 1.5;
            self.text(x + 4.0, baseline, layout.font_size, face, Align::Left, &shown);
            x += w;
        }
    }

    /// Draw a table whose top edge is at `y`, breaking onto new pages as needed.
    /// The header row is repeated at the top of every continuation page.
    /// Returns the y coordinate just below the last row.
    pub fn table(
        &mut self,
        layout: &TableLayout,
        mut y: f32,
        headers: &[String],
        rows: &[Vec<String>],
    ) -> f32 {
        if y - layout.row_height < layout.bottom {
            self.new_page();
            y = layout.top;
        }
        y -= layout.row_height;
        self.table_row(layout, y, headers, true);
        for row in rows {
            if y - layout.row_height < layout.bottom {
                self.new_page();
                y = layout.top - layout.row_height;
                self.table_row(layout, y, headers, true);
            }
            y -= layout.row_height;
            self.table_row(layout, y, row, false);
        }
        y
    }

    fn draw_footers(&mut self) {
        let Some(footer) = self.footer.as_ref() else {
            return;
        };
        let w = self.size.0;
        let prepared = format!("Prepared by: {}", footer.prepared_by);
        for (n, page) in self.pages.iter_mut().enumerate() {
            let y = FOOTER_Y;
            page.extend(text_ops(MARGIN_X, y, FOOTER_SIZE, Face::Regular, Align::Left, &prepared));
            page.extend(text_ops(w / 2.0, y, FOOTER_SIZE, Face::Regular, Align::Center, &footer.date));
            let number = format!("Page {}", n + 1);
            page.extend(text_ops(w - MARGIN_X, y, FOOTER_SIZE, Face::Regular, Align::Right, &number));
        }
    }

    /// Serialize the document.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        self.draw_footers();
        let (w, h) = self.size;
        let mut doc = self.doc;
        let pages_id = doc.new_object_id();

        let regular = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let bold = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => regular,
                "F2" => bold,
            },
            "XObject" => self.xobjects,
        });

        let mut kids: Vec<Object> = Vec::with_capacity(self.pages.len());
        for operations in self.pages {
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }
        let count = kids.len() as i64;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(count),
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                w.into(),
                h.into(),
            ],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id: ObjectId = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut out = Vec::new();
        doc.save_to(&mut out)?;
        Ok(out)
    }
}
