use crate::aggregate::{ApartmentDetail, TowerSummary};
use crate::config::DashboardConfig;
use crate::error::Result;
use crate::pdf::{Align, Face, PdfCanvas, TableLayout, A4_LANDSCAPE, A4_PORTRAIT};
use crate::sections::SectionAggregate;
use crate::types::{Section, SheetCell};
use crate::util::{display_percent, format_percent, report_date};
use crate::weights::ACTIVITY_COLS;
use log::{info, warn};
use std::fs;
use std::path::Path;

/// Columns of a wide section table that never describe an activity.
const NON_ACTIVITY_COLUMNS: [&str; 6] = ["Tower", "Area", "Progress %", "Activity", "SortOrder", "Floor"];

const EMPTY_TABLE_TEXT: &str = "No activity data available.";

/// A finished report, ready to be written or offered for download.
#[derive(Debug, Clone)]
pub struct GeneratedPdf {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub pages: usize,
}

/// Branding and footer data shared by every report.
#[derive(Debug, Clone, Default)]
pub struct ReportStyle {
    pub prepared_by: String,
    pub project_name: String,
    pub report_date: String,
    pub logo_left: Option<Vec<u8>>,
    pub logo_right: Option<Vec<u8>>,
}

fn read_logo(path: &Path) -> Option<Vec<u8>> {
    if !path.exists() {
        return None;
    }
    match fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            warn!("Cannot read logo {}: {}", path.display(), e);
            None
        }
    }
}

impl ReportStyle {
    pub fn from_config(config: &DashboardConfig) -> Self {
        Self {
            prepared_by: config.prepared_by.clone(),
            project_name: config.project_name.clone(),
            report_date: report_date(),
            logo_left: read_logo(&config.logo_left),
            logo_right: read_logo(&config.logo_right),
        }
    }

    fn canvas(&self, size: (f32, f32)) -> PdfCanvas {
        PdfCanvas::new(size).with_footer(&self.prepared_by, &format!("Date: {}", self.report_date))
    }
}

/// A wide table: one column per activity, one row per area.
#[derive(Debug, Clone, Default)]
pub struct WideTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<SheetCell>>,
}

impl WideTable {
    /// The tower's rows of an aggregated section, laid out as the sheet was.
    pub fn from_section(agg: &SectionAggregate, tower: &str) -> Self {
        let mut headers = vec!["Tower".to_string(), "Area".to_string()];
        headers.extend(agg.activities.iter().cloned());
        headers.push("Progress %".to_string());
        let rows = agg
            .tower_rows(tower)
            .map(|r| {
                let mut row = vec![SheetCell::text(&r.tower), SheetCell::text(&r.area)];
                row.extend(r.activities.iter().map(|(_, v)| SheetCell::Number(*v)));
                row.push(SheetCell::Number(r.progress));
                row
            })
            .collect();
        Self { headers, rows }
    }

    fn is_numeric_column(&self, idx: usize) -> bool {
        let mut any = false;
        for row in &self.rows {
            match row.get(idx) {
                Some(SheetCell::Number(_)) => any = true,
                Some(SheetCell::Text(_)) => return false,
                _ => {}
            }
        }
        any
    }

    /// `(activity, value)` pairs read from the first row.
    pub fn first_row_activities(&self) -> Vec<(String, f64)> {
        let Some(first) = self.rows.first() else {
            return Vec::new();
        };
        self.headers
            .iter()
            .enumerate()
            .filter(|(_, h)| {
                !NON_ACTIVITY_COLUMNS.contains(&h.as_str())
                    && !h.to_lowercase().starts_with("unnamed")
            })
            .filter(|(i, _)| self.is_numeric_column(*i))
            .map(|(i, h)| {
                let v = match first.get(i) {
                    Some(SheetCell::Number(v)) => *v,
                    _ => 0.0,
                };
                (h.clone(), v)
            })
            .collect()
    }
}

fn draw_logos(canvas: &mut PdfCanvas, style: &ReportStyle) {
    let top = canvas.height() - 55.0;
    let slots = [
        (style.logo_left.as_ref(), 40.0, 110.0),
        (style.logo_right.as_ref(), canvas.width() - 140.0, 90.0),
    ];
    for (bytes, x, max_w) in slots {
        let Some(bytes) = bytes else { continue };
        match canvas.embed_image(bytes) {
            Ok(img) => {
                // Fit inside a max_w x 40 box.
                let mut w = max_w;
                let mut h = img.height_for(w);
                if h > 40.0 {
                    w *= 40.0 / h;
                    h = 40.0;
                }
                canvas.draw_image(&img, x, top, w, h);
            }
            Err(e) => warn!("Skipping unreadable logo: {}", e),
        }
    }
}

/// Draw `photo` with its lower-left corner at (x, y), inside a `max_w` x `max_h` box.
fn draw_photo(canvas: &mut PdfCanvas, photo: Option<&Path>, x: f32, y: f32, max_w: f32, max_h: f32) {
    let Some(path) = photo else { return };
    let placed = fs::read(path)
        .map_err(Into::into)
        .and_then(|bytes| canvas.embed_image(&bytes));
    match placed {
        Ok(img) => {
            let (w, h) = img.fit_within(max_w, max_h);
            canvas.draw_image(&img, x, y, w, h);
        }
        Err(e) => warn!("Skipping photo {}: {}", path.display(), e),
    }
}

fn percent_rows(values: &[(String, f64)]) -> Vec<Vec<String>> {
    values
        .iter()
        .map(|(a, v)| vec![a.clone(), format_percent(display_percent(*v))])
        .collect()
}

fn finish(canvas: PdfCanvas, file_name: String) -> Result<GeneratedPdf> {
    let pages = canvas.page_count();
    let bytes = canvas.finish()?;
    info!("Rendered {} ({} page(s), {} bytes)", file_name, pages, bytes.len());
    Ok(GeneratedPdf {
        file_name,
        bytes,
        pages,
    })
}

pub fn section_file_name(section: Section, tower: &str) -> String {
    format!("{}_{}_Report.pdf", section.dir_name(), tower)
}

pub fn apartment_file_name(key: &str) -> String {
    format!("{}_report.pdf", key)
}

pub fn tower_file_name(tower: &str) -> String {
    format!("Tower_{}_Report.pdf", tower)
}

/// Landscape section report: logos, title, meta lines and the activity table
/// taken from the first row of `table`.
pub fn section_report(
    style: &ReportStyle,
    section: Section,
    tower: &str,
    progress_text: &str,
    table: &WideTable,
    photo: Option<&Path>,
) -> Result<GeneratedPdf> {
    let mut c = style.canvas(A4_LANDSCAPE);
    let (width, height) = (c.width(), c.height());
    draw_logos(&mut c, style);

    let mut y = height - 110.0;
    let title = format!("{} Progress Report", section.title());
    c.text(width / 2.0, y, 16.0, Face::Bold, Align::Center, &title);
    c.line(40.0, y - 10.0, width - 40.0, y - 10.0);
    y -= 30.0;
    c.text(40.0, y, 11.0, Face::Regular, Align::Left, &format!("Tower: {}", tower));
    y -= 18.0;
    c.text(40.0, y, 11.0, Face::Regular, Align::Left, &format!("Progress: {}", progress_text));
    y -= 25.0;
    c.text(40.0, y, 11.0, Face::Bold, Align::Left, "Progress Details");
    y -= 15.0;

    let activities = table.first_row_activities();
    if activities.is_empty() {
        c.text(40.0, y - 20.0, 10.0, Face::Regular, Align::Left, EMPTY_TABLE_TEXT);
    } else {
        let layout = TableLayout {
            x: 40.0,
            col_widths: vec![320.0, 140.0],
            row_height: 18.0,
            font_size: 9.0,
            top: height - 60.0,
            bottom: 60.0,
        };
        let headers = vec!["Activity".to_string(), "Progress %".to_string()];
        c.table(&layout, y, &headers, &percent_rows(&activities));
    }

    if photo.is_some() {
        // The photo sits bottom-left of the last page; the table may reach it.
        draw_photo(&mut c, photo, 40.0, 40.0, 240.0, 240.0);
    }
    finish(c, section_file_name(section, tower))
}

/// Portrait apartment report with the Apt/Floor/Tower comparison table.
pub fn apartment_report(
    style: &ReportStyle,
    key: &str,
    detail: &ApartmentDetail,
    photo: Option<&Path>,
) -> Result<GeneratedPdf> {
    let mut c = style.canvas(A4_PORTRAIT);
    let x = 50.0;
    let top = 800.0;
    let title = format!("Apartment Progress Report - {}", style.project_name);
    c.text(x, top, 16.0, Face::Bold, Align::Left, &title);

    let r = &detail.record;
    let meta = [
        format!("Apartment: {}", r.apartment_no),
        format!("Tower: {}", r.tower),
        format!("Floor: {}", r.floor),
    ];
    for (i, line) in meta.iter().enumerate() {
        c.text(x, top - 30.0 - 20.0 * i as f32, 12.0, Face::Regular, Align::Left, line);
    }
    c.text(x, top - 110.0, 12.0, Face::Bold, Align::Left, "Overall Progress Summary:");
    let summary = [
        format!("Apartment Progress: {}", format_percent(detail.overall)),
        format!("Floor Progress: {}", format_percent(detail.floor_overall)),
        format!("Tower Progress: {}", format_percent(detail.tower_overall)),
    ];
    for (i, line) in summary.iter().enumerate() {
        c.text(x, top - 130.0 - 20.0 * i as f32, 11.0, Face::Regular, Align::Left, line);
    }

    let mut y = top - 200.0;
    if photo.is_some() {
        draw_photo(&mut c, photo, x, top - 500.0, 300.0, 300.0);
        y = top - 540.0;
    }
    c.text(x, y, 12.0, Face::Bold, Align::Left, "Activity Progress");

    let layout = TableLayout {
        x,
        col_widths: vec![200.0, 95.0, 95.0, 95.0],
        row_height: 14.0,
        font_size: 9.0,
        top,
        bottom: 80.0,
    };
    let headers: Vec<String> = ["Activity", "Apt %", "Floor %", "Tower %"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let rows: Vec<Vec<String>> = detail
        .activities
        .iter()
        .map(|a| {
            vec![
                a.activity.clone(),
                format_percent(a.apartment),
                format_percent(a.floor),
                format_percent(a.tower),
            ]
        })
        .collect();
    if rows.is_empty() {
        c.text(x, y - 20.0, 10.0, Face::Regular, Align::Left, EMPTY_TABLE_TEXT);
    } else {
        c.table(&layout, y - 8.0, &headers, &rows);
    }
    finish(c, apartment_file_name(key))
}

/// Portrait tower report: the tower's mean activity table and boosted overall.
pub fn tower_report(style: &ReportStyle, summary: &TowerSummary) -> Result<GeneratedPdf> {
    let mut c = style.canvas(A4_PORTRAIT);
    let (width, height) = (c.width(), c.height());
    draw_logos(&mut c, style);

    let mut y = height - 110.0;
    let title = format!("Tower {} Progress Report", summary.tower);
    c.text(width / 2.0, y, 16.0, Face::Bold, Align::Center, &title);
    c.line(40.0, y - 10.0, width - 40.0, y - 10.0);
    y -= 30.0;
    c.text(40.0, y, 11.0, Face::Regular, Align::Left, &style.project_name);
    y -= 18.0;
    let progress = format!("Progress: {}", format_percent(summary.overall));
    c.text(40.0, y, 11.0, Face::Regular, Align::Left, &progress);
    y -= 25.0;

    let activities: Vec<(String, f64)> = ACTIVITY_COLS
        .iter()
        .zip(summary.activities.iter())
        .map(|(a, v)| (a.to_string(), *v))
        .collect();
    let layout = TableLayout {
        x: 40.0,
        col_widths: vec![320.0, 140.0],
        row_height: 18.0,
        font_size: 9.0,
        top: height - 60.0,
        bottom: 60.0,
    };
    let headers = vec!["Activity".to_string(), "Progress %".to_string()];
    c.table(&layout, y, &headers, &percent_rows(&activities));
    finish(c, tower_file_name(&summary.tower))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wide() -> WideTable {
        WideTable {
            headers: vec![
                "Tower".into(),
                "Area".into(),
                "MEP Work".into(),
                "Unnamed: 4".into(),
                "Notes".into(),
                "Progress %".into(),
            ],
            rows: vec![
                vec![
                    SheetCell::text("I"),
                    SheetCell::text("Boundary wall"),
                    SheetCell::Number(0.5),
                    SheetCell::Number(1.0),
                    SheetCell::text("late"),
                    SheetCell::Number(40.0),
                ],
                vec![
                    SheetCell::text("I"),
                    SheetCell::text("Road"),
                    SheetCell::Number(80.0),
                    SheetCell::Empty,
                    SheetCell::Empty,
                    SheetCell::Number(20.0),
                ],
            ],
        }
    }

    #[test]
    fn first_row_keeps_numeric_activity_columns_only() {
        let acts = wide().first_row_activities();
        assert_eq!(acts, vec![("MEP Work".to_string(), 0.5)]);
        assert_eq!(percent_rows(&acts)[0][1], "50.00%");
    }

    #[test]
    fn dual_scale_display() {
        let rows = percent_rows(&[("A".into(), 1.0), ("B".into(), 45.5)]);
        assert_eq!(rows[0][1], "100.00%");
        assert_eq!(rows[1][1], "45.50%");
    }

    #[test]
    fn deterministic_file_names() {
        assert_eq!(section_file_name(Section::GroundFloor, "L1"), "GroundFloor_L1_Report.pdf");
        assert_eq!(apartment_file_name("I-101"), "I-101_report.pdf");
        assert_eq!(tower_file_name("L2"), "Tower_L2_Report.pdf");
    }

    fn number(obj: &lopdf::Object) -> f32 {
        match obj {
            lopdf::Object::Integer(i) => *i as f32,
            lopdf::Object::Real(r) => *r as f32,
            _ => panic!("not a number: {:?}", obj),
        }
    }

    #[test]
    fn portrait_photo_stays_below_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("front.jpg");
        let img = image::RgbImage::from_pixel(300, 400, image::Rgb([90, 90, 90]));
        img.save(&path).unwrap();

        let detail = ApartmentDetail {
            record: crate::types::ApartmentRecord {
                tower: "I".into(),
                apartment_no: 101,
                floor: 1,
                activities: [0.5; 12],
            },
            overall: 50.0,
            floor_overall: 50.0,
            tower_overall: 50.0,
            activities: Vec::new(),
        };
        let pdf = apartment_report(&ReportStyle::default(), "I-101", &detail, Some(&path)).unwrap();

        let doc = lopdf::Document::load_mem(&pdf.bytes).unwrap();
        let (_, page_id) = doc.get_pages().into_iter().next().unwrap();
        let content = lopdf::content::Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
        let cm = content
            .operations
            .iter()
            .find(|op| op.operator == "cm")
            .expect("photo transform");
        let w = number(&cm.operands[0]);
        let h = number(&cm.operands[3]);
        let y = number(&cm.operands[5]);
        assert!(w <= 300.0);
        assert_eq!(y, 300.0);
        assert!(y + h <= 600.0, "photo top edge at {}", y + h);
    }

    #[test]
    fn empty_table_still_renders() {
        let style = ReportStyle {
            prepared_by: "QA".into(),
            report_date: "09 October 2026".into(),
            ..ReportStyle::default()
        };
        let pdf = section_report(
            &style,
            Section::Rooftop,
            "I",
            "0.00%",
            &WideTable::default(),
            None,
        )
        .unwrap();
        assert!(pdf.bytes.starts_with(b"%PDF"));
        assert_eq!(pdf.pages, 1);
        assert_eq!(pdf.file_name, "Rooftop_I_Report.pdf");
    }
}
