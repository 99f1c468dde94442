// View controller.
//
// Each view is a pure function of (snapshot, config, filters) plus read-only
// photo lookups. Rendering recomputes its aggregates from the snapshot every
// time; nothing derived is cached between calls.
use crate::aggregate::{
    apartment_detail, apartment_tower_progress, floor_summary, lcrg_landing, tower_summary,
    TowerProgress, TowerSummary,
};
use crate::config::DashboardConfig;
use crate::error::Result;
use crate::finance::{check_password, display_row, ir_status_counts, load_cash_flow, load_site_documents};
use crate::loader::SheetTable;
use crate::output::{grid_string, table_string, Grid};
use crate::photos::{browse_folders, photo_key, PhotoKey, PhotoStore};
use crate::reports::{apartment_report, section_report, tower_report, GeneratedPdf, ReportStyle, WideTable};
use crate::snapshot::Snapshot;
use crate::types::{
    ActivityComparisonRow, DomainKpis, Filters, PhotoRow, ProjectSummary, Section, TowerKpiRow,
};
use crate::util::{format_int, format_percent, progress_band, report_date};
use crate::weights::{ACTIVITY_COLS, TOWERS};
use chrono::Local;
use std::fmt::Write as _;
use std::path::PathBuf;

const MAX_PREVIEW_ROWS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Landing,
    TowerSummary,
    FloorSummary,
    ApartmentDetail,
    Section(Section),
    PhotoBrowser,
    Financial,
    Documentation,
}

impl ViewMode {
    pub const ALL: [ViewMode; 11] = [
        ViewMode::Landing,
        ViewMode::TowerSummary,
        ViewMode::FloorSummary,
        ViewMode::ApartmentDetail,
        ViewMode::Section(Section::External),
        ViewMode::Section(Section::Rooftop),
        ViewMode::Section(Section::GroundFloor),
        ViewMode::Section(Section::CommonArea),
        ViewMode::PhotoBrowser,
        ViewMode::Financial,
        ViewMode::Documentation,
    ];

    pub fn label(self) -> String {
        match self {
            ViewMode::Landing => "LCRG Project Progress".to_string(),
            ViewMode::TowerSummary => "Tower Summary".to_string(),
            ViewMode::FloorSummary => "Floor Summary".to_string(),
            ViewMode::ApartmentDetail => "Apartment Detail".to_string(),
            ViewMode::Section(s) => format!("{} Progress", s.title()),
            ViewMode::PhotoBrowser => "Photo Browser".to_string(),
            ViewMode::Financial => "Financial (Cash Flow)".to_string(),
            ViewMode::Documentation => "Site Documentation".to_string(),
        }
    }
}

/// Everything a view may read.
pub struct ViewContext<'a> {
    pub snapshot: &'a Snapshot,
    pub config: &'a DashboardConfig,
    pub store: &'a dyn PhotoStore,
    pub filters: &'a Filters,
    /// Password typed for the financial view, if any.
    pub finance_password: Option<&'a str>,
}

impl ViewContext<'_> {
    fn style(&self) -> ReportStyle {
        ReportStyle::from_config(self.config)
    }
}

/// Output of one view: printable text, its tables (for CSV export) and an
/// optional downloadable report.
#[derive(Debug, Clone, Default)]
pub struct Rendered {
    pub title: String,
    pub body: String,
    pub tables: Vec<(String, Grid)>,
    pub pdf: Option<GeneratedPdf>,
}

impl Rendered {
    fn new(title: String) -> Self {
        Self {
            title,
            ..Self::default()
        }
    }

    fn line(&mut self, text: impl AsRef<str>) {
        self.body.push_str(text.as_ref());
        self.body.push('\n');
    }

    fn table(&mut self, name: &str, grid: Grid) {
        let _ = writeln!(self.body, "\n{}\n{}", name, grid_string(&grid, MAX_PREVIEW_ROWS));
        self.tables.push((name.to_string(), grid));
    }
}

pub fn render(mode: ViewMode, ctx: &ViewContext) -> Result<Rendered> {
    match mode {
        ViewMode::Landing => landing(ctx),
        ViewMode::TowerSummary => tower_view(ctx),
        ViewMode::FloorSummary => floor_view(ctx),
        ViewMode::ApartmentDetail => apartment_view(ctx),
        ViewMode::Section(s) => section_view(ctx, s),
        ViewMode::PhotoBrowser => photo_browser(ctx),
        ViewMode::Financial => financial_view(ctx),
        ViewMode::Documentation => documentation_view(ctx),
    }
}

fn kpis(t: &TowerProgress) -> DomainKpis {
    DomainKpis {
        i: t.i,
        l1: t.l1,
        l2: t.l2,
        project: t.project(),
    }
}

fn kpi_rows(t: &TowerProgress) -> Vec<TowerKpiRow> {
    let mut rows: Vec<TowerKpiRow> = TOWERS
        .iter()
        .map(|tower| TowerKpiRow {
            scope: format!("{} Tower", tower),
            progress: format_percent(t.get(tower)),
            band: progress_band(t.get(tower)).to_string(),
        })
        .collect();
    let project = t.project();
    rows.push(TowerKpiRow {
        scope: "Project".to_string(),
        progress: format_percent(project),
        band: progress_band(project).to_string(),
    });
    rows
}

fn scoped_towers(filters: &Filters) -> Vec<String> {
    match &filters.tower {
        Some(t) => vec![t.clone()],
        None => TOWERS.iter().map(|t| t.to_string()).collect(),
    }
}

fn first_photo(store: &dyn PhotoStore, key: &PhotoKey) -> Result<(Vec<PathBuf>, Option<PathBuf>)> {
    let files = store.list(key)?;
    let first = files.first().cloned();
    Ok((files, first))
}

fn photo_lines(out: &mut Rendered, key: &PhotoKey, files: &[PathBuf]) {
    if files.is_empty() {
        out.line(format!("\nNo photos for {}.", key));
        return;
    }
    out.line(format!("\nPhotos for {} ({}):", key, files.len()));
    for f in files {
        out.line(format!("  {}", f.display()));
    }
}

fn activity_headers(lead: &[&str], tail: &[&str]) -> Vec<String> {
    lead.iter()
        .chain(ACTIVITY_COLS.iter())
        .chain(tail.iter())
        .map(|s| s.to_string())
        .collect()
}

fn fraction_cells(activities: &[f64; 12]) -> impl Iterator<Item = String> + '_ {
    activities.iter().map(|v| format_percent(v * 100.0))
}

fn lcrg_grid(ctx: &ViewContext) -> Grid {
    let components: Vec<String> = ctx
        .snapshot
        .lcrg
        .first()
        .map(|r| r.components.iter().map(|(c, _)| c.clone()).collect())
        .unwrap_or_default();
    let mut headers = vec!["Tower".to_string(), "Area".to_string()];
    headers.extend(components);
    headers.push("Progress %".to_string());
    headers.push("Status".to_string());
    let mut grid = Grid::new(headers);
    for r in &ctx.snapshot.lcrg {
        let area = if r.is_lcrg() {
            format!(">> {}", r.area)
        } else {
            r.area.clone()
        };
        let mut row = vec![r.tower.clone(), area];
        row.extend(r.components.iter().map(|(_, v)| format_percent(*v)));
        row.push(format_percent(r.progress));
        row.push(progress_band(r.progress).to_string());
        grid.push(row);
    }
    grid
}

fn landing(ctx: &ViewContext) -> Result<Rendered> {
    let snap = ctx.snapshot;
    let mut out = Rendered::new(format!("{} - Project Progress", ctx.config.project_name));
    let landing = lcrg_landing(&snap.lcrg, ctx.config.boosts.lcrg_landing);
    out.line(format!("Report date: {}", report_date()));
    out.line(format!("LCRG Overall Progress: {}", format_percent(landing.overall)));
    out.table("LCRG Progress", lcrg_grid(ctx));

    let summary = project_summary(snap, ctx.config);
    let mut domains = Grid::new(vec![
        "Domain".to_string(),
        "I".to_string(),
        "L1".to_string(),
        "L2".to_string(),
        "Project".to_string(),
    ]);
    let rows = [
        ("Apartments", &summary.apartments),
        ("External Development", &summary.external_development),
        ("Rooftop", &summary.rooftop),
        ("Ground Floor", &summary.ground_floor),
        ("Common Area", &summary.common_area),
    ];
    for (name, k) in rows {
        domains.push(vec![
            name.to_string(),
            format_percent(k.i),
            format_percent(k.l1),
            format_percent(k.l2),
            format_percent(k.project),
        ]);
    }
    out.table("Progress by Domain", domains);
    out.line(format!(
        "\n{} apartments loaded, {} rows dropped, {} cells defaulted.",
        format_int(summary.apartments_loaded as u64),
        format_int(summary.rows_dropped as u64),
        format_int(summary.cells_defaulted as u64)
    ));
    Ok(out)
}

fn summary_grid(summary: &[TowerSummary]) -> Grid {
    let mut grid = Grid::new(activity_headers(&["Tower"], &["Overall %", "Status"]));
    for s in summary {
        let mut row = vec![s.tower.clone()];
        row.extend(fraction_cells(&s.activities));
        row.push(format_percent(s.overall));
        row.push(progress_band(s.overall).to_string());
        grid.push(row);
    }
    grid
}

fn tower_view(ctx: &ViewContext) -> Result<Rendered> {
    let mut out = Rendered::new("Tower Summary".to_string());
    let all = tower_summary(&ctx.snapshot.apartments, ctx.config.boosts.tower_summary);
    let shown: Vec<TowerSummary> = all
        .iter()
        .filter(|s| ctx.filters.tower.as_deref().map_or(true, |t| s.tower == t))
        .cloned()
        .collect();
    if shown.is_empty() {
        out.line("No apartment data for the selected tower.");
        return Ok(out);
    }
    let towers = apartment_tower_progress(&all);
    out.line(table_string(&kpi_rows(&towers), MAX_PREVIEW_ROWS));
    out.table("Tower Activity Summary", summary_grid(&shown));
    if let Some(first) = shown.first() {
        out.pdf = Some(tower_report(&ctx.style(), first)?);
    }
    Ok(out)
}

fn floor_view(ctx: &ViewContext) -> Result<Rendered> {
    let mut out = Rendered::new("Floor Summary".to_string());
    let floors = floor_summary(&ctx.snapshot.apartments, ctx.filters);
    if floors.is_empty() {
        out.line("No apartments match the current filters.");
        return Ok(out);
    }
    if let (Some(tower), Some(floor)) = (&ctx.filters.tower, ctx.filters.floor) {
        if let Some(f) = floors.first() {
            out.line(format!(
                "Floor {} Progress ({} Tower): {} [{}]",
                floor,
                tower,
                format_percent(f.overall),
                progress_band(f.overall)
            ));
        }
    } else if let Some(tower) = &ctx.filters.tower {
        for f in &floors {
            out.line(format!("{} - Floor {}: {}", tower, f.floor, format_percent(f.overall)));
        }
    }
    let mut grid = Grid::new(activity_headers(&["Tower", "Floor"], &["Overall %", "Status"]));
    for f in &floors {
        let mut row = vec![f.tower.clone(), f.floor.to_string()];
        row.extend(fraction_cells(&f.activities));
        row.push(format_percent(f.overall));
        row.push(progress_band(f.overall).to_string());
        grid.push(row);
    }
    out.table("Floor Overview", grid);
    Ok(out)
}

fn apartment_view(ctx: &ViewContext) -> Result<Rendered> {
    let mut out = Rendered::new("Apartment Detail".to_string());
    let Some(detail) = apartment_detail(
        &ctx.snapshot.apartments,
        ctx.filters,
        ctx.config.boosts.apartment_tower,
    ) else {
        out.line("No apartment matches the current filters.");
        return Ok(out);
    };
    let r = &detail.record;
    out.line(format!(
        "Apartment {} | Tower {} | Floor {}",
        r.apartment_no, r.tower, r.floor
    ));
    out.line(format!("Apartment Progress: {}", format_percent(detail.overall)));
    out.line(format!("Floor Progress: {}", format_percent(detail.floor_overall)));
    out.line(format!("Tower Progress: {}", format_percent(detail.tower_overall)));

    let rows: Vec<ActivityComparisonRow> = detail
        .activities
        .iter()
        .map(|a| ActivityComparisonRow {
            activity: a.activity.clone(),
            apartment: format_percent(a.apartment),
            floor: format_percent(a.floor),
            tower: format_percent(a.tower),
            band: progress_band(a.apartment).to_string(),
        })
        .collect();
    let mut grid = Grid::new(
        ["Activity", "Apt %", "Floor %", "Tower %", "Status"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    );
    for row in &rows {
        grid.push(vec![
            row.activity.clone(),
            row.apartment.clone(),
            row.floor.clone(),
            row.tower.clone(),
            row.band.clone(),
        ]);
    }
    out.line(format!("\nActivity Progress\n{}", table_string(&rows, MAX_PREVIEW_ROWS)));
    out.tables.push(("Activity Progress".to_string(), grid));

    let key_text = photo_key(&r.tower, r.apartment_no);
    let key = PhotoKey::Apartment(key_text.clone());
    let (files, first) = first_photo(ctx.store, &key)?;
    photo_lines(&mut out, &key, &files);
    out.pdf = Some(apartment_report(&ctx.style(), &key_text, &detail, first.as_deref())?);
    Ok(out)
}

fn section_view(ctx: &ViewContext, section: Section) -> Result<Rendered> {
    let mut out = Rendered::new(format!("{} Progress", section.title()));
    let Some(agg) = ctx.snapshot.section(section) else {
        out.line("No data for this section.");
        return Ok(out);
    };
    out.line(table_string(&kpi_rows(&agg.towers), MAX_PREVIEW_ROWS));

    let mut headers = vec!["Tower".to_string(), "Area".to_string()];
    headers.extend(agg.activities.iter().cloned());
    headers.push("Progress %".to_string());
    let mut grid = Grid::new(headers);
    let towers = scoped_towers(ctx.filters);
    for r in agg.rows.iter().filter(|r| towers.contains(&r.tower)) {
        let mut row = vec![r.tower.clone(), r.area.clone()];
        row.extend(r.activities.iter().map(|(_, v)| format_percent(*v)));
        row.push(format_percent(r.progress));
        grid.push(row);
    }
    if grid.is_empty() {
        out.line("No rows for the selected tower.");
    } else {
        out.table(&format!("{} Details", section.title()), grid);
    }

    // Photos and the PDF are per tower, so they need a tower selection.
    if let Some(tower) = ctx.filters.tower.as_deref() {
        let key = PhotoKey::section(section, tower);
        let (files, first) = first_photo(ctx.store, &key)?;
        photo_lines(&mut out, &key, &files);
        let progress = format_percent(agg.tower_value(tower));
        let table = WideTable::from_section(agg, tower);
        out.pdf = Some(section_report(
            &ctx.style(),
            section,
            tower,
            &progress,
            &table,
            first.as_deref(),
        )?);
    }
    Ok(out)
}

fn photo_browser(ctx: &ViewContext) -> Result<Rendered> {
    let mut out = Rendered::new("Photo Browser".to_string());
    let folders = browse_folders(ctx.store, ctx.filters.tower.as_deref())?;
    let rows: Vec<PhotoRow> = folders
        .iter()
        .flat_map(|(folder, files)| {
            files.iter().map(move |f| PhotoRow {
                folder: folder.clone(),
                file: f
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            })
        })
        .collect();
    out.line(format!(
        "{} folder(s), {} photo(s)",
        folders.len(),
        rows.len()
    ));
    let mut grid = Grid::new(vec!["Folder".to_string(), "File".to_string()]);
    for r in &rows {
        grid.push(vec![r.folder.clone(), r.file.clone()]);
    }
    out.line(table_string(&rows, MAX_PREVIEW_ROWS));
    out.tables.push(("Photos".to_string(), grid));
    Ok(out)
}

fn sheet_grid(table: &SheetTable) -> Grid {
    let columns: Vec<usize> = table.named_headers().map(|(i, _)| i).collect();
    let mut grid = Grid::new(columns.iter().map(|i| table.headers[*i].clone()).collect());
    let width = table.headers.len();
    for row in &table.rows {
        let cells = display_row(row, width);
        grid.push(columns.iter().map(|i| cells[*i].clone()).collect());
    }
    grid
}

fn financial_view(ctx: &ViewContext) -> Result<Rendered> {
    check_password(ctx.config, ctx.finance_password.unwrap_or(""))?;
    let mut out = Rendered::new("Financial (Cash Flow)".to_string());
    let sheets = load_cash_flow(&ctx.config.cash_flow_workbook, ctx.filters.tower.as_deref())?;
    if sheets.is_empty() {
        out.line("No cash-flow sheets for the selected tower.");
    }
    for sheet in &sheets {
        out.table(&sheet.name, sheet_grid(sheet));
    }
    Ok(out)
}

fn documentation_view(ctx: &ViewContext) -> Result<Rendered> {
    let mut out = Rendered::new("Site Documentation".to_string());
    let docs = load_site_documents(&ctx.config.site_docs_workbook)?;
    let mut status = Grid::new(vec!["IR Status".to_string(), "Count".to_string()]);
    for (label, count) in ir_status_counts(&docs) {
        status.push(vec![label, format_int(count as u64)]);
    }
    out.table("IR Status Summary", status);
    out.table("Documentation Register", sheet_grid(&docs));
    Ok(out)
}

/// Headline KPIs of every domain, as written to `summary.json`.
pub fn project_summary(snapshot: &Snapshot, config: &DashboardConfig) -> ProjectSummary {
    let towers = tower_summary(&snapshot.apartments, config.boosts.tower_summary);
    let section_kpis = |s: Section| {
        snapshot
            .section(s)
            .map(|agg| kpis(&agg.towers))
            .unwrap_or_else(|| kpis(&TowerProgress::default()))
    };
    ProjectSummary {
        generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        report_date: report_date(),
        lcrg_overall: lcrg_landing(&snapshot.lcrg, config.boosts.lcrg_landing).overall,
        apartments: kpis(&apartment_tower_progress(&towers)),
        external_development: section_kpis(Section::External),
        rooftop: section_kpis(Section::Rooftop),
        ground_floor: section_kpis(Section::GroundFloor),
        common_area: section_kpis(Section::CommonArea),
        apartments_loaded: snapshot.report.apartment_rows,
        rows_dropped: snapshot.report.dropped_rows,
        cells_defaulted: snapshot.cells_defaulted(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_distinct() {
        let mut labels: Vec<String> = ViewMode::ALL.iter().map(|m| m.label()).collect();
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), ViewMode::ALL.len());
    }

    #[test]
    fn kpi_rows_end_with_project() {
        let t = TowerProgress {
            i: 50.0,
            l1: 20.0,
            l2: 80.0,
        };
        let rows = kpi_rows(&t);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[3].scope, "Project");
        assert_eq!(rows[3].progress, "50.00%");
        assert_eq!(rows[1].band, "Low");
        assert_eq!(rows[2].band, "High");
    }
}
