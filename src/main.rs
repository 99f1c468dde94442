// Entry point and interactive console flow.
//
// - Option [1] loads (or reloads) the progress workbook into a snapshot.
// - Option [2] sets the tower/floor/apartment filters and activity search.
// - Option [3] renders one view, with optional CSV and PDF export.
// - Option [4] uploads photos for an apartment or a section.
// - Option [5] writes summary.json with the headline KPIs.
use lcrg_progress::config::{DashboardConfig, CONFIG_FILE};
use lcrg_progress::output;
use lcrg_progress::photos::{init_photo_folders, save_photos, LocalPhotoStore, PhotoKey, Upload};
use lcrg_progress::snapshot::Snapshot;
use lcrg_progress::types::{Filters, Section};
use lcrg_progress::util::format_int;
use lcrg_progress::views::{project_summary, render, ViewContext, ViewMode};
use log::{info, warn};
use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

// The loaded workbook is kept for the whole session; only [1] replaces it.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| {
    Mutex::new(AppState {
        snapshot: None,
        filters: Filters::default(),
        finance_password: None,
    })
});

struct AppState {
    snapshot: Option<Arc<Snapshot>>,
    filters: Filters,
    finance_password: Option<String>,
}

fn state() -> MutexGuard<'static, AppState> {
    APP_STATE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

fn read_choice() -> String {
    read_line("Enter choice: ")
}

/// Ask a Y/N question until the answer is one of the two.
fn prompt_yes_no(question: &str) -> bool {
    loop {
        let resp = read_line(&format!("{} (Y/N): ", question)).to_uppercase();
        match resp.as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Empty input means "All".
fn read_optional(prompt: &str) -> Option<String> {
    let s = read_line(prompt);
    if s.is_empty() || s.eq_ignore_ascii_case("all") {
        None
    } else {
        Some(s)
    }
}

fn slug(s: &str) -> String {
    let mut out = String::new();
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

fn current_snapshot() -> Option<Arc<Snapshot>> {
    state().snapshot.clone()
}

/// Handle option [1]: build a fresh snapshot and swap it in.
///
/// A fatal load error leaves the previous snapshot (if any) untouched.
fn handle_load(config: &DashboardConfig) {
    match Snapshot::load(config) {
        Ok(snapshot) => {
            let r = &snapshot.report;
            println!(
                "Loaded {} apartments ({} rows dropped, {} cells defaulted).",
                format_int(r.apartment_rows as u64),
                format_int(r.dropped_rows as u64),
                format_int(snapshot.cells_defaulted() as u64)
            );
            if !r.rescaled_columns.is_empty() {
                println!("Info: rescaled from 0-100 to fractions: {}", r.rescaled_columns.join(", "));
            }
            if !r.missing_activity_columns.is_empty() {
                println!(
                    "Note: missing activity columns treated as 0: {}",
                    r.missing_activity_columns.join(", ")
                );
            }
            println!();
            state().snapshot = Some(Arc::new(snapshot));
        }
        Err(e) if e.is_fatal_load() => {
            eprintln!("Failed to load workbook: {}\n", e);
        }
        Err(e) => {
            eprintln!("Error while loading: {}\n", e);
        }
    }
}

/// Handle option [2]: edit the filters in place.
fn handle_filters() {
    let snapshot = current_snapshot();
    if let Some(s) = &snapshot {
        println!("Towers: {}", s.towers().join(", "));
    }
    let mut filters = Filters {
        tower: read_optional("Tower (blank = All): "),
        ..Filters::default()
    };
    if let Some(s) = &snapshot {
        let floors: Vec<String> = s
            .floors(filters.tower.as_deref())
            .iter()
            .map(|f| f.to_string())
            .collect();
        println!("Floors: {}", floors.join(", "));
    }
    filters.floor = read_optional("Floor (blank = All): ").and_then(|f| f.parse().ok());
    if let Some(s) = &snapshot {
        let apts: Vec<String> = s
            .apartment_numbers(filters.tower.as_deref(), filters.floor)
            .iter()
            .map(|a| a.to_string())
            .collect();
        println!("Apartments: {}", apts.join(", "));
    }
    filters.apartment = read_optional("Apartment No (blank = All): ").and_then(|a| a.parse().ok());
    filters.activity = read_optional("Activity search (blank = none): ");
    println!("Filters set: {:?}\n", filters);
    state().filters = filters;
}

fn choose_view() -> Option<ViewMode> {
    println!("Select view:");
    for (i, mode) in ViewMode::ALL.iter().enumerate() {
        println!("[{}] {}", i + 1, mode.label());
    }
    let choice = read_choice();
    match choice.parse::<usize>() {
        Ok(n) if n >= 1 && n <= ViewMode::ALL.len() => Some(ViewMode::ALL[n - 1]),
        _ => {
            println!("Invalid choice.\n");
            None
        }
    }
}

/// Handle option [3]: render a view and offer its exports.
fn handle_view(config: &DashboardConfig, store: &LocalPhotoStore) {
    let Some(snapshot) = current_snapshot() else {
        println!("Error: No data loaded. Please load the workbook first (option 1).\n");
        return;
    };
    let Some(mode) = choose_view() else { return };

    if mode == ViewMode::Financial && state().finance_password.is_none() {
        let pw = read_line("Finance password: ");
        state().finance_password = Some(pw);
    }
    let (filters, password) = {
        let st = state();
        (st.filters.clone(), st.finance_password.clone())
    };
    let ctx = ViewContext {
        snapshot: &snapshot,
        config,
        store,
        filters: &filters,
        finance_password: password.as_deref(),
    };
    let rendered = match render(mode, &ctx) {
        Ok(r) => r,
        Err(e) => {
            if mode == ViewMode::Financial {
                // Let the user try again next time.
                state().finance_password = None;
            }
            eprintln!("{}\n", e);
            return;
        }
    };

    println!("\n{}\n", rendered.title);
    println!("{}", rendered.body);

    if !rendered.tables.is_empty() && prompt_yes_no("Export tables to CSV") {
        for (name, grid) in &rendered.tables {
            let file = format!("{}_{}.csv", slug(&rendered.title), slug(name));
            let path = config.output_dir.join(file);
            match output::write_grid_csv(&path, grid) {
                Ok(()) => println!("(Exported to {})", path.display()),
                Err(e) => eprintln!("Write error: {}", e),
            }
        }
    }
    if let Some(pdf) = &rendered.pdf {
        if prompt_yes_no(&format!("Save {}", pdf.file_name)) {
            match output::write_pdf(&config.output_dir, pdf) {
                Ok(path) => println!("(Saved {} page(s) to {})", pdf.pages, path.display()),
                Err(e) => eprintln!("Write error: {}", e),
            }
        }
    }
    println!();
}

fn upload_target() -> Option<PhotoKey> {
    println!("Upload photos for:");
    println!("[1] Apartment");
    for (i, s) in Section::ALL.iter().enumerate() {
        println!("[{}] {}", i + 2, s.title());
    }
    let choice = read_choice();
    let tower = read_line("Tower: ");
    if tower.is_empty() {
        println!("A tower is required.\n");
        return None;
    }
    match choice.parse::<usize>() {
        Ok(1) => {
            let apt = read_line("Apartment No: ");
            if apt.is_empty() {
                println!("An apartment number is required.\n");
                return None;
            }
            Some(PhotoKey::apartment(&tower, apt))
        }
        Ok(n) if n >= 2 && n < 2 + Section::ALL.len() => {
            Some(PhotoKey::section(Section::ALL[n - 2], &tower))
        }
        _ => {
            println!("Invalid choice.\n");
            None
        }
    }
}

/// Handle option [4]: store images (or zips of images) from local paths.
fn handle_upload(store: &LocalPhotoStore) {
    let Some(key) = upload_target() else { return };
    let raw = read_line("File paths (comma separated): ");
    let mut uploads = Vec::new();
    for p in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match Upload::from_path(Path::new(p)) {
            Ok(u) => uploads.push(u),
            Err(e) => eprintln!("Cannot read {}: {}", p, e),
        }
    }
    if uploads.is_empty() {
        println!("Nothing to upload.\n");
        return;
    }
    let report = save_photos(store, &key, &uploads);
    println!(
        "Saved {} photo(s) to {}; skipped {}.",
        report.saved.len(),
        key,
        report.skipped.len()
    );
    for s in &report.skipped {
        println!("  skipped {}: {:?}", s.name, s.reason);
    }
    println!();
}

/// Handle option [5]: headline KPIs to summary.json.
fn handle_summary(config: &DashboardConfig) {
    let Some(snapshot) = current_snapshot() else {
        println!("Error: No data loaded. Please load the workbook first (option 1).\n");
        return;
    };
    let summary = project_summary(&snapshot, config);
    let path: PathBuf = config.output_dir.join("summary.json");
    if let Err(e) = output::write_json(&path, &summary) {
        eprintln!("Write error: {}", e);
        return;
    }
    println!("Summary Stats ({}):", path.display());
    println!(
        "{{\"lcrg_overall\": {:.2}, \"apartments_project\": {:.2}, \"report_date\": \"{}\"}}\n",
        summary.lcrg_overall, summary.apartments.project, summary.report_date
    );
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match DashboardConfig::load(Path::new(CONFIG_FILE)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Invalid {}: {}", CONFIG_FILE, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = init_photo_folders(&config.photo_dir) {
        warn!("Cannot prepare photo folders under {}: {}", config.photo_dir.display(), e);
    }
    let store = LocalPhotoStore::new(config.photo_dir.clone());
    info!("Photo root: {}", store.root().display());

    loop {
        println!("{} Progress Dashboard", config.project_name);
        println!("[1] Load / reload workbook");
        println!("[2] Set filters");
        println!("[3] Show a view");
        println!("[4] Upload photos");
        println!("[5] Export summary.json");
        println!("[0] Exit\n");
        match read_choice().as_str() {
            "1" => handle_load(&config),
            "2" => handle_filters(),
            "3" => handle_view(&config, &store),
            "4" => handle_upload(&store),
            "5" => handle_summary(&config),
            "0" => {
                println!("Exiting the program.");
                break;
            }
            _ => println!("Invalid choice. Please enter 0-5.\n"),
        }
    }
}
