// Photo storage.
//
// Photos live in plain directories under one root: `{root}/{I-101}/` for an
// apartment and `{root}/{Section}/{Tower}/` for a section. Apartment folders
// can also be seeded lazily from `{key}*.zip` archives dropped into the root.
//
// Every image goes through a decode/re-encode round trip, which is how corrupt
// files get filtered out. Individual failures are reported, never raised.
// There is no locking: two writers on the same key race and the last one wins.
use crate::error::Result;
use crate::types::Section;
use image::{DynamicImage, ImageOutputFormat};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::fs;
use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};

static TOWER_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s-]+").expect("static regex"));

/// Largest archive entry that will be read into memory.
pub const MAX_ENTRY_BYTES: u64 = 64 * 1024 * 1024;

pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Top-level folders created by `init_photo_folders`; not apartment folders.
pub const SECTION_FOLDERS: [&str; 7] = [
    "Apartment",
    "Tower",
    "Floor",
    "Rooftop",
    "GroundFloor",
    "CommonArea",
    "External",
];

fn extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

pub fn is_image_name(name: &str) -> bool {
    extension(name).map_or(false, |e| IMAGE_EXTENSIONS.contains(&e.as_str()))
}

pub fn is_zip_name(name: &str) -> bool {
    extension(name).as_deref() == Some("zip")
}

/// Derive the apartment photo key, e.g. `("I Tower", 101.0)` -> `"I-101"`.
///
/// The prefix is the first whitespace/hyphen-delimited token of the tower.
/// Numeric apartment ids are written as integers; anything else is kept as
/// trimmed text (`"5B"`).
pub fn photo_key<A: fmt::Display>(tower: &str, apartment: A) -> String {
    let tower = tower.trim();
    let prefix = TOWER_SPLIT.split(tower).next().unwrap_or("");
    let raw = apartment.to_string();
    let apt = match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => format!("{}", v.trunc() as i64),
        _ => raw.trim().to_string(),
    };
    format!("{}-{}", prefix, apt)
}

/// Identifies one photo folder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PhotoKey {
    Apartment(String),
    Section { section: Section, tower: String },
}

impl PhotoKey {
    pub fn apartment<A: fmt::Display>(tower: &str, apartment: A) -> Self {
        PhotoKey::Apartment(photo_key(tower, apartment))
    }

    pub fn section(section: Section, tower: &str) -> Self {
        PhotoKey::Section {
            section,
            tower: tower.trim().to_string(),
        }
    }

    pub fn relative_path(&self) -> PathBuf {
        match self {
            PhotoKey::Apartment(key) => PathBuf::from(key),
            PhotoKey::Section { section, tower } => Path::new(section.dir_name()).join(tower),
        }
    }
}

impl fmt::Display for PhotoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhotoKey::Apartment(key) => f.write_str(key),
            PhotoKey::Section { section, tower } => write!(f, "{}/{}", section.dir_name(), tower),
        }
    }
}

/// Blob-store view of the photo folders.
pub trait PhotoStore {
    /// Decode and store one image under `key`. `Ok(false)` means the bytes
    /// were not a decodable image and nothing was written.
    fn put(&self, key: &PhotoKey, name: &str, bytes: &[u8]) -> Result<bool>;

    /// Image files for `key`, sorted by file name.
    fn list(&self, key: &PhotoKey) -> Result<Vec<PathBuf>>;

    /// Image files already stored for `key`. Never extracts or creates anything.
    fn stored(&self, key: &PhotoKey) -> Result<Vec<PathBuf>>;

    /// Folder for `key`, seeding it from an archive first when that applies.
    fn resolve(&self, key: &PhotoKey) -> Result<PathBuf>;

    /// Apartment folder names under the root, sorted.
    fn folders(&self) -> Result<Vec<String>>;
}

/// Re-encode an image into `dir/name`, choosing the format from the extension.
fn store_image(dir: &Path, name: &str, bytes: &[u8]) -> Result<bool> {
    let Some(file_name) = Path::new(name).file_name().and_then(|f| f.to_str()) else {
        return Ok(false);
    };
    let img = match image::load_from_memory(bytes) {
        Ok(img) => img,
        Err(e) => {
            debug!("Skipping {}: {}", file_name, e);
            return Ok(false);
        }
    };
    let (img, format) = match extension(file_name).as_deref() {
        Some("png") => (img, ImageOutputFormat::Png),
        // JPEG has no alpha channel.
        _ => (DynamicImage::ImageRgb8(img.to_rgb8()), ImageOutputFormat::Jpeg(90)),
    };
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format)?;
    fs::create_dir_all(dir)?;
    fs::write(dir.join(file_name), buf.into_inner())?;
    Ok(true)
}

fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| p.file_name().and_then(|f| f.to_str()).map_or(false, is_image_name))
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Local-disk photo store rooted at one directory.
#[derive(Debug, Clone)]
pub struct LocalPhotoStore {
    root: PathBuf,
}

impl LocalPhotoStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir_for(&self, key: &PhotoKey) -> PathBuf {
        self.root.join(key.relative_path())
    }

    /// First archive in the root (by name) whose file name starts with `key`.
    fn archive_for(&self, key: &str) -> Option<PathBuf> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cannot scan photo root {}: {}", self.root.display(), e);
                return None;
            }
        };
        let mut zips: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|f| f.to_str())
                    .map_or(false, |f| is_zip_name(f) && f.starts_with(key))
            })
            .collect();
        zips.sort();
        zips.into_iter().next()
    }
}

impl PhotoStore for LocalPhotoStore {
    fn put(&self, key: &PhotoKey, name: &str, bytes: &[u8]) -> Result<bool> {
        store_image(&self.dir_for(key), name, bytes)
    }

    fn list(&self, key: &PhotoKey) -> Result<Vec<PathBuf>> {
        let dir = self.resolve(key)?;
        list_images(&dir)
    }

    fn stored(&self, key: &PhotoKey) -> Result<Vec<PathBuf>> {
        list_images(&self.dir_for(key))
    }

    fn resolve(&self, key: &PhotoKey) -> Result<PathBuf> {
        let dir = self.dir_for(key);
        let apt_key = match key {
            PhotoKey::Section { .. } => {
                fs::create_dir_all(&dir)?;
                return Ok(dir);
            }
            PhotoKey::Apartment(k) => k,
        };
        if !list_images(&dir)?.is_empty() {
            return Ok(dir);
        }
        let Some(archive) = self.archive_for(apt_key) else {
            return Ok(dir);
        };
        match fs::File::open(&archive) {
            Ok(file) => match extract_archive(file, |name, bytes| store_image(&dir, name, bytes)) {
                Ok(report) => info!(
                    "Extracted {} photo(s) for {} from {} ({} skipped)",
                    report.saved.len(),
                    apt_key,
                    archive.display(),
                    report.skipped.len()
                ),
                Err(e) => warn!("Cannot read {}: {}", archive.display(), e),
            },
            Err(e) => warn!("Cannot open {}: {}", archive.display(), e),
        }
        Ok(dir)
    }

    fn folders(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut dirs: Vec<String> = fs::read_dir(&self.root)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .filter(|d| !SECTION_FOLDERS.contains(&d.as_str()))
            .collect();
        dirs.sort();
        Ok(dirs)
    }
}

/// Why an uploaded file (or archive entry) was not stored.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    Undecodable,
    UnsupportedType,
    BrokenArchive(String),
    TooLarge,
    Io(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Skipped {
    pub name: String,
    pub reason: SkipReason,
}

/// Per-file outcome of an upload or extraction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveReport {
    pub saved: Vec<String>,
    pub skipped: Vec<Skipped>,
}

impl SaveReport {
    fn skip(&mut self, name: &str, reason: SkipReason) {
        warn!("Skipped {}: {:?}", name, reason);
        self.skipped.push(Skipped {
            name: name.to_string(),
            reason,
        });
    }

    fn record(&mut self, name: &str, outcome: Result<bool>) {
        match outcome {
            Ok(true) => self.saved.push(name.to_string()),
            Ok(false) => self.skip(name, SkipReason::Undecodable),
            Err(e) => self.skip(name, SkipReason::Io(e.to_string())),
        }
    }

    fn merge(&mut self, other: SaveReport) {
        self.saved.extend(other.saved);
        self.skipped.extend(other.skipped);
    }
}

/// Read at most `limit` bytes; `None` when the source holds more.
///
/// The declared size of an archive entry is not trusted, so the buffer
/// grows with what is actually read.
fn read_capped<R: Read>(reader: R, limit: u64) -> std::io::Result<Option<Vec<u8>>> {
    let mut bytes = Vec::new();
    reader.take(limit + 1).read_to_end(&mut bytes)?;
    if bytes.len() as u64 > limit {
        return Ok(None);
    }
    Ok(Some(bytes))
}

/// Feed every image entry of a zip archive to `store`.
fn extract_archive<R, F>(reader: R, mut store: F) -> Result<SaveReport>
where
    R: Read + Seek,
    F: FnMut(&str, &[u8]) -> Result<bool>,
{
    let mut archive = zip::ZipArchive::new(reader)?;
    let mut report = SaveReport::default();
    for i in 0..archive.len() {
        let mut entry = match archive.by_index(i) {
            Ok(entry) => entry,
            Err(e) => {
                report.skip(&format!("entry #{}", i), SkipReason::BrokenArchive(e.to_string()));
                continue;
            }
        };
        let name = entry.name().to_string();
        if entry.is_dir() || !is_image_name(&name) {
            continue;
        }
        let bytes = match read_capped(&mut entry, MAX_ENTRY_BYTES) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                report.skip(&name, SkipReason::TooLarge);
                continue;
            }
            Err(e) => {
                report.skip(&name, SkipReason::BrokenArchive(e.to_string()));
                continue;
            }
        };
        let outcome = store(&name, &bytes);
        report.record(&name, outcome);
    }
    Ok(report)
}

/// One uploaded file: its original name and contents.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn from_path(path: &Path) -> Result<Self> {
        Ok(Self {
            name: path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default(),
            bytes: fs::read(path)?,
        })
    }
}

/// Store a batch of uploads (images or zips of images) under one key.
///
/// The batch never fails as a whole; the report says what was kept.
pub fn save_photos(store: &dyn PhotoStore, key: &PhotoKey, uploads: &[Upload]) -> SaveReport {
    let mut report = SaveReport::default();
    for upload in uploads {
        if is_zip_name(&upload.name) {
            let extracted = extract_archive(Cursor::new(upload.bytes.as_slice()), |name, bytes| {
                store.put(key, name, bytes)
            });
            match extracted {
                Ok(r) => report.merge(r),
                Err(e) => report.skip(&upload.name, SkipReason::BrokenArchive(e.to_string())),
            }
        } else if is_image_name(&upload.name) {
            report.record(&upload.name, store.put(key, &upload.name, &upload.bytes));
        } else {
            report.skip(&upload.name, SkipReason::UnsupportedType);
        }
    }
    info!(
        "Upload to {}: {} saved, {} skipped",
        key,
        report.saved.len(),
        report.skipped.len()
    );
    report
}

/// Create the section folder skeleton under the photo root.
pub fn init_photo_folders(root: &Path) -> Result<()> {
    for folder in SECTION_FOLDERS {
        let base = root.join(folder);
        fs::create_dir_all(&base)?;
        if matches!(folder, "Apartment" | "Floor") {
            continue;
        }
        for tower in crate::weights::TOWERS {
            fs::create_dir_all(base.join(tower))?;
        }
    }
    Ok(())
}

/// Apartment folders with their images, optionally limited to one tower prefix.
pub fn browse_folders(
    store: &dyn PhotoStore,
    tower: Option<&str>,
) -> Result<Vec<(String, Vec<PathBuf>)>> {
    let mut out = Vec::new();
    for folder in store.folders()? {
        if let Some(t) = tower {
            if !folder.starts_with(t) {
                continue;
            }
        }
        let files = store.stored(&PhotoKey::Apartment(folder.clone()))?;
        out.push((folder, files));
    }
    Ok(out)
}
