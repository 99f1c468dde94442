use image::{ImageOutputFormat, Rgb, RgbImage};
use lcrg_progress::photos::{
    browse_folders, init_photo_folders, save_photos, LocalPhotoStore, PhotoKey, PhotoStore,
    SkipReason, Upload,
};
use lcrg_progress::types::Section;
use std::io::{Cursor, Write};

fn encoded(format: ImageOutputFormat) -> Vec<u8> {
    let img = RgbImage::from_pixel(8, 6, Rgb([200, 120, 40]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

fn jpeg() -> Vec<u8> {
    encoded(ImageOutputFormat::Jpeg(80))
}

fn png() -> Vec<u8> {
    encoded(ImageOutputFormat::Png)
}

fn truncated_jpeg() -> Vec<u8> {
    jpeg()[..20].to_vec()
}

fn zip_of(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut w = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let opts = zip::write::FileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);
    for (name, bytes) in entries {
        w.start_file(*name, opts).unwrap();
        w.write_all(bytes).unwrap();
    }
    w.finish().unwrap().into_inner()
}

fn file_names(files: &[std::path::PathBuf]) -> Vec<String> {
    files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn zip_with_one_corrupt_entry_extracts_one_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("I-101.zip"),
        zip_of(&[("101_a.jpg", jpeg()), ("101_b.jpg", truncated_jpeg()), ("notes.txt", b"x".to_vec())]),
    )
    .unwrap();
    let store = LocalPhotoStore::new(dir.path());
    let key = PhotoKey::apartment("I Tower", 101.0);

    let files = store.list(&key).unwrap();
    assert_eq!(file_names(&files), vec!["101_a.jpg".to_string()]);
    assert!(dir.path().join("I-101").join("101_a.jpg").is_file());
    assert!(!dir.path().join("I-101").join("101_b.jpg").exists());
}

#[test]
fn existing_images_skip_archive_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalPhotoStore::new(dir.path());
    let key = PhotoKey::apartment("L1", 5);
    assert!(store.put(&key, "z_front.png", &png()).unwrap());
    std::fs::write(dir.path().join("L1-5 extra.zip"), zip_of(&[("a_back.jpg", jpeg())])).unwrap();

    let files = store.list(&key).unwrap();
    assert_eq!(file_names(&files), vec!["z_front.png".to_string()]);
}

#[test]
fn uploads_report_every_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalPhotoStore::new(dir.path());
    let key = PhotoKey::section(Section::Rooftop, "L2");
    let uploads = vec![
        Upload { name: "b.png".into(), bytes: png() },
        Upload { name: "a.jpg".into(), bytes: truncated_jpeg() },
        Upload { name: "plan.pdf".into(), bytes: b"%PDF".to_vec() },
        Upload {
            name: "batch.zip".into(),
            bytes: zip_of(&[("site/c.jpeg", jpeg())]),
        },
        Upload { name: "broken.zip".into(), bytes: b"not a zip".to_vec() },
    ];
    let report = save_photos(&store, &key, &uploads);

    assert_eq!(report.saved, vec!["b.png".to_string(), "site/c.jpeg".to_string()]);
    let reasons: Vec<(&str, &SkipReason)> =
        report.skipped.iter().map(|s| (s.name.as_str(), &s.reason)).collect();
    assert_eq!(reasons.len(), 3);
    assert_eq!(reasons[0], ("a.jpg", &SkipReason::Undecodable));
    assert_eq!(reasons[1], ("plan.pdf", &SkipReason::UnsupportedType));
    assert!(matches!(reasons[2], ("broken.zip", SkipReason::BrokenArchive(_))));

    let stored = store.list(&key).unwrap();
    assert_eq!(file_names(&stored), vec!["b.png".to_string(), "c.jpeg".to_string()]);
    assert!(dir.path().join("Rooftop").join("L2").join("c.jpeg").is_file());
}

#[test]
fn same_name_upload_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalPhotoStore::new(dir.path());
    let key = PhotoKey::apartment("I", 7);
    let first = [Upload { name: "x.jpg".into(), bytes: jpeg() }];
    save_photos(&store, &key, &first);
    save_photos(&store, &key, &first);
    assert_eq!(store.list(&key).unwrap().len(), 1);
}

#[test]
fn browser_lists_apartment_folders_only() {
    let dir = tempfile::tempdir().unwrap();
    init_photo_folders(dir.path()).unwrap();
    assert!(dir.path().join("GroundFloor").join("L1").is_dir());

    let store = LocalPhotoStore::new(dir.path());
    store.put(&PhotoKey::apartment("I", 101), "a.png", &png()).unwrap();
    store.put(&PhotoKey::apartment("L1", 202), "b.png", &png()).unwrap();

    let all = browse_folders(&store, None).unwrap();
    let names: Vec<&str> = all.iter().map(|(f, _)| f.as_str()).collect();
    assert_eq!(names, vec!["I-101", "L1-202"]);

    let l1 = browse_folders(&store, Some("L1")).unwrap();
    assert_eq!(l1.len(), 1);
    assert_eq!(l1[0].1.len(), 1);
}

#[test]
fn browsing_does_not_extract_archives() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("I-102")).unwrap();
    std::fs::write(dir.path().join("I-102.zip"), zip_of(&[("102_a.jpg", jpeg())])).unwrap();
    let store = LocalPhotoStore::new(dir.path());

    let all = browse_folders(&store, None).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].0, "I-102");
    assert!(all[0].1.is_empty());
    assert!(!dir.path().join("I-102").join("102_a.jpg").exists());

    // Opening the apartment itself still seeds the folder.
    let files = store.list(&PhotoKey::apartment("I", 102)).unwrap();
    assert_eq!(file_names(&files), vec!["102_a.jpg".to_string()]);
}
