//! Stimulus preloading against a scratch experiment directory.

use std::fs;
use std::path::{Path, PathBuf};
use stim_trigger::error::AppResult;
use stim_trigger::stimuli::{
    assign_by_name, assign_by_trial, folder_list, preload_dir, preload_folder,
    preload_trial_images, preload_unique_images, FolderQuery, ImageComponent, ImageLoader,
    TrialTable,
};
use stim_trigger::StimError;
use tempfile::TempDir;

/// Loader that records what it was asked to decode.
#[derive(Default)]
struct NameLoader {
    loaded: Vec<PathBuf>,
}

impl ImageLoader for NameLoader {
    type Handle = String;

    fn load(&mut self, path: &Path) -> AppResult<String> {
        self.loaded.push(path.to_path_buf());
        Ok(path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default())
    }
}

#[derive(Default)]
struct Screen {
    showing: Option<PathBuf>,
}

impl ImageComponent for Screen {
    fn set_image(&mut self, source: Option<&Path>) {
        self.showing = source.map(Path::to_path_buf);
    }
}

fn touch(path: PathBuf) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"").unwrap();
}

fn experiment() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    for name in ["f01.png", "f02.png", "id03_f03.png", "notes.txt"] {
        touch(root.join("STIMULI/faces").join(name));
    }
    for name in ["h01.png", "h02.PNG"] {
        touch(root.join("STIMULI/houses").join(name));
    }
    touch(root.join("top.png"));
    fs::write(
        root.join("trials.csv"),
        "face,house,code\nf02.png,h01.png,1\nf01.png,,2\nf02.png,h01.png,3\n",
    )
    .unwrap();
    dir
}

fn names(images: &[stim_trigger::stimuli::PreloadedImage<String>]) -> Vec<&str> {
    images.iter().map(|i| i.handle.as_str()).collect()
}

#[test]
fn test_preload_folders_with_exclusions() {
    let dir = experiment();
    let mut loader = NameLoader::default();
    let folders = folder_list(&["faces houses", "faces"]);
    let query = FolderQuery::new(dir.path(), "png")
        .sub_folder("STIMULI")
        .folders(folders)
        .exclude(["id03"]);

    let images = preload_folder(&mut loader, &query).unwrap();
    // extensions match case-sensitively, so h02.PNG stays out
    assert_eq!(names(&images), vec!["f01.png", "f02.png", "h01.png"]);
    assert_eq!(loader.loaded.len(), 3);
}

#[test]
fn test_preload_dir_is_not_recursive() {
    let dir = experiment();
    let mut loader = NameLoader::default();
    let images = preload_dir(&mut loader, dir.path(), ".png").unwrap();
    assert_eq!(names(&images), vec!["top.png"]);
}

#[test]
fn test_missing_folder_is_skipped() {
    let dir = experiment();
    let mut loader = NameLoader::default();
    let query = FolderQuery::new(dir.path(), "png").folders(["nowhere"]);
    assert!(preload_folder(&mut loader, &query).unwrap().is_empty());
}

#[test]
fn test_empty_file_type_is_rejected() {
    let dir = experiment();
    let mut loader = NameLoader::default();
    let err = preload_dir(&mut loader, dir.path(), "").unwrap_err();
    assert!(matches!(err, StimError::Stimulus(_)));
}

#[test]
fn test_unique_images_follow_presentation_order() {
    let dir = experiment();
    let table = TrialTable::from_path(dir.path().join("trials.csv")).unwrap();
    let mut loader = NameLoader::default();

    let faces = preload_unique_images(
        &mut loader,
        &table,
        &["face"],
        dir.path(),
        "STIMULI/faces",
    )
    .unwrap();
    assert_eq!(names(&faces), vec!["f02.png", "f01.png"]);

    let mut screen = Screen::default();
    assert_eq!(assign_by_name(&faces, Some("f01.png"), &mut screen), Some(1));
    assert_eq!(
        screen.showing,
        Some(dir.path().join("STIMULI/faces/f01.png"))
    );
}

#[test]
fn test_unique_images_skip_missing_files() {
    let dir = experiment();
    let table = TrialTable::from_path(dir.path().join("trials.csv")).unwrap();
    let mut loader = NameLoader::default();

    // houses live in their own folder, so nothing resolves under faces
    let images = preload_unique_images(
        &mut loader,
        &table,
        &["house"],
        dir.path(),
        "STIMULI/faces",
    )
    .unwrap();
    assert!(images.is_empty());
}

#[test]
fn test_trial_images_keep_duplicates() {
    let dir = experiment();
    let table = TrialTable::from_path(dir.path().join("trials.csv"))
        .unwrap()
        .with_sequence(vec![2, 0, 1])
        .unwrap();
    let base = dir.path().join("STIMULI/houses");
    let mut loader = NameLoader::default();

    let images = preload_trial_images(&mut loader, &table, "house", &base).unwrap();
    assert_eq!(images.len(), 3);
    assert_eq!(loader.loaded.len(), 2);

    let mut screen = Screen::default();
    assert_eq!(assign_by_trial(&images, 1, &mut screen), Some(1));
    assert_eq!(screen.showing, Some(base.join("h01.png")));
    assert_eq!(assign_by_trial(&images, 3, &mut screen), None);
}

#[test]
fn test_trial_images_stay_aligned_after_gaps() {
    let dir = experiment();
    fs::write(
        dir.path().join("gaps.csv"),
        "img,code\n,0\nf01.png,1\nlost.png,2\nf02.png,3\n",
    )
    .unwrap();
    let table = TrialTable::from_path(dir.path().join("gaps.csv")).unwrap();
    let base = dir.path().join("STIMULI/faces");
    let mut loader = NameLoader::default();

    let images = preload_trial_images(&mut loader, &table, "img", &base).unwrap();
    let handles: Vec<Option<&str>> = images
        .iter()
        .map(|slot| slot.as_ref().map(|img| img.handle.as_str()))
        .collect();
    assert_eq!(handles, vec![None, Some("f01.png"), None, Some("f02.png")]);

    let mut screen = Screen::default();
    assert_eq!(assign_by_trial(&images, 1, &mut screen), Some(1));
    assert_eq!(screen.showing, Some(base.join("f01.png")));

    // a missing file clears the screen rather than showing the next trial
    assert_eq!(assign_by_trial(&images, 2, &mut screen), None);
    assert_eq!(screen.showing, None);

    assert_eq!(assign_by_trial(&images, 3, &mut screen), Some(3));
    assert_eq!(screen.showing, Some(base.join("f02.png")));
}

#[test]
fn test_unknown_column_is_an_error() {
    let dir = experiment();
    let table = TrialTable::from_path(dir.path().join("trials.csv")).unwrap();
    let mut loader = NameLoader::default();
    let err = preload_trial_images(&mut loader, &table, "scene", dir.path()).unwrap_err();
    assert!(matches!(err, StimError::Stimulus(_)));
    assert!(loader.loaded.is_empty());
}
