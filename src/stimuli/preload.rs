//! Image discovery and preloading.

use super::trials::TrialTable;
use crate::error::{AppResult, StimError};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Turns an image file into whatever the presentation toolkit draws.
///
/// Implementations typically hold the window the images belong to.
pub trait ImageLoader {
    /// Loaded image handle.
    type Handle;

    /// Decode the image at `path`.
    fn load(&mut self, path: &Path) -> AppResult<Self::Handle>;
}

/// A loaded image and the file it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct PreloadedImage<H> {
    /// Toolkit handle
    pub handle: H,
    /// Source file
    pub source: PathBuf,
}

/// Per-trial images; `None` marks a trial with no image to show.
pub type TrialImages<H> = Vec<Option<PreloadedImage<H>>>;

/// Which files `preload_folder` picks up.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FolderQuery {
    /// Directory everything is resolved against
    pub base_dir: PathBuf,
    /// File extension without the dot, e.g. `png`
    pub file_type: String,
    /// Stimulus folders; `None` scans `base_dir` (or `sub_folder`) itself
    pub folders: Option<Vec<String>>,
    /// File-name prefixes to leave out
    pub exclude: Option<Vec<String>>,
    /// Folder between `base_dir` and `folders`
    pub sub_folder: Option<String>,
}

impl FolderQuery {
    /// Every `file_type` file directly in `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>, file_type: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            file_type: file_type.into(),
            ..Self::default()
        }
    }

    /// Restrict to these folders.
    pub fn folders<I, S>(mut self, folders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.folders = Some(folders.into_iter().map(Into::into).collect());
        self
    }

    /// Leave out files whose names start with any of these.
    pub fn exclude<I, S>(mut self, exclude: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = Some(exclude.into_iter().map(Into::into).collect());
        self
    }

    /// Look for `folders` under this sub folder.
    pub fn sub_folder(mut self, sub_folder: impl Into<String>) -> Self {
        self.sub_folder = Some(sub_folder.into());
        self
    }

    fn directories(&self) -> Vec<PathBuf> {
        let root = match &self.sub_folder {
            Some(sub) => self.base_dir.join(sub),
            None => self.base_dir.clone(),
        };
        match &self.folders {
            Some(folders) => folders.iter().map(|f| root.join(f)).collect(),
            None => vec![root],
        }
    }

    fn is_excluded(&self, path: &Path) -> bool {
        let Some(exclude) = &self.exclude else {
            return false;
        };
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        let hits = exclude
            .iter()
            .filter(|prefix| !prefix.is_empty() && name.starts_with(prefix.as_str()))
            .count();
        if hits > 1 {
            warn!(file = %path.display(), hits, "File matches several exclusion entries");
        }
        hits > 0
    }
}

/// Unique folder names from space-separated entries, in first-seen order.
///
/// `["faces houses", "houses cars"]` gives `["faces", "houses", "cars"]`.
pub fn folder_list<S: AsRef<str>>(entries: &[S]) -> Vec<String> {
    let mut folders: Vec<String> = Vec::new();
    for entry in entries {
        for folder in entry.as_ref().split_whitespace() {
            if !folders.iter().any(|f| f == folder) {
                folders.push(folder.to_string());
            }
        }
    }
    folders
}

/// Files in `dir` with extension exactly `file_type`, sorted by path.
///
/// The match is case-sensitive: `png` does not pick up `IMG.PNG`.
fn list_images(dir: &Path, file_type: &str) -> AppResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "Stimulus folder does not exist");
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) == Some(file_type) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn load_all<L: ImageLoader>(
    loader: &mut L,
    paths: Vec<PathBuf>,
) -> AppResult<Vec<PreloadedImage<L::Handle>>> {
    let mut images = Vec::with_capacity(paths.len());
    for source in paths {
        let handle = loader.load(&source)?;
        images.push(PreloadedImage { handle, source });
    }
    Ok(images)
}

/// Load every image selected by `query`.
///
/// # Errors
///
/// Returns `StimError::Io` if a folder cannot be listed and propagates loader
/// failures. Missing folders are only logged.
pub fn preload_folder<L: ImageLoader>(
    loader: &mut L,
    query: &FolderQuery,
) -> AppResult<Vec<PreloadedImage<L::Handle>>> {
    let file_type = query.file_type.trim_start_matches('.');
    if file_type.is_empty() {
        return Err(StimError::Stimulus("image file type must not be empty".into()));
    }

    let mut paths = Vec::new();
    for dir in query.directories() {
        for path in list_images(&dir, file_type)? {
            if query.is_excluded(&path) {
                debug!(file = %path.display(), "Excluded stimulus");
                continue;
            }
            paths.push(path);
        }
    }

    let images = load_all(loader, paths)?;
    info!(count = images.len(), file_type, "Preloaded images");
    Ok(images)
}

/// Load every `file_type` image directly in `base_dir`.
///
/// # Errors
///
/// See [`preload_folder`].
pub fn preload_dir<L: ImageLoader>(
    loader: &mut L,
    base_dir: &Path,
    file_type: &str,
) -> AppResult<Vec<PreloadedImage<L::Handle>>> {
    preload_folder(loader, &FolderQuery::new(base_dir, file_type))
}

/// Keep the paths that exist, logging the ones that do not.
fn existing(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths
        .into_iter()
        .filter(|p| {
            let found = p.is_file();
            if !found {
                warn!(file = %p.display(), "Image named in trial table not found");
            }
            found
        })
        .collect()
}

/// Load each image named in `columns`, once, in presentation order.
///
/// Files are looked up as `base_dir/folder/<cell>`. Use with
/// [`assign_by_name`](super::assign_by_name) during the trial loop.
///
/// # Errors
///
/// Returns `StimError::Stimulus` for an unknown column and propagates loader
/// failures. Missing files are only logged.
pub fn preload_unique_images<L: ImageLoader>(
    loader: &mut L,
    table: &TrialTable,
    columns: &[&str],
    base_dir: &Path,
    folder: &str,
) -> AppResult<Vec<PreloadedImage<L::Handle>>> {
    check_columns(table, columns)?;

    let mut names: Vec<&str> = Vec::new();
    for &row in table.sequence() {
        for column in columns {
            if let Some(name) = table.value(row, column) {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
    }

    let dir = base_dir.join(folder);
    let paths = existing(names.iter().map(|n| dir.join(n)).collect());
    load_all(loader, paths)
}

/// Load one image per trial from `column`, in presentation order.
///
/// The result has exactly one slot per trial, so it can be indexed by trial
/// count with [`assign_by_trial`](super::assign_by_trial). Repeated file names
/// are loaded repeatedly. Files are looked up as `base_dir/<cell>`; an empty
/// cell or a missing file leaves its slot `None`.
///
/// # Errors
///
/// Returns `StimError::Stimulus` for an unknown column and propagates loader
/// failures. Missing files are only logged.
pub fn preload_trial_images<L: ImageLoader>(
    loader: &mut L,
    table: &TrialTable,
    column: &str,
    base_dir: &Path,
) -> AppResult<TrialImages<L::Handle>> {
    check_columns(table, &[column])?;

    let mut slots = Vec::with_capacity(table.sequence().len());
    for (trial, name) in table.sequence_values(column).enumerate() {
        let Some(name) = name else {
            debug!(trial, column, "Empty stimulus cell");
            slots.push(None);
            continue;
        };
        let source = base_dir.join(name);
        if !source.is_file() {
            warn!(trial, file = %source.display(), "Image named in trial table not found");
            slots.push(None);
            continue;
        }
        let handle = loader.load(&source)?;
        slots.push(Some(PreloadedImage { handle, source }));
    }
    Ok(slots)
}

fn check_columns(table: &TrialTable, columns: &[&str]) -> AppResult<()> {
    match columns.iter().find(|c| !table.has_column(c)) {
        Some(missing) => Err(StimError::Stimulus(format!(
            "trial table has no column '{}'",
            missing
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_list_dedups_in_order() {
        let folders = folder_list(&["faces houses", "houses  cars", "faces"]);
        assert_eq!(folders, vec!["faces", "houses", "cars"]);
        assert!(folder_list::<&str>(&[]).is_empty());
    }

    #[test]
    fn test_query_directories() {
        let base = Path::new("/exp");
        assert_eq!(FolderQuery::new(base, "png").directories(), vec![PathBuf::from("/exp")]);
        assert_eq!(
            FolderQuery::new(base, "png").folders(["a", "b"]).directories(),
            vec![PathBuf::from("/exp/a"), PathBuf::from("/exp/b")]
        );
        assert_eq!(
            FolderQuery::new(base, "png")
                .sub_folder("STIMULI")
                .folders(["a"])
                .directories(),
            vec![PathBuf::from("/exp/STIMULI/a")]
        );
    }

    #[test]
    fn test_exclusion_is_file_name_prefix() {
        let query = FolderQuery::new("/exp", "png").exclude(["id03", "id1"]);
        assert!(query.is_excluded(Path::new("/exp/id03_happy.png")));
        assert!(query.is_excluded(Path::new("/exp/id12.png")));
        assert!(!query.is_excluded(Path::new("/exp/id04.png")));
        assert!(!query.is_excluded(Path::new("/id03/x.png")));
        assert!(!FolderQuery::new("/exp", "png").is_excluded(Path::new("/exp/id03.png")));
    }
}
