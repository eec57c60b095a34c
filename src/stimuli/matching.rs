//! Matching trial-table entries to preloaded images.

use super::preload::PreloadedImage;
use std::path::Path;
use tracing::warn;

/// A display component that shows one image at a time.
pub trait ImageComponent {
    /// Show the image loaded from `source`, or nothing for `None`.
    fn set_image(&mut self, source: Option<&Path>);
}

/// Show the preloaded image named `name`.
///
/// An image whose file name equals `name` wins. Otherwise the last image whose
/// path contains `name` is used; zero-pad numbered file names so `img1` does not
/// also match `img10`. `None` (an empty cell) clears the component.
///
/// Returns the index of the image shown.
pub fn assign_by_name<H>(
    images: &[PreloadedImage<H>],
    name: Option<&str>,
    component: &mut impl ImageComponent,
) -> Option<usize> {
    let Some(name) = name else {
        component.set_image(None);
        return None;
    };

    let exact = images
        .iter()
        .position(|img| img.source.file_name().and_then(|n| n.to_str()) == Some(name));

    let index = exact.or_else(|| {
        let hits: Vec<usize> = images
            .iter()
            .enumerate()
            .filter(|(_, img)| img.source.to_string_lossy().contains(name))
            .map(|(i, _)| i)
            .collect();
        if hits.len() > 1 {
            warn!(name, matches = hits.len(), "Ambiguous image match; using the last one");
        }
        hits.last().copied()
    });

    match index {
        Some(i) => component.set_image(Some(images[i].source.as_path())),
        None => warn!(name, "No preloaded image matches"),
    }
    index
}

/// Show the preloaded image loaded from exactly `base_dir/name`.
///
/// `None` clears the component. Returns the index of the image shown.
pub fn assign_by_path<H>(
    images: &[PreloadedImage<H>],
    base_dir: &Path,
    name: Option<&str>,
    component: &mut impl ImageComponent,
) -> Option<usize> {
    let Some(name) = name else {
        component.set_image(None);
        return None;
    };

    let wanted = base_dir.join(name);
    let index = images.iter().position(|img| img.source == wanted);
    match index {
        Some(i) => component.set_image(Some(images[i].source.as_path())),
        None => warn!(path = %wanted.display(), "No preloaded image at path"),
    }
    index
}

/// Show the `index`-th preloaded image, typically a running trial count.
pub fn assign_by_index<H>(
    images: &[PreloadedImage<H>],
    index: usize,
    component: &mut impl ImageComponent,
) -> Option<usize> {
    match images.get(index) {
        Some(img) => {
            component.set_image(Some(img.source.as_path()));
            Some(index)
        }
        None => {
            warn!(index, loaded = images.len(), "Image index out of range");
            None
        }
    }
}

/// Show the image preloaded for `trial`.
///
/// Pairs with [`preload_trial_images`](super::preload_trial_images): a trial
/// whose slot is empty (blank cell or missing file) clears the component
/// instead of showing a neighbouring trial's image.
///
/// Returns `trial` if an image is shown.
pub fn assign_by_trial<H>(
    images: &[Option<PreloadedImage<H>>],
    trial: usize,
    component: &mut impl ImageComponent,
) -> Option<usize> {
    match images.get(trial) {
        Some(Some(img)) => {
            component.set_image(Some(img.source.as_path()));
            Some(trial)
        }
        Some(None) => {
            component.set_image(None);
            None
        }
        None => {
            warn!(trial, trials = images.len(), "Trial index out of range");
            None
        }
    }
}
