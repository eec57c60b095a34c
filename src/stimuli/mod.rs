//! Image stimulus preloading and matching
//!
//! Decoding every image up front keeps disk reads out of the frame loop. This
//! module finds the image files an experiment needs, hands each to the
//! presentation toolkit's loader, and later matches trial-table entries back to
//! the preloaded images.
//!
//! # Directory Structure
//!
//! ```text
//! <base_dir>/
//! ├── STIMULI/              # general stimulus folder (`sub_folder`)
//! │   ├── faces/            # one of `folders`
//! │   │   ├── f01.png
//! │   │   └── f02.png
//! │   └── houses/
//! └── trials.csv
//! ```
//!
//! All paths are resolved against an explicit `base_dir`; nothing here reads
//! the process working directory.
//!
//! Problems with individual images (missing files, ambiguous matches) are
//! logged and skipped so presentation can go on.

pub mod matching;
pub mod preload;
pub mod trials;

pub use matching::{
    assign_by_index, assign_by_name, assign_by_path, assign_by_trial, ImageComponent,
};
pub use preload::{
    folder_list, preload_dir, preload_folder, preload_trial_images, preload_unique_images,
    FolderQuery, ImageLoader, PreloadedImage, TrialImages,
};
pub use trials::TrialTable;
