//! Container build artifact synthesis

pub mod ignore;
pub mod synthesizer;

pub use ignore::{merge_ignore, render_ignore, DEFAULT_IGNORE_ENTRIES, IGNORE_FILE_NAME};
pub use synthesizer::{
    normalize_version, ArtifactSynthesizer, GeneratedArtifacts, DEFAULT_BASE_IMAGE,
    DEFAULT_WORKDIR_ROOT,
};
