pub mod bundles;
pub mod jobs;
