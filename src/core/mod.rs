pub mod downloader;
pub mod normalizer;
pub mod playlist;
pub mod renamer;
pub mod tagger;
