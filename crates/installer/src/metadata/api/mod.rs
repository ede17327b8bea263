//! Remote API clients used during metadata resolution

pub mod curseforge_api;

pub use curseforge_api::{CurseForgeAPI, FileRecord, ModLinks, ModRecord};
