//! CurseForge metadata resolution
//!
//! This module contains everything needed to turn pack entries that point at
//! CurseForge files into download URLs: configuration, the mirror-aware
//! request executor, the API client and the resolver itself.

pub mod core;
pub mod config;
pub mod http;
pub mod fallback;
pub mod api;
pub mod resolver;

// Re-export main types for convenience
pub use self::core::{
    CurseForgeUpdate, EndpointKind, FailureKind, FileId, MetadataError, ModReference, ProjectId,
    ResolutionFailure, Result, OTHER_LABEL,
};
pub use config::CurseForgeConfig;
pub use http::{ApiRequest, ApiResponse, ApiTransport, ReqwestTransport};
pub use fallback::{AttemptOutcome, EndpointAttempt, FallbackExecutor, FallbackResponse};
pub use api::{CurseForgeAPI, FileRecord, ModRecord};
pub use resolver::{CurseForgeResolver, ResolutionReport};
