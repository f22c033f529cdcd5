//! Core library for `meteotunes`.
//!
//! Given a coordinate, this crate fetches current weather and then, in
//! parallel, an AI-generated image and an AI song suggestion for it:
//! - Configuration & credentials handling
//! - Provider clients for the weather, image and language-model APIs
//! - Prompt construction from weather data
//! - The fan-out coordinator with per-branch deadlines
//! - Mapping of results onto HTTP status codes and JSON bodies
//!
//! It is used by `meteotunes-cli`, both for the HTTP server and for one-shot
//! loads from the command line.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod model;
pub mod prompt;
pub mod provider;
pub mod response;
pub mod service;

pub use config::{Config, ProviderConfig};
pub use coordinator::{
    AggregateResult, BranchDeadlines, BranchOutcome, Coordinator, FanOutObserver, NoopObserver,
    Stage,
};
pub use error::{LoadError, ProviderError, ValidationError};
pub use model::{Coordinate, GeneratedImage, LoadRequest, Prompt, SongSuggestion, WeatherSnapshot};
pub use provider::{Provider, ProviderId, ProviderSet};
pub use response::{Assembled, ResponseBody};
pub use service::LoadService;
