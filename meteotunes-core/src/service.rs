use tracing::warn;

use crate::{
    Config,
    coordinator::{AggregateResult, BranchDeadlines, Coordinator, FanOutObserver},
    error::LoadError,
    model::{Coordinate, LoadRequest},
    provider::ProviderSet,
    response::{Assembled, assemble},
};

/// Entry point for one load request: parse, validate, fan out, assemble.
/// Every path yields exactly one final response.
#[derive(Debug, Clone)]
pub struct LoadService {
    coordinator: Coordinator,
}

impl LoadService {
    pub fn new(coordinator: Coordinator) -> Self {
        Self { coordinator }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let providers = ProviderSet::from_config(config)?;
        let deadlines = BranchDeadlines::from(&config.timeouts);
        Ok(Self::new(Coordinator::new(providers, deadlines)))
    }

    /// Handle a raw JSON body `{latitude, longitude}`.
    pub async fn load(&self, body: &[u8], observer: &dyn FanOutObserver) -> Assembled {
        let result = match LoadRequest::from_json(body).and_then(Coordinate::try_from) {
            Ok(coordinate) => self.run(coordinate, observer).await,
            Err(err) => Err(err.into()),
        };
        Self::finish(result)
    }

    /// Handle an already-validated coordinate.
    pub async fn load_coordinate(
        &self,
        coordinate: Coordinate,
        observer: &dyn FanOutObserver,
    ) -> Assembled {
        Self::finish(self.run(coordinate, observer).await)
    }

    async fn run(
        &self,
        coordinate: Coordinate,
        observer: &dyn FanOutObserver,
    ) -> Result<AggregateResult, LoadError> {
        self.coordinator
            .run(coordinate, observer)
            .await
            .map_err(LoadError::UpstreamUnavailable)
    }

    fn finish(result: Result<AggregateResult, LoadError>) -> Assembled {
        if let Err(err) = &result {
            warn!(code = err.code(), error = %err, "load request failed");
        }
        assemble(result)
    }
}
