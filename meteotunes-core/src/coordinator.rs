//! Fan-out of a single load request.
//!
//! The weather call runs first and alone. Once it succeeds, the image and
//! song calls are spawned as two tasks, each reporting back over its own
//! `oneshot` channel and racing its own deadline measured from launch. A
//! branch whose deadline fires is cancelled through its child
//! [`CancellationToken`], which drops the in-flight HTTP call. Dropping the
//! coordinator future cancels every branch still running.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::oneshot,
    time::{Instant, timeout_at},
};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, instrument, warn};

use crate::{
    config::TimeoutConfig,
    error::ProviderError,
    model::{Coordinate, GeneratedImage, SongSuggestion, WeatherSnapshot},
    prompt::{Purpose, build_prompt},
    provider::{Provider, ProviderId, ProviderSet},
};

/// Lifecycle of one coordinator run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    WeatherPending,
    WeatherDone,
    BranchesPending,
    Complete,
    /// Terminal state after a failed weather call; no branch was launched.
    Failed,
}

/// Hooks into a coordinator run. Both default to no-ops.
pub trait FanOutObserver: Send + Sync {
    fn stage(&self, _stage: Stage) {}

    /// Fired once, before any branch is launched.
    fn weather_ready(&self, _weather: &WeatherSnapshot) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl FanOutObserver for NoopObserver {}

#[derive(Debug, Clone, PartialEq)]
pub enum BranchOutcome<T> {
    Success(T),
    Failure(ProviderError),
    TimedOut { after: Duration },
}

impl<T> BranchOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Failure(_) => "failure",
            Self::TimedOut { .. } => "timed_out",
        }
    }
}

/// Everything a finished run produced. Both branch outcomes are always
/// present, whichever finished first.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateResult {
    pub weather: WeatherSnapshot,
    pub image: BranchOutcome<Vec<GeneratedImage>>,
    pub song: BranchOutcome<SongSuggestion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchDeadlines {
    pub image: Duration,
    pub song: Duration,
}

impl Default for BranchDeadlines {
    fn default() -> Self {
        Self::from(&TimeoutConfig::default())
    }
}

impl From<&TimeoutConfig> for BranchDeadlines {
    fn from(cfg: &TimeoutConfig) -> Self {
        Self { image: cfg.image(), song: cfg.song() }
    }
}

#[derive(Debug, Clone)]
pub struct Coordinator {
    providers: ProviderSet,
    deadlines: BranchDeadlines,
}

impl Coordinator {
    pub fn new(providers: ProviderSet, deadlines: BranchDeadlines) -> Self {
        Self { providers, deadlines }
    }

    pub fn deadlines(&self) -> BranchDeadlines {
        self.deadlines
    }

    /// Run one request. A weather failure is returned as-is and neither
    /// branch is started.
    #[instrument(
        name = "fan_out",
        skip(self, observer),
        fields(lat = coordinate.latitude(), lon = coordinate.longitude())
    )]
    pub async fn run(
        &self,
        coordinate: Coordinate,
        observer: &dyn FanOutObserver,
    ) -> Result<AggregateResult, ProviderError> {
        let started = Instant::now();
        observer.stage(Stage::Init);

        observer.stage(Stage::WeatherPending);
        let weather = match self.providers.weather.call(&coordinate).await {
            Ok(weather) => weather,
            Err(err) => {
                warn!(error = %err, "weather call failed, branches not launched");
                observer.stage(Stage::Failed);
                return Err(err);
            }
        };
        observer.stage(Stage::WeatherDone);
        observer.weather_ready(&weather);

        let scope = CancellationToken::new();
        let _scope_guard = scope.clone().drop_guard();

        let image = Branch::launch(
            Arc::clone(&self.providers.image),
            build_prompt(&weather, Purpose::Image),
            self.deadlines.image,
            &scope,
        );
        let song = Branch::launch(
            Arc::clone(&self.providers.song),
            build_prompt(&weather, Purpose::Song),
            self.deadlines.song,
            &scope,
        );
        observer.stage(Stage::BranchesPending);

        let (image, song) = tokio::join!(image.resolve(), song.resolve());
        observer.stage(Stage::Complete);

        info!(
            image = image.label(),
            song = song.label(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "fan-out complete"
        );

        Ok(AggregateResult { weather, image, song })
    }
}

/// A spawned provider call plus the receiving half of its result slot.
struct Branch<T> {
    provider: ProviderId,
    rx: oneshot::Receiver<Result<T, ProviderError>>,
    token: CancellationToken,
    deadline: Instant,
    budget: Duration,
}

impl<T: Send + 'static> Branch<T> {
    fn launch<I>(
        client: Arc<dyn Provider<Input = I, Output = T>>,
        input: I,
        budget: Duration,
        scope: &CancellationToken,
    ) -> Self
    where
        I: Send + Sync + 'static,
    {
        let provider = client.id();
        let (tx, rx) = oneshot::channel();
        let token = scope.child_token();
        let cancelled = token.clone();

        tokio::spawn(
            async move {
                tokio::select! {
                    _ = cancelled.cancelled() => debug!("branch cancelled"),
                    result = client.call(&input) => {
                        if tx.send(result).is_err() {
                            debug!("receiver gone, late result discarded");
                        }
                    }
                }
            }
            .instrument(info_span!("branch", %provider)),
        );

        Self { provider, rx, token, deadline: Instant::now() + budget, budget }
    }

    async fn resolve(self) -> BranchOutcome<T> {
        let Branch { provider, rx, token, deadline, budget } = self;

        match timeout_at(deadline, rx).await {
            Ok(Ok(Ok(value))) => BranchOutcome::Success(value),
            Ok(Ok(Err(err))) => {
                warn!(%provider, error = %err, "branch failed");
                BranchOutcome::Failure(err)
            }
            Ok(Err(_)) => {
                warn!(%provider, "branch task ended without a result");
                BranchOutcome::Failure(ProviderError::Interrupted {
                    provider,
                    message: "branch task stopped before sending a result".to_string(),
                })
            }
            Err(_) => {
                token.cancel();
                warn!(%provider, budget_ms = budget.as_millis() as u64, "branch deadline exceeded");
                BranchOutcome::TimedOut { after: budget }
            }
        }
    }
}
