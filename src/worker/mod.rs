//! Background asset cache worker.
//!
//! Rust rendition of the page's request-interception worker: a single
//! event-dispatch loop with explicit lifecycle state and a match table from
//! event kind to handler, instead of ambient global listeners.
//!
//! Install fetches a fixed manifest of page assets into a staging area and
//! commits the whole generation atomically; a single failed manifest fetch
//! aborts the install and leaves the generation absent. Activation deletes
//! every stale generation carrying the recognized prefix. An intercepted
//! fetch is answered from the current generation when present, otherwise
//! proxied live to the network without populating the cache.

pub mod cache;

pub use cache::{AssetCache, CacheStorage, CachedResponse};

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Name of the cache generation this build serves from.
pub const STATIC_CACHE_NAME: &str = "plate-static-v1";

/// Generations carrying this prefix belong to this worker and are eligible
/// for cleanup on activation. Unrelated cache names are never touched.
pub const CACHE_NAME_PREFIX: &str = "plate-";

/// Fixed manifest of page assets cached at install time.
pub const ASSET_MANIFEST: &[&str] = &[
    "/index.html",
    "/restaurant.html",
    "/js/main.js",
    "/js/restaurant_info.js",
    "/css/styles.css",
    "/css/responsive.css",
    "/data/restaurants.json",
];

/// Maximum concurrent manifest fetches during install.
const MAX_CONCURRENT_INSTALL_FETCHES: usize = 4;

/// HTTP timeout for asset fetches in seconds.
const FETCH_TIMEOUT_SECS: u64 = 30;

/// Buffer size for the worker event channel.
const CHANNEL_BUFFER_SIZE: usize = 32;

/// Worker lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Installing,
    Waiting,
    Active,
}

/// Control messages posted to the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    /// Activate immediately instead of waiting.
    SkipWaiting,
}

/// Events dispatched through the worker loop.
#[derive(Debug)]
pub enum WorkerEvent {
    Install,
    Activate,
    Fetch {
        url: String,
        reply: oneshot::Sender<Result<CachedResponse>>,
    },
    Message(ControlMessage),
}

pub struct AssetCacheWorker {
    client: Client,
    storage: CacheStorage,
    /// Base URL relative asset paths resolve against.
    origin: String,
    state: WorkerState,
    skip_waiting: bool,
}

impl AssetCacheWorker {
    pub fn new(cache_root: PathBuf, origin: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()
            .context("failed to build asset fetch client")?;
        let storage = CacheStorage::open(cache_root)?;
        Ok(Self {
            client,
            storage,
            origin: origin.trim_end_matches('/').to_string(),
            state: WorkerState::Installing,
            skip_waiting: false,
        })
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Event dispatch table. Handler failures are logged, never propagated;
    /// the loop keeps serving.
    pub async fn handle(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Install => match self.on_install().await {
                Ok(()) => {
                    info!(cache = STATIC_CACHE_NAME, "asset cache installed");
                    if self.skip_waiting {
                        self.activate_now();
                    } else {
                        self.state = WorkerState::Waiting;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "asset cache install failed, generation left absent");
                }
            },
            WorkerEvent::Activate => {
                if self.state == WorkerState::Waiting {
                    self.activate_now();
                } else {
                    debug!(state = ?self.state, "activate ignored");
                }
            }
            WorkerEvent::Fetch { url, reply } => {
                let result = self.on_fetch(&url).await;
                // The requester may have given up; that is fine.
                let _ = reply.send(result);
            }
            WorkerEvent::Message(ControlMessage::SkipWaiting) => {
                self.skip_waiting = true;
                if self.state == WorkerState::Waiting {
                    self.activate_now();
                }
            }
        }
    }

    fn activate_now(&mut self) {
        match self.on_activate() {
            Ok(()) => info!("asset cache worker active"),
            Err(e) => warn!(error = %e, "asset cache activation failed"),
        }
    }

    /// Populate the current generation from the manifest: all-or-nothing.
    async fn on_install(&mut self) -> Result<()> {
        self.state = WorkerState::Installing;
        let staging = self.storage.staging(STATIC_CACHE_NAME)?;

        // Paths are owned up front so the install futures capture no
        // borrowed state while queued.
        let install_futures: Vec<_> = ASSET_MANIFEST
            .iter()
            .map(|path| {
                let client = self.client.clone();
                let path = (*path).to_string();
                let url = format!("{}{}", self.origin, path);
                async move {
                    let response = client
                        .get(&url)
                        .send()
                        .await
                        .with_context(|| format!("failed to fetch {url}"))?;
                    if !response.status().is_success() {
                        anyhow::bail!("manifest fetch for {url} returned {}", response.status());
                    }
                    let cached = into_cached(response).await?;
                    Ok((path, cached))
                }
            })
            .collect();
        let fetches: Vec<Result<(String, CachedResponse)>> = stream::iter(install_futures)
            .buffer_unordered(MAX_CONCURRENT_INSTALL_FETCHES)
            .collect()
            .await;

        for result in fetches {
            match result {
                Ok((path, cached)) => staging.put(&path, &cached)?,
                Err(e) => {
                    self.storage.discard(staging)?;
                    return Err(e);
                }
            }
        }

        self.storage.commit(staging, STATIC_CACHE_NAME)
    }

    /// Delete stale generations sharing our prefix; leave everything else.
    fn on_activate(&mut self) -> Result<()> {
        for name in self.storage.generation_names()? {
            if name.starts_with(CACHE_NAME_PREFIX) && name != STATIC_CACHE_NAME {
                debug!(cache = %name, "deleting stale cache generation");
                self.storage.delete(&name)?;
            }
        }
        self.state = WorkerState::Active;
        Ok(())
    }

    /// Serve from the current generation when cached, otherwise pass the
    /// request through live. Only install populates the cache.
    async fn on_fetch(&self, url: &str) -> Result<CachedResponse> {
        let key = self.request_key(url);
        if let Some(generation) = self.storage.generation(STATIC_CACHE_NAME) {
            if let Some(cached) = generation.lookup(key)? {
                debug!(url, "served from asset cache");
                return Ok(cached);
            }
        }

        debug!(url, "asset cache miss, fetching live");
        let full_url = if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}{}", self.origin, url)
        };
        let response = self
            .client
            .get(&full_url)
            .send()
            .await
            .with_context(|| format!("live fetch of {full_url} failed"))?;
        into_cached(response).await
    }

    /// Cache keys are origin-relative paths so a full URL and its relative
    /// form hit the same entry.
    fn request_key<'a>(&self, url: &'a str) -> &'a str {
        url.strip_prefix(self.origin.as_str()).unwrap_or(url)
    }
}

async fn into_cached(response: reqwest::Response) -> Result<CachedResponse> {
    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.bytes().await?.to_vec();
    Ok(CachedResponse {
        status,
        content_type,
        body,
    })
}

/// Handle for talking to a registered worker.
#[derive(Clone)]
pub struct WorkerHandle {
    tx: mpsc::Sender<WorkerEvent>,
}

impl WorkerHandle {
    /// Intercepted fetch: cached response when present, live otherwise.
    pub async fn fetch(&self, url: &str) -> Result<CachedResponse> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(WorkerEvent::Fetch {
                url: url.to_string(),
                reply,
            })
            .await
            .map_err(|_| anyhow!("asset cache worker is gone"))?;
        rx.await
            .map_err(|_| anyhow!("asset cache worker dropped the request"))?
    }

    /// Post a control message to the worker.
    pub async fn post_message(&self, message: ControlMessage) -> Result<()> {
        self.tx
            .send(WorkerEvent::Message(message))
            .await
            .map_err(|_| anyhow!("asset cache worker is gone"))
    }
}

/// Register the worker: spawn its event loop and queue the install/activate
/// lifecycle. Registration success or failure is logged only, never
/// surfaced to callers.
pub fn register(cache_root: PathBuf, origin: &str) -> WorkerHandle {
    let (tx, mut rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

    // The channel is fresh, so these cannot fail; queueing them before the
    // loop starts fixes the lifecycle order ahead of any fetch.
    let _ = tx.try_send(WorkerEvent::Install);
    let _ = tx.try_send(WorkerEvent::Activate);

    let origin = origin.to_string();
    tokio::spawn(async move {
        let mut worker = match AssetCacheWorker::new(cache_root, &origin) {
            Ok(worker) => {
                info!("asset cache worker registered");
                worker
            }
            Err(e) => {
                warn!(error = %e, "asset cache worker registration failed");
                return;
            }
        };
        while let Some(event) = rx.recv().await {
            worker.handle(event).await;
        }
    });

    WorkerHandle { tx }
}
