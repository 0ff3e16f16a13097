use crate::playback::{
    BackendError, EngineConfig, EngineDependencies, EngineListener, EngineNotice, KeepAlive,
    MediaAction, MediaMetadata, MediaPlaybackState, MediaSessionHost, MediaSource,
    PlaybackBackend, PlaybackEngine, PlaybackToken, PositionState, Progress, TrackDescriptor,
    TrackList,
};
use crate::resolution::{
    AudioStream, CredentialError, CredentialProvider, Credentials, MirrorError, MirrorFamily,
    MirrorProvider, SearchCandidate, SearchEndpoint, SearchEndpointError, StreamResolver,
    StreamResolverConfig, TrackResolver, TrackResolverConfig,
};
use crate::MediaId;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

pub(crate) struct SearchMock {
    results: Mutex<HashMap<String, Vec<SearchCandidate>>>,
    failures: Mutex<HashMap<String, VecDeque<SearchEndpointError>>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    calls: Mutex<Vec<String>>,
}

impl SearchMock {
    pub(crate) fn new() -> Self {
        Self {
            results: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            calls: Mutex::new(vec![]),
        }
    }

    pub(crate) fn with_results(self, query: &str, candidates: Vec<SearchCandidate>) -> Self {
        self.results
            .lock()
            .unwrap()
            .insert(query.to_string(), candidates);
        self
    }

    /// Queues errors returned before the configured results.
    pub(crate) fn with_failures(self, query: &str, errors: Vec<SearchEndpointError>) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(query.to_string(), errors.into());
        self
    }

    /// Holds every search for `query` until the returned handle is notified.
    pub(crate) fn gate(&self, query: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(query.to_string(), notify.clone());
        notify
    }

    pub(crate) fn calls_for(&self, query: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.as_str() == query)
            .count()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl SearchEndpoint for SearchMock {
    async fn search(
        &self,
        query: &str,
        _credentials: &Credentials,
        _max_results: usize,
    ) -> Result<Vec<SearchCandidate>, SearchEndpointError> {
        self.calls.lock().unwrap().push(query.to_string());

        let gate = self.gates.lock().unwrap().get(query).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let failure = self
            .failures
            .lock()
            .unwrap()
            .get_mut(query)
            .and_then(VecDeque::pop_front);
        if let Some(error) = failure {
            return Err(error);
        }

        Ok(self
            .results
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_default())
    }
}

pub(crate) enum MirrorBehavior {
    /// Media id to stream URL; anything else answers 404.
    Serve(HashMap<String, String>),
    Fail(u16),
    Hang,
    Delay(Duration, String),
}

pub(crate) struct MirrorMock {
    name: String,
    family: MirrorFamily,
    behavior: MirrorBehavior,
    calls: AtomicUsize,
}

impl MirrorMock {
    pub(crate) fn new(name: &str, family: MirrorFamily, behavior: MirrorBehavior) -> Self {
        Self {
            name: name.to_string(),
            family,
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn serving(name: &str, family: MirrorFamily, streams: &[(&str, &str)]) -> Self {
        let table = streams
            .iter()
            .map(|(media_id, url)| (media_id.to_string(), url.to_string()))
            .collect();

        Self::new(name, family, MirrorBehavior::Serve(table))
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn audio_stream(url: &str) -> Vec<AudioStream> {
    vec![
        AudioStream::new(&format!("{}?webm", url), "audio/webm", 160_000),
        AudioStream::new(url, "audio/mp4", 128_000),
    ]
}

#[async_trait]
impl MirrorProvider for MirrorMock {
    fn name(&self) -> &str {
        &self.name
    }

    fn family(&self) -> MirrorFamily {
        self.family
    }

    async fn audio_streams(&self, media_id: &MediaId) -> Result<Vec<AudioStream>, MirrorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match &self.behavior {
            MirrorBehavior::Serve(table) => match table.get(&media_id.to_string()) {
                Some(url) => Ok(audio_stream(url)),
                None => Err(MirrorError::Status(404)),
            },
            MirrorBehavior::Fail(status) => Err(MirrorError::Status(*status)),
            MirrorBehavior::Hang => std::future::pending().await,
            MirrorBehavior::Delay(delay, url) => {
                tokio::time::sleep(*delay).await;
                Ok(audio_stream(url))
            }
        }
    }
}

pub(crate) struct CredentialsMock {
    configured: AtomicBool,
    invalidations: AtomicUsize,
}

impl CredentialsMock {
    pub(crate) fn configured() -> Self {
        Self {
            configured: AtomicBool::new(true),
            invalidations: AtomicUsize::new(0),
        }
    }

    pub(crate) fn missing() -> Self {
        Self {
            configured: AtomicBool::new(false),
            invalidations: AtomicUsize::new(0),
        }
    }

    pub(crate) fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialProvider for CredentialsMock {
    async fn credentials(&self) -> Result<Credentials, CredentialError> {
        if self.configured.load(Ordering::SeqCst) {
            Ok(Credentials::with_api_key("test-key"))
        } else {
            Err(CredentialError::NotConfigured)
        }
    }

    fn invalidate(&self) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) struct BackendMock {
    loads: Mutex<Vec<(MediaSource, PlaybackToken)>>,
    commands: Mutex<Vec<String>>,
    refuse_loads: AtomicBool,
    pushes_progress: bool,
    progress: Mutex<Option<Progress>>,
}

impl BackendMock {
    pub(crate) fn new() -> Self {
        Self {
            loads: Mutex::new(vec![]),
            commands: Mutex::new(vec![]),
            refuse_loads: AtomicBool::new(false),
            pushes_progress: true,
            progress: Mutex::new(None),
        }
    }

    pub(crate) fn polled() -> Self {
        Self {
            pushes_progress: false,
            ..Self::new()
        }
    }

    pub(crate) fn refuse_loads(&self) {
        self.refuse_loads.store(true, Ordering::SeqCst);
    }

    pub(crate) fn set_progress(&self, position: f64, duration: f64) {
        self.progress
            .lock()
            .unwrap()
            .replace(Progress { position, duration });
    }

    pub(crate) fn loads(&self) -> Vec<(MediaSource, PlaybackToken)> {
        self.loads.lock().unwrap().clone()
    }

    pub(crate) fn last_token(&self) -> PlaybackToken {
        self.loads.lock().unwrap().last().unwrap().1
    }

    pub(crate) fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    fn record(&self, command: String) -> Result<(), BackendError> {
        self.commands.lock().unwrap().push(command);
        Ok(())
    }
}

impl PlaybackBackend for BackendMock {
    fn load(&self, source: &MediaSource, token: PlaybackToken) -> Result<(), BackendError> {
        if self.refuse_loads.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable);
        }
        self.loads.lock().unwrap().push((source.clone(), token));
        Ok(())
    }

    fn play(&self) -> Result<(), BackendError> {
        self.record("play".into())
    }

    fn pause(&self) -> Result<(), BackendError> {
        self.record("pause".into())
    }

    fn seek(&self, position: f64) -> Result<(), BackendError> {
        self.record(format!("seek {}", position))
    }

    fn set_volume(&self, level: u8) -> Result<(), BackendError> {
        self.record(format!("volume {}", level))
    }

    fn stop(&self) -> Result<(), BackendError> {
        self.record("stop".into())
    }

    fn pushes_progress(&self) -> bool {
        self.pushes_progress
    }

    fn progress(&self) -> Option<Progress> {
        *self.progress.lock().unwrap()
    }
}

#[derive(Default)]
pub(crate) struct MediaSessionMock {
    pub(crate) actions: Mutex<Vec<MediaAction>>,
    pub(crate) metadata: Mutex<Vec<Option<MediaMetadata>>>,
    pub(crate) states: Mutex<Vec<MediaPlaybackState>>,
    pub(crate) positions: Mutex<Vec<PositionState>>,
}

impl MediaSessionHost for MediaSessionMock {
    fn register_actions(&self, actions: &[MediaAction]) {
        self.actions.lock().unwrap().extend_from_slice(actions);
    }

    fn clear_actions(&self) {
        self.actions.lock().unwrap().clear();
    }

    fn set_metadata(&self, metadata: Option<MediaMetadata>) {
        self.metadata.lock().unwrap().push(metadata);
    }

    fn set_playback_state(&self, state: MediaPlaybackState) {
        self.states.lock().unwrap().push(state);
    }

    fn set_position_state(&self, state: PositionState) {
        self.positions.lock().unwrap().push(state);
    }
}

#[derive(Default)]
pub(crate) struct KeepAliveMock {
    pub(crate) calls: Mutex<Vec<&'static str>>,
}

impl KeepAlive for KeepAliveMock {
    fn resume(&self) {
        self.calls.lock().unwrap().push("resume");
    }

    fn suspend(&self) {
        self.calls.lock().unwrap().push("suspend");
    }

    fn teardown(&self) {
        self.calls.lock().unwrap().push("teardown");
    }
}

#[derive(Default)]
pub(crate) struct ListenerMock {
    pub(crate) notices: Mutex<Vec<EngineNotice>>,
}

impl EngineListener for ListenerMock {
    fn notify(&self, notice: EngineNotice) {
        self.notices.lock().unwrap().push(notice);
    }
}

pub(crate) fn candidate(media_id: &str, title: &str, channel: &str) -> SearchCandidate {
    SearchCandidate::new(media_id, title, channel)
}

pub(crate) struct Harness {
    pub(crate) engine: PlaybackEngine,
    pub(crate) tracks: TrackList,
    pub(crate) search: Arc<SearchMock>,
    pub(crate) credentials: Arc<CredentialsMock>,
    pub(crate) native: Arc<BackendMock>,
    pub(crate) fallback: Arc<BackendMock>,
    pub(crate) media_session: Arc<MediaSessionMock>,
    pub(crate) keep_alive: Arc<KeepAliveMock>,
    pub(crate) listener: Arc<ListenerMock>,
}

pub(crate) struct HarnessBuilder {
    tracks: Vec<TrackDescriptor>,
    search: SearchMock,
    mirrors: Vec<MirrorMock>,
    credentials: CredentialsMock,
    fallback: BackendMock,
    config: EngineConfig,
}

impl HarnessBuilder {
    pub(crate) fn new(tracks: Vec<TrackDescriptor>) -> Self {
        Self {
            tracks,
            search: SearchMock::new(),
            mirrors: vec![],
            credentials: CredentialsMock::configured(),
            fallback: BackendMock::polled(),
            config: EngineConfig::default(),
        }
    }

    pub(crate) fn search(mut self, search: SearchMock) -> Self {
        self.search = search;
        self
    }

    /// Single primary mirror serving the given media ids.
    pub(crate) fn streams(mut self, streams: &[(&str, &str)]) -> Self {
        self.mirrors = vec![MirrorMock::serving(
            "primary",
            MirrorFamily::Primary,
            streams,
        )];
        self
    }

    pub(crate) fn credentials(mut self, credentials: CredentialsMock) -> Self {
        self.credentials = credentials;
        self
    }

    pub(crate) fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub(crate) fn build(self) -> Harness {
        let search = Arc::new(self.search);
        let credentials = Arc::new(self.credentials);
        let native = Arc::new(BackendMock::new());
        let fallback = Arc::new(self.fallback);
        let media_session = Arc::new(MediaSessionMock::default());
        let keep_alive = Arc::new(KeepAliveMock::default());
        let listener = Arc::new(ListenerMock::default());

        let mirrors = self
            .mirrors
            .into_iter()
            .map(|mirror| Arc::new(mirror) as Arc<dyn MirrorProvider>)
            .collect();
        let stream_config = StreamResolverConfig {
            primary_picks: 1,
            secondary_picks: 1,
            ..StreamResolverConfig::default()
        };

        let tracks = TrackList::new(self.tracks);
        let engine = PlaybackEngine::new(
            self.config,
            EngineDependencies {
                track_resolver: Arc::new(TrackResolver::new(
                    search.clone(),
                    TrackResolverConfig::default(),
                )),
                stream_resolver: Arc::new(StreamResolver::new(mirrors, stream_config)),
                credentials: credentials.clone(),
                native: native.clone(),
                fallback: fallback.clone(),
                media_session: Some(media_session.clone()),
                keep_alive: keep_alive.clone(),
                listener: listener.clone(),
            },
            tracks.clone(),
        );

        Harness {
            engine,
            tracks,
            search,
            credentials,
            native,
            fallback,
            media_session,
            keep_alive,
            listener,
        }
    }
}

impl Harness {
    pub(crate) fn notices(&self) -> Vec<EngineNotice> {
        self.listener.notices.lock().unwrap().clone()
    }

    pub(crate) fn keep_alive_calls(&self) -> Vec<&'static str> {
        self.keep_alive.calls.lock().unwrap().clone()
    }
}
