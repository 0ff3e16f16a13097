use crate::playback::prefetch::{PrefetchScheduler, ShufflePrefetch};
use crate::playback::traits::{
    BackendError, EngineListener, KeepAlive, MediaSessionHost, PlaybackBackend,
};
use crate::playback::types::{
    ActiveBackend, BackendEvent, BackendKind, EngineNotice, EngineState, MediaAction,
    MediaMetadata, MediaPlaybackState, MediaSource, PlaybackSession, PlaybackSnapshot,
    PlaybackToken, PositionState, Progress, TrackDescriptor, TrackList,
};
use crate::resolution::{CredentialError, CredentialProvider, StreamResolver, TrackResolver};
use crate::{MediaId, StreamUrl, TrackError, TrackId};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Extra stream resolutions attempted before falling back.
    pub stream_retry_limit: u32,
    pub stream_retry_delay: Duration,
    /// Native errors tolerated per track before it is marked native-unplayable.
    pub native_error_retry_limit: u32,
    pub fallback_error_skip_delay: Duration,
    /// Seconds moved by the seek-forward / seek-backward media actions.
    pub seek_step: f64,
    pub visibility_retry_delays: Vec<Duration>,
    pub shuffle_prefetch: ShufflePrefetch,
    pub default_volume: u8,
    pub artwork_base: String,
    pub album: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stream_retry_limit: 2,
            stream_retry_delay: Duration::from_millis(450),
            native_error_retry_limit: 2,
            fallback_error_skip_delay: Duration::from_secs(1),
            seek_step: 10.0,
            visibility_retry_delays: vec![
                Duration::from_millis(200),
                Duration::from_secs(1),
                Duration::from_secs(3),
            ],
            shuffle_prefetch: ShufflePrefetch::default(),
            default_volume: 80,
            artwork_base: "https://img.youtube.com/vi".to_string(),
            album: None,
        }
    }
}

pub struct EngineDependencies {
    pub track_resolver: Arc<TrackResolver>,
    pub stream_resolver: Arc<StreamResolver>,
    pub credentials: Arc<dyn CredentialProvider>,
    pub native: Arc<dyn PlaybackBackend>,
    pub fallback: Arc<dyn PlaybackBackend>,
    pub media_session: Option<Arc<dyn MediaSessionHost>>,
    pub keep_alive: Arc<dyn KeepAlive>,
    pub listener: Arc<dyn EngineListener>,
}

struct EngineInner {
    session: PlaybackSession,
    /// Bumped on every load and on every reset; async results carrying an
    /// older value are dropped.
    generation: u64,
    volume: u8,
    native_failures: u32,
    native_unplayable: HashSet<TrackId>,
    /// Set after a credential failure. Cleared by any explicit selection.
    auto_advance_halted: bool,
    /// Tracks skipped without starting playback since the last successful
    /// start or explicit selection.
    failed_tracks: HashSet<TrackId>,
    fallback_reports_playing: bool,
    disposed: bool,
    prefetch_task: Option<JoinHandle<()>>,
    visibility_task: Option<JoinHandle<()>>,
}

enum Step {
    Done,
    Skip,
}

fn lock_inner(inner: &Mutex<EngineInner>) -> MutexGuard<'_, EngineInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

fn log_rejection(result: Result<(), BackendError>, command: &'static str) {
    if let Err(error) = result {
        warn!(command, ?error, "Backend rejected command");
    }
}

fn clamp_position(position: f64, duration: f64) -> f64 {
    let position = if position.is_finite() {
        position.max(0.0)
    } else {
        0.0
    };

    if duration > 0.0 {
        position.min(duration)
    } else {
        position
    }
}

/// Index to advance to from `current`.
///
/// Sequential mode returns `None` past the last track. Shuffle mode always
/// returns an index, and never `current` while the list has more than one
/// track.
pub fn pick_next_index<R: Rng + ?Sized>(
    current: Option<usize>,
    len: usize,
    shuffle: bool,
    rng: &mut R,
) -> Option<usize> {
    if len == 0 {
        return None;
    }

    if shuffle {
        return Some(match current {
            Some(current) if len == 1 => current,
            Some(current) => {
                let pick = rng.gen_range(0..len - 1);
                if pick >= current {
                    pick + 1
                } else {
                    pick
                }
            }
            None => rng.gen_range(0..len),
        });
    }

    match current {
        None => Some(0),
        Some(current) if current + 1 < len => Some(current + 1),
        Some(_) => None,
    }
}

/// Random index among the tracks that have not failed, other than
/// `current`. Falls back to [`pick_next_index`] when there is none.
fn pick_untried_index<R: Rng + ?Sized>(
    current: Option<usize>,
    tracks: &[TrackDescriptor],
    failed: &HashSet<TrackId>,
    rng: &mut R,
) -> Option<usize> {
    let untried: Vec<usize> = tracks
        .iter()
        .enumerate()
        .filter(|(index, track)| Some(*index) != current && !failed.contains(&track.id))
        .map(|(index, _)| index)
        .collect();

    match untried.choose(rng) {
        Some(index) => Some(*index),
        None => pick_next_index(current, tracks.len(), true, rng),
    }
}

/// Drives continuous playback of a [`TrackList`] over a native stream
/// backend and an embedded fallback backend.
pub struct PlaybackEngine {
    config: EngineConfig,
    tracks: TrackList,
    track_resolver: Arc<TrackResolver>,
    stream_resolver: Arc<StreamResolver>,
    credentials: Arc<dyn CredentialProvider>,
    native: Arc<dyn PlaybackBackend>,
    fallback: Arc<dyn PlaybackBackend>,
    media_session: Option<Arc<dyn MediaSessionHost>>,
    keep_alive: Arc<dyn KeepAlive>,
    listener: Arc<dyn EngineListener>,
    prefetch: PrefetchScheduler,
    inner: Arc<Mutex<EngineInner>>,
}

impl PlaybackEngine {
    pub fn new(config: EngineConfig, dependencies: EngineDependencies, tracks: TrackList) -> Self {
        let EngineDependencies {
            track_resolver,
            stream_resolver,
            credentials,
            native,
            fallback,
            media_session,
            keep_alive,
            listener,
        } = dependencies;

        let prefetch = PrefetchScheduler::new(
            tracks.clone(),
            track_resolver.clone(),
            credentials.clone(),
            config.shuffle_prefetch,
        );

        if let Some(host) = &media_session {
            host.register_actions(&MediaAction::ALL);
        }

        let inner = EngineInner {
            session: PlaybackSession::default(),
            generation: 0,
            volume: config.default_volume.min(100),
            native_failures: 0,
            native_unplayable: HashSet::new(),
            auto_advance_halted: false,
            failed_tracks: HashSet::new(),
            fallback_reports_playing: false,
            disposed: false,
            prefetch_task: None,
            visibility_task: None,
        };

        Self {
            config,
            tracks,
            track_resolver,
            stream_resolver,
            credentials,
            native,
            fallback,
            media_session,
            keep_alive,
            listener,
            prefetch,
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    pub fn track_resolver(&self) -> &Arc<TrackResolver> {
        &self.track_resolver
    }

    pub fn stream_resolver(&self) -> &Arc<StreamResolver> {
        &self.stream_resolver
    }

    pub fn tracks(&self) -> Vec<TrackDescriptor> {
        self.tracks.snapshot()
    }

    pub fn state(&self) -> EngineState {
        self.lock().session.state()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        let inner = self.lock();
        let session = &inner.session;

        PlaybackSnapshot {
            state: session.state(),
            current_index: session.current_index,
            current_track: session
                .current_index
                .and_then(|index| self.tracks.get(index))
                .map(|track| track.id),
            playing: session.playing,
            shuffle: session.shuffle,
            active_backend: session.active_backend,
            position: session.position,
            duration: session.duration,
            volume: inner.volume,
            halted: inner.auto_advance_halted,
        }
    }

    /// Unified progress readout. Backends that do not push time updates are
    /// polled here.
    pub fn progress(&self) -> Progress {
        let mut inner = self.lock();

        if let Some(backend) = self.backend_for(inner.session.active_backend) {
            if !backend.pushes_progress() {
                if let Some(progress) = backend.progress() {
                    inner.session.position = progress.position.max(0.0);
                    if progress.duration.is_finite() && progress.duration > 0.0 {
                        inner.session.duration = progress.duration;
                    }
                    self.publish_position(&inner.session);
                }
            }
        }

        Progress {
            position: inner.session.position,
            duration: inner.session.duration,
        }
    }

    /// Starts playback of the track at `index`.
    pub async fn select_track(&self, index: usize) {
        {
            let mut inner = self.lock();
            inner.auto_advance_halted = false;
            inner.failed_tracks.clear();
        }

        self.run_from(index).await;
    }

    /// Selects a track by identity. Selecting the current track toggles
    /// play/pause instead of restarting it.
    pub async fn play_track(&self, track_id: &TrackId) {
        let Some(index) = self.tracks.position(track_id) else {
            warn!(%track_id, "Unknown track selected");
            return;
        };

        let current = self.lock().session.current_index;
        if current == Some(index) {
            self.toggle_play().await;
        } else {
            self.select_track(index).await;
        }
    }

    pub async fn play_all(&self) {
        if self.tracks.is_empty() {
            debug!("Nothing to play");
            return;
        }

        self.select_track(0).await;
    }

    pub async fn next(&self) {
        let len = self.tracks.len();
        let target = {
            let mut inner = self.lock();
            inner.auto_advance_halted = false;
            inner.failed_tracks.clear();

            let target = pick_next_index(
                inner.session.current_index,
                len,
                inner.session.shuffle,
                &mut rand::thread_rng(),
            );
            if target.is_none() && inner.session.current_index.is_some() {
                self.go_idle(&mut inner);
            }
            target
        };

        if let Some(index) = target {
            self.run_from(index).await;
        }
    }

    /// Steps back one track. Index 0 stays on index 0.
    pub async fn previous(&self) {
        let target = {
            let mut inner = self.lock();
            inner.auto_advance_halted = false;
            inner.failed_tracks.clear();
            inner
                .session
                .current_index
                .map(|index| index.saturating_sub(1))
        };

        if let Some(index) = target {
            self.run_from(index).await;
        }
    }

    pub async fn play(&self) {
        enum Plan {
            StartList,
            Restart(usize),
            Resumed,
        }

        let plan = {
            let mut inner = self.lock();
            match (inner.session.current_index, inner.session.active_backend) {
                (None, _) => Plan::StartList,
                // Halted while resolving, e.g. after a credential failure.
                (Some(index), ActiveBackend::None) if !inner.session.playing => {
                    Plan::Restart(index)
                }
                (Some(_), active) => {
                    inner.session.playing = true;
                    if let Some(backend) = self.backend_for(active) {
                        log_rejection(backend.play(), "play");
                    }
                    if active == ActiveBackend::Fallback {
                        self.keep_alive.resume();
                    }
                    Plan::Resumed
                }
            }
        };

        match plan {
            Plan::StartList => self.play_all().await,
            Plan::Restart(index) => self.select_track(index).await,
            Plan::Resumed => self.publish_playback_state(true),
        }
    }

    pub fn pause(&self) {
        {
            let mut inner = self.lock();
            inner.session.playing = false;

            let active = inner.session.active_backend;
            if let Some(backend) = self.backend_for(active) {
                log_rejection(backend.pause(), "pause");
            }
            if active == ActiveBackend::Fallback {
                self.keep_alive.suspend();
            }
        }

        self.publish_playback_state(false);
    }

    pub async fn toggle_play(&self) {
        let playing = self.lock().session.playing;
        if playing {
            self.pause();
        } else {
            self.play().await;
        }
    }

    /// Moves the active backend to `position` seconds, clamped to the known
    /// duration. Returns the applied position.
    pub fn seek(&self, position: f64) -> f64 {
        let mut inner = self.lock();
        let target = clamp_position(position, inner.session.duration);

        if let Some(backend) = self.backend_for(inner.session.active_backend) {
            log_rejection(backend.seek(target), "seek");
        }
        inner.session.position = target;
        self.publish_position(&inner.session);

        target
    }

    pub fn seek_by(&self, delta: f64) -> f64 {
        let position = self.lock().session.position;
        self.seek(position + delta)
    }

    /// Sets the volume on a 0..=100 scale. Returns the applied level.
    pub fn set_volume(&self, level: u8) -> u8 {
        let level = level.min(100);
        let mut inner = self.lock();
        inner.volume = level;

        if let Some(backend) = self.backend_for(inner.session.active_backend) {
            log_rejection(backend.set_volume(level), "set_volume");
        }

        level
    }

    pub fn set_shuffle(&self, shuffle: bool) {
        let current = {
            let mut inner = self.lock();
            if inner.session.shuffle == shuffle {
                return;
            }
            inner.session.shuffle = shuffle;
            inner.session.current_index
        };

        info!(shuffle, "Shuffle changed");

        // The upcoming track depends on the mode.
        if let Some(current) = current {
            self.schedule_prefetch(current, shuffle);
        }
    }

    pub fn toggle_shuffle(&self) -> bool {
        let shuffle = !self.lock().session.shuffle;
        self.set_shuffle(shuffle);
        shuffle
    }

    /// Applies an event reported by one of the backends. Events from a
    /// backend that is no longer active, or from an older load, are ignored.
    pub async fn handle_backend_event(
        &self,
        kind: BackendKind,
        token: PlaybackToken,
        event: BackendEvent,
    ) {
        match event {
            BackendEvent::Ended => {
                if self.owns(kind, token) {
                    self.advance_after(token).await;
                }
            }
            BackendEvent::Error { message } => match kind {
                BackendKind::Native => self.recover_native(token, message).await,
                BackendKind::Fallback => self.skip_after_fallback_error(token, message).await,
            },
            report => self.apply_report(kind, token, report),
        }
    }

    pub async fn handle_media_action(&self, action: MediaAction) {
        debug!(?action, "Media action");

        match action {
            MediaAction::Play => self.play().await,
            MediaAction::Pause => self.pause(),
            MediaAction::PreviousTrack => self.previous().await,
            MediaAction::NextTrack => self.next().await,
            MediaAction::SeekForward => {
                self.seek_by(self.config.seek_step);
            }
            MediaAction::SeekBackward => {
                self.seek_by(-self.config.seek_step);
            }
        }
    }

    /// Keeps the embedded backend going while the page is hidden. Hiding
    /// schedules play retries until the backend reports itself as playing;
    /// showing resumes it right away.
    pub fn on_visibility_change(&self, hidden: bool) {
        let mut inner = self.lock();
        if inner.session.active_backend != ActiveBackend::Fallback || !inner.session.playing {
            return;
        }

        self.keep_alive.resume();

        if !hidden {
            if !inner.fallback_reports_playing {
                log_rejection(self.fallback.play(), "play");
            }
            return;
        }

        let token = PlaybackToken::new(inner.generation);
        let delays = self.config.visibility_retry_delays.clone();
        let state = self.inner.clone();
        let fallback = self.fallback.clone();

        let task = tokio::spawn(async move {
            for delay in delays {
                tokio::time::sleep(delay).await;

                let inner = lock_inner(&state);
                let still_wanted = inner.generation == token.generation
                    && inner.session.active_backend == ActiveBackend::Fallback
                    && inner.session.playing;
                if !still_wanted || inner.fallback_reports_playing {
                    return;
                }

                debug!(?delay, "Nudging embedded backend after visibility change");
                log_rejection(fallback.play(), "play");
            }
        });

        if let Some(previous) = inner.visibility_task.replace(task) {
            previous.abort();
        }
    }

    /// Replaces the track list and starts a fresh session. Shuffle and
    /// volume carry over.
    pub fn reset(&self, tracks: Vec<TrackDescriptor>) {
        let mut inner = self.lock();
        self.stop_active(&mut inner);
        inner.generation += 1;

        let shuffle = inner.session.shuffle;
        inner.session = PlaybackSession {
            shuffle,
            ..PlaybackSession::default()
        };
        inner.native_failures = 0;
        inner.native_unplayable.clear();
        inner.auto_advance_halted = false;
        inner.failed_tracks.clear();
        inner.fallback_reports_playing = false;

        info!(tracks = tracks.len(), "Track list replaced");
        self.tracks.replace(tracks);

        if let Some(host) = &self.media_session {
            host.set_metadata(None);
            host.set_playback_state(MediaPlaybackState::None);
        }
    }

    /// Resolves the media id of every track that still lacks one. Returns the
    /// number of tracks that gained a media id.
    pub async fn resolve_all(&self) -> Result<usize, CredentialError> {
        let credentials = self.credentials.credentials().await?;
        let tracks = self.tracks.snapshot();

        let queries: Vec<(usize, String)> = tracks
            .iter()
            .enumerate()
            .filter(|(_, track)| track.media_id.is_none())
            .map(|(index, track)| (index, track.query.clone()))
            .collect();
        if queries.is_empty() {
            return Ok(0);
        }

        let resolved = self
            .track_resolver
            .resolve_many(&queries, &credentials)
            .await;

        // Keyed by identity: the list may have been replaced meanwhile.
        let attached = resolved
            .into_iter()
            .filter_map(|(index, media_id)| {
                let track = tracks.get(index)?;
                self.tracks.attach_media_id(&track.id, media_id)
            })
            .count();

        info!(requested = queries.len(), attached, "Batch resolution finished");

        Ok(attached)
    }

    /// Stops playback for good and releases the keep-alive signal and the
    /// media-session registrations.
    pub fn dispose(&self) {
        let mut inner = self.lock();
        if inner.disposed {
            return;
        }

        inner.disposed = true;
        self.stop_active(&mut inner);
        inner.generation += 1;
        inner.session.current_index = None;
        inner.session.playing = false;

        if let Some(task) = inner.prefetch_task.take() {
            task.abort();
        }
        if let Some(task) = inner.visibility_task.take() {
            task.abort();
        }

        self.keep_alive.teardown();

        if let Some(host) = &self.media_session {
            host.clear_actions();
            host.set_metadata(None);
            host.set_playback_state(MediaPlaybackState::None);
        }

        info!("Playback engine disposed");
    }

    #[cfg(test)]
    pub(crate) async fn settle_prefetch(&self) {
        let task = self.lock().prefetch_task.take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineInner> {
        lock_inner(&self.inner)
    }

    fn backend_of(&self, kind: BackendKind) -> &Arc<dyn PlaybackBackend> {
        match kind {
            BackendKind::Native => &self.native,
            BackendKind::Fallback => &self.fallback,
        }
    }

    fn backend_for(&self, active: ActiveBackend) -> Option<&Arc<dyn PlaybackBackend>> {
        active.kind().map(|kind| self.backend_of(kind))
    }

    fn is_current(&self, token: PlaybackToken) -> bool {
        let inner = self.lock();
        !inner.disposed && inner.generation == token.generation
    }

    fn owns(&self, kind: BackendKind, token: PlaybackToken) -> bool {
        let inner = self.lock();
        let owns = inner.generation == token.generation
            && inner.session.active_backend == ActiveBackend::from(kind);
        if !owns {
            debug!(?kind, generation = token.generation, "Dropping event from a stale load");
        }
        owns
    }

    async fn run_from(&self, mut index: usize) {
        loop {
            let Some((token, track)) = self.begin(index) else {
                return;
            };

            info!(index, track_id = %track.id, generation = token.generation, "Selecting track");

            match self.resolve(token, track).await {
                Step::Done => return,
                Step::Skip => match self.skip_target(token) {
                    Some(next) => index = next,
                    None => return,
                },
            }
        }
    }

    fn begin(&self, index: usize) -> Option<(PlaybackToken, TrackDescriptor)> {
        let Some(track) = self.tracks.get(index) else {
            warn!(index, "Track index out of range");
            return None;
        };

        let mut inner = self.lock();
        if inner.disposed {
            return None;
        }

        self.stop_active(&mut inner);
        inner.generation += 1;
        inner.native_failures = 0;
        inner.fallback_reports_playing = false;

        let session = &mut inner.session;
        session.current_index = Some(index);
        session.playing = true;
        session.position = 0.0;
        session.duration = 0.0;

        Some((PlaybackToken::new(inner.generation), track))
    }

    async fn resolve(&self, token: PlaybackToken, track: TrackDescriptor) -> Step {
        let media_id = match track.media_id.clone() {
            Some(media_id) => media_id,
            None => match self.resolve_media_id(token, &track).await {
                Ok(media_id) => media_id,
                Err(step) => return step,
            },
        };

        if !self.is_current(token) {
            debug!(track_id = %track.id, "Selection moved on before stream resolution");
            return Step::Done;
        }

        let stream_url = self.resolve_stream(token, &track.id, &media_id).await;
        self.start_playback(token, &track, media_id, stream_url)
    }

    /// `Err` carries the step to take when no media id could be obtained.
    async fn resolve_media_id(
        &self,
        token: PlaybackToken,
        track: &TrackDescriptor,
    ) -> Result<MediaId, Step> {
        let credentials = match self.credentials.credentials().await {
            Ok(credentials) => credentials,
            Err(error) => {
                warn!(?error, "Search credentials unavailable");
                self.halt(token, EngineNotice::CredentialsRequired);
                return Err(Step::Done);
            }
        };

        self.listener.notify(EngineNotice::Searching {
            track_id: track.id.clone(),
            title: track.title.clone(),
        });

        match self
            .track_resolver
            .resolve_track_id(&track.query, &credentials)
            .await
        {
            // Attached even when the selection moved on; the id stays valid
            // for this track.
            Ok(Some(media_id)) => Ok(self
                .tracks
                .attach_media_id(&track.id, media_id.clone())
                .unwrap_or(media_id)),
            Ok(None) => {
                if self.is_current(token) {
                    self.listener.notify(EngineNotice::TrackNotFound {
                        track_id: track.id.clone(),
                        title: track.title.clone(),
                    });
                }
                Err(Step::Skip)
            }
            Err(TrackError::Auth) => {
                self.credentials.invalidate();
                self.halt(token, EngineNotice::CredentialsRejected);
                Err(Step::Done)
            }
            Err(error) => {
                if self.is_current(token) {
                    self.listener.notify(EngineNotice::SearchFailed {
                        track_id: track.id.clone(),
                        title: track.title.clone(),
                        reason: error.to_string(),
                    });
                }
                Err(Step::Skip)
            }
        }
    }

    async fn resolve_stream(
        &self,
        token: PlaybackToken,
        track_id: &TrackId,
        media_id: &MediaId,
    ) -> Option<StreamUrl> {
        let unplayable = self.lock().native_unplayable.contains(track_id);
        if unplayable {
            debug!(%track_id, "Track is native-unplayable for this session");
            return None;
        }

        let mut attempt = 0;
        loop {
            if let Some(url) = self.stream_resolver.resolve_stream_url(media_id).await {
                return Some(url);
            }
            if attempt >= self.config.stream_retry_limit || !self.is_current(token) {
                return None;
            }

            attempt += 1;
            tokio::time::sleep(self.config.stream_retry_delay).await;
            self.stream_resolver.evict(media_id);
            debug!(%media_id, attempt, "Retrying stream resolution");
        }
    }

    fn start_playback(
        &self,
        token: PlaybackToken,
        track: &TrackDescriptor,
        media_id: MediaId,
        stream_url: Option<StreamUrl>,
    ) -> Step {
        let (index, shuffle, playing, active) = {
            let mut inner = self.lock();
            if inner.disposed || inner.generation != token.generation {
                debug!(track_id = %track.id, generation = token.generation, "Dropping stale resolution");
                return Step::Done;
            }
            let Some(index) = inner.session.current_index else {
                return Step::Done;
            };

            let active = self.activate(&mut inner, token, &media_id, stream_url.clone());
            match active {
                ActiveBackend::None => return Step::Skip,
                ActiveBackend::Native => self.tracks.set_stream_url(&track.id, stream_url),
                ActiveBackend::Fallback => (),
            }
            inner.failed_tracks.clear();

            (index, inner.session.shuffle, inner.session.playing, active)
        };

        let mut described = track.clone();
        described.media_id = Some(media_id);
        self.publish_metadata(&described);
        self.publish_playback_state(playing);

        if let Some(backend) = active.kind() {
            info!(track_id = %track.id, ?backend, generation = token.generation, "Playback started");
            self.listener.notify(EngineNotice::NowPlaying {
                track_id: track.id.clone(),
                title: track.title.clone(),
                backend,
            });
        }

        self.schedule_prefetch(index, shuffle);

        Step::Done
    }

    /// Loads the stream on the native backend, or the media id on the
    /// embedded backend when there is no stream or the native load fails.
    fn activate(
        &self,
        inner: &mut EngineInner,
        token: PlaybackToken,
        media_id: &MediaId,
        stream_url: Option<StreamUrl>,
    ) -> ActiveBackend {
        if let Some(url) = stream_url {
            match self.native.load(&MediaSource::Stream(url), token) {
                Ok(()) => {
                    self.start_backend(inner, BackendKind::Native);
                    return ActiveBackend::Native;
                }
                Err(error) => {
                    warn!(%media_id, ?error, "Native backend refused the stream, using embedded playback");
                }
            }
        }

        match self
            .fallback
            .load(&MediaSource::Embedded(media_id.clone()), token)
        {
            Ok(()) => {
                self.start_backend(inner, BackendKind::Fallback);
                ActiveBackend::Fallback
            }
            Err(error) => {
                error!(%media_id, ?error, "Embedded backend refused the media id");
                ActiveBackend::None
            }
        }
    }

    fn start_backend(&self, inner: &mut EngineInner, kind: BackendKind) {
        inner.session.active_backend = kind.into();

        let backend = self.backend_of(kind);
        log_rejection(backend.set_volume(inner.volume), "set_volume");

        if inner.session.playing {
            log_rejection(backend.play(), "play");
            if kind == BackendKind::Fallback {
                self.keep_alive.resume();
            }
        }
    }

    fn stop_active(&self, inner: &mut EngineInner) {
        let active = inner.session.active_backend;
        if let Some(backend) = self.backend_for(active) {
            log_rejection(backend.stop(), "stop");
        }
        if active == ActiveBackend::Fallback {
            self.keep_alive.suspend();
        }
        if let Some(task) = inner.visibility_task.take() {
            task.abort();
        }
        inner.session.active_backend = ActiveBackend::None;
    }

    fn go_idle(&self, inner: &mut EngineInner) {
        self.stop_active(inner);
        inner.generation += 1;

        let session = &mut inner.session;
        session.current_index = None;
        session.playing = false;
        session.position = 0.0;
        session.duration = 0.0;

        info!("Reached the end of the track list");

        if let Some(host) = &self.media_session {
            host.set_metadata(None);
            host.set_playback_state(MediaPlaybackState::None);
        }
    }

    /// Stops automatic advancement and surfaces the notice.
    fn halt(&self, token: PlaybackToken, notice: EngineNotice) {
        {
            let mut inner = self.lock();
            if inner.generation != token.generation {
                return;
            }
            inner.session.playing = false;
            inner.auto_advance_halted = true;
        }

        warn!(?notice, "Automatic advancement halted");
        self.publish_playback_state(false);
        self.listener.notify(notice);
    }

    /// Next index after a track was skipped without playing. Playback stops
    /// only once every track in the list has failed; shuffle prefers tracks
    /// that have not failed yet.
    fn skip_target(&self, token: PlaybackToken) -> Option<usize> {
        let tracks = self.tracks.snapshot();
        let mut inner = self.lock();
        if inner.generation != token.generation || inner.auto_advance_halted {
            return None;
        }

        let current = inner.session.current_index;
        if let Some(track) = current.and_then(|index| tracks.get(index)) {
            inner.failed_tracks.insert(track.id.clone());
        }

        let all_failed = tracks
            .iter()
            .all(|track| inner.failed_tracks.contains(&track.id));
        if all_failed {
            warn!(len = tracks.len(), "No track in the list could be played, stopping");
            self.go_idle(&mut inner);
            return None;
        }

        let mut rng = rand::thread_rng();
        let target = if inner.session.shuffle {
            pick_untried_index(current, &tracks, &inner.failed_tracks, &mut rng)
        } else {
            pick_next_index(current, tracks.len(), false, &mut rng)
        };
        if target.is_none() {
            self.go_idle(&mut inner);
        }
        target
    }

    async fn advance_after(&self, token: PlaybackToken) {
        let len = self.tracks.len();
        let target = {
            let mut inner = self.lock();
            if inner.generation != token.generation {
                return;
            }
            if inner.auto_advance_halted {
                inner.session.playing = false;
                return;
            }

            let target = pick_next_index(
                inner.session.current_index,
                len,
                inner.session.shuffle,
                &mut rand::thread_rng(),
            );
            if target.is_none() {
                self.go_idle(&mut inner);
            }
            target
        };

        if let Some(index) = target {
            self.run_from(index).await;
        }
    }

    /// Evicts the stream URL and resolves again. Past the retry bound the
    /// track stays on the embedded backend for the rest of the session.
    async fn recover_native(&self, token: PlaybackToken, message: String) {
        if !self.owns(BackendKind::Native, token) {
            return;
        }
        let error = TrackError::Playback(message);

        let (token, track, media_id) = {
            let mut inner = self.lock();
            if inner.generation != token.generation {
                return;
            }
            let Some(track) = inner
                .session
                .current_index
                .and_then(|index| self.tracks.get(index))
            else {
                return;
            };
            let Some(media_id) = track.media_id.clone() else {
                return;
            };

            self.stream_resolver.evict(&media_id);
            self.tracks.set_stream_url(&track.id, None);

            inner.native_failures += 1;
            if inner.native_failures > self.config.native_error_retry_limit {
                inner.native_unplayable.insert(track.id.clone());
            }
            warn!(track_id = %track.id, %error, failures = inner.native_failures, "Native playback failed");

            self.stop_active(&mut inner);
            inner.generation += 1;
            inner.session.position = 0.0;
            inner.session.duration = 0.0;

            (PlaybackToken::new(inner.generation), track, media_id)
        };

        let stream_url = self.resolve_stream(token, &track.id, &media_id).await;
        if let Step::Skip = self.start_playback(token, &track, media_id, stream_url) {
            if let Some(index) = self.skip_target(token) {
                self.run_from(index).await;
            }
        }
    }

    async fn skip_after_fallback_error(&self, token: PlaybackToken, message: String) {
        if !self.owns(BackendKind::Fallback, token) {
            return;
        }

        warn!(%message, generation = token.generation, "Embedded playback failed, skipping track");
        tokio::time::sleep(self.config.fallback_error_skip_delay).await;
        self.advance_after(token).await;
    }

    fn apply_report(&self, kind: BackendKind, token: PlaybackToken, event: BackendEvent) {
        let mut inner = self.lock();
        if inner.generation != token.generation
            || inner.session.active_backend != ActiveBackend::from(kind)
        {
            debug!(?kind, generation = token.generation, ?event, "Dropping report from a stale load");
            return;
        }
        let backend = self.backend_of(kind);

        match event {
            BackendEvent::MetadataReady { duration } => {
                if duration.is_finite() && duration > 0.0 {
                    inner.session.duration = duration;
                }
                log_rejection(backend.set_volume(inner.volume), "set_volume");
                if inner.session.playing {
                    log_rejection(backend.play(), "play");
                }
                self.publish_position(&inner.session);
            }
            BackendEvent::TimeUpdate { position, duration } => {
                inner.session.position = position.max(0.0);
                if duration.is_finite() && duration > 0.0 {
                    inner.session.duration = duration;
                }
                self.publish_position(&inner.session);
            }
            BackendEvent::Playing => {
                if kind == BackendKind::Fallback {
                    inner.fallback_reports_playing = true;
                }
                self.publish_playback_state(true);
            }
            BackendEvent::Paused => {
                if kind == BackendKind::Fallback {
                    inner.fallback_reports_playing = false;
                }
                self.publish_playback_state(false);
            }
            BackendEvent::Ended | BackendEvent::Error { .. } => (),
        }
    }

    fn schedule_prefetch(&self, current: usize, shuffle: bool) {
        if let Some(task) = self.prefetch.schedule(current, shuffle) {
            self.lock().prefetch_task.replace(task);
        }
    }

    fn publish_metadata(&self, track: &TrackDescriptor) {
        if let Some(host) = &self.media_session {
            host.set_metadata(Some(MediaMetadata::for_track(
                track,
                &self.config.artwork_base,
                self.config.album.as_deref(),
            )));
        }
    }

    fn publish_playback_state(&self, playing: bool) {
        if let Some(host) = &self.media_session {
            host.set_playback_state(if playing {
                MediaPlaybackState::Playing
            } else {
                MediaPlaybackState::Paused
            });
        }
    }

    fn publish_position(&self, session: &PlaybackSession) {
        if session.duration <= 0.0 {
            return;
        }

        if let Some(host) = &self.media_session {
            host.set_position_state(PositionState {
                duration: session.duration,
                position: session.position.min(session.duration),
                playback_rate: 1.0,
            });
        }
    }
}
