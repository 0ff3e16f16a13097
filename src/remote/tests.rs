use super::outbox::{BackendCommand, KeepAliveCommand, MediaSessionUpdate, RemoteMessage};
use super::{
    OutboxListener, RemoteBridge, RemoteKeepAlive, RemoteMediaSession, RemoteOutbox,
    SessionCredentials,
};
use playback_core::playback::{
    BackendKind, EngineListener, EngineNotice, KeepAlive, MediaPlaybackState, MediaSessionHost,
    MediaSource, PlaybackBackend, PlaybackToken, Progress,
};
use playback_core::resolution::{CredentialError, CredentialProvider};
use playback_core::MediaId;
use serde_json::json;
use std::sync::Arc;

fn messages(outbox: &RemoteOutbox) -> Vec<RemoteMessage> {
    outbox
        .drain()
        .into_iter()
        .map(|entry| entry.message)
        .collect()
}

#[test]
fn test_outbox_sequences_survive_drains() {
    let outbox = RemoteOutbox::default();

    outbox.push(RemoteMessage::KeepAlive {
        command: KeepAliveCommand::Resume,
    });
    outbox.push(RemoteMessage::KeepAlive {
        command: KeepAliveCommand::Suspend,
    });
    let first = outbox.drain();
    outbox.push(RemoteMessage::KeepAlive {
        command: KeepAliveCommand::Teardown,
    });
    let second = outbox.drain();

    assert_eq!(
        vec![1, 2],
        first.iter().map(|entry| entry.sequence).collect::<Vec<_>>()
    );
    assert_eq!(3, second[0].sequence);
    assert!(outbox.drain().is_empty());
}

#[test]
fn test_full_outbox_drops_oldest() {
    let outbox = RemoteOutbox::with_capacity(2);

    for command in [
        KeepAliveCommand::Resume,
        KeepAliveCommand::Suspend,
        KeepAliveCommand::Teardown,
    ] {
        outbox.push(RemoteMessage::KeepAlive { command });
    }

    let entries = outbox.drain();
    assert_eq!(
        vec![2, 3],
        entries.iter().map(|entry| entry.sequence).collect::<Vec<_>>()
    );
}

#[test]
fn test_outbox_entry_json() {
    let outbox = RemoteOutbox::default();
    outbox.push(RemoteMessage::Backend {
        backend: BackendKind::Fallback,
        command: BackendCommand::Load {
            source: MediaSource::Embedded(MediaId::from("abc")),
            token: PlaybackToken::new(7),
        },
    });
    outbox.push(RemoteMessage::Notice {
        notice: EngineNotice::CredentialsRequired,
    });

    let json = serde_json::to_value(outbox.drain()).unwrap();

    assert_eq!(
        json!([
            {
                "sequence": 1,
                "target": "backend",
                "backend": "fallback",
                "command": {
                    "action": "load",
                    "source": { "kind": "embedded", "value": "abc" },
                    "token": { "generation": 7 }
                }
            },
            {
                "sequence": 2,
                "target": "notice",
                "notice": { "type": "credentials_required" }
            }
        ]),
        json
    );
}

#[test]
fn test_backend_commands_are_queued() {
    let outbox = Arc::new(RemoteOutbox::default());
    let bridge = RemoteBridge::new(outbox.clone());
    let native = bridge.backend(BackendKind::Native);

    native
        .load(
            &MediaSource::Stream("https://mirror/a".into()),
            PlaybackToken::new(1),
        )
        .unwrap();
    native.set_volume(40).unwrap();
    native.seek(12.5).unwrap();
    native.stop().unwrap();

    let commands = messages(&outbox)
        .into_iter()
        .map(|message| match message {
            RemoteMessage::Backend { backend, command } => {
                assert_eq!(BackendKind::Native, backend);
                command
            }
            other => panic!("unexpected message {:?}", other),
        })
        .collect::<Vec<_>>();
    assert_eq!(
        vec![
            BackendCommand::Load {
                source: MediaSource::Stream("https://mirror/a".into()),
                token: PlaybackToken::new(1),
            },
            BackendCommand::SetVolume { level: 40 },
            BackendCommand::Seek { position: 12.5 },
            BackendCommand::Stop,
        ],
        commands
    );
}

#[test]
fn test_only_fallback_is_polled() {
    let bridge = RemoteBridge::new(Arc::new(RemoteOutbox::default()));

    assert!(bridge.native.pushes_progress());
    assert!(!bridge.fallback.pushes_progress());
}

#[test]
fn test_progress_reports_follow_current_load() {
    let bridge = RemoteBridge::new(Arc::new(RemoteOutbox::default()));
    let fallback = &bridge.fallback;
    let progress = Progress {
        position: 3.0,
        duration: 200.0,
    };

    // Nothing loaded yet.
    assert!(!fallback.report_progress(PlaybackToken::new(1), progress));

    fallback
        .load(
            &MediaSource::Embedded(MediaId::from("abc")),
            PlaybackToken::new(2),
        )
        .unwrap();
    assert!(!fallback.report_progress(PlaybackToken::new(1), progress));
    assert_eq!(None, fallback.progress());

    assert!(fallback.report_progress(PlaybackToken::new(2), progress));
    assert_eq!(Some(progress), fallback.progress());

    fallback.stop().unwrap();
    assert_eq!(None, fallback.progress());
}

#[test]
fn test_media_session_and_keep_alive_messages() {
    let outbox = Arc::new(RemoteOutbox::default());
    let session = RemoteMediaSession::new(outbox.clone());
    let keep_alive = RemoteKeepAlive::new(outbox.clone());
    let listener = OutboxListener::new(outbox.clone());

    session.set_playback_state(MediaPlaybackState::Paused);
    keep_alive.resume();
    listener.notify(EngineNotice::CredentialsRejected);
    session.clear_actions();

    assert_eq!(
        vec![
            RemoteMessage::MediaSession {
                update: MediaSessionUpdate::PlaybackState {
                    state: MediaPlaybackState::Paused
                }
            },
            RemoteMessage::KeepAlive {
                command: KeepAliveCommand::Resume
            },
            RemoteMessage::Notice {
                notice: EngineNotice::CredentialsRejected
            },
            RemoteMessage::MediaSession {
                update: MediaSessionUpdate::ClearActions
            },
        ],
        messages(&outbox)
    );
}

#[actix_rt::test]
async fn test_credentials_from_config_and_page() {
    let credentials = SessionCredentials::new(Some("key".to_string()));
    assert!(credentials.is_configured());

    let current = credentials.credentials().await.unwrap();
    assert_eq!(Some("key"), current.api_key());
    assert_eq!(None, current.access_token());

    credentials.update(None, Some("token".to_string()));
    let current = credentials.credentials().await.unwrap();
    assert_eq!(Some("key"), current.api_key());
    assert_eq!(Some("token"), current.access_token());
}

#[actix_rt::test]
async fn test_invalidate_clears_the_credential_in_use() {
    let credentials = SessionCredentials::new(Some("key".to_string()));
    credentials.update(None, Some("token".to_string()));

    credentials.invalidate();
    let current = credentials.credentials().await.unwrap();
    assert_eq!(None, current.access_token());
    assert_eq!(Some("key"), current.api_key());

    credentials.invalidate();
    assert!(!credentials.is_configured());
    assert!(matches!(
        credentials.credentials().await,
        Err(CredentialError::NotConfigured)
    ));
}

#[actix_rt::test]
async fn test_blank_credentials_count_as_missing() {
    let credentials = SessionCredentials::new(Some("  ".to_string()));
    assert!(!credentials.is_configured());

    credentials.update(Some("key".to_string()), None);
    assert!(credentials.is_configured());

    credentials.update(Some(String::new()), None);
    assert!(!credentials.is_configured());
}
