use playback_core::playback::{EngineConfig, ShufflePrefetch};
use playback_core::resolution::{StreamResolverConfig, TrackResolverConfig};
use serde::Deserialize;
use std::time::Duration;

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_shutdown_timeout() -> u64 {
    30u64
}

fn default_youtube_api_endpoint() -> String {
    "https://www.googleapis.com/youtube/v3".to_string()
}

fn default_search_max_results() -> usize {
    5usize
}

fn default_search_timeout_secs() -> u64 {
    10u64
}

fn default_piped_instances() -> Vec<String> {
    vec![
        "https://pipedapi.kavin.rocks".to_string(),
        "https://pipedapi.adminforge.de".to_string(),
        "https://pipedapi.r4fo.com".to_string(),
    ]
}

fn default_invidious_instances() -> Vec<String> {
    vec![
        "https://inv.nadeko.net".to_string(),
        "https://invidious.nerdvpn.de".to_string(),
        "https://invidious.privacyredirect.com".to_string(),
    ]
}

fn default_mirror_timeout_secs() -> u64 {
    5u64
}

fn default_stream_url_ttl_secs() -> u64 {
    5 * 60 * 60
}

fn default_volume() -> u8 {
    80u8
}

fn default_album() -> String {
    "Atlas Sónico".to_string()
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct Config {
    #[serde(default = "default_bind_address")]
    pub(crate) bind_address: String,
    #[serde(default = "default_shutdown_timeout")]
    pub(crate) shutdown_timeout: u64,
    #[serde(default)]
    pub(crate) youtube_api_key: Option<String>,
    #[serde(default = "default_youtube_api_endpoint")]
    pub(crate) youtube_api_endpoint: String,
    #[serde(default = "default_search_max_results")]
    pub(crate) search_max_results: usize,
    #[serde(default = "default_search_timeout_secs")]
    pub(crate) search_timeout_secs: u64,
    #[serde(default = "default_piped_instances")]
    pub(crate) piped_instances: Vec<String>,
    #[serde(default = "default_invidious_instances")]
    pub(crate) invidious_instances: Vec<String>,
    #[serde(default = "default_mirror_timeout_secs")]
    pub(crate) mirror_timeout_secs: u64,
    #[serde(default = "default_stream_url_ttl_secs")]
    pub(crate) stream_url_ttl_secs: u64,
    #[serde(default)]
    pub(crate) shuffle_prefetch: ShufflePrefetch,
    #[serde(default = "default_volume")]
    pub(crate) default_volume: u8,
    #[serde(default = "default_album")]
    pub(crate) album: String,
}

impl Config {
    pub(crate) fn from_env() -> Self {
        match envy::from_env::<Self>() {
            Ok(config) => config,
            Err(error) => panic!("Missing environment variable: {:#?}", error),
        }
    }

    pub(crate) fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    pub(crate) fn mirror_timeout(&self) -> Duration {
        Duration::from_secs(self.mirror_timeout_secs)
    }

    /// Blank entries from sloppy comma-separated lists are dropped.
    pub(crate) fn piped_instances(&self) -> Vec<&str> {
        non_blank(&self.piped_instances)
    }

    pub(crate) fn invidious_instances(&self) -> Vec<&str> {
        non_blank(&self.invidious_instances)
    }

    pub(crate) fn track_resolver_config(&self) -> TrackResolverConfig {
        TrackResolverConfig {
            max_results: self.search_max_results,
            ..TrackResolverConfig::default()
        }
    }

    pub(crate) fn stream_resolver_config(&self) -> StreamResolverConfig {
        StreamResolverConfig {
            request_timeout: self.mirror_timeout(),
            positive_ttl: Duration::from_secs(self.stream_url_ttl_secs),
            ..StreamResolverConfig::default()
        }
    }

    pub(crate) fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            shuffle_prefetch: self.shuffle_prefetch,
            default_volume: self.default_volume,
            album: Some(self.album.clone()).filter(|album| !album.is_empty()),
            ..EngineConfig::default()
        }
    }
}

fn non_blank(instances: &[String]) -> Vec<&str> {
    instances
        .iter()
        .map(|instance| instance.trim())
        .filter(|instance| !instance.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        envy::from_iter(
            vars.iter()
                .map(|(key, value)| (key.to_string(), value.to_string())),
        )
        .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);

        assert_eq!("0.0.0.0:8080", config.bind_address);
        assert_eq!(None, config.youtube_api_key);
        assert_eq!(3, config.piped_instances().len());
        assert_eq!(3, config.invidious_instances().len());
        assert_eq!(ShufflePrefetch::FirstUnresolved, config.shuffle_prefetch);
        assert_eq!(
            Duration::from_secs(5 * 60 * 60),
            config.stream_resolver_config().positive_ttl
        );
        assert_eq!(Some("Atlas Sónico".to_string()), config.engine_config().album);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("YOUTUBE_API_KEY", "key"),
            ("SEARCH_MAX_RESULTS", "3"),
            ("PIPED_INSTANCES", "https://a.example, ,https://b.example"),
            ("MIRROR_TIMEOUT_SECS", "2"),
            ("SHUFFLE_PREFETCH", "random_unresolved"),
            ("ALBUM", ""),
        ]);

        assert_eq!(Some("key".to_string()), config.youtube_api_key);
        assert_eq!(3, config.track_resolver_config().max_results);
        assert_eq!(
            vec!["https://a.example", "https://b.example"],
            config.piped_instances()
        );
        assert_eq!(
            Duration::from_secs(2),
            config.stream_resolver_config().request_timeout
        );
        assert_eq!(
            ShufflePrefetch::RandomUnresolved,
            config.engine_config().shuffle_prefetch
        );
        assert_eq!(None, config.engine_config().album);
    }
}
