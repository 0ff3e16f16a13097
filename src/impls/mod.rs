mod mirrors;
mod search;

pub(crate) use mirrors::mirror_providers;
pub(crate) use search::YouTubeSearchEndpoint;
