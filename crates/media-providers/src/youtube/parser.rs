use serde::Deserialize;

#[derive(Debug, PartialEq, Clone)]
pub struct VideoSearchResult {
    pub video_id: String,
    pub title: String,
    pub channel_title: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: Option<Snippet>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    video_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    channel_title: String,
}

const HTML_ENTITIES: [(&str, &str); 6] = [
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&#039;", "'"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&amp;", "&"),
];

/// Snippet fields arrive HTML-escaped.
pub(crate) fn decode_html_entities(text: &str) -> String {
    HTML_ENTITIES
        .iter()
        .fold(text.to_string(), |text, (entity, replacement)| {
            text.replace(entity, replacement)
        })
}

/// Parses a search response, keeping result order. Items that are not
/// videos are skipped.
pub(crate) fn parse_search_response(raw: &str) -> Result<Vec<VideoSearchResult>, serde_json::Error> {
    let response: SearchResponse = serde_json::from_str(raw)?;

    Ok(response
        .items
        .into_iter()
        .filter_map(|item| {
            let video_id = item.id.video_id?;
            let snippet = item.snippet.unwrap_or(Snippet {
                title: String::new(),
                channel_title: String::new(),
            });

            Some(VideoSearchResult {
                video_id,
                title: decode_html_entities(&snippet.title),
                channel_title: decode_html_entities(&snippet.channel_title),
            })
        })
        .collect())
}
