use crate::resolution::types::SearchCandidate;
use crate::MediaId;

/// Annotations the track generator appends to queries. They describe the
/// upload, not the track, so they are not matched as tokens.
const ANNOTATION_PHRASES: [&str; 10] = [
    "(official audio)",
    "(official video)",
    "(official music video)",
    "(lyric video)",
    "(lyrics)",
    "(audio)",
    "[official audio]",
    "[official video]",
    "(audio oficial)",
    "(video oficial)",
];

const QUALITY_TERMS: [&str; 5] = ["official", "audio", "lyric", "- topic", "video oficial"];

const UNDESIRED_TERMS: [&str; 7] = [
    "reaction",
    "review",
    "cover",
    "tutorial",
    "karaoke",
    "instrumental",
    "remix",
];

const LONG_FORM_TERMS: [&str; 2] = ["full album", "completo"];

const PREVIEW_TERMS: [&str; 2] = ["preview", "teaser"];

const TRUSTED_CHANNEL_MARKERS: [&str; 3] = ["vevo", "- topic", "official"];

const TOKEN_MATCH_SCORE: i32 = 3;
const QUALITY_TERM_SCORE: i32 = 2;
const UNDESIRED_TERM_PENALTY: i32 = 5;
const REMIX_EXTRA_PENALTY: i32 = 3;
const LONG_FORM_PENALTY: i32 = 2;
const PREVIEW_PENALTY: i32 = 5;
const TRUSTED_CHANNEL_SCORE: i32 = 4;

/// Significant tokens of a query: annotations stripped, lower-cased, split on
/// whitespace and hyphens, shorter than three characters dropped.
pub fn query_tokens(query: &str) -> Vec<String> {
    let mut query = query.to_lowercase();
    for phrase in ANNOTATION_PHRASES {
        query = query.replace(phrase, " ");
    }

    query
        .split(|c: char| c.is_whitespace() || c == '-')
        .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|token| token.chars().count() > 2)
        .map(str::to_string)
        .collect()
}

/// Scores a single candidate against a query. Higher is better.
pub fn score_candidate(query: &str, candidate: &SearchCandidate) -> i32 {
    let query_lower = query.to_lowercase();
    let title = candidate.title.to_lowercase();
    let channel = candidate.channel.to_lowercase();
    let requested = |term: &str| query_lower.contains(term);

    let mut score = query_tokens(query)
        .iter()
        .filter(|token| title.contains(token.as_str()))
        .count() as i32
        * TOKEN_MATCH_SCORE;

    score += QUALITY_TERMS
        .iter()
        .filter(|term| title.contains(*term))
        .count() as i32
        * QUALITY_TERM_SCORE;

    for term in UNDESIRED_TERMS {
        if title.contains(term) && !requested(term) {
            score -= UNDESIRED_TERM_PENALTY;
            if term == "remix" {
                score -= REMIX_EXTRA_PENALTY;
            }
        }
    }

    if LONG_FORM_TERMS.iter().any(|term| title.contains(term)) {
        score -= LONG_FORM_PENALTY;
    }

    if PREVIEW_TERMS.iter().any(|term| title.contains(term)) {
        score -= PREVIEW_PENALTY;
    }

    if TRUSTED_CHANNEL_MARKERS
        .iter()
        .any(|marker| channel.contains(marker))
    {
        score += TRUSTED_CHANNEL_SCORE;
    }

    score
}

/// Picks the best candidate for a query. Ties go to the earlier result, so
/// an all-equal set yields the first candidate; an empty set yields `None`.
pub fn pick_best_candidate(query: &str, candidates: &[SearchCandidate]) -> Option<MediaId> {
    let mut best: Option<(i32, &SearchCandidate)> = None;

    for candidate in candidates {
        let score = score_candidate(query, candidate);
        match best {
            Some((best_score, _)) if best_score >= score => (),
            _ => best = Some((score, candidate)),
        }
    }

    best.map(|(_, candidate)| candidate.media_id.clone())
}
