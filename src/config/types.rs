use serde::Deserialize;

/// Recognised link substrings and file-extension substrings for gated posts
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Filters {
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub filetypes: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub bot_token: String,
    pub guild_id: u64,
    pub feedback_channel_id: u64,
    pub announcement_channel_id: u64,
    pub db_path: String,
    pub filters_path: String,
    pub log_level: String,
}

/// Message tokens and point rules.
///
/// The two minimum lengths differ for known and unknown authors, and spending
/// on a post also credits `total_reviews`. Both are kept as-is here.
#[derive(Debug, Clone)]
pub struct Thresholds {
    pub command_prefix: String,
    pub escape_prefix: String,
    pub feedback_marker: String,
    pub marker_closure: String,
    pub existing_user_min_len: usize,
    pub new_user_min_len: usize,
    pub post_cost: i64,
    pub post_review_credit: i64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            command_prefix: "!#".to_string(),
            escape_prefix: "c#".to_string(),
            feedback_marker: "<feedback>".to_string(),
            marker_closure: "k>".to_string(),
            existing_user_min_len: 190,
            new_user_min_len: 55,
            post_cost: 3,
            post_review_credit: 3,
        }
    }
}
