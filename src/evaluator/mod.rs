//! Pure decisions for feedback comments and gated posts.
//!
//! Nothing here touches the ledger or the platform; the event router applies
//! the returned outcome.

use crate::{
    config::{Filters, Thresholds},
    database::types::UserRecord,
    discordclient::Attachment,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackOutcome {
    /// Author tagged themselves, likely quoting
    SelfQuote,
    /// Known author, long enough comment
    Award,
    /// Known author, comment too short
    TooShort,
    /// Unknown author, long enough comment
    CreateWithPoint,
    /// Unknown author, comment too short
    CreateWithoutPoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    Unregistered,
    Publish,
    InsufficientPoints,
}

/// Everything after the first closure token, or the whole text when it is missing
pub fn extract_comment<'a>(content: &'a str, closure: &str) -> &'a str {
    content
        .find(closure)
        .map(|index| &content[index + closure.len()..])
        .unwrap_or(content)
}

pub fn evaluate_feedback(
    author_id: u64,
    target_id: u64,
    comment: &str,
    existing: Option<&UserRecord>,
    thresholds: &Thresholds,
) -> FeedbackOutcome {
    if author_id == target_id {
        return FeedbackOutcome::SelfQuote;
    }

    let length = comment.chars().count();
    match existing {
        Some(_) if length >= thresholds.existing_user_min_len => FeedbackOutcome::Award,
        Some(_) => FeedbackOutcome::TooShort,
        None if length >= thresholds.new_user_min_len => FeedbackOutcome::CreateWithPoint,
        None => FeedbackOutcome::CreateWithoutPoint,
    }
}

pub fn matches_link(content: &str, filters: &Filters) -> bool {
    content.contains("http") && filters.links.iter().any(|link| content.contains(link.as_str()))
}

/// First attachment whose filename carries a recognised file type
pub fn matching_attachment<'a>(
    attachments: &'a [Attachment],
    filters: &Filters,
) -> Option<&'a Attachment> {
    attachments.iter().find(|attachment| {
        filters
            .filetypes
            .iter()
            .any(|filetype| attachment.filename.contains(filetype.as_str()))
    })
}

pub fn evaluate_gate(existing: Option<&UserRecord>, thresholds: &Thresholds) -> GateOutcome {
    match existing {
        None => GateOutcome::Unregistered,
        Some(record) if record.points >= thresholds.post_cost => GateOutcome::Publish,
        Some(_) => GateOutcome::InsufficientPoints,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        evaluate_feedback, evaluate_gate, extract_comment, matches_link, matching_attachment,
        FeedbackOutcome, GateOutcome,
    };
    use crate::{
        config::{Filters, Thresholds},
        database::types::UserRecord,
        discordclient::Attachment,
    };

    fn record_with_points(points: i64) -> UserRecord {
        UserRecord {
            handle: "lowend".to_string(),
            discriminator: None,
            external_id: 1,
            points,
            total_reviews: 0,
            last_submitted: None,
        }
    }

    fn filters() -> Filters {
        Filters {
            links: vec!["soundcloud.com".to_string(), "youtu.be".to_string()],
            filetypes: vec![".mp3".to_string(), ".wav".to_string()],
        }
    }

    #[test]
    fn test_extract_comment_after_marker() {
        assert_eq!(
            extract_comment("<@7><feedback> great low end", "k>"),
            " great low end"
        );
        assert_eq!(extract_comment("no marker here", "k>"), "no marker here");
    }

    #[test]
    fn test_self_mention_is_a_quote() {
        let thresholds = Thresholds::default();
        let long = "a".repeat(300);
        assert_eq!(
            evaluate_feedback(1, 1, &long, Some(&record_with_points(0)), &thresholds),
            FeedbackOutcome::SelfQuote
        );
        assert_eq!(
            evaluate_feedback(1, 1, &long, None, &thresholds),
            FeedbackOutcome::SelfQuote
        );
    }

    #[test]
    fn test_existing_author_needs_long_comment() {
        let thresholds = Thresholds::default();
        let record = record_with_points(0);
        assert_eq!(
            evaluate_feedback(1, 2, &"a".repeat(190), Some(&record), &thresholds),
            FeedbackOutcome::Award
        );
        assert_eq!(
            evaluate_feedback(1, 2, &"a".repeat(189), Some(&record), &thresholds),
            FeedbackOutcome::TooShort
        );
    }

    // new authors only need 55 characters, known authors need 190
    #[test]
    fn test_new_author_threshold_is_lower() {
        let thresholds = Thresholds::default();
        assert_eq!(
            evaluate_feedback(1, 2, &"a".repeat(60), None, &thresholds),
            FeedbackOutcome::CreateWithPoint
        );
        assert_eq!(
            evaluate_feedback(1, 2, &"a".repeat(40), None, &thresholds),
            FeedbackOutcome::CreateWithoutPoint
        );
        assert_eq!(
            evaluate_feedback(1, 2, &"a".repeat(60), Some(&record_with_points(0)), &thresholds),
            FeedbackOutcome::TooShort
        );
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let thresholds = Thresholds::default();
        let comment = "é".repeat(55);
        assert_eq!(
            evaluate_feedback(1, 2, &comment, None, &thresholds),
            FeedbackOutcome::CreateWithPoint
        );
    }

    #[test]
    fn test_link_needs_http_and_filter() {
        let filters = filters();
        assert!(matches_link("https://soundcloud.com/me/track", &filters));
        assert!(!matches_link("soundcloud.com/me/track", &filters));
        assert!(!matches_link("https://example.com/track", &filters));
    }

    #[test]
    fn test_matching_attachment_skips_unrecognised_files() {
        let filters = filters();
        let attachments = vec![
            Attachment {
                filename: "cover.png".to_string(),
                url: "https://cdn.example/cover.png".to_string(),
            },
            Attachment {
                filename: "track.mp3".to_string(),
                url: "https://cdn.example/track.mp3".to_string(),
            },
        ];

        let found = matching_attachment(&attachments, &filters).expect("finds the mp3");
        assert_eq!(found.filename, "track.mp3");
        assert!(matching_attachment(&attachments[..1], &filters).is_none());
        assert!(matching_attachment(&[], &filters).is_none());
    }

    #[test]
    fn test_gate_outcomes() {
        let thresholds = Thresholds::default();
        assert_eq!(evaluate_gate(None, &thresholds), GateOutcome::Unregistered);
        assert_eq!(
            evaluate_gate(Some(&record_with_points(3)), &thresholds),
            GateOutcome::Publish
        );
        assert_eq!(
            evaluate_gate(Some(&record_with_points(2)), &thresholds),
            GateOutcome::InsufficientPoints
        );
        assert_eq!(
            evaluate_gate(Some(&record_with_points(-1)), &thresholds),
            GateOutcome::InsufficientPoints
        );
    }
}
