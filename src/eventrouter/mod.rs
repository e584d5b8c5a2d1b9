use std::time::{SystemTime, UNIX_EPOCH};

use regex::Regex;

use crate::{
    appstate::AppState,
    database::{types::UserLookup, Database},
    discordclient::{Attachment, DiscordClient, MessageCreate, WsHandler},
    evaluator::{
        evaluate_feedback, evaluate_gate, extract_comment, matches_link, matching_attachment,
        FeedbackOutcome, GateOutcome,
    },
    notifier::{insufficient_points_notice, score_reply, unregistered_notice, NO_SCORE_REPLY},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Score,
}

/// What a gated post re-publishes
enum GatedPost<'a> {
    Link(&'a str),
    File(&'a Attachment),
}

impl GatedPost<'_> {
    fn body(&self) -> &str {
        match self {
            GatedPost::Link(content) => content,
            GatedPost::File(attachment) => &attachment.url,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            GatedPost::Link(_) => "link",
            GatedPost::File(_) => "file",
        }
    }
}

/// Matches the bot's commands, compiled once at startup
#[derive(Debug, Clone)]
pub struct CommandParser {
    score: Regex,
}

impl CommandParser {
    pub fn new(prefix: &str) -> Result<Self, anyhow::Error> {
        Ok(Self {
            score: Regex::new(&format!(r"(?i)^{}score", regex::escape(prefix)))?,
        })
    }

    pub fn parse(&self, content: &str) -> Option<Command> {
        self.score.is_match(content).then_some(Command::Score)
    }
}

fn unix_timestamp() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
        .to_string()
}

/// Runs the command, feedback and gate checks for one message.
/// The checks are independent; any of them may fire.
pub async fn handle_message<D: Database + Send, C: DiscordClient + Send + Sync>(
    app_state: &AppState<D, C>,
    msg: &MessageCreate,
) {
    if msg.author.bot {
        log::debug!("ignoring bot message {}", msg.id);
        return;
    }

    if let Some(guild_id) = msg.guild_id {
        if guild_id != app_state.settings.guild_id {
            log::debug!("ignoring message from guild {}", guild_id);
            return;
        }
    }

    if let Err(e) = catch_command_posts(app_state, msg).await {
        log::error!("problem while handling command from {}: {}", msg.author.tag(), e);
    }

    if let Err(e) = catch_feedback_posts(app_state, msg).await {
        log::error!("problem while scoring feedback from {}: {}", msg.author.tag(), e);
    }

    if let Err(e) = catch_media_posts(app_state, msg).await {
        log::error!("problem while gating post from {}: {}", msg.author.tag(), e);
    }
}

async fn catch_command_posts<D: Database + Send, C: DiscordClient + Send + Sync>(
    app_state: &AppState<D, C>,
    msg: &MessageCreate,
) -> Result<(), anyhow::Error> {
    let Some(Command::Score) = app_state.commands.parse(&msg.content) else {
        return Ok(());
    };

    log::info!("{} is checking score.", msg.author.tag());

    // keep the shared channel clean
    if !msg.is_direct_message() {
        app_state.notifier.delete(msg.channel_id, msg.id).await;
    }

    let record = {
        let database = app_state.database.lock().await;
        database.find_user(&UserLookup::Id(msg.author.id))?
    };

    let reply = match record {
        Some(record) => score_reply(record.points),
        None => NO_SCORE_REPLY.to_string(),
    };
    app_state.notifier.direct_message(msg.author.id, &reply).await;

    Ok(())
}

async fn catch_feedback_posts<D: Database + Send, C: DiscordClient + Send + Sync>(
    app_state: &AppState<D, C>,
    msg: &MessageCreate,
) -> Result<(), anyhow::Error> {
    let thresholds = &app_state.thresholds;
    if !msg.content.contains(thresholds.feedback_marker.as_str()) || msg.mentions.len() != 1 {
        return Ok(());
    }

    let author = &msg.author;
    let target = &msg.mentions[0];
    let comment = extract_comment(&msg.content, &thresholds.marker_closure);

    let database = app_state.database.lock().await;
    let existing = database.find_user(&UserLookup::Id(author.id))?;

    match evaluate_feedback(author.id, target.id, comment, existing.as_ref(), thresholds) {
        FeedbackOutcome::SelfQuote => {
            log::info!("{} is just quoting..", author.tag());
        }
        FeedbackOutcome::Award => {
            database.update_user(author.id, 1)?;
            log::info!("{} has left valid feedback to {}.", author.tag(), target.tag());
        }
        FeedbackOutcome::TooShort => {
            log::info!("{} has left invalid feedback to {}.", author.tag(), target.tag());
        }
        FeedbackOutcome::CreateWithPoint => {
            database.create_user(&author.username, author.discriminator(), author.id, 1, 1)?;
            log::info!("{} has been created.", author.tag());
            log::info!("{} has left valid feedback to {}.", author.tag(), target.tag());
        }
        FeedbackOutcome::CreateWithoutPoint => {
            database.create_user(&author.username, author.discriminator(), author.id, 0, 0)?;
            log::info!("{} has been created.", author.tag());
            log::info!("{} has left invalid feedback to {}.", author.tag(), target.tag());
        }
    }

    Ok(())
}

async fn catch_media_posts<D: Database + Send, C: DiscordClient + Send + Sync>(
    app_state: &AppState<D, C>,
    msg: &MessageCreate,
) -> Result<(), anyhow::Error> {
    if msg.channel_id != app_state.settings.feedback_channel_id
        || msg.content.starts_with(app_state.thresholds.escape_prefix.as_str())
    {
        return Ok(());
    }

    // link and file are gated independently, one failing does not stop the other
    if matches_link(&msg.content, &app_state.filters) {
        log::info!("{} tried placing a feedback link {}", msg.author.tag(), msg.content);
        if let Err(e) = gate_post(app_state, msg, GatedPost::Link(&msg.content)).await {
            log::error!("problem while gating link from {}: {}", msg.author.tag(), e);
        }
    }

    if let Some(attachment) = matching_attachment(&msg.attachments, &app_state.filters) {
        log::info!("{} tried placing a feedback file", msg.author.tag());
        if let Err(e) = gate_post(app_state, msg, GatedPost::File(attachment)).await {
            log::error!("problem while gating file from {}: {}", msg.author.tag(), e);
        }
    }

    Ok(())
}

async fn gate_post<D: Database + Send, C: DiscordClient + Send + Sync>(
    app_state: &AppState<D, C>,
    msg: &MessageCreate,
    post: GatedPost<'_>,
) -> Result<(), anyhow::Error> {
    let author = &msg.author;
    let thresholds = &app_state.thresholds;

    // ledger first, platform calls after the lock is released
    let outcome = {
        let database = app_state.database.lock().await;
        let existing = database.find_user(&UserLookup::Id(author.id))?;
        let outcome = evaluate_gate(existing.as_ref(), thresholds);

        match outcome {
            GateOutcome::Unregistered => {
                match database.create_user(
                    &author.username,
                    author.discriminator(),
                    author.id,
                    0,
                    0,
                ) {
                    Ok(_) => log::info!("{} has been created.", author.tag()),
                    Err(e) => log::error!("could not create {}: {}", author.tag(), e),
                }
            }
            GateOutcome::Publish => {
                database.adjust_user(
                    author.id,
                    -thresholds.post_cost,
                    thresholds.post_review_credit,
                )?;
                database.mark_submitted(author.id, &unix_timestamp())?;
            }
            GateOutcome::InsufficientPoints => {}
        }

        outcome
    };

    match outcome {
        GateOutcome::Unregistered => {
            app_state.notifier.delete(msg.channel_id, msg.id).await;
            app_state
                .notifier
                .direct_message(author.id, &unregistered_notice())
                .await;
            log::info!(
                "{} does not exist. Post has been removed and notification sent.",
                author.tag()
            );
        }
        GateOutcome::InsufficientPoints => {
            app_state.notifier.delete(msg.channel_id, msg.id).await;
            app_state
                .notifier
                .direct_message(author.id, &insufficient_points_notice())
                .await;
            log::info!(
                "{} does not have enough points. Post has been removed and notification sent.",
                author.tag()
            );
        }
        GateOutcome::Publish => {
            app_state
                .notifier
                .announce(author.display_name(), post.body())
                .await?;
            app_state.notifier.delete(msg.channel_id, msg.id).await;
            log::info!(
                "{} has successfully posted a {}. Points have been deducted",
                author.tag(),
                post.kind()
            );
        }
    }

    Ok(())
}

/// Handles gateway messages one at a time until the stream ends
pub async fn run_event_loop<D: Database + Send, C: DiscordClient + Send + Sync>(
    app_state: AppState<D, C>,
    mut ws: impl WsHandler,
) -> Result<(), anyhow::Error> {
    log::info!("Now entering main event loop");

    while let Some(message) = ws.recv().await? {
        handle_message(&app_state, &message).await;
    }

    log::warn!("gateway stream ended, leaving the event loop");
    Ok(())
}
