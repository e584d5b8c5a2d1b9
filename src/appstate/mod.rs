use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    config::{Filters, Settings, Thresholds},
    database::{Database, DatabaseConnection, DatabaseConnectionCreater},
    discordclient::{DiscordClient, DiscordReqwestClient},
    eventrouter::CommandParser,
    notifier::Notifier,
};

#[cfg(test)]
use crate::discordclient::MockDiscordClient;

pub struct AppState<D: Database + Send, C: DiscordClient + Send + Sync> {
    pub database: Arc<Mutex<D>>,
    pub discordclient: Arc<C>,
    pub notifier: Notifier<C>,
    pub settings: Arc<Settings>,
    pub filters: Arc<Filters>,
    pub thresholds: Arc<Thresholds>,
    pub commands: Arc<CommandParser>,
}

impl<D: Database + Send, C: DiscordClient + Send + Sync> Clone for AppState<D, C> {
    fn clone(&self) -> Self {
        Self {
            database: self.database.clone(),
            discordclient: self.discordclient.clone(),
            notifier: self.notifier.clone(),
            settings: self.settings.clone(),
            filters: self.filters.clone(),
            thresholds: self.thresholds.clone(),
            commands: self.commands.clone(),
        }
    }
}

impl<D: Database + Send, C: DiscordClient + Send + Sync> AppState<D, C> {
    pub fn new(
        database: D,
        discordclient: C,
        settings: Settings,
        filters: Filters,
    ) -> Result<Self, anyhow::Error> {
        let discordclient = Arc::new(discordclient);
        let thresholds = Thresholds::default();
        let commands = CommandParser::new(&thresholds.command_prefix)?;

        Ok(Self {
            database: Arc::new(Mutex::new(database)),
            notifier: Notifier::new(discordclient.clone(), settings.announcement_channel_id),
            discordclient,
            settings: Arc::new(settings),
            filters: Arc::new(filters),
            thresholds: Arc::new(thresholds),
            commands: Arc::new(commands),
        })
    }
}

pub fn new_real_appstate(
    settings: Settings,
) -> Result<AppState<DatabaseConnection, DiscordReqwestClient>, anyhow::Error> {
    let filters = Filters::from_path(&settings.filters_path)?;
    log::info!(
        "loaded {} link filters and {} file type filters",
        filters.links.len(),
        filters.filetypes.len()
    );

    let database = DatabaseConnectionCreater::open_else_new(&settings.db_path).start()?;
    let discordclient = DiscordReqwestClient::new_with_token(&settings.bot_token);

    AppState::new(database, discordclient, settings, filters)
}

#[cfg(test)]
pub const TEST_GUILD_ID: u64 = 10;
#[cfg(test)]
pub const TEST_FEEDBACK_CHANNEL_ID: u64 = 20;
#[cfg(test)]
pub const TEST_ANNOUNCEMENT_CHANNEL_ID: u64 = 30;

#[cfg(test)]
pub fn new_testing_appstate(
) -> Result<AppState<DatabaseConnection, MockDiscordClient>, anyhow::Error> {
    new_testing_appstate_with(MockDiscordClient::default())
}

#[cfg(test)]
pub fn new_testing_appstate_with(
    discordclient: MockDiscordClient,
) -> Result<AppState<DatabaseConnection, MockDiscordClient>, anyhow::Error> {
    let settings = Settings {
        bot_token: "test-token".to_string(),
        guild_id: TEST_GUILD_ID,
        feedback_channel_id: TEST_FEEDBACK_CHANNEL_ID,
        announcement_channel_id: TEST_ANNOUNCEMENT_CHANNEL_ID,
        db_path: ":memory:".to_string(),
        filters_path: "./filters.json".to_string(),
        log_level: "debug".to_string(),
    };
    let filters = Filters {
        links: vec!["soundcloud.com".to_string(), "youtu.be".to_string()],
        filetypes: vec![".mp3".to_string(), ".wav".to_string()],
    };

    AppState::new(
        DatabaseConnectionCreater::open_in_memory().start()?,
        discordclient,
        settings,
        filters,
    )
}
