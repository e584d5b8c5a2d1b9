use music_feedback_bot::{
    appstate,
    config::Settings,
    database::Database,
    discordclient::DiscordClient,
    eventrouter,
};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let dotenv = dotenvy::dotenv();
    let settings = Settings::from_env()?;

    env_logger::Builder::new()
        .parse_filters(&settings.log_level)
        .init();

    match dotenv {
        Ok(path) => log::debug!("loaded settings from {}", path.display()),
        Err(e) => log::debug!("no .env file loaded: {}", e),
    }

    let app_state = appstate::new_real_appstate(settings)?;

    match app_state.database.lock().await.find_all_users()? {
        Some(users) => log::info!("ledger holds {} users", users.len()),
        None => log::info!("ledger is empty"),
    }

    let ws_handler = app_state.discordclient.get_websocket_handler().await?;
    log::info!("connected to the gateway");

    tokio::select! {
        result = eventrouter::run_event_loop(app_state, ws_handler) => result,
        _ = tokio::signal::ctrl_c() => {
            log::info!("shutting down");
            Ok(())
        }
    }
}
