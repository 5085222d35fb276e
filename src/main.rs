mod commands;
mod confidence;
mod config;
mod corpus;
mod embed;
mod error;
mod escalation;
mod index;
mod llm;
mod prompts;
mod retriever;
mod state;
mod web;

use std::sync::Arc;

use anyhow::Context;
use poise::serenity_prelude as serenity;
use poise::{Framework, FrameworkOptions};
use tracing::{error, info};

use confidence::UncertaintyDetector;
use config::Settings;
use corpus::CorpusStore;
use embed::OllamaEmbedder;
use escalation::EscalationEngine;
use llm::OllamaClient;
use retriever::{KnowledgeBase, Retriever};
use state::AppState;
use web::JinaSearch;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();
    let settings = Settings::from_env()?;

    tracing_subscriber::fmt()
        .with_max_level(settings.log_level)
        .init();

    let token = dotenv::var("DISCORD_TOKEN").context("DISCORD_TOKEN required")?;
    let guild_id: Option<serenity::GuildId> = dotenv::var("DISCORD_GUILD_ID")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(serenity::GuildId::new);

    // Corpus, embeddings and index are built once; everything after is read-only.
    let corpus = CorpusStore::load(&settings.recipes_path).await?;
    let embedder = Arc::new(OllamaEmbedder::new(
        &settings.ollama_url,
        &settings.embedding_model,
        settings.request_timeout,
    )?);
    info!(model = %settings.embedding_model, "Embedding recipes");
    let kb = Arc::new(
        KnowledgeBase::build(corpus, embedder.as_ref())
            .await
            .context("Failed to build recipe index")?,
    );

    let generator = Arc::new(OllamaClient::new(
        &settings.ollama_url,
        &settings.generation_model,
        settings.request_timeout,
    )?);
    let web = Arc::new(JinaSearch::new(
        &settings.search_url,
        settings.search_api_key.clone(),
        settings.request_timeout,
    )?);
    if settings.search_api_key.is_none() {
        info!("SEARCH_API_KEY not set; web fallback will run unauthenticated");
    }

    let engine = Arc::new(EscalationEngine::new(
        Retriever::new(kb, embedder),
        generator,
        web,
        UncertaintyDetector::new(&settings.uncertainty_markers),
        settings.top_k,
    ));
    info!(top_k = settings.top_k, model = %settings.generation_model, "Recipe QA engine ready");

    let app_state = AppState { engine };

    let intents = serenity::GatewayIntents::GUILDS;

    let framework = Framework::builder()
        .options(FrameworkOptions {
            commands: vec![commands::recipe()],
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Bot connected as: {} ({})", ready.user.name, ready.user.id);

                if let Some(gid) = guild_id {
                    info!("Registering to guild {} (instant)", gid);
                    poise::builtins::register_in_guild(ctx, &framework.options().commands, gid)
                        .await?;
                } else {
                    info!("Registering globally (up to 1 hour delay)");
                    poise::builtins::register_globally(ctx, &framework.options().commands)
                        .await?;
                }

                Ok(app_state)
            })
        })
        .build();

    info!("Starting recipe QA bot...");

    let mut client = serenity::ClientBuilder::new(&token, intents)
        .framework(framework)
        .await
        .context("Failed to create client")?;

    if let Err(e) = client.start().await {
        error!("Client error: {}", e);
    }

    Ok(())
}
