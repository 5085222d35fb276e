use tracing::{error, info};

use crate::escalation::Outcome;
use crate::state::Context;

/// Discord rejects messages above 2000 chars.
const MESSAGE_LIMIT: usize = 1990;

/// Ask a question about the recipe collection
#[poise::command(slash_command, guild_only)]
pub async fn recipe(
    ctx: Context<'_>,
    #[description = "Ask a question about recipes"] question: String,
) -> Result<(), anyhow::Error> {
    ctx.defer().await?;

    info!(user = %ctx.author().name, question, "Question received");

    let reply = match ctx.data().engine.answer(&question).await {
        Ok(resp) => {
            info!(
                outcome = ?resp.outcome,
                passes = resp.generation_passes,
                web_searched = resp.web_searched,
                "Question answered"
            );
            let mut text = format!("**Q:** {}\n\n**A:** {}", question, resp.answer);
            if resp.outcome != Outcome::NoContext && !resp.recipes.is_empty() {
                text.push_str(&format!("\n\n**Recipes consulted:** {}", resp.recipes.join(", ")));
            }
            text
        }
        Err(e) => {
            error!(error = %e, "Question failed");
            format!("Sorry, I couldn't search the recipe database: {}", e)
        }
    };

    for chunk in split_message(&reply, MESSAGE_LIMIT) {
        ctx.say(chunk).await?;
    }
    Ok(())
}

/// Split `text` into pieces of at most `limit` bytes, breaking after a newline
/// or space where possible and never inside a UTF-8 character. A character
/// wider than `limit` becomes a chunk of its own.
fn split_message(text: &str, limit: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut remaining = text;
    while !remaining.is_empty() {
        if remaining.len() <= limit {
            chunks.push(remaining);
            break;
        }
        let mut end = limit;
        while !remaining.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            // limit narrower than the first char: emit that char on its own
            end = remaining
                .char_indices()
                .nth(1)
                .map_or(remaining.len(), |(i, _)| i);
        }
        let window = &remaining[..end];
        let split_at = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .map(|i| i + 1)
            .unwrap_or(end);
        chunks.push(&remaining[..split_at]);
        remaining = &remaining[split_at..];
    }
    chunks
}
