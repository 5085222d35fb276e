use std::sync::Arc;

use crate::escalation::EscalationEngine;

/// Shared, read-only state handed to every command invocation.
pub struct AppState {
    pub engine: Arc<EscalationEngine>,
}

pub type Context<'a> = poise::Context<'a, AppState, anyhow::Error>;
