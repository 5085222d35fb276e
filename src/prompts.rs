use crate::corpus::types::Recipe;

/// Header for the recipe-grounded pass. The "I don't know." cue is what the
/// uncertainty detector listens for.
pub const RECIPE_INSTRUCTION: &str =
    r#"Answer the question using ONLY the context below. If unsure, say "I don't know.""#;

/// Header for the web-augmented pass.
pub const WEB_INSTRUCTION: &str = r#"Answer the question using the following web search results. If still unsure, say "I don't know.""#;

/// Blank-line separated recipe renderings, in retrieval order.
pub fn recipe_context(recipes: &[Recipe]) -> String {
    recipes
        .iter()
        .map(Recipe::to_context)
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn recipe_prompt(recipes: &[Recipe], question: &str) -> String {
    format!(
        "{}\n\nContext:\n{}\n\nQuestion: {}\n\nAnswer:",
        RECIPE_INSTRUCTION,
        recipe_context(recipes),
        question
    )
}

pub fn web_prompt(web_results: &str, question: &str) -> String {
    format!(
        "{}\n\nWeb Search Results:\n{}\n\nQuestion: {}\n\nAnswer:",
        WEB_INSTRUCTION, web_results, question
    )
}
