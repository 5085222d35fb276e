use serde::{Deserialize, Serialize};

/// One recipe as it appears in the corpus document. Its identity is its
/// position in load order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub name: String,
    pub ingredients: Vec<String>,
    /// Step sequence, in order.
    pub instructions: Vec<String>,
    pub cuisine: String,
    pub difficulty: String,
    pub prep_time_minutes: u32,
    pub cook_time_minutes: u32,
    pub servings: u32,
}

impl Recipe {
    /// Flattened text submitted to the embedding model.
    pub fn embedding_text(&self) -> String {
        format!(
            "{} {} {}",
            self.name,
            self.instructions.join(" "),
            self.ingredients.join(" ")
        )
    }

    /// Labeled rendering used as grounding context in the answer prompt.
    pub fn to_context(&self) -> String {
        format!(
            "Name: {}\n\
             Ingredients: {}\n\
             Instructions: {}\n\
             Cuisine: {}\n\
             Difficulty: {}\n\
             Prep Time: {} minutes\n\
             Cook Time: {} minutes\n\
             Servings: {}\n",
            self.name,
            self.ingredients.join(", "),
            self.instructions.join(" "),
            self.cuisine,
            self.difficulty,
            self.prep_time_minutes,
            self.cook_time_minutes,
            self.servings
        )
    }
}

/// Top-level shape of the corpus file.
#[derive(Debug, Deserialize)]
pub(super) struct CorpusDocument {
    pub recipes: Vec<Recipe>,
}
