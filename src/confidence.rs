use crate::config::DEFAULT_UNCERTAINTY_MARKERS;

/// Flags generated text that admits not knowing the answer.
///
/// Plain case-insensitive substring matching: "I don't know if this helps, but…"
/// counts as uncertain too.
#[derive(Debug, Clone)]
pub struct UncertaintyDetector {
    markers: Vec<String>,
}

impl UncertaintyDetector {
    /// Markers are compared lowercased.
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            markers: markers
                .into_iter()
                .map(|m| m.as_ref().to_lowercase())
                .collect(),
        }
    }

    pub fn is_uncertain(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.markers.iter().any(|m| lower.contains(m.as_str()))
    }
}

impl Default for UncertaintyDetector {
    fn default() -> Self {
        Self::new(DEFAULT_UNCERTAINTY_MARKERS)
    }
}
