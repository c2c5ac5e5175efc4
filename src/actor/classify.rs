/// Outcome of inspecting the page after the click settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Success { marker: Option<String> },
    Uncertain,
}

impl Classification {
    pub fn is_success(&self) -> bool {
        matches!(self, Classification::Success { .. })
    }
}

/// Success iff any marker occurs in `text`. Empty markers never match.
pub fn classify_text(text: &str, markers: &[String]) -> Classification {
    markers
        .iter()
        .find(|m| !m.is_empty() && text.contains(m.as_str()))
        .map(|m| Classification::Success {
            marker: Some(m.clone()),
        })
        .unwrap_or(Classification::Uncertain)
}

pub fn classify_element(found: bool) -> Classification {
    if found {
        Classification::Success { marker: None }
    } else {
        Classification::Uncertain
    }
}
