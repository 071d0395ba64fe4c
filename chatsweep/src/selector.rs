/// Represents ways to locate an element on the host page
///
/// The concrete strings behind each variant are configuration supplied by the
/// host-page adapter; the engine never interprets them beyond routing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Select by CSS query
    Css(String),
    /// Select by visible text content (case-insensitive substring)
    Text(String),
    /// Select by the host page's stable test id attribute
    TestId(String),
    /// Chain multiple selectors, each scoped to the previous match
    Chain(Vec<Selector>),
    /// Filter by visibility on screen
    Visible(bool),
    /// Represents an invalid selector string, with a reason.
    Invalid(String),
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl From<&str> for Selector {
    fn from(s: &str) -> Self {
        // Handle chained selectors first
        let parts: Vec<&str> = s.split(">>").map(|p| p.trim()).collect();
        if parts.len() > 1 {
            return Selector::Chain(parts.into_iter().map(Selector::from).collect());
        }

        match s {
            _ if s.starts_with("css:") => Selector::Css(s[4..].trim().to_string()),
            _ if s.starts_with("text:") => Selector::Text(s[5..].trim().to_string()),
            _ if s.to_lowercase().starts_with("testid:") => {
                let parts: Vec<&str> = s.splitn(2, ':').collect();
                Selector::TestId(parts[1].trim().to_string())
            }
            _ if s.to_lowercase().starts_with("visible:") => {
                let value = s[8..].trim().to_lowercase();
                Selector::Visible(value == "true")
            }
            // Raw CSS shorthand: anything that reads like a CSS query already
            _ if s.starts_with('.') || s.starts_with('#') || s.starts_with('[') => {
                Selector::Css(s.to_string())
            }
            _ if s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') && !s.is_empty() => {
                // Bare element name, e.g. "button" or "mat-dialog-container"
                Selector::Css(s.to_string())
            }
            _ => Selector::Invalid(format!(
                "Unknown selector format: \"{s}\". Use prefixes like 'css:', 'text:', 'testid:' or 'visible:' to specify the selector type."
            )),
        }
    }
}

impl From<String> for Selector {
    fn from(s: String) -> Self {
        Selector::from(s.as_str())
    }
}
