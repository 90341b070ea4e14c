use std::collections::HashMap;
use std::sync::OnceLock;

use parking_lot::Mutex;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::{as_24_bit_terminal_escaped, LinesWithEndings};
use tracing::warn;

struct Assets {
    syntax_set: SyntaxSet,
    theme: Theme,
}

/// Shared syntect assets, loaded once on first use.
fn assets() -> &'static Assets {
    static ASSETS: OnceLock<Assets> = OnceLock::new();
    ASSETS.get_or_init(|| {
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let theme_set = ThemeSet::load_defaults();
        let theme = theme_set
            .themes
            .get("base16-eighties.dark")
            .cloned()
            .unwrap_or_else(|| {
                theme_set
                    .themes
                    .values()
                    .next()
                    .cloned()
                    .expect("syntect ships with at least one theme")
            });
        Assets { syntax_set, theme }
    })
}

/// Language name → grammar mapping, populated incrementally. Grammars are
/// only ever added; registering a known language again is a no-op.
pub struct GrammarRegistry {
    registered: Mutex<HashMap<String, String>>,
}

impl GrammarRegistry {
    pub fn new() -> Self {
        Self {
            registered: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve and register the grammar for `language`. Returns true if the
    /// language was newly registered.
    pub fn register(&self, language: &str) -> bool {
        let mut registered = self.registered.lock();
        if registered.contains_key(language) {
            return false;
        }
        let syntax = Self::resolve(language);
        registered.insert(language.to_string(), syntax.name.clone());
        true
    }

    pub fn is_registered(&self, language: &str) -> bool {
        self.registered.lock().contains_key(language)
    }

    /// A name outside the known set falls back to the generic C grammar; the
    /// degradation is logged rather than surfaced as an error.
    fn resolve(language: &str) -> &'static SyntaxReference {
        let set = &assets().syntax_set;

        let token = match language {
            "elm" | "python" | "javascript" | "go" | "rust" | "java" => language,
            other => {
                warn!("No grammar mapped for language {:?}, falling back to C", other);
                "c"
            }
        };

        set.find_syntax_by_token(token).unwrap_or_else(|| {
            warn!("Grammar {:?} missing from syntax set, using plain text", token);
            set.find_syntax_plain_text()
        })
    }

    /// Highlight `code` with the grammar registered for `language`, or return
    /// it unchanged if the language has not been registered yet.
    pub fn rendered(&self, language: &str, code: &str) -> String {
        let syntax_name = match self.registered.lock().get(language).cloned() {
            Some(name) => name,
            None => return code.to_string(),
        };

        let assets = assets();
        let syntax = assets
            .syntax_set
            .find_syntax_by_name(&syntax_name)
            .unwrap_or_else(|| assets.syntax_set.find_syntax_plain_text());

        let mut highlighter = HighlightLines::new(syntax, &assets.theme);
        let mut out = String::new();
        for line in LinesWithEndings::from(code) {
            match highlighter.highlight_line(line, &assets.syntax_set) {
                Ok(ranges) => out.push_str(&as_24_bit_terminal_escaped(&ranges, false)),
                Err(_) => out.push_str(line),
            }
        }
        out
    }
}

impl Default for GrammarRegistry {
    fn default() -> Self {
        Self::new()
    }
}
