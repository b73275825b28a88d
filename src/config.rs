use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Callable made available to templates. The parser stores these for a
/// later evaluation step and never invokes them.
pub type Func = Arc<dyn Fn(&[String]) -> Result<String, String> + Send + Sync>;

/// Function name to callable.
pub type FuncMap = HashMap<String, Func>;

/// How the parser obtains tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LexMode {
    /// Lexer runs on its own thread and hands tokens over one at a time.
    #[default]
    Concurrent,
    /// Lexer runs on the parsing thread, one token per request.
    Inline,
}

/// Options for a single parse.
///
/// ```
/// use std::sync::Arc;
/// use tmpl_parse::{Func, FuncMap, LexMode, ParseOptions};
///
/// let mut funcs = FuncMap::new();
/// let upper: Func = Arc::new(|args: &[String]| Ok(args.concat().to_uppercase()));
/// funcs.insert("upper".to_string(), upper);
///
/// let options = ParseOptions::new().lex_mode(LexMode::Inline).func_map(funcs);
/// assert_eq!(options.mode(), LexMode::Inline);
/// ```
#[derive(Clone, Default)]
pub struct ParseOptions {
    mode: LexMode,
    funcs: Vec<FuncMap>,
}

impl ParseOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn lex_mode(mut self, mode: LexMode) -> Self {
        self.mode = mode;
        self
    }

    /// Add a function table. Later tables are consulted after earlier ones.
    #[must_use]
    pub fn func_map(mut self, funcs: FuncMap) -> Self {
        self.funcs.push(funcs);
        self
    }

    #[must_use]
    pub const fn mode(&self) -> LexMode {
        self.mode
    }

    #[must_use]
    pub fn funcs(&self) -> &[FuncMap] {
        &self.funcs
    }
}

impl fmt::Debug for ParseOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<Vec<&String>> = self.funcs.iter().map(|m| m.keys().collect()).collect();
        f.debug_struct("ParseOptions")
            .field("mode", &self.mode)
            .field("funcs", &names)
            .finish()
    }
}
