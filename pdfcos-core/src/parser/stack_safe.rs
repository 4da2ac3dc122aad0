//! Stack-safe parsing utilities
//!
//! Arrays and dictionaries are parsed recursively. A nesting limit keeps
//! hostile input such as `[[[[...` from exhausting the stack.

use super::{ParseError, ParseResult};

/// Maximum nesting depth of arrays and dictionaries
pub const MAX_RECURSION_DEPTH: usize = 1000;

/// Nesting depth tracking for one parser
#[derive(Debug, Clone)]
pub struct StackSafeContext {
    /// Current recursion depth
    pub depth: usize,
    /// Maximum allowed depth
    pub max_depth: usize,
}

impl Default for StackSafeContext {
    fn default() -> Self {
        Self::new()
    }
}

impl StackSafeContext {
    pub fn new() -> Self {
        Self::with_limit(MAX_RECURSION_DEPTH)
    }

    pub fn with_limit(max_depth: usize) -> Self {
        Self {
            depth: 0,
            max_depth,
        }
    }

    /// Enter a new nesting level
    pub fn enter(&mut self) -> ParseResult<()> {
        if self.depth + 1 > self.max_depth {
            return Err(ParseError::RecursionLimit {
                depth: self.depth + 1,
                limit: self.max_depth,
            });
        }
        self.depth += 1;
        Ok(())
    }

    /// Leave a nesting level
    pub fn exit(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}
