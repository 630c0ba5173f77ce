//! Break point detection for chunking

/// Priority levels for break points
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BreakPriority {
    /// Word boundary (lowest)
    Word = 1,
    /// Line break
    Line = 2,
    /// Sentence boundary
    Sentence = 3,
    /// Paragraph boundary (highest)
    Paragraph = 4,
}

/// A potential break point in text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakPoint {
    /// Character index the next chunk would start at
    pub position: usize,
    pub priority: BreakPriority,
}

/// Find break points in `chars`, sorted by position
pub fn find_break_points(chars: &[char]) -> Vec<BreakPoint> {
    let mut points = Vec::new();

    for (i, pair) in chars.windows(2).enumerate() {
        let priority = match (pair[0], pair[1]) {
            ('\n', '\n') => Some(BreakPriority::Paragraph),
            ('.' | '?' | '!', ' ' | '\n') => Some(BreakPriority::Sentence),
            (_, '\n') => Some(BreakPriority::Line),
            (_, ' ') => Some(BreakPriority::Word),
            _ => None,
        };

        if let Some(priority) = priority {
            points.push(BreakPoint {
                position: i + 2,
                priority,
            });
        }
    }

    points
}

/// Best break point in `[min, max]`, highest priority first and the latest
/// position among equals
pub fn best_break_in(points: &[BreakPoint], min: usize, max: usize) -> Option<usize> {
    points
        .iter()
        .filter(|p| p.position >= min && p.position <= max)
        .max_by_key(|p| (p.priority, p.position))
        .map(|p| p.position)
}
