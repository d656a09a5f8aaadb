use tracing::trace;

use crate::matcher::PathMatcher;

/// Resolves concrete URLs to the most specific matching template.
#[derive(Debug, Default, Clone)]
pub struct Router {
    matchers: Vec<PathMatcher>,
}

/// The result of a successful lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    /// Insertion index of the winning template.
    pub index: usize,
    pub params: Vec<(String, String)>,
}

impl Router {
    /// Create a new empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a template. Returns its index.
    pub fn insert(&mut self, matcher: PathMatcher) -> usize {
        self.matchers.push(matcher);
        self.matchers.len() - 1
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PathMatcher> {
        self.matchers.get(index)
    }

    pub fn matchers(&self) -> &[PathMatcher] {
        &self.matchers
    }

    /// Look up a URL (which must include the base path).
    ///
    /// Among several matching templates the one whose specificity vector is
    /// lexicographically greatest wins: the first segment where candidates
    /// differ decides, literal beating parameter. Full ties go to the
    /// template inserted first.
    pub fn lookup(&self, url: &str) -> Option<RouteMatch> {
        let mut best: Option<(RouteMatch, Vec<u8>)> = None;

        for (index, matcher) in self.matchers.iter().enumerate() {
            let Some(params) = matcher.captures(url) else {
                continue;
            };
            let score = matcher.specificity();
            let better = match &best {
                Some((_, best_score)) => score > *best_score,
                None => true,
            };
            if better {
                if let Some((previous, _)) = &best {
                    trace!(
                        url,
                        preferred = matcher.template(),
                        over = self.matchers[previous.index].template(),
                        "more specific template"
                    );
                }
                best = Some((RouteMatch { index, params }, score));
            }
        }

        best.map(|(found, _)| found)
    }
}
