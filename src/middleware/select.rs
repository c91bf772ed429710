use super::{CompiledMiddleware, MiddlewareFn, SkipScope};

/// Compute the ordered middleware chain for one route path.
///
/// Descriptors are scanned in registration order. A skip-pattern match
/// (unanchored regex) excludes the descriptor and, under
/// [`SkipScope::Remaining`], stops the scan entirely. A match-pattern hit
/// includes the descriptor by inserting it at the *front* of the chain
/// built so far, so the most-recently-registered matching middleware runs
/// first and the earliest-registered one runs last, immediately before the
/// core handler. A descriptor with no matching pattern - including an empty
/// match set - never applies.
///
/// Selection runs once per route at compile time; the returned chain is the
/// fixed execution order, stored as data on the compiled route.
pub fn select(
    route: &str,
    middlewares: &[CompiledMiddleware],
    scope: SkipScope,
) -> Vec<MiddlewareFn> {
    let mut chain: Vec<MiddlewareFn> = Vec::new();
    'descriptors: for mw in middlewares {
        for skip in &mw.skip_patterns {
            if skip.is_match(route) {
                match scope {
                    SkipScope::Remaining => break 'descriptors,
                    SkipScope::DescriptorOnly => continue 'descriptors,
                }
            }
        }
        if !mw.match_patterns.iter().any(|m| m.is_match(route)) {
            continue;
        }
        chain.insert(0, std::sync::Arc::clone(&mw.handler));
    }
    chain
}
