use seedline_core::{ScopePolicy, Target, WorkItem};

/// Decides whether a produced item belongs to the target it came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScopeFilter {
    policy: ScopePolicy,
}

impl ScopeFilter {
    #[must_use]
    pub fn new(policy: ScopePolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub fn policy(&self) -> ScopePolicy {
        self.policy
    }

    #[must_use]
    pub fn in_scope(&self, candidate: &WorkItem, origin: &Target) -> bool {
        match self.policy {
            ScopePolicy::Domain => candidate
                .domain()
                .is_some_and(|domain| domain == origin.domain()),
            ScopePolicy::Origin => {
                let (url, target) = (candidate.url(), origin.url());
                url.scheme() == target.scheme()
                    && candidate.domain().as_deref() == Some(origin.domain())
                    && url.port_or_known_default() == target.port_or_known_default()
            }
        }
    }
}
