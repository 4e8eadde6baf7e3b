/// Pagination state definitions for one manufacturer
///
/// This module defines the states the extractor moves through while it walks
/// a manufacturer's paginated listing, and why it stopped.
use std::fmt;

/// Why pagination stopped for a manufacturer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// No category group appeared before the page-load timeout
    LoadTimeout,

    /// The page could not be loaded at all
    NavigationFailed,

    /// A category outside the allow-list was reached
    CategoryHalt { category: String },

    /// The page has no next-page control
    NoNextPage,

    /// The next-page control is present but disabled
    NextPageDisabled,

    /// Checking or invoking the next-page control failed
    NextPageFailed,

    /// The configured page limit was reached
    PageLimit,

    /// Any other error while processing the page
    Unexpected,
}

impl StopReason {
    /// Returns true if pagination ended because something went wrong
    ///
    /// Reaching the end of the data (halt category, last page, page limit) is
    /// not a failure.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::LoadTimeout | Self::NavigationFailed | Self::NextPageFailed | Self::Unexpected
        )
    }

    /// Short label used in logs and run statistics
    pub fn label(&self) -> &'static str {
        match self {
            Self::LoadTimeout => "load_timeout",
            Self::NavigationFailed => "navigation_failed",
            Self::CategoryHalt { .. } => "category_halt",
            Self::NoNextPage => "no_next_page",
            Self::NextPageDisabled => "next_page_disabled",
            Self::NextPageFailed => "next_page_failed",
            Self::PageLimit => "page_limit",
            Self::Unexpected => "unexpected",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CategoryHalt { category } => write!(f, "category_halt ({})", category),
            other => write!(f, "{}", other.label()),
        }
    }
}

/// Represents where the extractor is in a manufacturer's pagination
///
/// Pages are numbered from 1. The loop is
/// `Loading -> Extracting -> Continue -> Loading(page + 1)`, and any state but
/// `Stop` may move to `Stop`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaginationState {
    /// Waiting for the page's category groups to appear
    Loading { page: u32 },

    /// Capturing the page and parsing its rows
    Extracting { page: u32 },

    /// The page was fully processed and a next page should be requested
    Continue { page: u32 },

    /// Terminal
    Stop(StopReason),
}

impl PaginationState {
    /// The state every manufacturer starts in
    pub fn start() -> Self {
        Self::Loading { page: 1 }
    }

    /// Page number the state refers to, if any
    pub fn page(&self) -> Option<u32> {
        match self {
            Self::Loading { page } | Self::Extracting { page } | Self::Continue { page } => {
                Some(*page)
            }
            Self::Stop(_) => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stop(_))
    }

    /// Returns true if moving from `self` to `next` is a legal step
    pub fn can_transition_to(&self, next: &PaginationState) -> bool {
        match (self, next) {
            (Self::Stop(_), _) => false,
            (_, Self::Stop(_)) => true,
            (Self::Loading { page: a }, Self::Extracting { page: b }) => a == b,
            (Self::Extracting { page: a }, Self::Continue { page: b }) => a == b,
            (Self::Continue { page: a }, Self::Loading { page: b }) => a.checked_add(1) == Some(*b),
            _ => false,
        }
    }

    /// Short label used in logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Loading { .. } => "loading",
            Self::Extracting { .. } => "extracting",
            Self::Continue { .. } => "continue",
            Self::Stop(_) => "stop",
        }
    }
}

impl fmt::Display for PaginationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stop(reason) => write!(f, "stop: {}", reason),
            other => match other.page() {
                Some(page) => write!(f, "{} (page {})", other.label(), page),
                None => write!(f, "{}", other.label()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start() {
        assert_eq!(PaginationState::start(), PaginationState::Loading { page: 1 });
        assert_eq!(PaginationState::start().page(), Some(1));
    }

    #[test]
    fn test_forward_loop() {
        let loading = PaginationState::Loading { page: 2 };
        let extracting = PaginationState::Extracting { page: 2 };
        let cont = PaginationState::Continue { page: 2 };

        assert!(loading.can_transition_to(&extracting));
        assert!(extracting.can_transition_to(&cont));
        assert!(cont.can_transition_to(&PaginationState::Loading { page: 3 }));
    }

    #[test]
    fn test_illegal_transitions() {
        let loading = PaginationState::Loading { page: 1 };

        // cannot skip extraction or change page mid-step
        assert!(!loading.can_transition_to(&PaginationState::Continue { page: 1 }));
        assert!(!loading.can_transition_to(&PaginationState::Extracting { page: 2 }));
        assert!(!PaginationState::Continue { page: 1 }
            .can_transition_to(&PaginationState::Loading { page: 1 }));
        assert!(!PaginationState::Continue { page: u32::MAX }
            .can_transition_to(&PaginationState::Loading { page: 0 }));
    }

    #[test]
    fn test_every_active_state_can_stop() {
        let stop = PaginationState::Stop(StopReason::Unexpected);
        assert!(PaginationState::Loading { page: 1 }.can_transition_to(&stop));
        assert!(PaginationState::Extracting { page: 1 }.can_transition_to(&stop));
        assert!(PaginationState::Continue { page: 1 }.can_transition_to(&stop));
    }

    #[test]
    fn test_stop_is_terminal() {
        let stop = PaginationState::Stop(StopReason::NoNextPage);
        assert!(stop.is_terminal());
        assert_eq!(stop.page(), None);
        assert!(!stop.can_transition_to(&PaginationState::Loading { page: 1 }));
        assert!(!stop.can_transition_to(&PaginationState::Stop(StopReason::NoNextPage)));
    }

    #[test]
    fn test_failure_reasons() {
        assert!(StopReason::LoadTimeout.is_failure());
        assert!(StopReason::NavigationFailed.is_failure());
        assert!(StopReason::NextPageFailed.is_failure());
        assert!(StopReason::Unexpected.is_failure());

        assert!(!StopReason::NoNextPage.is_failure());
        assert!(!StopReason::NextPageDisabled.is_failure());
        assert!(!StopReason::PageLimit.is_failure());
        assert!(!StopReason::CategoryHalt {
            category: "Related Products".to_string()
        }
        .is_failure());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", PaginationState::Extracting { page: 4 }), "extracting (page 4)");
        assert_eq!(
            format!(
                "{}",
                PaginationState::Stop(StopReason::CategoryHalt {
                    category: "Analogues".to_string()
                })
            ),
            "stop: category_halt (Analogues)"
        );
        assert_eq!(format!("{}", StopReason::LoadTimeout), "load_timeout");
    }
}
