//! `PreviewBudgetSelector` - picks the budget that applies to a viewer.
//!
//! The host page supplies two budgets per asset: the standard one shown on
//! the public page, and a member-preview one used inside the member area for
//! viewers who are signed in but not subscribed. The lookup runs once at mount
//! and is never re-evaluated mid-playback.
//!
//! | Tier       | Public page | Member area                         |
//! |------------|-------------|-------------------------------------|
//! | Anonymous  | standard    | member preview, else standard       |
//! | Free       | standard    | member preview, else standard       |
//! | Subscriber | entitled    | entitled                            |

use crate::policy::{PreviewBudget, PreviewPolicy};
use serde::{Deserialize, Serialize};

/// Where the player is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageContext {
    /// Gated public page.
    Public,
    /// Authenticated member's in-app page (dashboard).
    MemberArea,
}

/// Viewer tier supplied by the host page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewerTier {
    Anonymous,
    Free,
    /// Full access; never gated.
    Subscriber,
}

/// Per-asset budgets in whole seconds. Unset means no limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetSet {
    #[serde(default)]
    pub standard: Option<u32>,
    #[serde(default)]
    pub member_preview: Option<u32>,
}

/// Result of the lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub budget: PreviewBudget,
    pub entitled: bool,
}

impl Selection {
    #[must_use]
    pub fn policy(&self) -> PreviewPolicy {
        PreviewPolicy::new(self.budget, self.entitled)
    }
}

/// Stateless budget lookup over one asset's `BudgetSet`.
#[derive(Debug, Clone, Copy)]
pub struct PreviewBudgetSelector {
    budgets: BudgetSet,
}

impl PreviewBudgetSelector {
    #[must_use]
    pub fn new(budgets: BudgetSet) -> Self {
        Self { budgets }
    }

    #[must_use]
    pub fn select(&self, page: PageContext, tier: ViewerTier) -> Selection {
        if tier == ViewerTier::Subscriber {
            return Selection {
                budget: PreviewBudget::Unlimited,
                entitled: true,
            };
        }

        let seconds = match page {
            PageContext::Public => self.budgets.standard,
            PageContext::MemberArea => self.budgets.member_preview.or(self.budgets.standard),
        };

        Selection {
            budget: PreviewBudget::from_seconds(seconds),
            entitled: false,
        }
    }
}
