//! Automatic numbering to resolve colliding target names.

use serde::{Deserialize, Serialize};

use crate::conflict::CollisionReport;
use crate::error::RenameError;
use crate::preview::PreviewResult;
use crate::rules::RuleConfiguration;

/// Zero padding widths tried in order before giving up.
pub const DEFAULT_ESCALATION_PADDINGS: [usize; 2] = [2, 3];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationPolicy {
    pub paddings: Vec<usize>,
}

/// Rules and previews that no longer collide.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub rules: RuleConfiguration,
    pub previews: Vec<PreviewResult>,
    /// Padding width that resolved the collisions.
    pub padding: usize,
    pub attempts: usize,
}

/// Bounded escalation of forced suffix numbering.
#[derive(Debug, Clone, Default)]
pub struct AutoNumbering {
    policy: EscalationPolicy,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            paddings: DEFAULT_ESCALATION_PADDINGS.to_vec(),
        }
    }
}

impl EscalationPolicy {
    #[must_use]
    pub const fn new(paddings: Vec<usize>) -> Self {
        Self { paddings }
    }

    /// Padding levels wide enough for every number in a batch of the given size.
    pub fn paddings_for(&self, batch_size: usize) -> impl Iterator<Item = usize> + '_ {
        let width = number_width(batch_size);
        self.paddings.iter().copied().filter(move |&padding| padding >= width)
    }
}

impl AutoNumbering {
    #[must_use]
    pub const fn new(policy: EscalationPolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub const fn policy(&self) -> &EscalationPolicy {
        &self.policy
    }

    /// Force numbering on with increasing padding until no collisions remain.
    ///
    /// Numbering runs from 1 to `batch_size`,
    /// so padding levels narrower than `batch_size` are skipped.
    /// `preview` regenerates the previews for the whole batch in input order,
    /// so every file keeps the number of its batch index across attempts.
    /// `detect` reports the collisions of a preview run.
    ///
    /// # Errors
    /// Returns `EscalationExhausted` with the last collision report
    /// if collisions remain after the last padding level.
    pub fn resolve<P, D>(
        &self,
        rules: &RuleConfiguration,
        batch_size: usize,
        initial: CollisionReport,
        mut preview: P,
        mut detect: D,
    ) -> Result<Resolution, RenameError>
    where
        P: FnMut(&RuleConfiguration) -> Vec<PreviewResult>,
        D: FnMut(&[PreviewResult]) -> CollisionReport,
    {
        let mut report = initial;
        let mut attempts = 0;
        for padding in self.policy.paddings_for(batch_size) {
            attempts += 1;
            let forced = rules.with_forced_numbering(padding);
            let previews = preview(&forced);
            report = detect(&previews);
            if report.is_empty() {
                return Ok(Resolution {
                    rules: forced,
                    previews,
                    padding,
                    attempts,
                });
            }
        }
        Err(RenameError::EscalationExhausted { report, attempts })
    }
}

/// Number of digits in the largest sequence number of a batch.
const fn number_width(batch_size: usize) -> usize {
    match batch_size.checked_ilog10() {
        Some(digits) => digits as usize + 1,
        None => 1,
    }
}
