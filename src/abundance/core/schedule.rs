//! Survey schedule: per-site observation window, inter-period gaps and
//! all-missing period flags.
//!
//! Purpose
//! -------
//! Describe *when* each site was surveyed. The forward recursion walks a
//! site's periods from `last` back to `first`, applying the one-step
//! transition `delta(i, t)` times across the gap that ends at period `t`,
//! and skipping periods flagged as entirely missing.
//!
//! Key behaviors
//! -------------
//! - [`SurveySchedule::new`] validates a caller-supplied layout.
//! - [`SurveySchedule::from_dates`] derives the layout from survey dates:
//!   dates are rebased so the earliest observed date across all sites sits
//!   one step after the origin, the initial gap of each site is its rebased
//!   first date, and later gaps are the differences between consecutive
//!   observed dates. Missing periods carry a gap of 1 (never read).
//! - [`SurveySchedule::regular`] uses period indices as dates.
//!
//! Invariants & assumptions
//! ------------------------
//! - `0 <= first(i) <= last(i) < T` and period `first(i)` is observed.
//! - `delta(i, t) >= 1` for every observed `t` in `first(i)..=last(i)`.
//! - A site with no observed period cannot be scheduled.
use crate::abundance::{
    core::validation::check_shape,
    errors::{AbundanceError, AbundanceResult},
};
use ndarray::{Array1, Array2};

/// Observation window and gap layout for `M` sites over `T` primary periods.
#[derive(Debug, Clone, PartialEq)]
pub struct SurveySchedule {
    first: Array1<usize>,
    last: Array1<usize>,
    delta: Array2<u32>,
    period_missing: Array2<bool>,
}

impl SurveySchedule {
    /// Build a schedule from explicit windows, gaps and missing flags.
    ///
    /// Parameters
    /// ----------
    /// - `first`, `last`: length-`M` window bounds (0-based, inclusive).
    /// - `delta`: `M × T` gaps; `delta[[i, first]]` is the initial gap from
    ///   the origin, `delta[[i, t]]` (`t > first`) the gap ending at `t`.
    /// - `period_missing`: `M × T`, `true` where a period has no data.
    ///
    /// # Errors
    /// - `ShapeMismatch` if the arrays disagree on `M` or `T`.
    /// - `InvalidSchedule` if a window is out of range or inverted, the first
    ///   period is missing, or a gap inside the window is zero.
    pub fn new(
        first: Array1<usize>, last: Array1<usize>, delta: Array2<u32>, period_missing: Array2<bool>,
    ) -> AbundanceResult<Self> {
        let (m, t) = period_missing.dim();
        if t == 0 {
            return Err(AbundanceError::ShapeMismatch {
                what: "period_missing",
                expected: vec![m, 1],
                actual: vec![m, 0],
            });
        }
        check_shape("first", &[m], first.shape())?;
        check_shape("last", &[m], last.shape())?;
        check_shape("delta", &[m, t], delta.shape())?;

        for site in 0..m {
            let (f, l) = (first[site], last[site]);
            if l >= t {
                return Err(AbundanceError::InvalidSchedule {
                    site,
                    reason: "last period index out of range",
                });
            }
            if f > l {
                return Err(AbundanceError::InvalidSchedule { site, reason: "first period after last" });
            }
            if period_missing[[site, f]] {
                return Err(AbundanceError::InvalidSchedule {
                    site,
                    reason: "first period is flagged all-missing",
                });
            }
            for period in f..=l {
                if !period_missing[[site, period]] && delta[[site, period]] == 0 {
                    return Err(AbundanceError::InvalidSchedule { site, reason: "zero gap" });
                }
            }
        }
        Ok(SurveySchedule { first, last, delta, period_missing })
    }

    /// Derive windows and gaps from per-period survey dates.
    ///
    /// `dates` is `M × T`; entries of missing periods are ignored. Observed
    /// dates must strictly increase within a site.
    ///
    /// # Errors
    /// - `ShapeMismatch` if `dates` and `period_missing` differ in shape.
    /// - `InvalidSchedule` if a site has no observed period or its observed
    ///   dates do not strictly increase.
    pub fn from_dates(dates: &Array2<i64>, period_missing: Array2<bool>) -> AbundanceResult<Self> {
        let (m, t) = period_missing.dim();
        check_shape("dates", &[m, t], dates.shape())?;

        let mut first = Array1::<usize>::zeros(m);
        let mut last = Array1::<usize>::zeros(m);
        for site in 0..m {
            let mut observed = (0..t).filter(|&p| !period_missing[[site, p]]);
            let Some(f) = observed.next() else {
                return Err(AbundanceError::InvalidSchedule { site, reason: "no observed period" });
            };
            first[site] = f;
            last[site] = observed.last().unwrap_or(f);
        }

        let origin = (0..m).map(|site| dates[[site, first[site]]]).min().unwrap_or(0);

        let mut delta = Array2::<u32>::ones((m, t));
        for site in 0..m {
            let f = first[site];
            delta[[site, f]] = gap_from(dates[[site, f]] - origin + 1, site)?;
            let mut previous = dates[[site, f]];
            for period in (f + 1)..=last[site] {
                if period_missing[[site, period]] {
                    continue;
                }
                let date = dates[[site, period]];
                delta[[site, period]] = gap_from(date - previous, site)?;
                previous = date;
            }
        }
        SurveySchedule::new(first, last, delta, period_missing)
    }

    /// Schedule with period indices as dates.
    pub fn regular(period_missing: Array2<bool>) -> AbundanceResult<Self> {
        let (m, t) = period_missing.dim();
        let dates = Array2::from_shape_fn((m, t), |(_, p)| p as i64);
        SurveySchedule::from_dates(&dates, period_missing)
    }

    /// Every site observed in every period, unit gaps.
    pub fn complete(m: usize, t: usize) -> AbundanceResult<Self> {
        SurveySchedule::regular(Array2::from_elem((m, t), false))
    }

    pub fn n_sites(&self) -> usize {
        self.period_missing.nrows()
    }

    pub fn n_periods(&self) -> usize {
        self.period_missing.ncols()
    }

    pub fn first(&self, site: usize) -> usize {
        self.first[site]
    }

    pub fn last(&self, site: usize) -> usize {
        self.last[site]
    }

    /// Gap ending at `period` (initial gap when `period == first(site)`).
    pub fn delta(&self, site: usize, period: usize) -> u32 {
        self.delta[[site, period]]
    }

    pub fn is_missing(&self, site: usize, period: usize) -> bool {
        self.period_missing[[site, period]]
    }

    pub fn period_missing(&self) -> &Array2<bool> {
        &self.period_missing
    }
}

fn gap_from(diff: i64, site: usize) -> AbundanceResult<u32> {
    if diff < 1 {
        return Err(AbundanceError::InvalidSchedule {
            site,
            reason: "observed dates must strictly increase",
        });
    }
    u32::try_from(diff).map_err(|_| AbundanceError::InvalidSchedule { site, reason: "gap too large" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // - Validation in `SurveySchedule::new`.
    // - Gap derivation in `from_dates` / `regular`, including the initial gap
    //   relative to the earliest observed date across sites.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // A fully observed regular schedule has unit gaps everywhere and spans
    // the full period range.
    fn complete_schedule_has_unit_gaps() {
        let sched = SurveySchedule::complete(2, 4).unwrap();
        for site in 0..2 {
            assert_eq!(sched.first(site), 0);
            assert_eq!(sched.last(site), 3);
            for t in 0..4 {
                assert_eq!(sched.delta(site, t), 1);
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Gaps derived from dates skip missing periods and offset a late start.
    //
    // Given
    // -----
    // - Site 0 observed at dates 1, 3, 7 (all periods).
    // - Site 1 missing period 0, observed at dates 4 and 9.
    //
    // Expect
    // ------
    // - Site 0: first = 0, initial gap 1, gaps 2 and 4.
    // - Site 1: first = 1, initial gap 4 - 1 + 1 = 4, gap 5 at period 2.
    fn from_dates_derives_gaps() {
        let dates = array![[1_i64, 3, 7], [0, 4, 9]];
        let missing = array![[false, false, false], [true, false, false]];
        let sched = SurveySchedule::from_dates(&dates, missing).unwrap();
        assert_eq!(sched.first(0), 0);
        assert_eq!(sched.delta(0, 0), 1);
        assert_eq!(sched.delta(0, 1), 2);
        assert_eq!(sched.delta(0, 2), 4);
        assert_eq!(sched.first(1), 1);
        assert_eq!(sched.last(1), 2);
        assert_eq!(sched.delta(1, 1), 4);
        assert_eq!(sched.delta(1, 2), 5);
    }

    #[test]
    // Purpose
    // -------
    // An interior missing period leaves its gap at 1 and the following
    // observed period absorbs the elapsed time.
    fn interior_missing_period_is_absorbed_by_next_gap() {
        let missing = array![[false, true, false, false]];
        let sched = SurveySchedule::regular(missing).unwrap();
        assert_eq!(sched.delta(0, 1), 1);
        assert_eq!(sched.delta(0, 2), 2);
        assert_eq!(sched.delta(0, 3), 1);
        assert!(sched.is_missing(0, 1));
    }

    #[test]
    // Purpose
    // -------
    // Schedules without any observed period, or with non-increasing dates,
    // are rejected.
    fn invalid_layouts_are_rejected() {
        let all_missing = array![[false, false], [true, true]];
        assert!(matches!(
            SurveySchedule::regular(all_missing),
            Err(AbundanceError::InvalidSchedule { site: 1, .. })
        ));
        let dates = array![[2_i64, 2]];
        assert!(SurveySchedule::from_dates(&dates, array![[false, false]]).is_err());

        let bad_window = SurveySchedule::new(
            array![1],
            array![0],
            Array2::ones((1, 2)),
            Array2::from_elem((1, 2), false),
        );
        assert!(matches!(bad_window, Err(AbundanceError::InvalidSchedule { .. })));

        let bad_shape = SurveySchedule::new(
            array![0, 0],
            array![1],
            Array2::ones((2, 2)),
            Array2::from_elem((2, 2), false),
        );
        assert!(matches!(bad_shape, Err(AbundanceError::ShapeMismatch { what: "last", .. })));
    }
}
