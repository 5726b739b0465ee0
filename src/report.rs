/**
 * Score keeping for the divisions of a test.
 *
 * A report is open while questions in its division are being answered, and is
 * finalized when the division is exited. Finalizing a report adds its counts and its
 * missed questions to the report of the enclosing division. The reports of a session
 * live together in a `Reports` collection and refer to their parents by `ReportId`.
 *
 * Author:  Ian Fisher (iafisher@protonmail.com)
 * Version: October 2019
 */
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::debug;

use super::common::{QuizError, Result};
use super::quiz::{CategoryKind, Record};


/// A level of the test that can be entered and exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Division {
    UnitTest, Chapter, Section,
}


/// Identifies a report within the `Reports` that opened it. An id is rejected by every
/// other `Reports`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportId {
    arena: usize,
    index: usize,
}


static NEXT_ARENA: AtomicUsize = AtomicUsize::new(0);


/// A question that was answered incorrectly, and the answer that was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub record: Record,
    pub given: String,
}


#[derive(Debug, Clone)]
pub struct Report {
    level: Division,
    parent: Option<ReportId>,
    right: usize,
    wrong: usize,
    problems: Vec<Problem>,
    finalized: bool,
    open_children: usize,
}


/// A missed question as it should be shown when reviewing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Review<'a> {
    problem: &'a Problem,
}


/// Every report of a single session.
#[derive(Debug)]
pub struct Reports {
    arena: usize,
    reports: Vec<Report>,
}


impl Report {
    fn new(level: Division, parent: Option<ReportId>) -> Self {
        Report {
            level,
            parent,
            right: 0,
            wrong: 0,
            problems: Vec::new(),
            finalized: false,
            open_children: 0,
        }
    }

    pub fn level(&self) -> Division {
        self.level
    }

    /// Whether this is the report of the whole test.
    pub fn is_final(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn right_answer(&mut self) -> Result<()> {
        self.require_open()?;
        self.right += 1;
        Ok(())
    }

    pub fn wrong_answer(&mut self) -> Result<()> {
        self.require_open()?;
        self.wrong += 1;
        Ok(())
    }

    /// Record a question that will need to be reviewed.
    pub fn review(&mut self, record: Record, given: String) -> Result<()> {
        self.require_open()?;
        self.problems.push(Problem { record, given });
        Ok(())
    }

    /// Add the results of a finalized child report.
    pub fn commit(&mut self, right: usize, wrong: usize, problems: &[Problem]) -> Result<()> {
        self.require_open()?;
        self.right += right;
        self.wrong += wrong;
        self.problems.extend_from_slice(problems);
        Ok(())
    }

    pub fn right(&self) -> Result<usize> {
        self.require_finalized()?;
        Ok(self.right)
    }

    pub fn wrong(&self) -> Result<usize> {
        self.require_finalized()?;
        Ok(self.wrong)
    }

    pub fn total(&self) -> Result<usize> {
        self.require_finalized()?;
        Ok(self.right + self.wrong)
    }

    /// The percentage of answers that were right, or 0 if nothing was answered.
    pub fn percent(&self) -> Result<f64> {
        let total = self.total()?;
        if total == 0 {
            Ok(0.0)
        } else {
            Ok((self.right as f64) * 100.0 / (total as f64))
        }
    }

    /// Iterate over the questions that were answered incorrectly, in the order they
    /// were answered.
    pub fn problems(&self) -> Result<impl Iterator<Item = Review<'_>> + '_> {
        self.require_finalized()?;
        Ok(self.problems.iter().map(|problem| Review { problem }))
    }

    fn require_open(&self) -> Result<()> {
        if self.finalized {
            Err(QuizError::ReportFinalized)
        } else {
            Ok(())
        }
    }

    fn require_finalized(&self) -> Result<()> {
        if self.finalized {
            Ok(())
        } else {
            Err(QuizError::ReportNotFinalized)
        }
    }
}


impl<'a> Review<'a> {
    pub fn category(&self) -> CategoryKind {
        self.problem.record.category
    }

    pub fn question(&self) -> &'a str {
        &self.problem.record.question
    }

    pub fn choices(&self) -> &'a [String] {
        &self.problem.record.choices
    }

    /// The answer that was given.
    pub fn answer(&self) -> &'a str {
        &self.problem.given
    }

    /// The answer that should have been given.
    pub fn right(&self) -> &'a str {
        &self.problem.record.answer
    }
}


impl Reports {
    pub fn new() -> Self {
        Reports {
            arena: NEXT_ARENA.fetch_add(1, Ordering::Relaxed),
            reports: Vec::new(),
        }
    }

    /// Start a new report. The parent, if any, must still be open, and cannot be
    /// finalized until the new report is.
    pub fn open(&mut self, level: Division, parent: Option<ReportId>) -> Result<ReportId> {
        if let Some(parent) = parent {
            let parent = self.get_mut(parent)?;
            parent.require_open()?;
            parent.open_children += 1;
        }
        self.reports.push(Report::new(level, parent));
        Ok(ReportId { arena: self.arena, index: self.reports.len() - 1 })
    }

    pub fn get(&self, id: ReportId) -> Result<&Report> {
        let index = self.index(id)?;
        Ok(&self.reports[index])
    }

    pub fn get_mut(&mut self, id: ReportId) -> Result<&mut Report> {
        let index = self.index(id)?;
        Ok(&mut self.reports[index])
    }

    /// Lock the report and roll its results up into its parent.
    pub fn finalize(&mut self, id: ReportId) -> Result<&Report> {
        let index = self.index(id)?;
        let report = &self.reports[index];
        report.require_open()?;
        if report.open_children > 0 {
            return Err(QuizError::ReportHasOpenChildren(report.open_children));
        }

        let (right, wrong, parent) = (report.right, report.wrong, report.parent);
        if let Some(parent) = parent {
            // Parents are always opened before their children.
            let (before, after) = self.reports.split_at_mut(index);
            let report = &after[0];
            let parent = &mut before[parent.index];
            parent.commit(right, wrong, &report.problems)?;
            parent.open_children -= 1;
        }

        let report = &mut self.reports[index];
        report.finalized = true;
        debug!("Finalized {} report: {} right, {} wrong", report.level, right, wrong);
        Ok(&self.reports[index])
    }

    fn index(&self, id: ReportId) -> Result<usize> {
        if id.arena == self.arena && id.index < self.reports.len() {
            Ok(id.index)
        } else {
            Err(QuizError::ForeignReport)
        }
    }
}


impl Default for Reports {
    fn default() -> Self {
        Reports::new()
    }
}


impl fmt::Display for Division {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Division::UnitTest => write!(f, "UnitTest"),
            Division::Chapter => write!(f, "Chapter"),
            Division::Section => write!(f, "Section"),
        }
    }
}
