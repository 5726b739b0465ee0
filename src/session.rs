/**
 * The sequence of events that make up one sitting of a test.
 *
 * A `Session` walks the test depth-first. Entering a division opens a report for it,
 * and exiting the division finalizes the report and hands a copy of it to the caller.
 * The questions of a section are built and shuffled together only when the section
 * is reached.
 *
 * Author:  Ian Fisher (iafisher@protonmail.com)
 * Version: October 2019
 */
use std::fmt;

use log::{debug, info};
use rand::rngs::ThreadRng;
use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};

use super::common::{QuizError, Result};
use super::quiz::{CategoryBuild, CategoryKind, Record, UnitTest};
use super::report::{Division, Report, ReportId, Reports};


#[derive(Debug)]
pub enum Event {
    Enter(Status),
    Exit(Status),
    Question(Question),
    /// A finalized report for the division that was just exited.
    Report(Report),
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub kind: Division,
    pub name: String,
}


/// A question to be answered exactly once.
#[derive(Debug)]
pub struct Question {
    record: Record,
    report: ReportId,
    answered: bool,
}


/// How the user answered a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Index into the question's choices.
    Index(usize),
    /// The text of the answer.
    Text(String),
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    EnterTest,
    EnterChapter,
    EnterSection,
    BuildSection,
    Ask,
    ExitSection,
    SectionReport,
    ExitChapter,
    ChapterReport,
    ExitTest,
    TestReport,
    Finished,
    Exhausted,
}


pub struct Session<'a, R: Rng = ThreadRng> {
    test: &'a UnitTest,
    rng: R,
    reports: Reports,
    step: Step,
    chapter: usize,
    section: usize,
    /// Reports of the divisions that have been entered but not exited, outermost first.
    open: Vec<ReportId>,
    /// One build per category, indexed by chapter and section.
    builds: Vec<Vec<Vec<CategoryBuild<'a>>>>,
    pending: Vec<Record>,
    asked: usize,
}


impl<'a> Session<'a, ThreadRng> {
    pub fn new(test: &'a UnitTest) -> Self {
        Session::with_rng(test, thread_rng())
    }
}


impl<'a, R: Rng> Session<'a, R> {
    pub fn with_rng(test: &'a UnitTest, rng: R) -> Self {
        Session {
            test,
            rng,
            reports: Reports::new(),
            step: Step::EnterTest,
            chapter: 0,
            section: 0,
            open: Vec::new(),
            builds: test.chapters.iter().map(|chapter| {
                chapter.sections.iter().map(|section| {
                    section.categories.iter().map(CategoryBuild::new).collect()
                }).collect()
            }).collect(),
            pending: Vec::new(),
            asked: 0,
        }
    }

    /// Return the next event of the session. `Ok(None)` is returned once, after the
    /// report for the whole test; asking for another event after that is an error.
    /// Any error ends the session.
    pub fn next_event(&mut self) -> Result<Option<Event>> {
        let event = self.advance();
        if event.is_err() {
            self.step = Step::Exhausted;
        }
        event
    }

    fn advance(&mut self) -> Result<Option<Event>> {
        loop {
            match self.step {
                Step::EnterTest => {
                    let test = self.test;
                    info!("Starting test '{}'", test.name);
                    self.step = Step::EnterChapter;
                    return self.enter(Division::UnitTest, &test.name).map(Some);
                },
                Step::EnterChapter => {
                    let test = self.test;
                    let chapter = &test.chapters[self.chapter];
                    self.section = 0;
                    self.step = Step::EnterSection;
                    return self.enter(Division::Chapter, &chapter.name).map(Some);
                },
                Step::EnterSection => {
                    let test = self.test;
                    let section = &test.chapters[self.chapter].sections[self.section];
                    self.step = Step::BuildSection;
                    return self.enter(Division::Section, &section.name).map(Some);
                },
                Step::BuildSection => {
                    self.build_section()?;
                    self.step = Step::Ask;
                },
                Step::Ask => {
                    if let Some(record) = self.pending.pop() {
                        self.asked += 1;
                        let report = self.current_report()?;
                        return Ok(Some(Event::Question(Question {
                            record, report, answered: false,
                        })));
                    }
                    self.step = Step::ExitSection;
                },
                Step::ExitSection => {
                    let test = self.test;
                    let section = &test.chapters[self.chapter].sections[self.section];
                    self.step = Step::SectionReport;
                    return Ok(Some(exit(Division::Section, &section.name)));
                },
                Step::SectionReport => {
                    let report = self.finalize_current()?;
                    self.section += 1;
                    self.step = if self.section < self.test.chapters[self.chapter].sections.len() {
                        Step::EnterSection
                    } else {
                        Step::ExitChapter
                    };
                    return Ok(Some(report));
                },
                Step::ExitChapter => {
                    let test = self.test;
                    let chapter = &test.chapters[self.chapter];
                    self.step = Step::ChapterReport;
                    return Ok(Some(exit(Division::Chapter, &chapter.name)));
                },
                Step::ChapterReport => {
                    let report = self.finalize_current()?;
                    self.chapter += 1;
                    self.step = if self.chapter < self.test.chapters.len() {
                        Step::EnterChapter
                    } else {
                        Step::ExitTest
                    };
                    return Ok(Some(report));
                },
                Step::ExitTest => {
                    self.step = Step::TestReport;
                    return Ok(Some(exit(Division::UnitTest, &self.test.name)));
                },
                Step::TestReport => {
                    let report = self.finalize_current()?;
                    info!("Finished test '{}' after {} question(s)", self.test.name, self.asked);
                    self.step = Step::Finished;
                    return Ok(Some(report));
                },
                Step::Finished => {
                    self.step = Step::Exhausted;
                    return Ok(None);
                },
                Step::Exhausted => {
                    return Err(QuizError::SessionExhausted);
                },
            }
        }
    }

    /// Answer a question that this session produced.
    pub fn answer(&mut self, question: &mut Question, response: Response) -> Result<bool> {
        question.answer(&mut self.reports, response)
    }

    pub fn reports(&self) -> &Reports {
        &self.reports
    }

    pub fn reports_mut(&mut self) -> &mut Reports {
        &mut self.reports
    }

    /// How many questions have been handed out so far.
    pub fn asked(&self) -> usize {
        self.asked
    }

    fn enter(&mut self, kind: Division, name: &str) -> Result<Event> {
        debug!("Entering {}: {}", kind, name);
        let parent = self.open.last().cloned();
        let id = self.reports.open(kind, parent)?;
        self.open.push(id);
        Ok(Event::Enter(Status { kind, name: name.to_string() }))
    }

    fn build_section(&mut self) -> Result<()> {
        let test = self.test;
        let section = &test.chapters[self.chapter].sections[self.section];
        let mut records = Vec::new();
        for build in self.builds[self.chapter][self.section].iter_mut() {
            records.extend(build.build(&mut self.rng)?);
        }
        records.shuffle(&mut self.rng);
        debug!("Section '{}' has {} question(s)", section.name, records.len());
        self.pending = records;
        Ok(())
    }

    fn current_report(&self) -> Result<ReportId> {
        self.open.last().cloned().ok_or(QuizError::SessionExhausted)
    }

    fn finalize_current(&mut self) -> Result<Event> {
        let id = self.open.pop().ok_or(QuizError::SessionExhausted)?;
        let report = self.reports.finalize(id)?;
        Ok(Event::Report(report.clone()))
    }
}


fn exit(kind: Division, name: &str) -> Event {
    debug!("Exiting {}: {}", kind, name);
    Event::Exit(Status { kind, name: name.to_string() })
}


impl Question {
    pub fn category(&self) -> CategoryKind {
        self.record.category
    }

    pub fn label(&self) -> Option<&str> {
        self.record.label.as_ref().map(|l| l.as_str())
    }

    pub fn text(&self) -> &str {
        &self.record.question
    }

    pub fn choices(&self) -> &[String] {
        &self.record.choices
    }

    pub fn is_answered(&self) -> bool {
        self.answered
    }

    /// Record the response in the report of the question's section, and return whether
    /// it was right. A question can only be answered once.
    pub fn answer(&mut self, reports: &mut Reports, response: Response) -> Result<bool> {
        if self.answered {
            return Err(QuizError::AlreadyAnswered);
        }

        let given = match response {
            Response::Index(index) => {
                self.record.choices.get(index).cloned().ok_or(QuizError::ChoiceOutOfRange {
                    index, len: self.record.choices.len(),
                })?
            },
            Response::Text(text) => text,
        };

        let report = reports.get_mut(self.report)?;
        let correct = given == self.record.answer;
        if correct {
            report.right_answer()?;
        } else {
            report.wrong_answer()?;
            report.review(self.record.clone(), given)?;
        }
        self.answered = true;
        Ok(correct)
    }

    #[cfg(test)]
    pub(crate) fn right_answer(&self) -> &str {
        &self.record.answer
    }
}


impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.name)
    }
}
