/**
 * Study a test bank of chapters, sections and categories of facts.
 *
 * The `testbank` module reads the document, `quiz` validates it and builds questions,
 * `session` produces the events of a sitting and `report` keeps score. The `ui` and
 * `iohelper` modules are the terminal front-end used by the `quizme` binary.
 *
 * Author:  Ian Fisher (iafisher@protonmail.com)
 * Version: October 2019
 */
#[macro_use]
pub mod iohelper;
pub mod common;
pub mod quiz;
pub mod report;
pub mod session;
pub mod testbank;
pub mod ui;

use std::path::Path;

use log::info;

pub use common::{QuizError, Result};
pub use quiz::UnitTest;
pub use session::{Event, Response, Session};


/// Read, validate and verify the test bank at `path`.
pub fn load_test(path: &Path) -> Result<UnitTest> {
    let root = testbank::parse_file(path)?;
    let test = UnitTest::from_node(&root)?;
    test.verify()?;
    info!("Loaded test '{}' with {} chapter(s)", test.name, test.chapters.len());
    Ok(test)
}
