/**
 * The command-line user interface for taking a test.
 *
 * Author:  Ian Fisher (iafisher@protonmail.com)
 * Version: October 2019
 */
use std::io::Write;

use chrono::{DateTime, Utc};
use colored::*;
use rustyline::Editor;

use super::common::{QuizError, Result};
use super::iohelper::{letter, parse_letter, prettyprint, prettyprint_colored, prompt};
use super::report::{Division, Report};
use super::session::{Question, Response, Status};


pub struct CmdUI {
    editor: Editor<()>,
    number: usize,
    time_started: DateTime<Utc>,
}


impl CmdUI {
    pub fn new() -> Self {
        Self {
            editor: Editor::<()>::new(),
            number: 0,
            time_started: Utc::now(),
        }
    }

    pub fn entering(&mut self, status: &Status) -> Result<()> {
        self.status("Entering", status)
    }

    pub fn exiting(&mut self, status: &Status) -> Result<()> {
        self.status("Exiting", status)
    }

    fn status(&mut self, verb: &str, status: &Status) -> Result<()> {
        let color = match status.kind {
            Division::UnitTest => Color::BrightBlue,
            Division::Chapter => Color::Blue,
            Division::Section => Color::Cyan,
        };
        my_print!("\n")?;
        prettyprint_colored(&status.to_string(), &format!("{} ", verb), Some(color), None)
    }

    /// Show the question with its lettered choices and read a response. Returns
    /// `Ok(None)` if the user wants to stop.
    pub fn ask(&mut self, question: &Question) -> Result<Option<Response>> {
        self.number += 1;
        my_print!("\n")?;
        let prefix = format!("  ({}) ", self.number);
        let title = match question.label() {
            Some(label) => format!("[{}: {}] ", question.category(), label),
            None => format!("[{}] ", question.category()),
        };
        prettyprint_colored(
            &format!("{}{}", title, question.text()), &prefix, None, Some(Color::Cyan)
        )?;
        self.choices(question.choices())?;

        loop {
            let response = match prompt(&mut self.editor, "> ")? {
                Some(response) => response,
                None => return Ok(None),
            };

            match interpret(response, question.choices()) {
                Some(response) => return Ok(Some(response)),
                None => my_println!("{}", "Please enter a letter.".white())?,
            }
        }
    }

    fn choices(&mut self, choices: &[String]) -> Result<()> {
        for (i, choice) in choices.iter().enumerate() {
            if let Some(letter) = letter(i) {
                prettyprint(choice, &format!("     ({}) ", letter))?;
            }
        }
        my_print!("\n")
    }

    /// Walk through the questions that were missed in the division.
    pub fn review(&mut self, report: &Report) -> Result<()> {
        my_println!("\n{}", "You missed:".white())?;
        for review in report.problems()? {
            my_print!("\n")?;
            prettyprint_colored(
                review.question(), &format!("  [{}] ", review.category()), None, Some(Color::Cyan)
            )?;
            prettyprint_colored(review.answer(), "    You answered: ", Some(Color::Red), None)?;
            prettyprint_colored(review.right(), "    Right answer: ", Some(Color::Green), None)?;
        }
        Ok(())
    }

    pub fn report(&mut self, report: &Report) -> Result<()> {
        let total = report.total()?;
        let score_as_str = format!("{:.1}%", report.percent()?);

        my_print!("\n")?;
        my_print!("Cumulative score for previous {}: ", report.level())?;
        my_print!("{}", score_as_str.cyan())?;
        my_print!(" out of ")?;
        my_print!("{}", format!("{}", total).cyan())?;
        if total == 1 {
            my_println!(" question")?;
        } else {
            my_println!(" questions")?;
        }
        my_print!("  {}", format!("{}", report.right()?).green())?;
        my_print!(" correct\n")?;
        my_print!("  {}", format!("{}", report.wrong()?).red())?;
        my_print!(" incorrect\n")
    }

    pub fn finished(&mut self) -> Result<()> {
        let elapsed = Utc::now().signed_duration_since(self.time_started);
        my_print!("\n")?;
        prettyprint_colored(
            "Congratulations! You have finished the test.", "", Some(Color::BrightGreen), None
        )?;
        my_println!(
            "Time taken: {}m {:02}s", elapsed.num_minutes(), elapsed.num_seconds() % 60
        )
    }
}


/// Match a response against the choices. The exact text of a choice wins over a letter,
/// so a choice like "b" can be picked by typing it.
fn interpret(response: String, choices: &[String]) -> Option<Response> {
    if choices.iter().any(|c| *c == response) {
        Some(Response::Text(response))
    } else {
        parse_letter(&response, choices.len()).map(Response::Index)
    }
}
