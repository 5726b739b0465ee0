/**
 * Take a test from a test bank on the command line.
 *
 * Author:  Ian Fisher (iafisher@protonmail.com)
 * Version: October 2019
 */
use std::io::Write;

use colored::*;
use structopt::StructOpt;

use testbank_quiz::common::{is_broken_pipe, CheckOptions, Command, Options, TakeOptions};
use testbank_quiz::report::Division;
use testbank_quiz::ui::CmdUI;
use testbank_quiz::{load_test, my_println, testbank, Event, QuizError, Result, Session};


fn main() {
    pretty_env_logger::init();
    let options = Options::from_args();

    if options.no_color {
        colored::control::set_override(false);
    }

    let result = match options.cmd {
        Command::Take(options) => {
            main_take(options)
        },
        Command::Check(options) => {
            main_check(options)
        },
    };

    if let Err(e) = result {
        match e {
            QuizError::ReadlineInterrupted => {},
            ref e if is_broken_pipe(e) => {},
            e => {
                eprintln!("{}: {}", "Error".red(), e);
                ::std::process::exit(2);
            },
        }
    }
}


/// The main function for the `take` subcommand.
pub fn main_take(options: TakeOptions) -> Result<()> {
    let test = load_test(&options.path)?;
    let mut session = Session::new(&test);
    let mut ui = CmdUI::new();
    let mut last_exit = None;
    let mut done = false;

    while let Some(event) = session.next_event()? {
        match event {
            Event::Enter(status) => {
                ui.entering(&status)?;
            },
            Event::Exit(status) => {
                ui.exiting(&status)?;
                last_exit = Some(status.kind);
            },
            Event::Question(mut question) => {
                match ui.ask(&question)? {
                    Some(response) => {
                        session.answer(&mut question, response)?;
                    },
                    // Abandon the session; nothing is kept.
                    None => return Ok(()),
                }
            },
            Event::Report(report) => {
                if !options.no_review
                    && last_exit == Some(Division::Section)
                    && report.wrong()? > 0 {
                    ui.review(&report)?;
                }
                ui.report(&report)?;
                if report.is_final() {
                    ui.finished()?;
                    done = true;
                }
            },
        }
    }

    if done {
        Ok(())
    } else {
        Err(QuizError::FinalEventNotProcessed)
    }
}


/// The main function for the `check` subcommand.
pub fn main_check(options: CheckOptions) -> Result<()> {
    let root = testbank::parse_file(&options.path)?;
    if options.tree {
        my_println!("{}", root)?;
    }

    let test = testbank_quiz::UnitTest::from_node(&root)?;
    test.verify()?;
    let summary = test.summary();

    if options.json {
        let serialized = serde_json::to_string_pretty(&summary).map_err(QuizError::Json)?;
        my_println!("{}", serialized)?;
        return Ok(());
    }

    let sections = summary.chapters.iter().map(|c| c.sections.len()).sum::<usize>();
    let categories = summary.chapters.iter()
        .flat_map(|c| c.sections.iter())
        .map(|s| s.categories.len())
        .sum::<usize>();
    let (facts, questions) = summary.chapters.iter()
        .flat_map(|c| c.sections.iter())
        .flat_map(|s| s.categories.iter())
        .fold((0, 0), |(f, q), c| (f + c.facts, q + c.questions));

    my_println!("{}", summary.name.cyan())?;
    my_println!("  {} chapter(s)", summary.chapters.len())?;
    my_println!("  {} section(s)", sections)?;
    my_println!("  {} category(s)", categories)?;
    my_println!("  {} fact(s)", facts)?;
    my_println!("  {} question(s)", questions)
}
