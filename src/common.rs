/**
 * Definitions of data structures used by several modules, such as `QuizError` and the
 * various structs that hold command-line arguments.
 *
 * Author:  Ian Fisher (iafisher@protonmail.com)
 * Version: October 2019
 */
use std::error;
use std::fmt;
use std::io;
use std::path::PathBuf;

use structopt::StructOpt;


pub type Result<T> = ::std::result::Result<T, QuizError>;


/// A position in a test-bank document. Both fields are 1-indexed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}


#[derive(Debug)]
pub enum QuizError {
    Io(io::Error),
    Json(serde_json::Error),
    ReadlineInterrupted,
    /// The document is not well-formed, or its tags are nested incorrectly.
    Document { location: Location, message: String },
    /// The document is well-formed but violates the rules of a test bank. `context`
    /// lists the enclosing divisions from the outermost inwards.
    Structure { context: Vec<String>, error: StructureError },

    // The remaining variants mean that the caller broke the rules for driving a
    // session.
    AlreadyAnswered,
    ChoiceOutOfRange { index: usize, len: usize },
    AlreadyBuilt,
    ReportFinalized,
    ReportNotFinalized,
    ReportHasOpenChildren(usize),
    ForeignReport,
    SessionExhausted,
    FinalEventNotProcessed,
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructureError {
    EmptyUnitTest,
    EmptyChapter,
    EmptySection,
    EmptyCategory,
    EmptyFact,
    UnknownCategory(String),
    InvalidTrueOrFalse(String),
    AmbiguousTrueOrFalse(String),
    UnexpectedNode(String),
}


impl QuizError {
    /// Wrap a structural error with the division it was found in. Errors that are not
    /// structural are returned unchanged.
    pub fn within(self, division: &str, name: &str) -> QuizError {
        match self {
            QuizError::Structure { mut context, error } => {
                context.insert(0, format!("{} '{}'", division, name));
                QuizError::Structure { context, error }
            },
            other => other,
        }
    }
}


impl From<StructureError> for QuizError {
    fn from(error: StructureError) -> Self {
        QuizError::Structure { context: Vec::new(), error }
    }
}


impl fmt::Display for QuizError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            QuizError::Io(ref err) => {
                write!(f, "IO error ({})", err)
            },
            QuizError::Json(ref err) => {
                write!(f, "could not serialize JSON ({})", err)
            },
            QuizError::ReadlineInterrupted => {
                Ok(())
            },
            QuizError::Document { location, ref message } => {
                write!(
                    f, "{} (line {}, column {})", message, location.line, location.column
                )
            },
            QuizError::Structure { ref context, ref error } => {
                if context.is_empty() {
                    write!(f, "{}", error)
                } else {
                    write!(f, "{}: {}", context.join(" > "), error)
                }
            },
            QuizError::AlreadyAnswered => {
                write!(f, "question has already been answered")
            },
            QuizError::ChoiceOutOfRange { index, len } => {
                write!(f, "choice {} is out of range for {} choices", index, len)
            },
            QuizError::AlreadyBuilt => {
                write!(f, "category has already been built for this session")
            },
            QuizError::ReportFinalized => {
                write!(f, "report is finalized")
            },
            QuizError::ReportNotFinalized => {
                write!(f, "report is not finalized")
            },
            QuizError::ReportHasOpenChildren(n) => {
                write!(f, "report still has {} open child report(s)", n)
            },
            QuizError::ForeignReport => {
                write!(f, "report does not belong to this session")
            },
            QuizError::SessionExhausted => {
                write!(f, "session has no more events")
            },
            QuizError::FinalEventNotProcessed => {
                write!(f, "final event not processed")
            },
        }
    }
}


impl fmt::Display for StructureError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            StructureError::EmptyUnitTest => write!(f, "unit test is empty"),
            StructureError::EmptyChapter => write!(f, "chapter is empty"),
            StructureError::EmptySection => write!(f, "section is empty"),
            StructureError::EmptyCategory => write!(f, "category is empty"),
            StructureError::EmptyFact => write!(f, "fact has no answers"),
            StructureError::UnknownCategory(ref kind) => {
                write!(f, "type of category not recognized: '{}'", kind)
            },
            StructureError::InvalidTrueOrFalse(ref answer) => {
                write!(f, "answer must be 'True' or 'False', not '{}'", answer)
            },
            StructureError::AmbiguousTrueOrFalse(ref question) => {
                write!(f, "question is both true and false: '{}'", question)
            },
            StructureError::UnexpectedNode(ref node) => {
                write!(f, "unexpected {} node", node)
            },
        }
    }
}


impl error::Error for QuizError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            QuizError::Io(ref err) => Some(err),
            QuizError::Json(ref err) => Some(err),
            _ => None,
        }
    }
}


impl error::Error for StructureError {}


pub fn is_broken_pipe(e: &QuizError) -> bool {
    if let QuizError::Io(e) = e {
        if let io::ErrorKind::BrokenPipe = e.kind() {
            return true;
        }
    }
    false
}


/// Holds the command-line configuration for the application.
#[derive(StructOpt)]
#[structopt(name = "quizme", about = "Study a test bank from the command line.")]
pub struct Options {
    /// Do not emit colorized output.
    #[structopt(long = "no-color")]
    pub no_color: bool,
    #[structopt(subcommand)]
    pub cmd: Command,
}

#[derive(StructOpt)]
pub enum Command {
    /// Take the test described by a test bank.
    #[structopt(name = "take")]
    Take(TakeOptions),
    /// Validate a test bank and summarize its contents.
    #[structopt(name = "check")]
    Check(CheckOptions),
}

#[derive(StructOpt)]
pub struct TakeOptions {
    /// Path to the test bank.
    #[structopt(parse(from_os_str))]
    pub path: PathBuf,
    /// Do not review missed questions at the end of each section.
    #[structopt(long = "no-review")]
    pub no_review: bool,
}

#[derive(StructOpt)]
pub struct CheckOptions {
    /// Path to the test bank.
    #[structopt(parse(from_os_str))]
    pub path: PathBuf,
    /// Print the summary as JSON.
    #[structopt(long = "json")]
    pub json: bool,
    /// Print the parsed document.
    #[structopt(long = "tree")]
    pub tree: bool,
}
