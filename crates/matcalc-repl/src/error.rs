use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CommandError {
    #[error("Command not found: {0}")]
    #[diagnostic(
        code(matcalc::repl::not_found),
        help("Type `help` for the list of available commands.")
    )]
    NotFound(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Calc(#[from] matcalc_lang::Error),

    #[error("Failed to open the file \"{}\"", path.display())]
    #[diagnostic(code(matcalc::repl::script))]
    Script {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Scripts can be nested at most {0} levels deep")]
    #[diagnostic(code(matcalc::repl::script_depth))]
    ScriptDepth(usize),

    #[error("Input ended while {0}")]
    #[diagnostic(code(matcalc::repl::unexpected_eof))]
    UnexpectedEof(&'static str),

    #[error("Failed to read input: {0}")]
    #[diagnostic(code(matcalc::repl::input))]
    Input(String),
}

impl CommandError {
    /// The calculator error behind this failure, if any.
    pub fn calc(&self) -> Option<&matcalc_lang::Error> {
        match self {
            CommandError::Calc(err) => Some(err),
            _ => None,
        }
    }
}
