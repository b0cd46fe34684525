use colored::*;
use itertools::Itertools;
use matcalc_lang::{MAX_OPERATIONS_LIMIT, check_max_operations, parse_number};
use miette::IntoDiagnostic;
use rustyline::{
    At, Cmd, CompletionType, Config, Context, EditMode, Editor, Helper, KeyCode, KeyEvent,
    Modifiers, Movement, Word,
    completion::{Completer, FilenameCompleter, Pair},
    error::ReadlineError,
    highlight::Highlighter,
    hint::Hinter,
    history::FileHistory,
    validate::Validator,
};
use std::{
    borrow::Cow,
    fs,
    io::{self, IsTerminal},
    path::{Path, PathBuf},
};

use crate::{
    command_context::{CommandContext, completions},
    error::CommandError,
    input::{LineInput, StreamInput},
    script::{ErrorPolicy, ScriptReport},
};

const PROMPT: &str = "Enter a command ('help' for the list of available commands): ";
const MAX_OPERATIONS_PROMPT: &str = "Enter the maximum number of operations: ";

pub struct MatcalcLineHelper {
    file_completer: FilenameCompleter,
}

impl MatcalcLineHelper {
    pub fn new() -> Self {
        Self {
            file_completer: FilenameCompleter::new(),
        }
    }
}

impl Default for MatcalcLineHelper {
    fn default() -> Self {
        Self::new()
    }
}

impl Hinter for MatcalcLineHelper {
    type Hint = String;
}

impl Highlighter for MatcalcLineHelper {
    fn highlight_prompt<'b, 's: 'b, 'p: 'b>(
        &'s self,
        prompt: &'p str,
        _default: bool,
    ) -> Cow<'b, str> {
        prompt.cyan().to_string().into()
    }
}

impl Validator for MatcalcLineHelper {}

impl Completer for MatcalcLineHelper {
    type Candidate = Pair;
    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> Result<(usize, Vec<Pair>), ReadlineError> {
        if line.starts_with("read ") {
            return self.file_completer.complete_path(line, pos);
        }

        let prefix = &line[..pos];
        if prefix.contains(char::is_whitespace) {
            return Ok((pos, Vec::new()));
        }

        let candidates = completions(prefix)
            .into_iter()
            .map(|cmd| Pair {
                display: cmd.clone(),
                replacement: cmd,
            })
            .collect_vec();

        Ok((0, candidates))
    }
}

impl Helper for MatcalcLineHelper {}

/// Terminal input backed by a rustyline editor.
struct EditorInput {
    editor: Editor<MatcalcLineHelper, FileHistory>,
}

impl LineInput for EditorInput {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>, CommandError> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(Some(line)),
            Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
            Err(ReadlineError::Eof) => Ok(None),
            Err(err) => Err(CommandError::Input(err.to_string())),
        }
    }

    fn message(&mut self, text: &str) {
        match text.strip_prefix("Error:") {
            Some(rest) => println!("{}{}", "Error:".red(), rest),
            None => println!("{}", text),
        }
    }

    fn interactive(&mut self) -> &mut dyn LineInput {
        self
    }

    fn remember(&mut self, line: &str) {
        if let Err(err) = self.editor.add_history_entry(line) {
            tracing::warn!("failed to add history entry: {}", err);
        }
    }
}

pub struct Repl {
    max_operations: Option<usize>,
    on_error: ErrorPolicy,
    history: bool,
}

impl Repl {
    /// Creates a REPL. Without `max_operations` the user is asked for it at startup.
    pub fn new(max_operations: Option<usize>) -> Self {
        Self {
            max_operations,
            on_error: ErrorPolicy::default(),
            history: true,
        }
    }

    pub fn with_error_policy(mut self, on_error: ErrorPolicy) -> Self {
        self.on_error = on_error;
        self
    }

    pub fn with_history(mut self, history: bool) -> Self {
        self.history = history;
        self
    }

    pub fn config_dir() -> Option<PathBuf> {
        std::env::var_os("MATCALC_CONFIG_DIR")
            .map(PathBuf::from)
            .or_else(|| dirs::config_dir().map(|d| d.join("matcalc")))
    }

    /// Runs the interactive session on the terminal, or on plain stdin when it is piped.
    pub fn run(&self) -> miette::Result<()> {
        if !io::stdin().is_terminal() {
            let mut input = StreamInput::new(io::stdin().lock(), io::stdout());
            return self.run_with(&mut input);
        }

        let config = Config::builder()
            .history_ignore_space(true)
            .completion_type(CompletionType::List)
            .edit_mode(EditMode::Emacs)
            .color_mode(rustyline::ColorMode::Enabled)
            .build();
        let mut editor = Editor::with_config(config).into_diagnostic()?;

        editor.set_helper(Some(MatcalcLineHelper::new()));
        editor.bind_sequence(
            KeyEvent(KeyCode::Left, Modifiers::CTRL),
            Cmd::Move(Movement::BackwardWord(1, Word::Big)),
        );
        editor.bind_sequence(
            KeyEvent(KeyCode::Right, Modifiers::CTRL),
            Cmd::Move(Movement::ForwardWord(1, At::AfterEnd, Word::Big)),
        );

        let history = self
            .history
            .then(Self::config_dir)
            .flatten()
            .map(|config_dir| {
                fs::create_dir_all(&config_dir).ok();
                config_dir.join("history.txt")
            });

        if let Some(history) = &history
            && editor.load_history(history).is_err()
        {
            tracing::debug!(path = %history.display(), "no previous history");
        }

        let mut input = EditorInput { editor };
        let result = self.run_with(&mut input);

        if let Some(history) = &history
            && let Err(err) = input.editor.save_history(history)
        {
            tracing::warn!(path = %history.display(), "failed to save history: {}", err);
        }

        result
    }

    /// Runs a session against any line source until `exit` or end of input.
    pub fn run_with(&self, input: &mut dyn LineInput) -> miette::Result<()> {
        let max_operations = match self.max_operations {
            Some(max) => max,
            None => match ask_max_operations(input)? {
                Some(max) => max,
                None => return Ok(()),
            },
        };

        let mut context = CommandContext::new(max_operations)?;
        context.set_error_policy(self.on_error);
        tracing::info!(max_operations, "session started");

        while context.is_running() {
            input.message("");
            for line in context.listing() {
                input.message(&line);
            }

            let Some(line) = input.read_line(PROMPT)? else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }
            input.remember(&line);

            match context.execute(&line, input) {
                Ok(output) => {
                    for text in output.lines() {
                        input.message(&text);
                    }
                }
                Err(err) => input.message(&format!("Error: {}", err)),
            }
        }

        Ok(())
    }
}

impl Repl {
    /// Executes `path` as a batch script on a fresh session.
    ///
    /// Script output goes to stdout; error confirmations are asked on stdin.
    pub fn run_file(&self, path: &Path) -> miette::Result<ScriptReport> {
        let mut context =
            CommandContext::new(self.max_operations.unwrap_or(MAX_OPERATIONS_LIMIT))?;
        context.set_error_policy(self.on_error);

        let mut input = StreamInput::new(io::stdin().lock(), io::stdout());
        let report = context.run_script(path, &mut input)?;
        input.message(&report.summary(path));

        Ok(report)
    }
}

/// Prompts until a valid capacity bound is entered; `None` at end of input.
fn ask_max_operations(input: &mut dyn LineInput) -> Result<Option<usize>, CommandError> {
    loop {
        let Some(line) = input.read_line(MAX_OPERATIONS_PROMPT)? else {
            return Ok(None);
        };

        match parse_number(&line).and_then(check_max_operations) {
            Ok(max) => return Ok(Some(max)),
            Err(err) => input.message(&format!("Error: {}", err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ScriptedInput;
    use matcalc_test::{create_file, defer};
    use rstest::rstest;

    fn session(max_operations: Option<usize>, lines: &[&str]) -> Vec<String> {
        let mut input = ScriptedInput::new(lines.iter().copied());
        Repl::new(max_operations).run_with(&mut input).unwrap();
        input.transcript().to_vec()
    }

    #[test]
    fn test_startup_asks_until_valid() {
        let transcript = session(None, &["1", "abc", "3", "exit"]);

        assert_eq!(
            transcript
                .iter()
                .filter(|line| line.as_str() == MAX_OPERATIONS_PROMPT)
                .count(),
            3
        );
        assert!(transcript.contains(&"Error: \"abc\" is not a valid number".to_string()));
        assert!(transcript.contains(
            &"Error: Number 1 is out of the valid range (2 - 100)".to_string()
        ));
        assert!(transcript.contains(
            &"List of available matrix operations with the limit of - '3' operations:".to_string()
        ));
        assert_eq!(transcript.last(), Some(&"Goodbye!".to_string()));
    }

    #[test]
    fn test_end_of_input_before_startup() {
        assert_eq!(session(None, &[]), [MAX_OPERATIONS_PROMPT]);
    }

    #[test]
    fn test_add_scenario() {
        let transcript = session(Some(10), &["add 0 1", "eval 2 2", "1 2", "3 4", "5 6", "7 8", "exit"]);

        assert!(transcript.contains(&"2. A + B^T".to_string()));
        assert!(transcript.contains(&"[[1,2],[3,4]] + [[5,6],[7,8]]^T = ".to_string()));
        assert!(transcript.contains(&"6 9".to_string()));
        assert!(transcript.contains(&"9 12".to_string()));
    }

    #[rstest]
    #[case::unknown("mul 0 1", "Error: Command not found: mul")]
    #[case::index("eval 9 2", "Error: Invalid operation index 9. Please enter an index in the range of (0 - 1).")]
    #[case::capacity("iden", "Error: You have exceeded the limit of 2 operations")]
    fn test_errors_are_reported_and_the_loop_continues(#[case] line: &str, #[case] expected: &str) {
        let transcript = session(Some(2), &[line, "exit"]);

        assert!(
            transcript.iter().any(|l| l == expected),
            "missing {:?} in {:?}",
            expected,
            transcript
        );
        assert_eq!(transcript.last(), Some(&"Goodbye!".to_string()));
    }

    #[test]
    fn test_read_runs_a_script() {
        let (_dir, file) = create_file("repl_read.txt", "scal 5\nadd 0 2\n");
        defer! {
            std::fs::remove_file(&file).ok();
        }

        let line = format!("read {}", file.display());
        let transcript = session(Some(10), &[line.as_str(), "exit"]);

        assert!(transcript.contains(&"2. 5 * A".to_string()));
        assert!(transcript.contains(&"3. A + (5 * B)".to_string()));
    }
}
