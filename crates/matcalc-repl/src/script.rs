//! Batch execution of command files.
//!
//! A script feeds its own lines to every prompt its commands raise, so `eval`
//! matrices and resize answers live in the file next to the commands.
//! Confirmation questions go to the interactive input that started the script.
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    command_context::CommandContext,
    error::CommandError,
    input::LineInput,
};

pub const MAX_SCRIPT_DEPTH: usize = 8;

/// What to do when a script line fails.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString, strum::EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum ErrorPolicy {
    /// Ask on the interactive input whether to keep going.
    #[default]
    Ask,
    Continue,
    Stop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptFailure {
    pub line: usize,
    pub command: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptReport {
    pub executed: usize,
    pub failures: Vec<ScriptFailure>,
    pub stopped: bool,
}

impl ScriptReport {
    pub fn summary(&self, path: &Path) -> String {
        format!(
            "Finished reading \"{}\": {} command(s) executed, {} failed{}",
            path.display(),
            self.executed,
            self.failures.len(),
            if self.stopped { ", stopped early" } else { "" }
        )
    }
}

struct ScriptFeed<'a> {
    lines: std::vec::IntoIter<String>,
    line_no: usize,
    parent: &'a mut dyn LineInput,
}

impl<'a> ScriptFeed<'a> {
    fn new(lines: Vec<String>, parent: &'a mut dyn LineInput) -> Self {
        Self {
            lines: lines.into_iter(),
            line_no: 0,
            parent,
        }
    }

    fn next_line(&mut self) -> Option<String> {
        let line = self.lines.next()?;
        self.line_no += 1;
        Some(line)
    }

    /// Next line that holds a command. Blank lines and `#` comments are skipped.
    fn next_command(&mut self) -> Option<String> {
        loop {
            let line = self.next_line()?;
            let trimmed = line.trim();
            if !trimmed.is_empty() && !trimmed.starts_with('#') {
                return Some(trimmed.to_string());
            }
        }
    }
}

impl LineInput for ScriptFeed<'_> {
    fn read_line(&mut self, _prompt: &str) -> Result<Option<String>, CommandError> {
        Ok(self.next_line())
    }

    fn message(&mut self, text: &str) {
        self.parent.message(text);
    }

    fn interactive(&mut self) -> &mut dyn LineInput {
        self.parent.interactive()
    }
}

impl CommandContext {
    /// Executes the commands in `path` against this session.
    ///
    /// Failing lines are reported and handled by the session's [`ErrorPolicy`].
    /// Only problems with the file itself are returned as errors.
    pub fn run_script(
        &mut self,
        path: &Path,
        input: &mut dyn LineInput,
    ) -> Result<ScriptReport, CommandError> {
        if self.script_depth >= MAX_SCRIPT_DEPTH {
            return Err(CommandError::ScriptDepth(MAX_SCRIPT_DEPTH));
        }

        let content = fs::read_to_string(path).map_err(|source| CommandError::Script {
            path: PathBuf::from(path),
            source,
        })?;
        tracing::info!(path = %path.display(), depth = self.script_depth, "running script");

        self.script_depth += 1;
        let report = self.run_lines(content.lines().map(str::to_string).collect(), input);
        self.script_depth -= 1;

        tracing::info!(
            path = %path.display(),
            executed = report.executed,
            failed = report.failures.len(),
            "script finished"
        );

        Ok(report)
    }

    fn run_lines(&mut self, lines: Vec<String>, input: &mut dyn LineInput) -> ScriptReport {
        let mut feed = ScriptFeed::new(lines, input);
        let mut report = ScriptReport::default();

        while self.running {
            let Some(line) = feed.next_command() else {
                break;
            };
            let line_no = feed.line_no;

            match self.execute(&line, &mut feed) {
                Ok(output) => {
                    report.executed += 1;
                    for text in output.lines() {
                        feed.message(&text);
                    }
                }
                Err(err) => {
                    tracing::warn!(line = line_no, command = %line, "script command failed: {}", err);
                    report.failures.push(ScriptFailure {
                        line: line_no,
                        command: line.clone(),
                        message: err.to_string(),
                    });

                    if !self.confirm_continue(&line, &err, feed.interactive()) {
                        report.stopped = true;
                        break;
                    }
                }
            }
        }

        report
    }

    fn confirm_continue(
        &self,
        line: &str,
        err: &CommandError,
        input: &mut dyn LineInput,
    ) -> bool {
        input.message(&format!(
            "There was a problem in the file with the command: {}",
            line
        ));
        input.message(&format!("Error: {}", err));

        match self.on_error {
            ErrorPolicy::Continue => true,
            ErrorPolicy::Stop => false,
            ErrorPolicy::Ask => {
                input.message("Do you want to continue executing the file?");
                loop {
                    let answer = match input.read_line("Enter 'Yes' to continue or 'No' to stop: ") {
                        Ok(answer) => answer,
                        Err(err) => {
                            tracing::warn!("failed to read the answer: {}", err);
                            None
                        }
                    };

                    match answer.as_deref().map(str::trim) {
                        Some("Yes") => return true,
                        Some("No") | None => return false,
                        Some(_) => input.message("Invalid input! Please enter 'Yes' or 'No'."),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ScriptedInput;
    use matcalc_test::create_file;
    use rstest::rstest;

    fn context(policy: ErrorPolicy) -> CommandContext {
        let mut ctx = CommandContext::new(10).unwrap();
        ctx.set_error_policy(policy);
        ctx
    }

    #[test]
    fn test_script_reads_commands_and_matrices() {
        let (_dir, file) = create_file(
            "ops.txt",
            "# sum with a transpose\nadd 0 1\n\neval 2 2\n1 2\n3 4\n5 6 7 8\nscal 3\n",
        );
        let mut ctx = context(ErrorPolicy::Stop);
        let mut input = ScriptedInput::default();

        let report = ctx.run_script(&file, &mut input).unwrap();

        assert_eq!(report.executed, 3);
        assert!(report.failures.is_empty());
        assert_eq!(ctx.registry().len(), 4);
        assert!(input.transcript().contains(&"6 9".to_string()));
        assert!(input.transcript().contains(&"9 12".to_string()));
        assert_eq!(input.remaining(), 0);
    }

    #[rstest]
    #[case::continue_on_error(ErrorPolicy::Continue, 4, false)]
    #[case::stop_on_error(ErrorPolicy::Stop, 3, true)]
    fn test_error_policy(
        #[case] policy: ErrorPolicy,
        #[case] expected_len: usize,
        #[case] stopped: bool,
    ) {
        let (_dir, file) = create_file("errors.txt", "scal 2\nadd 0 9\nscal 3\n");
        let mut ctx = context(policy);
        let mut input = ScriptedInput::default();

        let report = ctx.run_script(&file, &mut input).unwrap();

        assert_eq!(ctx.registry().len(), expected_len);
        assert_eq!(report.stopped, stopped);
        assert_eq!(
            report.failures,
            vec![ScriptFailure {
                line: 2,
                command: "add 0 9".to_string(),
                message: "Invalid operation index 9. Please enter an index in the range of (0 - 2)."
                    .to_string(),
            }]
        );
    }

    #[rstest]
    #[case::yes(&["maybe", "Yes"], 4)]
    #[case::no(&["No"], 3)]
    #[case::end_of_input(&[], 3)]
    fn test_ask_on_interactive_input(#[case] answers: &[&str], #[case] expected_len: usize) {
        let (_dir, file) = create_file("ask.txt", "scal 2\nfoo\nscal 3\n");
        let mut ctx = context(ErrorPolicy::Ask);
        let mut input = ScriptedInput::new(answers.iter().copied());

        ctx.run_script(&file, &mut input).unwrap();

        assert_eq!(ctx.registry().len(), expected_len);
        assert!(
            input
                .transcript()
                .contains(&"There was a problem in the file with the command: foo".to_string())
        );
    }

    #[test]
    fn test_missing_file() {
        let mut ctx = context(ErrorPolicy::Stop);
        let mut input = ScriptedInput::default();

        let err = ctx
            .run_script(Path::new("/nonexistent/matcalc/ops.txt"), &mut input)
            .unwrap_err();
        assert!(matches!(err, CommandError::Script { .. }));
        assert_eq!(
            err.to_string(),
            "Failed to open the file \"/nonexistent/matcalc/ops.txt\""
        );
    }

    #[test]
    fn test_self_reading_script_is_bounded() {
        let (dir, file) = create_file("loop.txt", "");
        std::fs::write(&file, format!("scal 1\nread {}\n", file.display())).unwrap();
        let mut ctx = context(ErrorPolicy::Continue);
        let mut input = ScriptedInput::default();

        let report = ctx.run_script(&file, &mut input).unwrap();

        assert_eq!(report.executed, 2);
        assert_eq!(ctx.registry().len(), 2 + MAX_SCRIPT_DEPTH);
        assert!(
            input
                .transcript()
                .contains(&format!("Error: Scripts can be nested at most {} levels deep", MAX_SCRIPT_DEPTH))
        );
        drop(dir);
    }

    #[test]
    fn test_exit_stops_the_script() {
        let (_dir, file) = create_file("exit.txt", "scal 2\nexit\nscal 3\n");
        let mut ctx = context(ErrorPolicy::Stop);
        let mut input = ScriptedInput::default();

        ctx.run_script(&file, &mut input).unwrap();

        assert!(!ctx.is_running());
        assert_eq!(ctx.registry().len(), 3);
        assert!(input.transcript().contains(&"Goodbye!".to_string()));
    }

    #[test]
    fn test_summary() {
        let report = ScriptReport {
            executed: 3,
            failures: Vec::new(),
            stopped: false,
        };
        assert_eq!(
            report.summary(Path::new("ops.txt")),
            "Finished reading \"ops.txt\": 3 command(s) executed, 0 failed"
        );
    }
}
