use std::{collections::VecDeque, fmt, path::PathBuf, str::FromStr};

use itertools::Itertools;
use matcalc_lang::{
    EvalRequest, Evaluation, Matrix, OperationKind, Registry, Resize, parse_number,
};

use crate::{error::CommandError, input::LineInput, script::ErrorPolicy};

const RULE: &str =
    "==============================================================================";

/// Usage and description of every command, in the order `help` prints them.
const COMMANDS: &[(&str, &str)] = &[
    (
        "eval num n",
        "compute the result of operation #num on n x n matrices (that will be prompted)",
    ),
    ("iden", "creates an operation that returns the given matrix"),
    ("tran", "creates an operation that transposes the given matrix"),
    (
        "scal val",
        "creates an operation that multiplies the given matrix by scalar val",
    ),
    (
        "add num1 num2",
        "creates an operation that is the addition of the result of operation #num1 and the result of operation #num2",
    ),
    (
        "sub num1 num2",
        "creates an operation that is the subtraction of the result of operation #num1 and the result of operation #num2",
    ),
    (
        "comp num1 num2",
        "creates an operation that is the composition of operation #num1 and operation #num2 (#num2 is applied first)",
    ),
    ("del num", "delete operation #num from the operation list"),
    (
        "resize num",
        "resize the maximum number of operations to num (2 <= num <= 100)",
    ),
    ("read path", "execute commands from a file"),
    ("list", "print the operation list"),
    ("help", "print this command list"),
    ("exit", "exit the program"),
];

#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutput {
    Evaluation(Evaluation),
    String(Vec<String>),
    None,
}

impl CommandOutput {
    pub fn lines(&self) -> Vec<String> {
        match self {
            CommandOutput::Evaluation(evaluation) => {
                evaluation.to_string().lines().map(str::to_string).collect()
            }
            CommandOutput::String(lines) => lines.clone(),
            CommandOutput::None => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Eval { index: i64, size: i64 },
    Create { kind: OperationKind, args: Vec<i64> },
    Delete(i64),
    Resize(i64),
    Read(PathBuf),
    List,
    Help,
    Exit,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Eval { .. } => write!(f, "eval"),
            Command::Create { kind, .. } => write!(f, "{}", kind),
            Command::Delete(_) => write!(f, "del"),
            Command::Resize(_) => write!(f, "resize"),
            Command::Read(_) => write!(f, "read"),
            Command::List => write!(f, "list"),
            Command::Help => write!(f, "help"),
            Command::Exit => write!(f, "exit"),
        }
    }
}

impl FromStr for Command {
    type Err = CommandError;

    /// Parses one command line. Argument counts are checked before argument values.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens = s.split_whitespace().collect_vec();
        let Some((verb, args)) = tokens.split_first() else {
            return Err(CommandError::NotFound(String::new()));
        };

        if let Ok(kind) = verb.parse::<OperationKind>() {
            return Ok(Command::Create {
                kind,
                args: numbers(verb, args, kind.argument_count())?,
            });
        }

        match *verb {
            "eval" => {
                let args = numbers(verb, args, 2)?;
                Ok(Command::Eval {
                    index: args[0],
                    size: args[1],
                })
            }
            "del" => Ok(Command::Delete(numbers(verb, args, 1)?[0])),
            "resize" => Ok(Command::Resize(numbers(verb, args, 1)?[0])),
            "read" => {
                let path = s.trim_start()[verb.len()..].trim();
                if path.is_empty() {
                    return Err(arguments(verb, 1, 0));
                }
                Ok(Command::Read(PathBuf::from(path)))
            }
            "list" => numbers(verb, args, 0).map(|_| Command::List),
            "help" => numbers(verb, args, 0).map(|_| Command::Help),
            "exit" => numbers(verb, args, 0).map(|_| Command::Exit),
            _ => Err(CommandError::NotFound(verb.to_string())),
        }
    }
}

fn arguments(verb: &str, expected: usize, got: usize) -> CommandError {
    matcalc_lang::Error::Arguments {
        command: verb.to_string(),
        expected,
        got,
    }
    .into()
}

fn numbers(verb: &str, args: &[&str], expected: usize) -> Result<Vec<i64>, CommandError> {
    if args.len() != expected {
        return Err(arguments(verb, expected, args.len()));
    }

    Ok(args
        .iter()
        .map(|arg| parse_number(arg))
        .collect::<Result<Vec<_>, _>>()?)
}

/// Command names starting with `prefix`.
pub fn completions(prefix: &str) -> Vec<String> {
    COMMANDS
        .iter()
        .filter_map(|(usage, _)| usage.split_whitespace().next())
        .filter(|name| name.starts_with(prefix))
        .map(str::to_string)
        .collect()
}

pub fn help() -> Vec<String> {
    std::iter::once("The available commands are:".to_string())
        .chain(
            COMMANDS
                .iter()
                .map(|(usage, description)| format!("* {:<16}{}", usage, description)),
        )
        .collect()
}

/// One interpreter session: the registry plus the session flags.
pub struct CommandContext {
    pub(crate) registry: Registry,
    pub(crate) running: bool,
    pub(crate) script_depth: usize,
    pub(crate) on_error: ErrorPolicy,
}

impl CommandContext {
    pub fn new(max_operations: usize) -> Result<Self, CommandError> {
        Ok(Self {
            registry: Registry::new(max_operations)?,
            running: true,
            script_depth: 0,
            on_error: ErrorPolicy::default(),
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn set_error_policy(&mut self, policy: ErrorPolicy) {
        self.on_error = policy;
    }

    /// The operation list printed before every prompt.
    pub fn listing(&self) -> Vec<String> {
        let mut lines = vec![
            RULE.to_string(),
            String::new(),
            format!(
                "List of available matrix operations with the limit of - '{}' operations:",
                self.registry.max_operations()
            ),
        ];
        lines.extend(
            self.registry
                .iter()
                .enumerate()
                .map(|(i, operation)| format!("{}. {}", i, operation)),
        );
        lines
    }

    /// Runs one command line. Follow-up input (matrices, resize answers) is
    /// read from `input`.
    pub fn execute(
        &mut self,
        line: &str,
        input: &mut dyn LineInput,
    ) -> Result<CommandOutput, CommandError> {
        if line.trim().is_empty() {
            return Ok(CommandOutput::None);
        }

        let command = line.parse::<Command>()?;
        tracing::debug!(%command, "executing");

        match command {
            Command::Eval { index, size } => self.eval(index, size, input),
            Command::Create { kind, args } => {
                self.registry.create(kind, &args)?;
                Ok(CommandOutput::None)
            }
            Command::Delete(index) => self.delete(index),
            Command::Resize(max) => self.resize(max, input),
            Command::Read(path) => {
                let report = self.run_script(&path, input)?;
                Ok(CommandOutput::String(vec![report.summary(&path)]))
            }
            Command::List => Ok(CommandOutput::String(self.listing())),
            Command::Help => Ok(CommandOutput::String(help())),
            Command::Exit => {
                self.running = false;
                Ok(CommandOutput::String(vec!["Goodbye!".to_string()]))
            }
        }
    }

    fn eval(
        &mut self,
        index: i64,
        size: i64,
        input: &mut dyn LineInput,
    ) -> Result<CommandOutput, CommandError> {
        let request = EvalRequest::new(&self.registry, index, size)?;
        let count = request.input_count();

        if count > 1 {
            input.message(&format!("Please enter {} matrices:", count));
        }

        let matrices = read_matrices(input, request.size(), count)?;
        Ok(CommandOutput::Evaluation(request.run(&matrices)?))
    }

    fn delete(&mut self, index: i64) -> Result<CommandOutput, CommandError> {
        let dependents = self.registry.dependents(index)?;
        self.registry.delete(index)?;

        if dependents.is_empty() {
            return Ok(CommandOutput::None);
        }

        // Dependents were created after their operand, so they all shifted down.
        let renumbered = dependents.iter().map(|i| i - 1).join(", ");
        tracing::warn!(index, dependents = %renumbered, "deleted an operand still in use");

        Ok(CommandOutput::String(vec![format!(
            "Operation #{} was still used by operation(s) {}, which keep computing with it",
            index, renumbered
        )]))
    }

    fn resize(
        &mut self,
        max: i64,
        input: &mut dyn LineInput,
    ) -> Result<CommandOutput, CommandError> {
        match self.registry.resize(max)? {
            Resize::Applied(max) => Ok(max_changed(max)),
            Resize::Pending { target, .. } => self.negotiate_shrink(target, input),
        }
    }

    /// Asks the user to cancel the shrink or delete operations until the
    /// registry fits `target`.
    ///
    /// A failing negotiation never leaves the shrink pending.
    fn negotiate_shrink(
        &mut self,
        target: usize,
        input: &mut dyn LineInput,
    ) -> Result<CommandOutput, CommandError> {
        self.shrink_dialog(target, input)
            .inspect_err(|_| self.registry.cancel_resize())
    }

    fn shrink_dialog(
        &mut self,
        target: usize,
        input: &mut dyn LineInput,
    ) -> Result<CommandOutput, CommandError> {
        input.message(&format!(
            "You are trying to resize to the number: {}. The number is under the amount of the current operations ({}).",
            target,
            self.registry.len()
        ));
        input.message("You have two choices:");
        input.message("   - Enter 'cancel' to cancel the resizing.");
        input.message("   - Enter 'del' to delete operations to fit the new limit.");

        loop {
            match input.read_line("> ")?.as_deref().map(str::trim) {
                None | Some("cancel") => return Ok(self.cancel_shrink()),
                Some("del") => break,
                Some(_) => input.message("Invalid command! Try again:"),
            }
        }

        while let Some(excess) = self.registry.shrink_excess() {
            for line in self.listing() {
                input.message(&line);
            }
            input.message(&format!("You need to erase {} more operations:", excess));

            // Deletions already made stay made if the input ends here.
            let Some(answer) = input.read_line("Delete operation #")? else {
                return Ok(self.cancel_shrink());
            };

            if let Err(err) = parse_number(&answer).and_then(|index| self.registry.delete(index)) {
                input.message(&format!("Error: {}", err));
            }
        }

        Ok(max_changed(self.registry.commit_resize()?))
    }

    fn cancel_shrink(&mut self) -> CommandOutput {
        self.registry.cancel_resize();
        CommandOutput::String(vec![format!(
            "Resizing cancelled. The maximum number of operations is still: {}",
            self.registry.max_operations()
        )])
    }
}

fn max_changed(max: usize) -> CommandOutput {
    CommandOutput::String(vec![format!(
        "The maximum number of operations is now: {}",
        max
    )])
}

/// Reads `count` matrices of `size x size` integers.
///
/// Values may be spread over any number of lines and one line may carry
/// values for consecutive matrices. On a bad value the rest of its line is
/// dropped and nothing is returned. Values left over on the last line are a
/// [`matcalc_lang::Error::ValueCount`].
fn read_matrices(
    input: &mut dyn LineInput,
    size: usize,
    count: usize,
) -> Result<Vec<Matrix>, CommandError> {
    let mut tokens = VecDeque::new();
    let mut matrices = Vec::with_capacity(count);

    for i in 0..count {
        input.message(&format!(
            "Enter a {0}x{0} matrix for {1}:",
            size,
            char::from(b'A' + i as u8)
        ));

        let mut cells = Vec::with_capacity(size * size);
        while cells.len() < size * size {
            let Some(token) = tokens.pop_front() else {
                let line = input
                    .read_line("")?
                    .ok_or(CommandError::UnexpectedEof("reading a matrix"))?;
                tokens.extend(line.split_whitespace().map(str::to_string));
                continue;
            };

            let n = cells.len();
            cells.push(Matrix::parse_cell(&token, n / size, n % size)?);
        }

        matrices.push(Matrix::from_cells(size, cells)?);
    }

    if !tokens.is_empty() {
        let expected = count * size * size;
        return Err(matcalc_lang::Error::ValueCount {
            expected,
            got: expected + tokens.len(),
        }
        .into());
    }

    Ok(matrices)
}
