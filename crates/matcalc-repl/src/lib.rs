//! Interactive front end for [matcalc](../matcalc_lang/index.html).
//!
//! The REPL supports:
//! - Creating, deleting and evaluating matrix operations
//! - Resizing the operation list, with a negotiation when it has to shrink
//! - Batch scripts through `read`
//! - History navigation and command completion
//!
//! ## Example
//!
//! ```rust,no_run
//! use matcalc_repl::Repl;
//!
//! let repl = Repl::new(Some(10));
//! repl.run().unwrap();
//! ```
mod command_context;
mod error;
mod input;
mod repl;
mod script;

pub use command_context::{Command, CommandContext, CommandOutput};
pub use error::CommandError;
pub use input::{LineInput, ScriptedInput, StreamInput};
pub use repl::Repl;
pub use script::{ErrorPolicy, MAX_SCRIPT_DEPTH, ScriptFailure, ScriptReport};
