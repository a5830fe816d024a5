//! [`Command`] – one protocol command plus its optional parameters.
//!
//! A command is an ordered list of `(name, values)` entries.  Entry 0 is the
//! verb and its parameters; every following entry is a modifier such as
//! `speed` or `overlap`.  Modifiers are serialized in insertion order.
//!
//! # Wire format
//!
//! ```text
//! <verb>[ : v1 v2 ...]; [<modifier> : v1 v2 ...;]...\n
//! ```
//!
//! ```
//! use rmi_commands::{Command, CommandKind};
//!
//! let mut cmd = Command::with_values(CommandKind::Queued, "ptp", &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
//! cmd.add_values("speed", &[100.0]);
//! assert_eq!(cmd.to_wire(true), "ptp : 1 2 3 4 5 6; speed : 100;\n");
//! ```

use std::fmt;

/// Number of decimals used when formatting numeric parameters.
pub const DEFAULT_PRECISION: usize = 4;

/// Which controller lane a command travels on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Expected to return almost immediately (status reads, IO reads).
    Immediate,
    /// May take significant time (motion, waits).  Tracked for completion.
    Queued,
}

/// A single `(name, values-as-text)` pair.
pub type CommandEntry = (String, String);

/// A protocol-ready command.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    kind: CommandKind,
    entries: Vec<CommandEntry>,
    correlation_id: u32,
}

impl Command {
    /// Create a command whose verb carries pre-formatted `params`.
    pub fn new(kind: CommandKind, verb: impl Into<String>, params: impl Into<String>) -> Self {
        Self {
            kind,
            entries: vec![(verb.into(), params.into())],
            correlation_id: 0,
        }
    }

    /// Create a command whose verb carries numeric `values`.
    pub fn with_values(kind: CommandKind, verb: impl Into<String>, values: &[f32]) -> Self {
        Self::new(kind, verb, params_to_string(values, DEFAULT_PRECISION))
    }

    /// Replace the verb and its parameters, keeping modifiers and kind.
    pub fn set_command(&mut self, verb: impl Into<String>, params: impl Into<String>) {
        self.entries[0] = (verb.into(), params.into());
    }

    /// Append a modifier entry.
    pub fn add_param(&mut self, name: impl Into<String>, values: impl Into<String>) {
        self.entries.push((name.into(), values.into()));
    }

    /// Append a modifier entry carrying numeric `values`.
    pub fn add_values(&mut self, name: impl Into<String>, values: &[f32]) {
        self.add_param(name, params_to_string(values, DEFAULT_PRECISION));
    }

    pub fn verb(&self) -> &str {
        &self.entries[0].0
    }

    pub fn entries(&self) -> &[CommandEntry] {
        &self.entries
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: CommandKind) {
        self.kind = kind;
    }

    pub fn correlation_id(&self) -> u32 {
        self.correlation_id
    }

    pub fn set_correlation_id(&mut self, id: u32) {
        self.correlation_id = id;
    }

    /// Serialize to the controller text protocol.
    pub fn to_wire(&self, append_newline: bool) -> String {
        let mut out = self
            .entries
            .iter()
            .map(|(name, values)| {
                if values.is_empty() {
                    format!("{name};")
                } else {
                    format!("{name} : {values};")
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
        if append_newline {
            out.push('\n');
        }
        out
    }

    /// Check a controller response.  Anything starting with `"error"` is a
    /// failure.
    pub fn check_response(&self, response: &str) -> bool {
        !response.trim_start().starts_with("error")
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire(false))
    }
}

/// Format `values` as space-separated text with `precision` decimals and
/// trailing zeros removed.
///
/// ```
/// use rmi_commands::robot_command::params_to_string;
///
/// assert_eq!(params_to_string(&[100.0, 0.25, -1.5], 4), "100 0.25 -1.5");
/// ```
pub fn params_to_string(values: &[f32], precision: usize) -> String {
    values
        .iter()
        .map(|v| {
            let mut s = format!("{v:.precision$}");
            if s.contains('.') {
                let trimmed = s.trim_end_matches('0').trim_end_matches('.').len();
                s.truncate(trimmed);
            }
            if s == "-0" { "0".to_string() } else { s }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
