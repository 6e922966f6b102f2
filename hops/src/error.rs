use snafu::Snafu;

use crate::HopId;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Hop id does not belong to this graph.
    #[snafu(display("unknown hop {id}"))]
    UnknownHop { id: HopId },

    /// Operator received the wrong number of inputs.
    #[snafu(display("{kind} expects {expected} inputs, got {actual}"))]
    InputArity { kind: String, expected: usize, actual: usize },

    /// Parameterized builtin lacks a required named parameter.
    #[snafu(display("{kind} is missing parameter '{name}'"))]
    MissingParameter { kind: String, name: String },

    /// Parameter position points past the input list.
    #[snafu(display("{kind} parameter '{name}' refers to input {position} of {inputs}"))]
    ParameterOutOfRange { kind: String, name: String, position: usize, inputs: usize },
}
