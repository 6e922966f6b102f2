use snafu::Snafu;

use kernfuse_hops::HopId;

use crate::template::TemplateType;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// The region contains an operator the template cannot lower.
    #[snafu(display("{template} template cannot lower {kind} at {hop}"))]
    UnsupportedOperator { hop: HopId, kind: String, template: TemplateType },

    /// Construction reached a hop the memo table holds no entry for.
    #[snafu(display("no {template} memo entry for {hop}"))]
    MissingMemoEntry { hop: HopId, template: TemplateType },

    /// An outer-product region lacks its main matrix or one of its factors.
    #[snafu(display("outer-product region has no {role} input"))]
    MissingOuterProductInput { role: &'static str },

    /// An input was never lowered while building its consumer.
    #[snafu(display("no CNode was built for {hop}"))]
    MissingCNode { hop: HopId },

    #[snafu(display("operator graph error: {source}"))]
    Graph { source: kernfuse_hops::Error },
}

impl From<kernfuse_hops::Error> for Error {
    fn from(source: kernfuse_hops::Error) -> Self {
        Self::Graph { source }
    }
}
