mod builtin;
mod external;

pub use builtin::{Builtin, BuiltinKind};
pub use external::{launch, spawn, wait_all, Launched};

use crate::parse::Pipeline;

/// A parsed line routed either into the interpreter or out to processes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Builtin(Builtin),
    External(Pipeline),
}

impl From<Pipeline> for Command {
    fn from(pipeline: Pipeline) -> Self {
        // Only a lone stage runs in-process; a builtin inside a pipe is
        // looked up on PATH like any other program.
        if let [stage] = pipeline.stages.as_slice() {
            if let Some(kind) = BuiltinKind::new(stage.name()) {
                return Self::Builtin(Builtin::new(kind, &stage.args()[1..]));
            }
        }
        Self::External(pipeline)
    }
}
