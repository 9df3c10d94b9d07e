//! Reporter and phase handle.

use tracing::debug;

/// Compiler phases the unpickler cares about, in run order.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum Phase {
    Namer,
    Pickler,
    ExtensionMethods,
    Erasure,
}

/// Collects position-less diagnostics emitted during unpickling.
#[derive(Default)]
pub struct Reporter {
    echoes: Vec<String>,
    errors: Vec<String>,
}

impl Reporter {
    pub fn new() -> Reporter {
        Reporter::default()
    }

    /// Informational echo, also mirrored to the trace log.
    pub fn echo(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!(target: "tasty", "{message}");
        self.echoes.push(message);
    }

    /// Report an error without aborting.
    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn echoes(&self) -> &[String] {
        &self.echoes
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
