use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use packsible_dev::errors::Result;
use packsible_dev::exec::{CommandOutput, CommandRunner, CommandSpec};

struct Rule {
    needle: String,
    output: CommandOutput,
}

/// A fake command runner that:
/// - records every `CommandSpec` it is asked to run
/// - answers with the first scripted output whose needle occurs in the
///   command line, or success otherwise.
///
/// Clones share their recordings and rules.
#[derive(Clone, Default)]
pub struct FakeCommandRunner {
    calls: Arc<Mutex<Vec<CommandSpec>>>,
    rules: Arc<Mutex<Vec<Rule>>>,
}

impl FakeCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands whose command line contains `needle` exit with `code`.
    pub fn fail_when(&self, needle: &str, code: i32) -> &Self {
        self.respond_when(needle, CommandOutput::failed(code))
    }

    pub fn respond_when(&self, needle: &str, output: CommandOutput) -> &Self {
        self.rules.lock().unwrap().push(Rule {
            needle: needle.to_string(),
            output,
        });
        self
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    /// Recorded command lines, in call order.
    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(CommandSpec::display).collect()
    }
}

impl CommandRunner for FakeCommandRunner {
    fn run(
        &self,
        spec: CommandSpec,
    ) -> Pin<Box<dyn Future<Output = Result<CommandOutput>> + Send + '_>> {
        let line = spec.display();
        self.calls.lock().unwrap().push(spec);

        let output = self
            .rules
            .lock()
            .unwrap()
            .iter()
            .find(|rule| line.contains(&rule.needle))
            .map(|rule| rule.output.clone())
            .unwrap_or_else(CommandOutput::success);

        Box::pin(async move { Ok(output) })
    }
}
