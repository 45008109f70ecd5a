use core::fmt;
use serde::{Deserialize, Serialize};
use tandem_core::{ComputeError, Context, Output, Shape, Value, ValueType};

/// Receives a text rendering of each value passing through a [`DebugText`].
///
/// Returning `false` fails the unit's compute.
pub type Sink = Box<dyn FnMut(&str) -> bool>;

/// Logs whatever value is received at the given log level, optionally
/// passing the rendered text to a sink, e.g. an on-screen label.
///
/// Outputs the received value in slot 0 and its text in slot 1.
#[derive(Deserialize, Serialize)]
pub struct DebugText {
    pub level: log::Level,
    #[serde(skip)]
    sink: Option<Sink>,
}

impl DebugText {
    pub fn new(level: log::Level) -> Self {
        DebugText { level, sink: None }
    }

    /// Also pass each rendered value to the given sink.
    pub fn with_sink(mut self, sink: impl FnMut(&str) -> bool + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }
}

impl Default for DebugText {
    fn default() -> Self {
        Self::new(log::Level::Info)
    }
}

impl tandem_core::Unit for DebugText {
    fn name(&self) -> &str {
        "debug-text"
    }

    fn shape(&self) -> Shape {
        Shape::default()
            .input("value", ValueType::Any)
            .output("value", ValueType::Any)
            .output("text", ValueType::Text)
    }

    fn compute(&mut self, ctx: &Context, inputs: &[Value]) -> Result<Output, ComputeError> {
        let value = crate::input(inputs, 0, "value")?.clone();
        let text = value.to_string();
        log::log!(self.level, "{text} ({} {})", ctx.token(), ctx.chain());
        if let Some(sink) = self.sink.as_mut() {
            if !sink(&text) {
                return Err(ComputeError::new("debug text sink rejected the update"));
            }
        }
        Ok(Output::new([value, Value::Text(text)]))
    }
}

impl fmt::Debug for DebugText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebugText")
            .field("level", &self.level)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}
