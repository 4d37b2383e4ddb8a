/*!
 * Gate Configuration
 *
 * Construction-time settings for a `ValueGate`
 */

use std::borrow::Cow;

/// Gate configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    /// Name attached to every trace event the gate emits
    pub label: Cow<'static, str>,
    /// Emit a trace event for each value transition
    pub trace_transitions: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self::named("value_gate")
    }
}

impl GateConfig {
    /// Configuration with a static label and transition tracing on
    pub const fn named(label: &'static str) -> Self {
        Self {
            label: Cow::Borrowed(label),
            trace_transitions: true,
        }
    }

    /// Configuration for hot gates where per-transition events would be noise
    pub const fn quiet() -> Self {
        Self {
            label: Cow::Borrowed("value_gate"),
            trace_transitions: false,
        }
    }

    pub fn with_label(mut self, label: impl Into<Cow<'static, str>>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_trace_transitions(mut self, enabled: bool) -> Self {
        self.trace_transitions = enabled;
        self
    }
}
