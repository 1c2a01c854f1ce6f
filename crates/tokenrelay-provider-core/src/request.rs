#[derive(Debug, Clone, Default)]
pub struct CallContext {
    pub trace_id: String,
}

impl CallContext {
    pub fn new(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
        }
    }
}
