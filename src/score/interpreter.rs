use std::collections::VecDeque;

use crate::score::types::Instance;

/// Lazy, finite source of instances in score order.
pub trait Interpreter {
    fn next_instance(&mut self) -> Option<Instance>;
}

/// Interpreter over instances already in memory.
#[derive(Debug, Clone, Default)]
pub struct BufferedInterpreter {
    pending: VecDeque<Instance>,
}

impl BufferedInterpreter {
    pub fn new(instances: impl IntoIterator<Item = Instance>) -> Self {
        Self {
            pending: instances.into_iter().collect(),
        }
    }
}

impl Interpreter for BufferedInterpreter {
    fn next_instance(&mut self) -> Option<Instance> {
        self.pending.pop_front()
    }
}
