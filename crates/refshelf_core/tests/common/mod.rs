#![allow(dead_code)]

use refshelf_core::{GenerationError, GenerationRequest, GenerationResult, TextGenerator};
use std::cell::RefCell;
use std::collections::VecDeque;

/// Replays canned replies in order and records every request.
#[derive(Default)]
pub struct ScriptedGenerator {
    replies: RefCell<VecDeque<GenerationResult<String>>>,
    requests: RefCell<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: RefCell::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn push_failure(&self, message: &str) {
        self.replies
            .borrow_mut()
            .push_back(Err(GenerationError::Other(message.to_string())));
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.borrow().clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.borrow().len()
    }
}

impl TextGenerator for ScriptedGenerator {
    fn generate(&self, request: &GenerationRequest) -> GenerationResult<String> {
        self.requests.borrow_mut().push(request.clone());
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::Other("script exhausted".to_string())))
    }
}
