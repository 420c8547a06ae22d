#![allow(dead_code)]

use async_trait::async_trait;
use jarvis_relay::model::GenerativeModel;
use jarvis_relay::types::{JarvisError, Result};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays a fixed script of model outputs and records every prompt it receives.
/// `Err` entries simulate transport failures; an exhausted script keeps failing.
pub struct ScriptedModel {
    script: Mutex<VecDeque<std::result::Result<String, String>>>,
    repeat_last: bool,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(script: Vec<std::result::Result<&str, &str>>) -> Self {
        Self {
            script: Mutex::new(
                script
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            repeat_last: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn answers(outputs: &[&str]) -> Self {
        Self::new(outputs.iter().map(|o| Ok(*o)).collect())
    }

    /// Returns `output` for every call.
    pub fn always(output: std::result::Result<&str, &str>) -> Self {
        let mut model = Self::new(vec![output]);
        model.repeat_last = true;
        model
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompt(&self, index: usize) -> String {
        self.prompts.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let next = {
            let mut script = self.script.lock().unwrap();
            if self.repeat_last && script.len() == 1 {
                script.front().cloned()
            } else {
                script.pop_front()
            }
        };
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(JarvisError::Protocol(message).into()),
            None => Err(JarvisError::Protocol("script exhausted".to_string()).into()),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
