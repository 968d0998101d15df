//! Story interpreter boundary and a small RON-scripted implementation.
//!
//! The region crates know nothing about narrative. The viewer talks to a
//! story only through `StoryInterpreter` and the lines it publishes.

use std::collections::HashMap;
use std::path::Path;
use std::sync::mpsc::Receiver;

use anyhow::{Context, Result};
use engine_core::EventChannel;
use serde::{Deserialize, Serialize};

/// A line ready to be shown, with the labels of the choices that follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueLine {
    pub speaker: String,
    pub text: String,
    pub choices: Vec<String>,
}

/// What the viewer needs from a narrative engine.
pub trait StoryInterpreter {
    /// Start the dialogue at a named entry point. Returns `false` if it does not exist.
    fn start_dialogue(&mut self, entry: &str) -> bool;

    /// Pick a choice of the current line. Returns `true` if the dialogue closed.
    fn choose_option(&mut self, index: usize) -> bool;

    fn is_active(&self) -> bool;

    /// Lines published from now on.
    fn subscribe_line_ready(&mut self) -> Receiver<DialogueLine>;
}

/// One dialogue node: speaker, line of text and choices (label, next node index or None to close).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueNode {
    #[serde(default)]
    pub speaker: String,
    pub text: String,
    #[serde(default)]
    pub choices: Vec<(String, Option<usize>)>,
}

/// Dialogue nodes plus named entry points into them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoryScript {
    pub nodes: Vec<DialogueNode>,
    #[serde(default)]
    pub entries: HashMap<String, usize>,
}

impl StoryScript {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading story script {}", path.display()))?;
        ron::from_str(&data).with_context(|| format!("parsing story script {}", path.display()))
    }

    /// Built-in field briefing used when no script is configured.
    pub fn briefing() -> Self {
        let node = |text: &str, choices: Vec<(&str, Option<usize>)>| DialogueNode {
            speaker: "Survey Lead".to_string(),
            text: text.to_string(),
            choices: choices
                .into_iter()
                .map(|(label, next)| (label.to_string(), next))
                .collect(),
        };
        Self {
            nodes: vec![
                node(
                    "Welcome to the survey area. The overlays show the same ground on different dates.",
                    vec![("What am I looking for?", Some(1)), ("Understood.", None)],
                ),
                node(
                    "Compare the layers. Anything that moved between captures gets a marker.",
                    vec![("And the markers?", Some(2)), ("Understood.", None)],
                ),
                node("They sit on the terrain. Fly close and they will turn to face you.", vec![("Understood.", None)]),
            ],
            entries: HashMap::from([("intro".to_string(), 0)]),
        }
    }
}

/// Walks a `StoryScript`, publishing each line it reaches.
pub struct ScriptedStory {
    script: StoryScript,
    current: Option<usize>,
    lines: EventChannel<DialogueLine>,
}

impl ScriptedStory {
    pub fn new(script: StoryScript) -> Self {
        Self {
            script,
            current: None,
            lines: EventChannel::new(),
        }
    }

    fn show(&mut self, index: usize) -> bool {
        let Some(node) = self.script.nodes.get(index) else {
            log::warn!("Story: node {} does not exist", index);
            self.current = None;
            return false;
        };
        let line = DialogueLine {
            speaker: node.speaker.clone(),
            text: node.text.clone(),
            choices: node.choices.iter().map(|(label, _)| label.clone()).collect(),
        };
        self.current = Some(index);
        self.lines.publish(line);
        true
    }
}

impl StoryInterpreter for ScriptedStory {
    fn start_dialogue(&mut self, entry: &str) -> bool {
        match self.script.entries.get(entry).copied() {
            Some(index) => self.show(index),
            None => {
                log::warn!("Story: unknown entry point {:?}", entry);
                false
            }
        }
    }

    fn choose_option(&mut self, index: usize) -> bool {
        let Some(node) = self.current.and_then(|i| self.script.nodes.get(i)) else {
            return true;
        };
        let next = match node.choices.get(index) {
            Some((_, next)) => *next,
            None => return false,
        };
        match next {
            Some(next) => !self.show(next),
            None => {
                self.current = None;
                true
            }
        }
    }

    fn is_active(&self) -> bool {
        self.current.is_some()
    }

    fn subscribe_line_ready(&mut self) -> Receiver<DialogueLine> {
        self.lines.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn briefing_walks_to_the_end() {
        let mut story = ScriptedStory::new(StoryScript::briefing());
        let lines = story.subscribe_line_ready();
        assert!(story.start_dialogue("intro"));
        assert_eq!(lines.try_recv().unwrap().choices.len(), 2);

        assert!(!story.choose_option(0));
        assert!(!story.choose_option(0));
        let last = lines.try_iter().last().unwrap();
        assert_eq!(last.choices, vec!["Understood.".to_string()]);

        assert!(story.choose_option(0));
        assert!(!story.is_active());
    }

    #[test]
    fn bad_input_is_ignored() {
        let mut story = ScriptedStory::new(StoryScript::briefing());
        assert!(!story.start_dialogue("epilogue"));
        assert!(story.choose_option(0));
        story.start_dialogue("intro");
        assert!(!story.choose_option(7));
        assert!(story.is_active());
    }

    #[test]
    fn script_parses_from_ron() {
        let script: StoryScript = ron::from_str(
            r#"(nodes: [(text: "Hello", choices: [("Bye", None)])], entries: {"start": 0})"#,
        )
        .unwrap();
        let mut story = ScriptedStory::new(script);
        assert!(story.start_dialogue("start"));
        assert!(story.choose_option(0));
    }
}
