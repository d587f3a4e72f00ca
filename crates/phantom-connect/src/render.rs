//! A toolkit-neutral description of what a view shows.
//!
//! Views produce a [`Screen`]; a shell (terminal, DOM) draws it and feeds
//! button clicks back as [`Action`]s.

use std::fmt;

pub const PHANTOM_INSTALL_URL: &str = "https://phantom.app/";

/// A clickable button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Connect,
    Disconnect,
    CreateAccount,
    Transfer,
}

impl Action {
    pub fn label(&self) -> &'static str {
        match self {
            Action::Connect => "Connect Wallet",
            Action::Disconnect => "Disconnect",
            Action::CreateAccount => "Create Account",
            Action::Transfer => "Transfer",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    Heading(String),
    Button(Action),
    Text(String),
    Link { text: String, href: String },
    /// A failure the shell chose to show.
    Notice(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Screen {
    pub elements: Vec<Element>,
}

impl Screen {
    pub fn new(heading: impl Into<String>) -> Self {
        Self {
            elements: vec![Element::Heading(heading.into())],
        }
    }

    pub fn push(&mut self, element: Element) {
        self.elements.push(element);
    }

    pub fn button(&mut self, action: Action) {
        self.push(Element::Button(action));
    }

    pub fn text(&mut self, text: impl Into<String>) {
        self.push(Element::Text(text.into()));
    }

    /// Attach a failure message for display.
    pub fn with_notice(mut self, message: impl fmt::Display) -> Self {
        self.push(Element::Notice(message.to_string()));
        self
    }

    pub fn buttons(&self) -> Vec<Action> {
        self.elements
            .iter()
            .filter_map(|e| match e {
                Element::Button(action) => Some(*action),
                _ => None,
            })
            .collect()
    }

    pub fn has_button(&self, action: Action) -> bool {
        self.elements.contains(&Element::Button(action))
    }

    pub fn has_text(&self, text: &str) -> bool {
        self.elements
            .iter()
            .any(|e| matches!(e, Element::Text(t) if t == text))
    }

    pub fn links(&self) -> impl Iterator<Item = (&str, &str)> {
        self.elements.iter().filter_map(|e| match e {
            Element::Link { text, href } => Some((text.as_str(), href.as_str())),
            _ => None,
        })
    }

    pub fn notice(&self) -> Option<&str> {
        self.elements.iter().find_map(|e| match e {
            Element::Notice(n) => Some(n.as_str()),
            _ => None,
        })
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for element in &self.elements {
            match element {
                Element::Heading(text) => writeln!(f, "== {text} ==")?,
                Element::Button(action) => writeln!(f, "[ {} ]", action.label())?,
                Element::Text(text) => writeln!(f, "{text}")?,
                Element::Link { text, href } => writeln!(f, "{text} <{href}>")?,
                Element::Notice(text) => writeln!(f, "! {text}")?,
            }
        }
        Ok(())
    }
}
