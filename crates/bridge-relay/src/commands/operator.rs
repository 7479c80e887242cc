//! Operator input lines

/// A parsed line typed by the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorInput {
    /// `/name arg arg…`
    Command { name: String, args: Vec<String> },
    /// Anything else is relayed into game chat
    Chat(String),
    /// Blank line
    Empty,
}

impl OperatorInput {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }

        match line.strip_prefix('/') {
            Some(rest) => {
                let mut words = rest.split_whitespace().map(str::to_string);
                match words.next() {
                    Some(name) => Self::Command {
                        name: name.to_lowercase(),
                        args: words.collect(),
                    },
                    None => Self::Empty,
                }
            }
            None => Self::Chat(line.to_string()),
        }
    }
}
