//! Outbound Typist
//!
//! Supplies operator-authored text on demand. The binary reads it line by
//! line from stdin; any `AsyncBufRead` works.

use std::future::Future;
use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};

/// Source of outgoing message strings
pub trait OutboundTypist: Send {
    /// Next message, `None` once the source is exhausted
    fn next_message(&mut self) -> impl Future<Output = io::Result<Option<String>>> + Send;
}

/// Typist reading one message per line
pub struct LineTypist<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin + Send> LineTypist<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }
}

impl LineTypist<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin + Send> OutboundTypist for LineTypist<R> {
    async fn next_message(&mut self) -> io::Result<Option<String>> {
        self.lines.next_line().await
    }
}

/// One line of operator input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorInput {
    Start,
    Stop,
    Sessions,
    Quit,
    /// Text to broadcast
    Say(String),
}

impl OperatorInput {
    /// Interpret a typed line; blank lines yield `None`
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let input = match line.trim() {
            "" => return None,
            "/start" => OperatorInput::Start,
            "/stop" => OperatorInput::Stop,
            "/sessions" => OperatorInput::Sessions,
            "/quit" => OperatorInput::Quit,
            _ => OperatorInput::Say(line.to_string()),
        };
        Some(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_line_typist_yields_each_line() {
        let input: &[u8] = b"hello\r\nsecond line\n";
        let mut typist = LineTypist::new(input);

        assert_eq!(typist.next_message().await.unwrap().as_deref(), Some("hello"));
        assert_eq!(
            typist.next_message().await.unwrap().as_deref(),
            Some("second line")
        );
        assert_eq!(typist.next_message().await.unwrap(), None);
    }

    #[test]
    fn test_operator_commands() {
        assert_eq!(OperatorInput::parse("/start"), Some(OperatorInput::Start));
        assert_eq!(OperatorInput::parse(" /stop "), Some(OperatorInput::Stop));
        assert_eq!(OperatorInput::parse("/sessions"), Some(OperatorInput::Sessions));
        assert_eq!(OperatorInput::parse("/quit\r"), Some(OperatorInput::Quit));
        assert_eq!(OperatorInput::parse("   "), None);
    }

    #[test]
    fn test_other_text_is_said_verbatim() {
        assert_eq!(
            OperatorInput::parse("  hi all"),
            Some(OperatorInput::Say("  hi all".to_string()))
        );
        assert_eq!(
            OperatorInput::parse("/unknown"),
            Some(OperatorInput::Say("/unknown".to_string()))
        );
    }
}
