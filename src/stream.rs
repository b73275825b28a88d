//! Token delivery from a lexer to the parser.
//!
//! [`TokenStream`] runs the lexer as an independent producer on its own
//! thread, handing tokens over a zero-capacity channel: the lexer is never
//! more than one token ahead of the parser. A plain [`Lexer`] is the
//! inline alternative, computing each token when it is asked for.

use std::io;
use std::panic;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::{self, JoinHandle};

use crate::lexer::Lexer;
use crate::token::{Pos, Token, TokenKind};

/// Anything the parser can pull tokens from.
pub trait TokenSource {
    /// Next token. After the terminal token this keeps returning an
    /// empty end-of-input token.
    fn next_token(&mut self) -> Token;

    /// Line of the most recently delivered token, counting from 1.
    fn line_number(&self) -> usize;
}

impl TokenSource for Lexer {
    fn next_token(&mut self) -> Token {
        Self::next_token(self)
    }

    fn line_number(&self) -> usize {
        Self::line_number(self)
    }
}

/// Lexer running on a producer thread.
#[derive(Debug)]
pub struct TokenStream {
    source: Arc<str>,
    items: Option<Receiver<Token>>,
    producer: Option<JoinHandle<()>>,
    last_pos: Pos,
    finished: bool,
}

impl TokenStream {
    /// Start lexing `source` on a new thread named `tmpl-lexer`.
    ///
    /// # Errors
    ///
    /// Returns the I/O error when the OS refuses to create the thread.
    pub fn spawn(source: impl Into<Arc<str>>) -> io::Result<Self> {
        let source = source.into();
        let lexer = Lexer::new(Arc::clone(&source));
        Self::spawn_source(source, lexer)
    }

    /// Run any token source on the producer thread. `text` must be the
    /// text `lexer` scans, for line numbers and the end-of-input position.
    fn spawn_source<S>(text: Arc<str>, lexer: S) -> io::Result<Self>
    where
        S: TokenSource + Send + 'static,
    {
        let (sender, items) = mpsc::sync_channel(0);
        let producer = thread::Builder::new()
            .name("tmpl-lexer".to_string())
            .spawn(move || produce(lexer, &sender))?;

        Ok(Self {
            source: text,
            items: Some(items),
            producer: Some(producer),
            last_pos: 0,
            finished: false,
        })
    }

    fn end_of_input(&self) -> Token {
        Token {
            kind: TokenKind::EndOfInput,
            value: String::new(),
            pos: self.source.len(),
        }
    }
}

impl TokenSource for TokenStream {
    fn next_token(&mut self) -> Token {
        let received = self.items.as_ref().and_then(|items| items.recv().ok());
        if let Some(token) = received {
            self.last_pos = token.pos;
            self.finished |= token.kind.is_terminal();
            return token;
        }

        // The channel only closes early when the producer died.
        if !self.finished {
            self.finished = true;
            if let Some(Err(payload)) = self.producer.take().map(JoinHandle::join) {
                panic::resume_unwind(payload);
            }
        }
        self.end_of_input()
    }

    fn line_number(&self) -> usize {
        1 + self.source[..self.last_pos].matches('\n').count()
    }
}

impl Drop for TokenStream {
    fn drop(&mut self) {
        // Closing the receiver fails any pending send, so the producer
        // cannot stay blocked once the parser is gone.
        drop(self.items.take());
        if let Some(producer) = self.producer.take() {
            if let Err(payload) = producer.join() {
                if !thread::panicking() {
                    panic::resume_unwind(payload);
                }
            }
        }
    }
}

fn produce(mut lexer: impl TokenSource, sender: &SyncSender<Token>) {
    tracing::trace!("lexer thread started");
    loop {
        let token = lexer.next_token();
        let terminal = token.kind.is_terminal();
        if sender.send(token).is_err() {
            tracing::trace!("token stream dropped before end of input");
            break;
        }
        if terminal {
            break;
        }
    }
    tracing::trace!("lexer thread finished");
}
