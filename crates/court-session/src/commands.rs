//! Stdin command language

use crate::render;
use courtroom::{MessageId, SessionError, SessionHandle, SharedMessageStore, StoreError};
use std::str::FromStr;
use thiserror::Error;

pub const HELP: &str = "\
commands:
  accept <id>   (a)    resolve a message
  deny <id>     (d)    dismiss a message; real violations come back
  ack           (dismiss) acknowledge the court ruling
  list          (ls)   show the inbox
  show <id>            show the stored record
  pause | resume       stop or restart new arrivals
  purge                delete every stored record
  help          (?)    this text
  quit          (q)    end the session";

/// A parsed user command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Accept(MessageId),
    Deny(MessageId),
    Dismiss,
    List,
    Show(MessageId),
    Pause,
    Resume,
    Purge,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command {0:?}, try `help`")]
    Unknown(String),

    #[error("`{0}` needs a message id")]
    MissingId(&'static str),

    #[error("Not a message id: {0:?}")]
    InvalidId(String),
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or(ParseError::Empty)?.to_ascii_lowercase();

        let mut id = |name: &'static str| -> Result<MessageId, ParseError> {
            let raw = words.next().ok_or(ParseError::MissingId(name))?;
            raw.trim_start_matches('#')
                .parse()
                .map_err(|_| ParseError::InvalidId(raw.to_string()))
        };

        match verb.as_str() {
            "accept" | "a" => Ok(Command::Accept(id("accept")?)),
            "deny" | "d" => Ok(Command::Deny(id("deny")?)),
            "show" => Ok(Command::Show(id("show")?)),
            "ack" | "dismiss" => Ok(Command::Dismiss),
            "list" | "ls" => Ok(Command::List),
            "pause" => Ok(Command::Pause),
            "resume" => Ok(Command::Resume),
            "purge" => Ok(Command::Purge),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            other => Err(ParseError::Unknown(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Run one command; returns the text to print.
pub async fn execute(
    session: &SessionHandle,
    store: &SharedMessageStore,
    command: Command,
) -> Result<String, CommandError> {
    let output = match command {
        Command::Accept(id) => {
            let message = session.accept(id).await?;
            format!("Accepted #{}: {}", message.id, message.text)
        }
        Command::Deny(id) => {
            let message = session.deny(id).await?;
            format!("Denied #{}: {}", message.id, message.text)
        }
        Command::Dismiss => match session.dismiss_ruling().await? {
            Some(ruling) => format!("Acknowledged: {}", ruling.law),
            None => "No ruling to acknowledge".to_string(),
        },
        Command::List => render::snapshot(&session.snapshot().await?),
        Command::Show(id) => render::record(&store.get(id).await?),
        Command::Pause => match session.stop_arrivals().await? {
            Some(delivered) => format!("Arrivals paused after {} messages", delivered),
            None => "Arrivals are not running".to_string(),
        },
        Command::Resume => {
            session.start_arrivals().await?;
            "Arrivals resumed".to_string()
        }
        Command::Purge => {
            let records = store.list().await?;
            for record in &records {
                store.delete(record.id).await?;
            }
            format!("Deleted {} stored messages", records.len())
        }
        Command::Help => HELP.to_string(),
        Command::Quit => String::new(),
    };
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use courtroom::{
        Category, CourtSession, InboxError, MemoryMessageStore, MessageStatus, MessageStore,
        NewMessage, SessionConfig,
    };
    use std::sync::Arc;

    #[test]
    fn test_parse_commands() {
        assert_eq!("accept 12".parse::<Command>(), Ok(Command::Accept(12)));
        assert_eq!("D #3".parse::<Command>(), Ok(Command::Deny(3)));
        assert_eq!("  ack ".parse::<Command>(), Ok(Command::Dismiss));
        assert_eq!("ls".parse::<Command>(), Ok(Command::List));
        assert_eq!("show -1".parse::<Command>(), Ok(Command::Show(-1)));
        assert_eq!("q".parse::<Command>(), Ok(Command::Quit));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Command>(), Err(ParseError::Empty));
        assert_eq!(
            "accept".parse::<Command>(),
            Err(ParseError::MissingId("accept"))
        );
        assert_eq!(
            "deny twelve".parse::<Command>(),
            Err(ParseError::InvalidId("twelve".to_string()))
        );
        assert_eq!(
            "approve 1".parse::<Command>(),
            Err(ParseError::Unknown("approve".to_string()))
        );
    }

    async fn session_with(text: &str) -> (SessionHandle, SharedMessageStore, MessageId) {
        let store: SharedMessageStore = Arc::new(MemoryMessageStore::new());
        let id = store
            .create(&NewMessage {
                category: Category::Boss,
                text: text.to_string(),
                status: MessageStatus::Normal,
                escalatable: false,
                law_broken: None,
                reason: None,
            })
            .await
            .unwrap()
            .id;
        let config = SessionConfig {
            arrivals: false,
            ..SessionConfig::test_mode()
        };
        let session = CourtSession::start(store.clone(), config).unwrap();
        (session, store, id)
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_accept_and_show() {
        let (session, store, id) = session_with("Status on the release notes?").await;

        let out = execute(&session, &store, Command::Accept(id)).await.unwrap();
        assert_eq!(out, format!("Accepted #{}: Status on the release notes?", id));

        // Store writes land in the background.
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        let out = execute(&session, &store, Command::Show(id)).await.unwrap();
        assert!(out.contains("\"status\": \"resolved\""));

        let err = execute(&session, &store, Command::Accept(id))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CommandError::Session(SessionError::Inbox(InboxError::NotInInbox(_)))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_purge_and_dismiss() {
        let (session, store, _) = session_with("Are you done with sprint 1?").await;

        let out = execute(&session, &store, Command::Dismiss).await.unwrap();
        assert_eq!(out, "No ruling to acknowledge");

        let out = execute(&session, &store, Command::Purge).await.unwrap();
        assert_eq!(out, "Deleted 1 stored messages");
        assert!(store.list().await.unwrap().is_empty());

        let out = execute(&session, &store, Command::Pause).await.unwrap();
        assert_eq!(out, "Arrivals are not running");
    }
}
