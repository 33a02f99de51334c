//! Line-oriented terminal front-end over [`ChatInterface`].

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use super::interface::{ChatError, ChatInterface};
use super::session::Role;
use crate::feedback::{DeliveryOutcome, Rating};

pub const PROMPT: &str = "Ask a question about the Roman Empire";

const HELP: &str = "\
Commands:
  <question>             ask a question
  /up N                  rate answer N as helpful
  /down N                rate answer N as unhelpful
  /draft N <text>        note text for answer N, saved with the next rating
  /feedback N <text>     submit written feedback for answer N
  /history               show the conversation
  /clear                 clear the conversation
  /help                  show this help
  /quit                  exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Ask(String),
    Rate { number: usize, rating: Rating },
    Draft { number: usize, text: String },
    Feedback { number: usize, text: String },
    History,
    Clear,
    Help,
    Quit,
    Empty,
    Invalid(String),
}

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Ask(line.to_string());
    };

    let (name, args) = rest
        .split_once(char::is_whitespace)
        .map_or((rest, ""), |(name, args)| (name, args.trim()));

    match name {
        "up" | "down" => {
            let rating = if name == "up" {
                Rating::Positive
            } else {
                Rating::Negative
            };
            match args.parse::<usize>() {
                Ok(number) => Command::Rate { number, rating },
                Err(_) => Command::Invalid(format!("Usage: /{} N", name)),
            }
        }
        "feedback" | "draft" => {
            let (number, text) = args
                .split_once(char::is_whitespace)
                .map_or((args, ""), |(n, text)| (n, text.trim()));
            let Ok(number) = number.parse::<usize>() else {
                return Command::Invalid(format!("Usage: /{} N <text>", name));
            };
            let text = text.to_string();
            if name == "draft" {
                Command::Draft { number, text }
            } else {
                Command::Feedback { number, text }
            }
        }
        "history" => Command::History,
        "clear" => Command::Clear,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => Command::Invalid(format!("Unknown command '/{}'. Type /help.", other)),
    }
}

/// Renders the transcript, numbering assistant messages from 1.
pub fn render_transcript(chat: &ChatInterface) -> String {
    let mut out = String::new();
    let mut number = 0;
    for turn in chat.session().turns() {
        match turn.role {
            Role::User => {
                out.push_str(&format!("you> {}\n", turn.content));
            }
            Role::Assistant => {
                number += 1;
                let marker = match turn.feedback.as_ref().and_then(|f| f.rating) {
                    Some(Rating::Positive) => " [+]",
                    Some(Rating::Negative) => " [-]",
                    None => "",
                };
                out.push_str(&format!("[{}]{} {}\n", number, marker, turn.content));
            }
        }
    }
    out
}

pub async fn run<R, W>(chat: &mut ChatInterface, input: R, mut output: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    output
        .write_all(format!("{} (/help for commands)\n> ", PROMPT).as_bytes())
        .await?;
    output.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let reply = match parse_command(&line) {
            Command::Quit => break,
            Command::Empty => String::new(),
            Command::Help => format!("{}\n", HELP),
            Command::Invalid(message) => format!("{}\n", message),
            Command::History => {
                if chat.session().is_empty() {
                    "(no messages)\n".to_string()
                } else {
                    render_transcript(chat)
                }
            }
            Command::Clear => {
                chat.clear();
                "Conversation cleared.\n".to_string()
            }
            Command::Ask(question) => {
                let answer = chat.ask(&question).await;
                let number = chat
                    .session()
                    .turns()
                    .iter()
                    .filter(|t| t.role == Role::Assistant)
                    .count();
                format!("[{}] {}\n", number, answer)
            }
            Command::Rate { number, rating } => match resolve(chat, number) {
                Ok(idx) => feedback_reply(chat.rate(idx, rating).await, rating_thanks(rating)),
                Err(message) => message,
            },
            Command::Draft { number, text } => match resolve(chat, number) {
                Ok(idx) => match chat.draft_feedback(idx, &text) {
                    Ok(()) => "Noted.\n".to_string(),
                    Err(err) => format!("{}\n", err),
                },
                Err(message) => message,
            },
            Command::Feedback { number, text } => match resolve(chat, number) {
                Ok(idx) => feedback_reply(
                    chat.submit_feedback(idx, &text).await,
                    "Thank you for your feedback!",
                ),
                Err(message) => message,
            },
        };

        output.write_all(reply.as_bytes()).await?;
        output.write_all(b"> ").await?;
        output.flush().await?;
    }

    output.write_all(b"\n").await?;
    output.flush().await
}

fn resolve(chat: &ChatInterface, number: usize) -> Result<usize, String> {
    chat.session()
        .assistant_turn(number)
        .ok_or_else(|| format!("No answer numbered {}.\n", number))
}

fn rating_thanks(rating: Rating) -> &'static str {
    match rating {
        Rating::Positive => "Thanks for the positive feedback!",
        Rating::Negative => "Thanks for the feedback! Please let us know how we can improve.",
    }
}

fn feedback_reply(
    result: Result<super::interface::FeedbackReceipt, ChatError>,
    thanks: &str,
) -> String {
    match result {
        Ok(receipt) => {
            tracing::debug!(
                "Feedback '{}' recorded, delivery {}",
                receipt.annotation.label,
                receipt.delivery
            );
            match receipt.delivery {
                DeliveryOutcome::Delivered | DeliveryOutcome::Skipped => format!("{}\n", thanks),
                other => format!("{} (not sent to trace sink: {})\n", thanks, other),
            }
        }
        Err(err) => format!("{}\n", err),
    }
}
