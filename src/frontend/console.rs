// src/frontend/console.rs

//! Line-oriented front end.
//!
//! Each input line is `<user_id> /<command>`; replies are written as
//! `[<user_id>] <text>`. Every line is dispatched in its own Tokio task, so a
//! long `restart` does not hold up a `pull` issued after it.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::errors::{RelayError, Result};
use crate::exec::ProcessRunner;
use crate::relay::{Authorizer, CommandRouter, Dispatch, ReplySink, UserId};

/// Reply sink that writes to a shared output, tagged with the caller id.
pub struct ConsoleReply<W> {
    user_id: UserId,
    out: Arc<Mutex<W>>,
}

impl<W> ConsoleReply<W> {
    pub fn new(user_id: UserId, out: Arc<Mutex<W>>) -> Self {
        Self { user_id, out }
    }
}

impl<W> ReplySink for ConsoleReply<W>
where
    W: AsyncWrite + Unpin + Send,
{
    fn send_reply(&self, text: String) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let line = format!("[{}] {}\n", self.user_id, text);
            let mut out = self.out.lock().await;
            out.write_all(line.as_bytes())
                .await
                .map_err(|e| RelayError::Reply(e.to_string()))?;
            out.flush()
                .await
                .map_err(|e| RelayError::Reply(e.to_string()))?;
            Ok(())
        })
    }
}

/// Split `"<user_id> <command>"`. Returns `None` for blank or malformed lines.
pub fn parse_line(line: &str) -> Option<(UserId, &str)> {
    let mut parts = line.split_whitespace();
    let user_id = parts.next()?.parse::<UserId>().ok()?;
    let command = parts.next()?;
    Some((user_id, command))
}

/// Read commands from `input` until EOF or `shutdown` resolves, then wait for
/// in-flight dispatches to finish.
pub async fn serve<R, A, I, W>(
    router: Arc<CommandRouter<R, A>>,
    input: I,
    out: Arc<Mutex<W>>,
    shutdown: impl Future<Output = ()>,
) -> anyhow::Result<()>
where
    R: ProcessRunner + 'static,
    A: Authorizer + 'static,
    I: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut lines = input.lines();
    let mut inflight: JoinSet<()> = JoinSet::new();
    tokio::pin!(shutdown);

    info!("relay accepting commands");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("reading command input")? else {
                    debug!("command input closed");
                    break;
                };
                let Some((user_id, command)) = parse_line(&line) else {
                    if !line.trim().is_empty() {
                        warn!(line = %line, "ignoring malformed input line");
                    }
                    continue;
                };

                let router = Arc::clone(&router);
                let reply = ConsoleReply::new(user_id, Arc::clone(&out));
                let command = command.to_string();
                inflight.spawn(async move {
                    match router.dispatch(user_id, &command, &reply).await {
                        Ok(Dispatch::Executed(outcome)) => {
                            debug!(user_id, command = %command, outcome = outcome.kind(), "dispatch done")
                        }
                        Ok(other) => debug!(user_id, command = %command, result = ?other, "dispatch done"),
                        Err(e) => error!(user_id, command = %command, error = %e, "dispatch failed"),
                    }
                });
            }
            Some(joined) = inflight.join_next(), if !inflight.is_empty() => {
                if let Err(e) = joined {
                    error!(error = %e, "dispatch task panicked");
                }
            }
            _ = &mut shutdown => {
                info!("shutdown requested; no longer accepting commands");
                break;
            }
        }
    }

    let pending = inflight.len();
    if pending > 0 {
        info!(pending, "waiting for in-flight operations");
    }
    while let Some(joined) = inflight.join_next().await {
        if let Err(e) = joined {
            error!(error = %e, "dispatch task panicked");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_user_and_command() {
        assert_eq!(parse_line("42 /pull"), Some((42, "/pull")));
        assert_eq!(parse_line("  7   restart  extra"), Some((7, "restart")));
        assert_eq!(parse_line("abc /pull"), None);
        assert_eq!(parse_line("42"), None);
        assert_eq!(parse_line(""), None);
    }

    #[tokio::test]
    async fn console_reply_tags_lines_with_user() {
        let out = Arc::new(Mutex::new(Vec::<u8>::new()));
        let reply = ConsoleReply::new(9, Arc::clone(&out));

        reply.send_reply("hello".to_string()).await.unwrap();

        let written = out.lock().await.clone();
        assert_eq!(String::from_utf8(written).unwrap(), "[9] hello\n");
    }
}
