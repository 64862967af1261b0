//! Interactive login.
//!
//! Prompts for credentials until the campus system accepts them. Invalid
//! credentials are reported and asked for again; any other authentication
//! failure ends the login, as does the end of input.

use enroll_core::{AuthError, Authenticator, Credentials};
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt, Lines};
use tracing::{info, warn};

use crate::error::{ConsoleError, Result};

/// Logs in through `authenticator`, reading answers from `lines` and
/// writing prompts to `prompt`.
///
/// With `username` set only the password is asked for.
///
/// # Errors
///
/// - `ConsoleError::LoginCancelled` if input ends before a successful login
/// - `ConsoleError::Auth` if the campus system cannot authenticate at all
/// - `ConsoleError::Io` if reading or prompting fails
pub async fn login<A, R, W>(
    authenticator: &A,
    lines: &mut Lines<R>,
    prompt: &mut W,
    username: Option<&str>,
) -> Result<A::Client>
where
    A: Authenticator,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut attempts = 0u32;

    loop {
        let user = match username {
            Some(user) => user.to_string(),
            None => ask(lines, prompt, "Username: ").await?.trim().to_string(),
        };
        let password = ask(lines, prompt, "Password: ").await?;
        attempts += 1;

        match authenticator
            .authenticate(&Credentials::new(user.clone(), password))
            .await
        {
            Ok(client) => {
                info!(username = %user, attempts, "Logged in");
                return Ok(client);
            }
            Err(AuthError::InvalidCredentials) => {
                warn!(username = %user, attempts, "Invalid credentials");
                prompt
                    .write_all(b"Invalid username or password, please try again.\n")
                    .await?;
            }
            Err(e) => {
                warn!(username = %user, error = %e, "Authentication failed");
                return Err(e.into());
            }
        }
    }
}

async fn ask<R, W>(lines: &mut Lines<R>, prompt: &mut W, question: &str) -> Result<String>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    prompt.write_all(question.as_bytes()).await?;
    prompt.flush().await?;

    // Untrimmed: passwords may start or end with spaces.
    match lines.next_line().await? {
        Some(answer) => Ok(answer),
        None => Err(ConsoleError::LoginCancelled),
    }
}
