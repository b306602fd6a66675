//! Login and account menus
//!
//! Runs once on every new connection before it is admitted to the chat.
//! The menus are plain line-oriented prompts; account lookups and updates
//! go through the server actor.

use futures_util::FutureExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::debug;

use crate::account::{MAX_PASSWORD_LEN, MAX_USERNAME_LEN};
use crate::error::AppError;
use crate::server::{request, ServerCommand};
use crate::types::AccountId;

/// Longest menu line read before the rest is treated as the next line
const MAX_MENU_LINE: u64 = 1024;

pub const BANNER: &str = "=============================================\n\
                          \x20        BASIC CHATROOM SERVER\n\
                          =============================================\n";

pub const HOME_MENU: &str = "=============================================\n\
                             Welcome to BASIC CHATROOM, please enter:\n\
                             \x20   (1) to login\n\
                             \x20   (2) to create an account\n\
                             \x20   (3) to exit\n\
                             Choice: ";

pub const LOGIN_SUCCESS: &str = "Successfully logged in!\n\n";
pub const CREATE_SUCCESS: &str = "Account created successfully!\n";

/// How a negotiation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Client left, cancelled or disconnected; do not admit
    Exit,
    /// Client logged in as this account
    Authenticated(AccountId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    HomeMenu,
    Login,
    CreateAccount,
    Done(Outcome),
}

/// Run the menus to completion on one connection
///
/// Sends the welcome banner, then loops through the home menu until the
/// client logs in or leaves. I/O errors end the negotiation with `Err`,
/// which the caller handles the same as `Outcome::Exit`.
pub async fn negotiate<R, W>(
    reader: &mut R,
    writer: &mut W,
    cmd_tx: &mpsc::Sender<ServerCommand>,
) -> Result<Outcome, AppError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut session = Session {
        reader,
        writer,
        cmd_tx,
    };
    session.send(BANNER).await?;

    let mut state = State::HomeMenu;
    loop {
        state = match state {
            State::HomeMenu => session.home_menu().await?,
            State::Login => session.login().await?,
            State::CreateAccount => session.create_account().await?,
            State::Done(outcome) => return Ok(outcome),
        };
        debug!("Negotiation state: {:?}", state);
    }
}

struct Session<'a, R, W> {
    reader: &'a mut R,
    writer: &'a mut W,
    cmd_tx: &'a mpsc::Sender<ServerCommand>,
}

impl<R, W> Session<'_, R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    async fn home_menu(&mut self) -> Result<State, AppError> {
        self.send(HOME_MENU).await?;
        let Some(choice) = self.read_line().await? else {
            return Ok(State::Done(Outcome::Exit));
        };

        Ok(match choice.chars().next() {
            Some('1') => State::Login,
            Some('2') => State::CreateAccount,
            Some('3') => {
                self.send("Goodbye!\n").await?;
                State::Done(Outcome::Exit)
            }
            _ => {
                self.send("Invalid choice. Please try again.\n").await?;
                State::HomeMenu
            }
        })
    }

    async fn login(&mut self) -> Result<State, AppError> {
        loop {
            self.send("Username (or 'exit' to cancel): ").await?;
            let Some(username) = self.read_field(MAX_USERNAME_LEN).await? else {
                return Ok(State::Done(Outcome::Exit));
            };
            if username == "exit" {
                return Ok(State::Done(Outcome::Exit));
            }

            let account = request(self.cmd_tx, |reply| ServerCommand::LookupAccount {
                username: username.clone(),
                reply,
            })
            .await?;
            let Some(account) = account else {
                self.send("User doesn't exist! (type exit to cancel)\n").await?;
                continue;
            };

            self.send("Password: ").await?;
            let Some(password) = self.read_field(MAX_PASSWORD_LEN).await? else {
                return Ok(State::Done(Outcome::Exit));
            };

            let ok = request(self.cmd_tx, |reply| ServerCommand::Authenticate {
                account,
                password,
                reply,
            })
            .await?;
            if ok {
                self.send(LOGIN_SUCCESS).await?;
                return Ok(State::Done(Outcome::Authenticated(account)));
            }
            self.send("Wrong password!\n").await?;
        }
    }

    async fn create_account(&mut self) -> Result<State, AppError> {
        let username = loop {
            self.send("Enter your desired username (< 15 characters): ")
                .await?;
            let Some(username) = self.read_field(MAX_USERNAME_LEN).await? else {
                return Ok(State::Done(Outcome::Exit));
            };

            self.send(&format!("Is your desired name \"{}\"? (y/n): ", username))
                .await?;
            let Some(confirm) = self.read_line().await? else {
                return Ok(State::Done(Outcome::Exit));
            };
            if !matches!(confirm.chars().next(), Some('n' | 'N')) {
                break username;
            }
        };

        self.drain_pending();
        self.send("Enter your password (< 12 characters): ").await?;
        let Some(password) = self.read_field(MAX_PASSWORD_LEN).await? else {
            return Ok(State::Done(Outcome::Exit));
        };

        let result = request(self.cmd_tx, |reply| ServerCommand::CreateAccount {
            username,
            password,
            reply,
        })
        .await?;
        match result {
            Ok(_) => self.send(CREATE_SUCCESS).await?,
            Err(e) => {
                self.send(&format!("Account creation failed: {}.\n", e))
                    .await?
            }
        }
        Ok(State::HomeMenu)
    }

    async fn send(&mut self, text: &str) -> Result<(), AppError> {
        self.writer.write_all(text.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Read one line without its terminator; `None` on disconnect
    async fn read_line(&mut self) -> Result<Option<String>, AppError> {
        let mut raw = Vec::new();
        let n = (&mut *self.reader)
            .take(MAX_MENU_LINE)
            .read_until(b'\n', &mut raw)
            .await?;
        if n == 0 {
            return Ok(None);
        }

        let line = String::from_utf8_lossy(&raw);
        let line = line.strip_suffix('\n').unwrap_or(&line);
        let line = line.strip_suffix('\r').unwrap_or(line);
        Ok(Some(line.to_string()))
    }

    /// Read a line truncated to `max` characters
    async fn read_field(&mut self, max: usize) -> Result<Option<String>, AppError> {
        Ok(self
            .read_line()
            .await?
            .map(|line| line.chars().take(max).collect()))
    }

    /// Discard input that has already arrived, without waiting for more
    fn drain_pending(&mut self) {
        let mut discarded = 0;
        loop {
            let n = match self.reader.fill_buf().now_or_never() {
                Some(Ok(buf)) => buf.len(),
                Some(Err(e)) => {
                    debug!("Stopped discarding pending input: {}", e);
                    0
                }
                None => 0,
            };
            if n == 0 {
                break;
            }
            self.reader.consume(n);
            discarded += n;
        }
        if discarded > 0 {
            debug!("Discarded {} pending bytes", discarded);
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{duplex, AsyncReadExt, BufReader, DuplexStream};

    use super::*;
    use crate::server::ChatServer;

    fn spawn_server() -> mpsc::Sender<ServerCommand> {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        tokio::spawn(ChatServer::new(cmd_rx).run());
        cmd_tx
    }

    /// Client side of an in-memory connection
    struct Client {
        stream: DuplexStream,
        seen: String,
    }

    impl Client {
        async fn send(&mut self, line: &str) {
            self.stream.write_all(line.as_bytes()).await.unwrap();
            self.stream.write_all(b"\n").await.unwrap();
        }

        /// Read until `needle` shows up in output not yet consumed
        async fn expect(&mut self, needle: &str) {
            let mut buf = [0u8; 512];
            while !self.seen.contains(needle) {
                let n = self.stream.read(&mut buf).await.unwrap();
                assert!(n > 0, "eof while waiting for {:?}, got {:?}", needle, self.seen);
                self.seen.push_str(&String::from_utf8_lossy(&buf[..n]));
            }
            let end = self.seen.find(needle).unwrap() + needle.len();
            self.seen.drain(..end);
        }
    }

    fn start(
        cmd_tx: &mpsc::Sender<ServerCommand>,
    ) -> (Client, tokio::task::JoinHandle<Result<Outcome, AppError>>) {
        let (client, server) = duplex(4096);
        let cmd_tx = cmd_tx.clone();
        let task = tokio::spawn(async move {
            let (read, mut write) = tokio::io::split(server);
            let mut reader = BufReader::new(read);
            negotiate(&mut reader, &mut write, &cmd_tx).await
        });
        (
            Client {
                stream: client,
                seen: String::new(),
            },
            task,
        )
    }

    async fn create_account(client: &mut Client, name: &str, pw: &str) {
        client.expect("Choice: ").await;
        client.send("2").await;
        client.expect("(< 15 characters): ").await;
        client.send(name).await;
        client.expect("(y/n): ").await;
        client.send("y").await;
        client.expect("(< 12 characters): ").await;
        client.send(pw).await;
    }

    #[tokio::test]
    async fn test_create_then_login() {
        let cmd_tx = spawn_server();
        let (mut client, task) = start(&cmd_tx);

        client.expect("BASIC CHATROOM SERVER").await;
        create_account(&mut client, "alice", "secret123").await;
        client.expect("Account created successfully!").await;

        client.expect("Choice: ").await;
        client.send("1").await;
        client.expect("Username (or 'exit' to cancel): ").await;
        client.send("alice").await;
        client.expect("Password: ").await;
        client.send("secret123").await;
        client.expect("Successfully logged in!").await;

        let outcome = task.await.unwrap().unwrap();
        assert!(matches!(outcome, Outcome::Authenticated(_)));
    }

    #[tokio::test]
    async fn test_exit_choice() {
        let cmd_tx = spawn_server();
        let (mut client, task) = start(&cmd_tx);

        client.expect("Choice: ").await;
        client.send("3").await;
        client.expect("Goodbye!").await;

        assert_eq!(task.await.unwrap().unwrap(), Outcome::Exit);
    }

    #[tokio::test]
    async fn test_invalid_choice_reprompts() {
        let cmd_tx = spawn_server();
        let (mut client, task) = start(&cmd_tx);

        client.expect("Choice: ").await;
        client.send("9").await;
        client.expect("Invalid choice. Please try again.").await;
        client.expect("Choice: ").await;
        drop(client);

        assert_eq!(task.await.unwrap().unwrap(), Outcome::Exit);
    }

    #[tokio::test]
    async fn test_login_unknown_user_then_cancel() {
        let cmd_tx = spawn_server();
        let (mut client, task) = start(&cmd_tx);

        client.expect("Choice: ").await;
        client.send("1").await;
        client.expect("cancel): ").await;
        client.send("nobody").await;
        client.expect("User doesn't exist!").await;
        client.expect("cancel): ").await;
        client.send("exit").await;

        assert_eq!(task.await.unwrap().unwrap(), Outcome::Exit);
    }

    #[tokio::test]
    async fn test_wrong_password_reprompts_username() {
        let cmd_tx = spawn_server();
        let (mut client, task) = start(&cmd_tx);

        create_account(&mut client, "bob", "pw").await;
        client.expect("Choice: ").await;
        client.send("1").await;
        client.expect("cancel): ").await;
        client.send("bob").await;
        client.expect("Password: ").await;
        client.send("nope").await;
        client.expect("Wrong password!").await;
        client.expect("cancel): ").await;
        drop(client);

        assert_eq!(task.await.unwrap().unwrap(), Outcome::Exit);
    }

    #[tokio::test]
    async fn test_duplicate_account_reported() {
        let cmd_tx = spawn_server();
        let (mut client, task) = start(&cmd_tx);

        create_account(&mut client, "alice", "one").await;
        client.expect("Account created successfully!").await;
        create_account(&mut client, "alice", "two").await;
        client
            .expect("Account creation failed: Username already exists.")
            .await;
        client.expect("Choice: ").await;
        client.send("3").await;

        assert_eq!(task.await.unwrap().unwrap(), Outcome::Exit);
    }

    #[tokio::test]
    async fn test_reject_name_reprompts() {
        let cmd_tx = spawn_server();
        let (mut client, task) = start(&cmd_tx);

        client.expect("Choice: ").await;
        client.send("2").await;
        client.expect("(< 15 characters): ").await;
        client.send("carl").await;
        client.expect("Is your desired name \"carl\"? (y/n): ").await;
        client.send("n").await;
        client.expect("(< 15 characters): ").await;
        drop(client);

        assert_eq!(task.await.unwrap().unwrap(), Outcome::Exit);
    }

    #[tokio::test]
    async fn test_long_username_truncated() {
        let cmd_tx = spawn_server();
        let (mut client, task) = start(&cmd_tx);

        client.expect("Choice: ").await;
        client.send("2").await;
        client.expect("(< 15 characters): ").await;
        client.send("abcdefghijklmnopqrst").await;
        client
            .expect("Is your desired name \"abcdefghijklmn\"? (y/n): ")
            .await;
        drop(client);

        assert_eq!(task.await.unwrap().unwrap(), Outcome::Exit);
    }

    #[tokio::test]
    async fn test_pending_input_discarded_before_password() {
        let cmd_tx = spawn_server();
        let (mut client, task) = start(&cmd_tx);

        client.expect("Choice: ").await;
        client.send("2").await;
        client.expect("(< 15 characters): ").await;
        client.send("dave").await;
        client.expect("(y/n): ").await;
        // Stray keystrokes typed along with the confirmation
        client.stream.write_all(b"y\nstray\n").await.unwrap();
        client.expect("(< 12 characters): ").await;
        client.send("realpw").await;
        client.expect("Account created successfully!").await;

        client.expect("Choice: ").await;
        client.send("1").await;
        client.expect("cancel): ").await;
        client.send("dave").await;
        client.expect("Password: ").await;
        client.send("realpw").await;
        client.expect("Successfully logged in!").await;

        assert!(matches!(
            task.await.unwrap().unwrap(),
            Outcome::Authenticated(_)
        ));
    }

    /// Yields `data` once, then fails every read
    struct FailingReader {
        data: &'static [u8],
    }

    impl tokio::io::AsyncRead for FailingReader {
        fn poll_read(
            mut self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            if self.data.is_empty() {
                let err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
                return std::task::Poll::Ready(Err(err));
            }
            let n = self.data.len().min(buf.remaining());
            buf.put_slice(&self.data[..n]);
            self.data = &self.data[n..];
            std::task::Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_read_error_while_discarding_ends_negotiation() {
        let cmd_tx = spawn_server();
        let mut reader = BufReader::new(FailingReader {
            data: b"2\nerin\ny\n",
        });
        let mut output = Vec::new();

        let result = negotiate(&mut reader, &mut output, &cmd_tx).await;

        assert!(matches!(result, Err(AppError::Io(_))));
        let output = String::from_utf8(output).unwrap();
        assert!(output.ends_with("Enter your password (< 12 characters): "));
    }

    #[tokio::test]
    async fn test_disconnect_mid_login_exits() {
        let cmd_tx = spawn_server();
        let (mut client, task) = start(&cmd_tx);

        client.expect("Choice: ").await;
        client.send("1").await;
        client.expect("cancel): ").await;
        drop(client);

        assert_eq!(task.await.unwrap().unwrap(), Outcome::Exit);
    }
}
