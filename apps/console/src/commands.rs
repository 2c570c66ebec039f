//! Line commands accepted by the interactive console.

use anyhow::{anyhow, bail, Context, Result};
use client_core::UserManager;
use shared::domain::UserId;

pub const HELP: &str = "\
commands:
  list                     reload the user list
  add                      open/close the add-user form
  name <text>              set the new user's full name
  username <text>          set the new user's user name
  email <text>             set the new user's email
  save                     save the new user
  cancel                   discard the new user form
  edit <row>               start/stop editing a row's email
  type <row> <email>       change the email being edited
  save-email <row>         save the edited email
  delete <row>             delete the user at <row>
  login <pin>              log in as admin (session services)
  logout                   log out
  help                     show this text
  quit                     exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    ToggleAdd,
    Name(String),
    Username(String),
    Email(String),
    Save,
    Cancel,
    Edit(usize),
    Type { row: usize, email: String },
    SaveEmail(usize),
    Delete(usize),
    Login(String),
    Logout,
    Help,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Render,
    Quiet,
    Quit,
}

fn parse_row(raw: &str) -> Result<usize> {
    let row = raw
        .parse::<usize>()
        .with_context(|| format!("'{raw}' is not a row number"))?;
    if row == 0 {
        bail!("rows are numbered from 1");
    }
    Ok(row)
}

fn require<'a>(word: &str, rest: &'a str, what: &str) -> Result<&'a str> {
    if rest.is_empty() {
        bail!("usage: {word} <{what}>");
    }
    Ok(rest)
}

/// Parses one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "list" | "reload" => Command::List,
        "add" => Command::ToggleAdd,
        "name" => Command::Name(rest.to_string()),
        "username" => Command::Username(rest.to_string()),
        "email" => Command::Email(rest.to_string()),
        "save" => Command::Save,
        "cancel" => Command::Cancel,
        "edit" => Command::Edit(parse_row(require(word, rest, "row")?)?),
        "type" => {
            let (row, email) = require(word, rest, "row> <email")?
                .split_once(char::is_whitespace)
                .ok_or_else(|| anyhow!("usage: type <row> <email>"))?;
            Command::Type {
                row: parse_row(row)?,
                email: email.trim().to_string(),
            }
        }
        "save-email" => Command::SaveEmail(parse_row(require(word, rest, "row")?)?),
        "delete" => Command::Delete(parse_row(require(word, rest, "row")?)?),
        "login" => Command::Login(require(word, rest, "pin")?.to_string()),
        "logout" => Command::Logout,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => bail!("unknown command '{other}'; type 'help'"),
    };
    Ok(Some(command))
}

async fn user_at(manager: &UserManager, row: usize) -> Result<UserId> {
    manager
        .user_id_at(row)
        .await
        .ok_or_else(|| anyhow!("no user at row {row}"))
}

pub async fn execute(manager: &UserManager, command: Command) -> Result<Flow> {
    match command {
        Command::List => manager.load_users().await?,
        Command::ToggleAdd => manager.toggle_add_panel().await?,
        Command::Name(name) => manager.set_draft_name(name).await,
        Command::Username(username) => manager.set_draft_username(username).await,
        Command::Email(email) => manager.set_draft_email(email).await,
        Command::Save => manager.submit_new_user().await?,
        Command::Cancel => manager.cancel_add().await,
        Command::Edit(row) => {
            let id = user_at(manager, row).await?;
            manager.toggle_edit_email(&id).await?;
        }
        Command::Type { row, email } => {
            let id = user_at(manager, row).await?;
            manager.change_email_draft(&id, email).await?;
        }
        Command::SaveEmail(row) => {
            let id = user_at(manager, row).await?;
            manager.save_email(&id).await?;
        }
        Command::Delete(row) => {
            let id = user_at(manager, row).await?;
            manager.delete_user(&id).await?;
        }
        Command::Login(pin) => {
            manager.set_pin(pin).await;
            if !manager.login().await? {
                println!("login rejected");
            }
        }
        Command::Logout => {
            if !manager.logout().await? {
                println!("logout was not confirmed by the service");
            }
        }
        Command::Help => {
            println!("{HELP}");
            return Ok(Flow::Quiet);
        }
        Command::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Render)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use client_core::{
        error::{ControllerError, ServiceResult},
        ServiceVariant, UserService,
    };
    use shared::{
        domain::{NewUser, User},
        protocol::{
            SessionResponse, UserListResponse, ID_CODE_ADMIN_LOGGED_IN, ID_CODE_ADMIN_LOGGED_OUT,
        },
    };

    #[derive(Default)]
    struct SessionBackend {
        is_admin: Mutex<bool>,
        writes: Mutex<Vec<String>>,
    }

    impl SessionBackend {
        fn writes(&self) -> Vec<String> {
            self.writes.lock().expect("writes lock").clone()
        }

        fn record(&self, write: String) {
            self.writes.lock().expect("writes lock").push(write);
        }
    }

    #[async_trait]
    impl UserService for SessionBackend {
        fn variant(&self) -> ServiceVariant {
            ServiceVariant::Session
        }

        async fn list_users(&self) -> ServiceResult<UserListResponse> {
            Ok(UserListResponse::Session {
                users: vec![User {
                    id: UserId::new("42"),
                    name: "Ann".into(),
                    username: "ann1".into(),
                    email: "a@x.com".into(),
                }],
                user_is_admin: *self.is_admin.lock().expect("admin lock"),
            })
        }

        async fn delete_user(&self, id: &UserId) -> ServiceResult<()> {
            self.record(format!("delete {id}"));
            Ok(())
        }

        async fn edit_user_email(&self, id: &UserId, email: &str) -> ServiceResult<()> {
            self.record(format!("email {id} {email}"));
            Ok(())
        }

        async fn insert_user(&self, user: &NewUser) -> ServiceResult<()> {
            self.record(format!("insert {}", user.username));
            Ok(())
        }

        async fn login(&self, _pin: &str) -> ServiceResult<SessionResponse> {
            *self.is_admin.lock().expect("admin lock") = true;
            Ok(SessionResponse {
                id_code: ID_CODE_ADMIN_LOGGED_IN.to_string(),
            })
        }

        async fn logout(&self) -> ServiceResult<SessionResponse> {
            *self.is_admin.lock().expect("admin lock") = false;
            Ok(SessionResponse {
                id_code: ID_CODE_ADMIN_LOGGED_OUT.to_string(),
            })
        }
    }

    async fn session_console() -> (Arc<SessionBackend>, Arc<UserManager>) {
        let backend = Arc::new(SessionBackend::default());
        let manager = UserManager::new(backend.clone());
        manager.load_users().await.expect("initial load");
        (backend, manager)
    }

    #[tokio::test]
    async fn write_commands_need_admin_session() {
        let (backend, manager) = session_console().await;

        for command in [
            Command::Delete(1),
            Command::Edit(1),
            Command::SaveEmail(1),
            Command::ToggleAdd,
            Command::Save,
        ] {
            let err = execute(&manager, command.clone())
                .await
                .expect_err("non-admin write");
            assert!(
                matches!(
                    err.downcast_ref::<ControllerError>(),
                    Some(ControllerError::NotAdmin)
                ),
                "{command:?} gave {err:#}"
            );
        }
        assert!(backend.writes().is_empty());
    }

    #[tokio::test]
    async fn delete_goes_through_after_login() {
        let (backend, manager) = session_console().await;

        let flow = execute(&manager, Command::Login("1234".into()))
            .await
            .expect("login");
        assert_eq!(flow, Flow::Render);
        execute(&manager, Command::Delete(1)).await.expect("delete");

        assert_eq!(backend.writes(), vec!["delete 42".to_string()]);
    }

    #[tokio::test]
    async fn rows_outside_the_list_are_reported() {
        let (backend, manager) = session_console().await;
        execute(&manager, Command::Login("1234".into()))
            .await
            .expect("login");

        let err = execute(&manager, Command::Delete(5))
            .await
            .expect_err("row 5 is empty");
        assert!(err.to_string().contains("no user at row 5"));
        assert!(backend.writes().is_empty());
    }

    #[tokio::test]
    async fn help_and_quit_control_the_loop() {
        let (_backend, manager) = session_console().await;
        assert_eq!(
            execute(&manager, Command::Help).await.expect("help"),
            Flow::Quiet
        );
        assert_eq!(
            execute(&manager, Command::Quit).await.expect("quit"),
            Flow::Quit
        );
    }

    #[test]
    fn blank_lines_are_skipped() {
        assert_eq!(parse("   ").expect("parse"), None);
    }

    #[test]
    fn draft_fields_keep_inner_spaces() {
        assert_eq!(
            parse("name  Ann  Smith ").expect("parse"),
            Some(Command::Name("Ann  Smith".into()))
        );
        assert_eq!(parse("email").expect("parse"), Some(Command::Email(String::new())));
    }

    #[test]
    fn row_commands_are_one_based() {
        assert_eq!(parse("delete 2").expect("parse"), Some(Command::Delete(2)));
        assert_eq!(parse("EDIT 1").expect("parse"), Some(Command::Edit(1)));
        assert!(parse("delete 0").is_err());
        assert!(parse("delete two").is_err());
        assert!(parse("delete").is_err());
    }

    #[test]
    fn type_takes_row_and_email() {
        assert_eq!(
            parse("type 3 new@x.com").expect("parse"),
            Some(Command::Type {
                row: 3,
                email: "new@x.com".into()
            })
        );
        assert!(parse("type 3").is_err());
    }

    #[test]
    fn session_and_control_commands() {
        assert_eq!(
            parse("login 1234").expect("parse"),
            Some(Command::Login("1234".into()))
        );
        assert!(parse("login").is_err());
        assert_eq!(parse("logout").expect("parse"), Some(Command::Logout));
        assert_eq!(parse("exit").expect("parse"), Some(Command::Quit));
        assert_eq!(parse("save-email 1").expect("parse"), Some(Command::SaveEmail(1)));
        assert!(parse("frobnicate").is_err());
    }
}
