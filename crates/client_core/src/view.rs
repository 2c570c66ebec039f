//! Render model derived from [`ViewState`].

use std::fmt;

use shared::domain::{NewUser, UserId};

use crate::{state::ViewState, ServiceVariant};

const TITLE: &str = "User Management App";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailCell {
    Static(String),
    /// Input with Save/Cancel buttons.
    Editing(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub position: usize,
    pub id: UserId,
    pub name: String,
    pub username: String,
    pub email: EmailCell,
    /// Delete and edit icons.
    pub show_controls: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionView {
    LoggedIn,
    PinEntry { pin_len: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewModel {
    pub total: usize,
    pub show_add_button: bool,
    pub add_form: Option<NewUser>,
    pub session: Option<SessionView>,
    pub rows: Vec<UserRow>,
    pub error: Option<String>,
}

impl ViewModel {
    pub fn from_state(state: &ViewState) -> Self {
        let can_mutate = state.can_mutate();

        let rows = state
            .users()
            .iter()
            .enumerate()
            .map(|(index, user)| {
                let email = match state.email_draft(&user.id) {
                    Some(draft) if can_mutate => EmailCell::Editing(draft.to_string()),
                    _ => EmailCell::Static(user.email.clone()),
                };
                UserRow {
                    position: index + 1,
                    id: user.id.clone(),
                    name: user.name.clone(),
                    username: user.username.clone(),
                    email,
                    show_controls: can_mutate,
                }
            })
            .collect();

        let session = match state.variant() {
            ServiceVariant::Plain => None,
            ServiceVariant::Session if state.user_is_admin() => Some(SessionView::LoggedIn),
            ServiceVariant::Session => Some(SessionView::PinEntry {
                pin_len: state.pin().chars().count(),
            }),
        };

        Self {
            total: state.users().len(),
            show_add_button: can_mutate,
            add_form: (can_mutate && state.add_panel_open()).then(|| state.draft().clone()),
            session,
            rows,
            error: state.last_error().map(str::to_string),
        }
    }
}

impl fmt::Display for ViewModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{TITLE}")?;

        match &self.session {
            Some(SessionView::LoggedIn) => writeln!(f, "Admin: logged in  [logout]")?,
            Some(SessionView::PinEntry { pin_len }) => {
                writeln!(f, "Admin PIN: {}  [login]", "*".repeat(*pin_len))?
            }
            None => {}
        }

        if let Some(error) = &self.error {
            writeln!(f, "! {error}")?;
        }

        if self.show_add_button {
            write!(f, "[Add User]  ")?;
        }
        writeln!(f, "Total: {} users", self.total)?;

        if let Some(draft) = &self.add_form {
            writeln!(f, "  + Full Name: {}", draft.name)?;
            writeln!(f, "    User Name: {}", draft.username)?;
            writeln!(f, "    Email:     {}", draft.email)?;
            writeln!(f, "    [Save New User] [Cancel]")?;
        }

        for row in &self.rows {
            writeln!(f)?;
            writeln!(f, "{:>3}. Full Name: {}", row.position, row.name)?;
            writeln!(f, "     User Name: {}", row.username)?;
            match &row.email {
                EmailCell::Static(email) => writeln!(f, "     E-Mail:    {email}")?,
                EmailCell::Editing(email) => {
                    writeln!(f, "     E-Mail:    [{email}] [Save] [Cancel]")?
                }
            }
            if row.show_controls {
                writeln!(f, "     [delete] [edit]")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use shared::domain::User;

    use super::*;
    use crate::state::Action;

    fn session_state(is_admin: bool) -> ViewState {
        let mut state = ViewState::new(ServiceVariant::Session);
        state.apply(Action::ListLoaded {
            seq: 1,
            users: vec![User {
                id: UserId::new("1"),
                name: "Ann".into(),
                username: "ann1".into(),
                email: "a@x.com".into(),
            }],
            user_is_admin: Some(is_admin),
        });
        state
    }

    #[test]
    fn non_admin_sees_no_mutating_controls() {
        let mut state = session_state(false);
        state.apply(Action::ToggleAddPanel);
        let view = ViewModel::from_state(&state);

        assert!(!view.show_add_button);
        assert!(view.add_form.is_none());
        assert!(view.rows.iter().all(|row| !row.show_controls));
        assert_eq!(view.session, Some(SessionView::PinEntry { pin_len: 0 }));

        let text = view.to_string();
        assert!(!text.contains("[Add User]"));
        assert!(!text.contains("[delete]"));
        assert!(!text.contains("[edit]"));
    }

    #[test]
    fn admin_sees_mutating_controls() {
        let view = ViewModel::from_state(&session_state(true));

        assert!(view.show_add_button);
        assert!(view.rows.iter().all(|row| row.show_controls));
        assert_eq!(view.session, Some(SessionView::LoggedIn));

        let text = view.to_string();
        assert!(text.contains("[Add User]"));
        assert!(text.contains("[delete] [edit]"));
        assert!(text.contains("Total: 1 users"));
    }

    #[test]
    fn editing_row_renders_draft_input() {
        let mut state = session_state(true);
        let id = UserId::new("1");
        state.apply(Action::ToggleEditEmail(id.clone()));
        state.apply(Action::ChangeEmailDraft {
            id,
            email: "typed@x.com".into(),
        });

        let view = ViewModel::from_state(&state);
        assert_eq!(view.rows[0].email, EmailCell::Editing("typed@x.com".into()));
        assert!(view.to_string().contains("[typed@x.com] [Save] [Cancel]"));
    }

    #[test]
    fn error_banner_is_rendered() {
        let mut state = ViewState::new(ServiceVariant::Plain);
        state.apply(Action::OperationFailed("NotFound: gone".into()));
        let view = ViewModel::from_state(&state);
        assert!(view.session.is_none());
        assert!(view.to_string().contains("! NotFound: gone"));
    }
}
