//! Line-oriented shell over [`Storage`]
//!
//! One command per line. Arguments after the command word are split on `|`
//! where a command takes several free-text fields:
//!
//! ```text
//! add Купить молоко | Хобби | 20.10.2026 18:00
//! search мол | 01.10.2026 | 31.10.2026
//! ```

use chrono::{NaiveDate, NaiveDateTime};
use taskdesk_shared::error::StorageError;
use taskdesk_shared::models::task::{TaskFilter, CATEGORIES, DEFAULT_CATEGORY};
use taskdesk_shared::render::DEADLINE_FORMAT;
use taskdesk_shared::session::{Session, SessionContext};
use taskdesk_shared::storage::Storage;

/// Format of a date typed without a time
pub const DATE_FORMAT: &str = "%d.%m.%Y";

pub const HELP: &str = "\
Commands:
  register <user> <password>
  login <user> <password>
  logout
  add <description> [| <category>] [| <DD.MM.YYYY[ HH:MM]>]
  list
  done <id>
  done-text <description>
  history
  search [<text>] [| <from DD.MM.YYYY>] [| <to DD.MM.YYYY>]
  categories
  export
  help
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Register { username: String, password: String },
    Login { username: String, password: String },
    Logout,
    Add {
        description: String,
        category: String,
        deadline: Option<NaiveDateTime>,
    },
    List,
    Done(i64),
    DoneText(String),
    History,
    Search(TaskFilter),
    Categories,
    Export,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Unknown command '{0}', type 'help' for the list")]
    UnknownCommand(String),

    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),

    #[error("'{0}' is not a task id")]
    InvalidId(String),

    #[error("'{0}' is not a date, expected DD.MM.YYYY or DD.MM.YYYY HH:MM")]
    InvalidDate(String),
}

/// Which end of a day a bare date stands for
#[derive(Debug, Clone, Copy)]
enum DayEdge {
    Start,
    Deadline,
    End,
}

fn parse_date(text: &str, edge: DayEdge) -> Result<NaiveDateTime, ParseError> {
    let text = text.trim();
    if let Ok(at) = NaiveDateTime::parse_from_str(text, DEADLINE_FORMAT) {
        return Ok(at);
    }

    let day = NaiveDate::parse_from_str(text, DATE_FORMAT)
        .map_err(|_| ParseError::InvalidDate(text.to_string()))?;
    let (h, m, s) = match edge {
        DayEdge::Start => (0, 0, 0),
        DayEdge::Deadline => (23, 59, 0),
        DayEdge::End => (23, 59, 59),
    };
    day.and_hms_opt(h, m, s)
        .ok_or_else(|| ParseError::InvalidDate(text.to_string()))
}

fn optional_date(part: Option<&str>, edge: DayEdge) -> Result<Option<NaiveDateTime>, ParseError> {
    match part.map(str::trim).filter(|p| !p.is_empty()) {
        Some(text) => parse_date(text, edge).map(Some),
        None => Ok(None),
    }
}

fn credentials(rest: &str) -> (String, String) {
    match rest.split_once(char::is_whitespace) {
        Some((username, password)) => (username.to_string(), password.trim().to_string()),
        None => (rest.to_string(), String::new()),
    }
}

impl Command {
    /// Parses one input line. Blank lines are `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Command>, ParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_lowercase().as_str() {
            "register" => {
                let (username, password) = credentials(rest);
                Command::Register { username, password }
            }
            "login" => {
                let (username, password) = credentials(rest);
                Command::Login { username, password }
            }
            "logout" => Command::Logout,
            "add" => {
                let mut parts = rest.split('|');
                let description = parts.next().unwrap_or_default().trim().to_string();
                let category = parts
                    .next()
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .unwrap_or(DEFAULT_CATEGORY)
                    .to_string();
                let deadline = optional_date(parts.next(), DayEdge::Deadline)?;
                Command::Add {
                    description,
                    category,
                    deadline,
                }
            }
            "list" => Command::List,
            "done" => {
                if rest.is_empty() {
                    return Err(ParseError::MissingArgument("done"));
                }
                let id = rest
                    .trim_start_matches('#')
                    .parse()
                    .map_err(|_| ParseError::InvalidId(rest.to_string()))?;
                Command::Done(id)
            }
            "done-text" => {
                if rest.is_empty() {
                    return Err(ParseError::MissingArgument("done-text"));
                }
                Command::DoneText(rest.to_string())
            }
            "history" => Command::History,
            "search" => {
                let mut parts = rest.split('|');
                let mut filter = TaskFilter::default();
                if let Some(text) = parts.next().map(str::trim).filter(|t| !t.is_empty()) {
                    filter = filter.text(text);
                }
                if let Some(from) = optional_date(parts.next(), DayEdge::Start)? {
                    filter = filter.date_from(from);
                }
                if let Some(to) = optional_date(parts.next(), DayEdge::End)? {
                    filter = filter.date_to(to);
                }
                Command::Search(filter)
            }
            "categories" => Command::Categories,
            "export" => Command::Export,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(ParseError::UnknownCommand(other.to_string())),
        };

        Ok(Some(command))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Log in first")]
    NotSignedIn,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Could not encode tasks: {0}")]
    Export(#[from] serde_json::Error),
}

impl ShellError {
    /// Errors that mean the backing store is broken, not the input
    pub fn is_fatal(&self) -> bool {
        match self {
            ShellError::Storage(err) => !err.is_recoverable(),
            _ => false,
        }
    }
}

/// What the loop should do after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Lines(Vec<String>),
    Quit,
}

impl Reply {
    fn line(text: impl Into<String>) -> Self {
        Reply::Lines(vec![text.into()])
    }
}

pub struct Shell {
    storage: Storage,
    context: SessionContext,
}

impl Shell {
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            context: SessionContext::new(),
        }
    }

    /// Name of the signed-in user, for the prompt
    pub fn current_user(&self) -> Option<&str> {
        self.context.current().map(Session::username)
    }

    fn session(&self) -> Result<&Session, ShellError> {
        self.context.current().ok_or(ShellError::NotSignedIn)
    }

    pub async fn execute(&mut self, command: Command) -> Result<Reply, ShellError> {
        let reply = match command {
            Command::Register { username, password } => {
                let user = self.storage.register(&username, &password).await?;
                Reply::line(format!("Registered {}. Now log in.", user.username))
            }
            Command::Login { username, password } => {
                let session = self.storage.login(&username, &password).await?;
                let text = format!("Welcome, {}!", session.username());
                self.context.sign_in(session);
                Reply::line(text)
            }
            Command::Logout => match self.context.sign_out() {
                Some(session) => Reply::line(format!("Bye, {}.", session.username())),
                None => Reply::line("Nobody is logged in."),
            },
            Command::Add {
                description,
                category,
                deadline,
            } => {
                let session = self.session()?;
                let task = self
                    .storage
                    .add_task(session, &description, deadline, &category)
                    .await?;
                Reply::line(format!("Added #{}", task.id))
            }
            Command::List => {
                let session = self.session()?;
                let lines = self.storage.list_open_tasks(session).await?;
                if lines.is_empty() {
                    Reply::line("No open tasks.")
                } else {
                    Reply::Lines(
                        lines
                            .iter()
                            .map(|l| format!("#{} {}", l.id, l.text))
                            .collect(),
                    )
                }
            }
            Command::Done(id) => {
                let session = self.session()?;
                let task = self.storage.complete_task(session, id).await?;
                Reply::line(format!("Completed: {}", task.description))
            }
            Command::DoneText(description) => {
                let session = self.session()?;
                let count = self
                    .storage
                    .complete_by_description(session, &description)
                    .await?;
                Reply::line(format!("Completed {} task(s)", count))
            }
            Command::History => {
                let session = self.session()?;
                let done = self.storage.list_completed_tasks(session).await?;
                if done.is_empty() {
                    Reply::line("Nothing completed yet.")
                } else {
                    Reply::Lines(done)
                }
            }
            Command::Search(filter) => {
                let session = self.session()?;
                let hits = self.storage.search_tasks(session, &filter).await?;
                if hits.is_empty() {
                    Reply::line("Nothing found.")
                } else {
                    Reply::Lines(
                        hits.iter()
                            .map(|l| format!("#{} {}", l.id, l.text))
                            .collect(),
                    )
                }
            }
            Command::Categories => {
                Reply::Lines(CATEGORIES.iter().map(|c| c.to_string()).collect())
            }
            Command::Export => {
                let session = self.session()?;
                let tasks = self.storage.open_tasks(session).await?;
                Reply::line(serde_json::to_string_pretty(&tasks)?)
            }
            Command::Help => Reply::line(HELP),
            Command::Quit => Reply::Quit,
        };

        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskdesk_shared::auth::password::PasswordConfig;

    fn day(d: u32, m: u32, y: i32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(h, min, s))
            .expect("valid date")
    }

    fn parse(line: &str) -> Command {
        Command::parse(line).expect("parses").expect("not blank")
    }

    fn shell() -> Shell {
        Shell::new(Storage::in_memory().with_password_config(PasswordConfig::insecure_fast()))
    }

    async fn run(shell: &mut Shell, line: &str) -> Result<Reply, ShellError> {
        shell.execute(parse(line)).await
    }

    fn lines(reply: Reply) -> Vec<String> {
        match reply {
            Reply::Lines(lines) => lines,
            Reply::Quit => panic!("unexpected quit"),
        }
    }

    #[test]
    fn test_blank_line() {
        assert_eq!(Command::parse("   "), Ok(None));
    }

    #[test]
    fn test_parse_credentials() {
        assert_eq!(
            parse("register alice  my secret "),
            Command::Register {
                username: "alice".to_string(),
                password: "my secret".to_string(),
            }
        );
        assert_eq!(
            parse("login alice"),
            Command::Login {
                username: "alice".to_string(),
                password: String::new(),
            }
        );
    }

    #[test]
    fn test_parse_add() {
        assert_eq!(
            parse("add Купить молоко"),
            Command::Add {
                description: "Купить молоко".to_string(),
                category: DEFAULT_CATEGORY.to_string(),
                deadline: None,
            }
        );
        assert_eq!(
            parse("add Report | Рабочая | 20.10.2026 18:30"),
            Command::Add {
                description: "Report".to_string(),
                category: "Рабочая".to_string(),
                deadline: Some(day(20, 10, 2026, 18, 30, 0)),
            }
        );
        assert_eq!(
            parse("add Report | | 20.10.2026"),
            Command::Add {
                description: "Report".to_string(),
                category: DEFAULT_CATEGORY.to_string(),
                deadline: Some(day(20, 10, 2026, 23, 59, 0)),
            }
        );
    }

    #[test]
    fn test_parse_search_bounds() {
        let Command::Search(filter) = parse("search мол | 01.10.2026 | 31.10.2026") else {
            panic!("expected search");
        };
        assert_eq!(filter.text.as_deref(), Some("мол"));
        assert_eq!(filter.date_from, Some(day(1, 10, 2026, 0, 0, 0)));
        assert_eq!(filter.date_to, Some(day(31, 10, 2026, 23, 59, 59)));

        assert_eq!(parse("search"), Command::Search(TaskFilter::default()));
        let Command::Search(filter) = parse("search | | 31.10.2026") else {
            panic!("expected search");
        };
        assert!(filter.text.is_none());
        assert!(filter.date_from.is_none());
        assert!(filter.date_to.is_some());
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            Command::parse("fly"),
            Err(ParseError::UnknownCommand("fly".to_string()))
        );
        assert_eq!(
            Command::parse("done"),
            Err(ParseError::MissingArgument("done"))
        );
        assert_eq!(
            Command::parse("done abc"),
            Err(ParseError::InvalidId("abc".to_string()))
        );
        assert_eq!(
            Command::parse("add x | Хобби | 32.13.2026"),
            Err(ParseError::InvalidDate("32.13.2026".to_string()))
        );
    }

    #[test]
    fn test_parse_done_accepts_hash() {
        assert_eq!(parse("done #7"), Command::Done(7));
        assert_eq!(parse("DONE 7"), Command::Done(7));
    }

    #[tokio::test]
    async fn test_task_commands_need_login() {
        let mut shell = shell();
        let err = run(&mut shell, "list").await.unwrap_err();
        assert!(matches!(err, ShellError::NotSignedIn));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn test_session_flow() {
        let mut shell = shell();

        run(&mut shell, "register alice 123").await.expect("register");
        assert!(shell.current_user().is_none());

        let err = run(&mut shell, "login alice 124").await.unwrap_err();
        assert!(matches!(err, ShellError::Storage(StorageError::WrongPassword)));

        run(&mut shell, "login alice 123").await.expect("login");
        assert_eq!(shell.current_user(), Some("alice"));

        run(&mut shell, "add Buy milk | Хобби").await.expect("add");
        let listed = lines(run(&mut shell, "list").await.expect("list"));
        assert_eq!(listed, vec!["#1 [Хобби] Buy milk"]);

        run(&mut shell, "done 1").await.expect("done");
        assert_eq!(
            lines(run(&mut shell, "history").await.expect("history")),
            vec!["Buy milk"]
        );
        assert_eq!(
            lines(run(&mut shell, "list").await.expect("list")),
            vec!["No open tasks."]
        );

        run(&mut shell, "logout").await.expect("logout");
        assert!(shell.current_user().is_none());
    }

    #[tokio::test]
    async fn test_user_errors_are_not_fatal() {
        let mut shell = shell();
        let err = run(&mut shell, "register   ").await.unwrap_err();
        assert!(matches!(err, ShellError::Storage(StorageError::EmptyUsername)));
        assert!(!err.is_fatal());

        let err = run(&mut shell, "register bob").await.unwrap_err();
        assert!(matches!(err, ShellError::Storage(StorageError::EmptyPassword)));
    }

    #[tokio::test]
    async fn test_search_and_export() {
        let mut shell = shell();
        run(&mut shell, "register alice 123").await.expect("register");
        run(&mut shell, "login alice 123").await.expect("login");
        run(&mut shell, "add Купить молоко | Домашняя | 20.10.2026 18:00")
            .await
            .expect("add");

        let hits = lines(run(&mut shell, "search мол").await.expect("search"));
        assert_eq!(hits, vec!["#1 [Домашняя] Купить молоко (до 20.10.2026 18:00)"]);
        assert_eq!(
            lines(run(&mut shell, "search exam").await.expect("search")),
            vec!["Nothing found."]
        );

        let exported = lines(run(&mut shell, "export").await.expect("export"));
        let json: serde_json::Value = serde_json::from_str(&exported[0]).expect("valid json");
        assert_eq!(json[0]["description"], "Купить молоко");
        assert_eq!(json[0]["category"], "Домашняя");
    }

    #[tokio::test]
    async fn test_quit() {
        let mut shell = shell();
        assert_eq!(run(&mut shell, "quit").await.expect("quit"), Reply::Quit);
    }
}
