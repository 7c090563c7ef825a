//! engine::command
//!
//! Tokenizing and parsing of learner commands.
//!
//! # Grammar
//!
//! ```text
//! git init
//! git status
//! git add <path>... | git add . | git add * | git add -A
//! git commit -m <msg> [-a]
//! git branch | git branch <name> [<start>] | git branch -d|-D <name>
//! git checkout [-b] <name> [<start>]
//! git switch [-c] <name>
//! git merge <name> | git merge --abort
//! git clone <url>
//! git tag | git tag <name> [<target>] | git tag -d <name>
//! git log [--oneline]
//! git reset [HEAD] <path>... | git restore --staged <path>...
//! ls [-a|-la]
//! echo <text>... [> <path> | >> <path>]
//! cat <path>
//! rm <path>...
//! ```
//!
//! Words are separated by whitespace. Single quotes keep their content
//! literally; double quotes honor `\` escapes (`\n` and `\t` included).
//! Unquoted `>` and `>>` are redirection tokens.
//!
//! # Invariants
//!
//! - Parsing never touches repository state
//! - Every malformed command maps to `ErrorKind::InvalidArguments`

use thiserror::Error;

use crate::core::repo::RepoError;
use crate::core::types::{BranchName, FilePath, TagName, TypeError};
use crate::core::ErrorKind;

/// Errors from interpreting a command line.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("'{command}' is not allowed in this step (allowed: {})", .allowed.join(", "))]
    NotAllowed {
        command: String,
        allowed: Vec<String>,
    },

    #[error("empty command")]
    Empty,

    #[error("unterminated {0} quote")]
    UnterminatedQuote(char),

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("aborting commit due to empty commit message")]
    EmptyMessage,

    #[error("unknown option '{option}' for {command}")]
    UnknownOption {
        command: &'static str,
        option: String,
    },

    #[error("redirection is only supported for echo")]
    UnexpectedRedirect,

    #[error(transparent)]
    Name(#[from] TypeError),

    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl CommandError {
    /// The category reported to the presentation layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CommandError::NotAllowed { .. } => ErrorKind::CommandNotAllowed,
            CommandError::Repo(err) => err.kind(),
            CommandError::Empty
            | CommandError::UnterminatedQuote(_)
            | CommandError::UnknownCommand(_)
            | CommandError::Usage(_)
            | CommandError::EmptyMessage
            | CommandError::UnknownOption { .. }
            | CommandError::UnexpectedRedirect
            | CommandError::Name(_) => ErrorKind::InvalidArguments,
        }
    }
}

/// One lexical token of a command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Word(String),
    /// Unquoted `>`
    Write,
    /// Unquoted `>>`
    Append,
}

impl Token {
    /// The token as it would be typed.
    pub fn as_str(&self) -> &str {
        match self {
            Token::Word(word) => word,
            Token::Write => ">",
            Token::Append => ">>",
        }
    }
}

/// Split a command line into tokens.
///
/// # Example
///
/// ```
/// use gitcoach::engine::command::{tokenize, Token};
///
/// let tokens = tokenize(r#"echo "hello world" > 'notes.txt'"#).unwrap();
/// assert_eq!(
///     tokens,
///     vec![
///         Token::Word("echo".into()),
///         Token::Word("hello world".into()),
///         Token::Write,
///         Token::Word("notes.txt".into()),
///     ]
/// );
/// ```
pub fn tokenize(line: &str) -> Result<Vec<Token>, CommandError> {
    let mut lexer = Lexer::default();
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => lexer.flush(),
            '\'' => {
                lexer.quoted();
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(ch) => lexer.word.push(ch),
                        None => return Err(CommandError::UnterminatedQuote('\'')),
                    }
                }
            }
            '"' => {
                lexer.quoted();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some('n') => lexer.word.push('\n'),
                            Some('t') => lexer.word.push('\t'),
                            Some(ch) => lexer.word.push(ch),
                            None => return Err(CommandError::UnterminatedQuote('"')),
                        },
                        Some(ch) => lexer.word.push(ch),
                        None => return Err(CommandError::UnterminatedQuote('"')),
                    }
                }
            }
            '\\' => {
                lexer.quoted();
                if let Some(ch) = chars.next() {
                    lexer.word.push(ch);
                }
            }
            c => {
                lexer.started = true;
                lexer.word.push(c);
            }
        }
    }

    lexer.flush();
    Ok(lexer.tokens)
}

#[derive(Default)]
struct Lexer {
    tokens: Vec<Token>,
    word: String,
    /// A word has begun (it may still be empty, as in `""`).
    started: bool,
    /// The current word contained quoting or escapes.
    literal: bool,
}

impl Lexer {
    fn quoted(&mut self) {
        self.started = true;
        self.literal = true;
    }

    fn flush(&mut self) {
        if !self.started {
            return;
        }
        let word = std::mem::take(&mut self.word);
        let token = match word.as_str() {
            ">" if !self.literal => Token::Write,
            ">>" if !self.literal => Token::Append,
            _ => Token::Word(word),
        };
        self.tokens.push(token);
        self.started = false;
        self.literal = false;
    }
}

/// How `echo` output reaches a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirect {
    Write,
    Append,
}

/// What `git add` stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddTarget {
    All,
    Paths(Vec<FilePath>),
}

/// A fully validated command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedCommand {
    Init,
    Status,
    Add(AddTarget),
    Commit {
        message: String,
        all: bool,
    },
    ListBranches,
    CreateBranch {
        name: BranchName,
        start: Option<String>,
    },
    DeleteBranch {
        name: BranchName,
        force: bool,
    },
    /// `git checkout <branch|rev>`
    Checkout(String),
    /// `git checkout -b` / `git switch -c`
    CheckoutNew {
        name: BranchName,
        start: Option<String>,
    },
    /// `git switch <branch>`
    Switch(BranchName),
    Merge(BranchName),
    MergeAbort,
    Clone {
        url: String,
    },
    ListTags,
    CreateTag {
        name: TagName,
        target: Option<String>,
    },
    DeleteTag(TagName),
    Log {
        oneline: bool,
    },
    Unstage(Vec<FilePath>),
    List {
        all: bool,
    },
    Echo {
        text: String,
        redirect: Option<(Redirect, FilePath)>,
    },
    Cat(FilePath),
    Remove(Vec<FilePath>),
}

/// Parse a tokenized command line.
///
/// # Example
///
/// ```
/// use gitcoach::engine::command::{parse, tokenize, ParsedCommand};
///
/// let tokens = tokenize("git commit -am 'Fix typo'").unwrap();
/// assert_eq!(
///     parse(&tokens).unwrap(),
///     ParsedCommand::Commit { message: "Fix typo".into(), all: true }
/// );
/// ```
pub fn parse(tokens: &[Token]) -> Result<ParsedCommand, CommandError> {
    let mut words = Vec::new();
    let mut redirect = None;

    let mut iter = tokens.iter();
    while let Some(token) = iter.next() {
        match token {
            Token::Word(word) => words.push(word.as_str()),
            Token::Write | Token::Append => {
                let mode = if *token == Token::Write {
                    Redirect::Write
                } else {
                    Redirect::Append
                };
                let target = match (iter.next(), iter.next()) {
                    (Some(Token::Word(path)), None) => FilePath::new(path.as_str())?,
                    _ => return Err(CommandError::Usage("echo <text>... > <file>")),
                };
                redirect = Some((mode, target));
            }
        }
    }

    if redirect.is_some() && words.first() != Some(&"echo") {
        return Err(CommandError::UnexpectedRedirect);
    }

    match words.as_slice() {
        [] => Err(CommandError::Empty),
        ["git"] => Err(CommandError::Usage("git <command> [<args>]")),
        ["git", sub, rest @ ..] => parse_git(sub, rest),
        ["ls", rest @ ..] => parse_ls(rest),
        ["echo", rest @ ..] => Ok(ParsedCommand::Echo {
            text: rest.join(" "),
            redirect,
        }),
        ["cat", path] => Ok(ParsedCommand::Cat(FilePath::new(*path)?)),
        ["cat", ..] => Err(CommandError::Usage("cat <file>")),
        ["rm", rest @ ..] => {
            let paths = paths(rest, "rm")?;
            if paths.is_empty() {
                return Err(CommandError::Usage("rm <file>..."));
            }
            Ok(ParsedCommand::Remove(paths))
        }
        [other, ..] => Err(CommandError::UnknownCommand(other.to_string())),
    }
}

/// Tokenize and parse in one go.
pub fn parse_line(line: &str) -> Result<ParsedCommand, CommandError> {
    parse(&tokenize(line)?)
}

fn parse_git(sub: &str, rest: &[&str]) -> Result<ParsedCommand, CommandError> {
    match (sub, rest) {
        ("init", []) => Ok(ParsedCommand::Init),
        ("init", _) => Err(CommandError::Usage("git init")),

        ("status", []) => Ok(ParsedCommand::Status),
        ("status", _) => Err(CommandError::Usage("git status")),

        ("add", []) => Err(CommandError::Usage("git add <file>... | git add .")),
        ("add", ["." | "*" | "-A" | "--all"]) => Ok(ParsedCommand::Add(AddTarget::All)),
        ("add", _) => Ok(ParsedCommand::Add(AddTarget::Paths(paths(rest, "git add")?))),

        ("commit", _) => parse_commit(rest),

        ("branch", [] | ["--list"] | ["-a"]) => Ok(ParsedCommand::ListBranches),
        ("branch", ["-d" | "--delete", name]) => Ok(ParsedCommand::DeleteBranch {
            name: BranchName::new(*name)?,
            force: false,
        }),
        ("branch", ["-D", name]) => Ok(ParsedCommand::DeleteBranch {
            name: BranchName::new(*name)?,
            force: true,
        }),
        ("branch", [name, start @ ..]) if !name.starts_with('-') && start.len() <= 1 => {
            Ok(ParsedCommand::CreateBranch {
                name: BranchName::new(*name)?,
                start: start.first().map(|s| s.to_string()),
            })
        }
        ("branch", _) => Err(CommandError::Usage(
            "git branch [<name> [<start>]] | git branch -d <name>",
        )),

        ("checkout", ["-b", name, start @ ..]) if start.len() <= 1 => {
            Ok(ParsedCommand::CheckoutNew {
                name: BranchName::new(*name)?,
                start: start.first().map(|s| s.to_string()),
            })
        }
        ("checkout", [target]) if !target.starts_with('-') => {
            Ok(ParsedCommand::Checkout(target.to_string()))
        }
        ("checkout", _) => Err(CommandError::Usage("git checkout [-b] <branch> [<start>]")),

        ("switch", ["-c" | "--create", name, start @ ..]) if start.len() <= 1 => {
            Ok(ParsedCommand::CheckoutNew {
                name: BranchName::new(*name)?,
                start: start.first().map(|s| s.to_string()),
            })
        }
        ("switch", [name]) if !name.starts_with('-') => {
            Ok(ParsedCommand::Switch(BranchName::new(*name)?))
        }
        ("switch", _) => Err(CommandError::Usage("git switch [-c] <branch>")),

        ("merge", ["--abort"]) => Ok(ParsedCommand::MergeAbort),
        ("merge", [name]) if !name.starts_with('-') => {
            Ok(ParsedCommand::Merge(BranchName::new(*name)?))
        }
        ("merge", _) => Err(CommandError::Usage("git merge <branch> | git merge --abort")),

        ("clone", [url]) if !url.starts_with('-') => Ok(ParsedCommand::Clone {
            url: url.to_string(),
        }),
        ("clone", _) => Err(CommandError::Usage("git clone <url>")),

        ("tag", [] | ["-l"] | ["--list"]) => Ok(ParsedCommand::ListTags),
        ("tag", ["-d" | "--delete", name]) => {
            Ok(ParsedCommand::DeleteTag(TagName::new(*name)?))
        }
        ("tag", [name, target @ ..]) if !name.starts_with('-') && target.len() <= 1 => {
            Ok(ParsedCommand::CreateTag {
                name: TagName::new(*name)?,
                target: target.first().map(|s| s.to_string()),
            })
        }
        ("tag", _) => Err(CommandError::Usage(
            "git tag [<name> [<commit>]] | git tag -d <name>",
        )),

        ("log", []) => Ok(ParsedCommand::Log { oneline: false }),
        ("log", ["--oneline"]) => Ok(ParsedCommand::Log { oneline: true }),
        ("log", _) => Err(CommandError::Usage("git log [--oneline]")),

        ("reset", ["HEAD", files @ ..] | files) if !files.is_empty() => {
            Ok(ParsedCommand::Unstage(paths(files, "git reset")?))
        }
        ("reset", _) => Err(CommandError::Usage("git reset <file>...")),

        ("restore", ["--staged", files @ ..]) if !files.is_empty() => {
            Ok(ParsedCommand::Unstage(paths(files, "git restore")?))
        }
        ("restore", _) => Err(CommandError::Usage("git restore --staged <file>...")),

        (other, _) => Err(CommandError::UnknownCommand(format!("git {other}"))),
    }
}

fn parse_commit(rest: &[&str]) -> Result<ParsedCommand, CommandError> {
    let mut messages = Vec::new();
    let mut all = false;

    let mut iter = rest.iter();
    while let Some(arg) = iter.next() {
        match *arg {
            "-a" | "--all" => all = true,
            "-m" | "--message" | "-am" => {
                all |= *arg == "-am";
                let message = iter
                    .next()
                    .ok_or(CommandError::Usage("git commit -m <message> [-a]"))?;
                messages.push(message.to_string());
            }
            other => match other.strip_prefix("--message=") {
                Some(message) => messages.push(message.to_string()),
                None => {
                    return Err(CommandError::UnknownOption {
                        command: "git commit",
                        option: other.to_string(),
                    })
                }
            },
        }
    }

    if messages.is_empty() {
        return Err(CommandError::Usage("git commit -m <message> [-a]"));
    }
    messages.retain(|m| !m.trim().is_empty());
    if messages.is_empty() {
        return Err(CommandError::EmptyMessage);
    }

    Ok(ParsedCommand::Commit {
        message: messages.join("\n\n"),
        all,
    })
}

fn parse_ls(rest: &[&str]) -> Result<ParsedCommand, CommandError> {
    let mut all = false;
    for arg in rest {
        let flags = arg
            .strip_prefix('-')
            .filter(|f| !f.is_empty() && f.chars().all(|c| c == 'a' || c == 'l'))
            .ok_or(CommandError::Usage("ls [-a|-la]"))?;
        all |= flags.contains('a');
    }
    Ok(ParsedCommand::List { all })
}

fn paths(args: &[&str], command: &'static str) -> Result<Vec<FilePath>, CommandError> {
    args.iter()
        .map(|arg| {
            if arg.starts_with('-') {
                Err(CommandError::UnknownOption {
                    command,
                    option: arg.to_string(),
                })
            } else {
                Ok(FilePath::new(*arg)?)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> FilePath {
        FilePath::new(s).unwrap()
    }

    fn b(s: &str) -> BranchName {
        BranchName::new(s).unwrap()
    }

    mod tokenizer {
        use super::*;

        fn words(line: &str) -> Vec<String> {
            tokenize(line)
                .unwrap()
                .iter()
                .map(|t| t.as_str().to_string())
                .collect()
        }

        #[test]
        fn splits_on_whitespace() {
            assert_eq!(words("  git   status "), vec!["git", "status"]);
            assert!(tokenize("   ").unwrap().is_empty());
        }

        #[test]
        fn quotes_group_words() {
            assert_eq!(
                words(r#"git commit -m "first commit""#),
                vec!["git", "commit", "-m", "first commit"]
            );
            assert_eq!(words("echo 'a \"b\"'"), vec!["echo", "a \"b\""]);
            assert_eq!(words(r#"echo pre"mid"post"#), vec!["echo", "premidpost"]);
        }

        #[test]
        fn double_quote_escapes() {
            assert_eq!(
                words(r#"echo "line one\nline \"two\"""#),
                vec!["echo", "line one\nline \"two\""]
            );
        }

        #[test]
        fn empty_quotes_are_a_word() {
            assert_eq!(
                tokenize(r#"git commit -m """#).unwrap().last(),
                Some(&Token::Word(String::new()))
            );
        }

        #[test]
        fn unterminated_quote_is_invalid_arguments() {
            let err = tokenize("git commit -m \"oops").unwrap_err();
            assert_eq!(err, CommandError::UnterminatedQuote('"'));
            assert_eq!(err.kind(), ErrorKind::InvalidArguments);
        }

        #[test]
        fn redirect_tokens() {
            assert_eq!(
                tokenize("echo hi >> log.txt").unwrap()[2],
                Token::Append
            );
            assert_eq!(
                tokenize("echo '>' x").unwrap()[1],
                Token::Word(">".into())
            );
        }
    }

    mod parser {
        use super::*;

        #[test]
        fn add_variants() {
            for line in ["git add .", "git add *", "git add -A", "git add --all"] {
                assert_eq!(
                    parse_line(line).unwrap(),
                    ParsedCommand::Add(AddTarget::All),
                    "{line}"
                );
            }
            assert_eq!(
                parse_line("git add a.txt src/b.rs").unwrap(),
                ParsedCommand::Add(AddTarget::Paths(vec![p("a.txt"), p("src/b.rs")]))
            );
            assert_eq!(
                parse_line("git add").unwrap_err().kind(),
                ErrorKind::InvalidArguments
            );
        }

        #[test]
        fn commit_variants() {
            assert_eq!(
                parse_line("git commit -m one -m two").unwrap(),
                ParsedCommand::Commit {
                    message: "one\n\ntwo".into(),
                    all: false
                }
            );
            assert_eq!(
                parse_line("git commit -a --message=done").unwrap(),
                ParsedCommand::Commit {
                    message: "done".into(),
                    all: true
                }
            );
            assert_eq!(
                parse_line("git commit").unwrap_err(),
                CommandError::Usage("git commit -m <message> [-a]")
            );
            assert!(matches!(
                parse_line("git commit --amend -m x").unwrap_err(),
                CommandError::UnknownOption { .. }
            ));
        }

        #[test]
        fn blank_commit_message_is_rejected() {
            for line in ["git commit -m \"\"", "git commit -m '   '", "git commit -am ''"] {
                let err = parse_line(line).unwrap_err();
                assert_eq!(err, CommandError::EmptyMessage, "{line}");
                assert_eq!(err.kind(), ErrorKind::InvalidArguments);
            }
            assert_eq!(
                parse_line("git commit -m '' -m body").unwrap(),
                ParsedCommand::Commit {
                    message: "body".into(),
                    all: false
                }
            );
        }

        #[test]
        fn branch_variants() {
            assert_eq!(parse_line("git branch").unwrap(), ParsedCommand::ListBranches);
            assert_eq!(
                parse_line("git branch feature/login main").unwrap(),
                ParsedCommand::CreateBranch {
                    name: b("feature/login"),
                    start: Some("main".into())
                }
            );
            assert_eq!(
                parse_line("git branch -D old").unwrap(),
                ParsedCommand::DeleteBranch {
                    name: b("old"),
                    force: true
                }
            );
            assert_eq!(
                parse_line("git branch bad..name").unwrap_err().kind(),
                ErrorKind::InvalidArguments
            );
        }

        #[test]
        fn checkout_and_switch() {
            assert_eq!(
                parse_line("git checkout -b feature").unwrap(),
                ParsedCommand::CheckoutNew {
                    name: b("feature"),
                    start: None
                }
            );
            assert_eq!(
                parse_line("git switch -c feature v1.0").unwrap(),
                ParsedCommand::CheckoutNew {
                    name: b("feature"),
                    start: Some("v1.0".into())
                }
            );
            assert_eq!(
                parse_line("git checkout 1a2b3c4").unwrap(),
                ParsedCommand::Checkout("1a2b3c4".into())
            );
            assert_eq!(
                parse_line("git switch main").unwrap(),
                ParsedCommand::Switch(b("main"))
            );
            assert!(parse_line("git checkout").is_err());
        }

        #[test]
        fn merge_tag_log_clone() {
            assert_eq!(parse_line("git merge --abort").unwrap(), ParsedCommand::MergeAbort);
            assert_eq!(
                parse_line("git merge feature").unwrap(),
                ParsedCommand::Merge(b("feature"))
            );
            assert_eq!(
                parse_line("git tag v1.0").unwrap(),
                ParsedCommand::CreateTag {
                    name: TagName::new("v1.0").unwrap(),
                    target: None
                }
            );
            assert_eq!(
                parse_line("git tag -d v1.0").unwrap(),
                ParsedCommand::DeleteTag(TagName::new("v1.0").unwrap())
            );
            assert_eq!(
                parse_line("git log --oneline").unwrap(),
                ParsedCommand::Log { oneline: true }
            );
            assert_eq!(
                parse_line("git clone https://example.com/repo.git").unwrap(),
                ParsedCommand::Clone {
                    url: "https://example.com/repo.git".into()
                }
            );
        }

        #[test]
        fn unstage_variants() {
            let expected = ParsedCommand::Unstage(vec![p("a.txt")]);
            assert_eq!(parse_line("git reset a.txt").unwrap(), expected);
            assert_eq!(parse_line("git reset HEAD a.txt").unwrap(), expected);
            assert_eq!(parse_line("git restore --staged a.txt").unwrap(), expected);
            assert!(parse_line("git restore a.txt").is_err());
        }

        #[test]
        fn shell_commands() {
            assert_eq!(parse_line("ls -la").unwrap(), ParsedCommand::List { all: true });
            assert_eq!(parse_line("ls").unwrap(), ParsedCommand::List { all: false });
            assert!(parse_line("ls -z").is_err());
            assert_eq!(
                parse_line("echo hello world > notes.txt").unwrap(),
                ParsedCommand::Echo {
                    text: "hello world".into(),
                    redirect: Some((Redirect::Write, p("notes.txt")))
                }
            );
            assert_eq!(
                parse_line("cat notes.txt").unwrap(),
                ParsedCommand::Cat(p("notes.txt"))
            );
            assert_eq!(
                parse_line("rm a.txt b.txt").unwrap(),
                ParsedCommand::Remove(vec![p("a.txt"), p("b.txt")])
            );
        }

        #[test]
        fn redirect_rules() {
            assert_eq!(
                parse_line("git status > out.txt").unwrap_err(),
                CommandError::UnexpectedRedirect
            );
            assert!(parse_line("echo hi >").is_err());
            assert!(parse_line("echo hi > a b").is_err());
        }

        #[test]
        fn unknown_commands() {
            assert_eq!(
                parse_line("git rebase main").unwrap_err(),
                CommandError::UnknownCommand("git rebase".into())
            );
            assert_eq!(
                parse_line("vim file.txt").unwrap_err().kind(),
                ErrorKind::InvalidArguments
            );
            assert_eq!(parse_line("").unwrap_err(), CommandError::Empty);
        }
    }
}
