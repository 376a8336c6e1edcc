//! Purpose: Line-oriented interactive session for `board shell`.
//! Exports: `run`.
//! Role: Keeps one `BoardClient` (one cookie jar) alive across commands read from stdin.
//! Invariants: Each input line yields exactly one JSON line on the output.
//! Invariants: Command errors are reported inline and never end the session.

use std::io::{BufRead, Write};

use serde_json::{Value, json};

use super::{error_json, to_json};
use crate::command_dispatch::comments_json;
use board_client::api::{
    BoardClient, Comment, Credentials, EditFocus, EditState, Error, ErrorKind, NewPost, Pager, Post,
    SignupForm,
};

const HELP: &str = "commands: me | login <user> <pass> | signup <user> <pass> <nick> <email> | logout \
| posts [page] | next | prev | last | show <post-id> | write <title> | <content> \
| open <post-id> | comments [page] | comment <text> | edit <comment-id> | draft <text> \
| save | cancel | delete <comment-id> | activity | quit";

struct Session {
    client: BoardClient,
    posts: Pager<Post>,
    thread: Option<(i64, EditFocus<Comment>)>,
}

enum Step {
    Continue(Value),
    Quit,
}

pub(super) fn run<R, W>(client: BoardClient, input: R, mut output: W) -> Result<(), Error>
where
    R: BufRead,
    W: Write,
{
    let mut session = Session {
        posts: client.posts(),
        client,
        thread: None,
    };
    session.client.session_mut().refresh();

    for line in input.lines() {
        let line = line.map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to read input")
                .with_source(err)
        })?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value = match session.execute(line) {
            Ok(Step::Continue(value)) => value,
            Ok(Step::Quit) => break,
            Err(err) => error_json(&err),
        };
        writeln!(output, "{value}")
            .and_then(|()| output.flush())
            .map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to write output")
                    .with_source(err)
            })?;
    }
    Ok(())
}

impl Session {
    fn execute(&mut self, line: &str) -> Result<Step, Error> {
        let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();
        let value = match verb {
            "quit" | "exit" => return Ok(Step::Quit),
            "help" => json!({ "help": HELP }),
            "me" => {
                let identity = self.client.session_mut().refresh();
                json!({ "user": identity.as_deref().map(to_json).transpose()? })
            }
            "login" => {
                let [username, password] = words(rest)?;
                let identity = self
                    .client
                    .session_mut()
                    .login(&Credentials::new(username, password))?;
                json!({ "user": to_json(&*identity)? })
            }
            "signup" => {
                let [username, password, nickname, email] = words(rest)?;
                let form = SignupForm {
                    username: username.to_string(),
                    password: password.to_string(),
                    nickname: nickname.to_string(),
                    email: email.to_string(),
                };
                let identity = self.client.session_mut().signup_and_login(&form)?;
                json!({ "user": to_json(&*identity)? })
            }
            "logout" => {
                self.client.session_mut().logout()?;
                json!({ "user": null })
            }
            "posts" => {
                let page = optional_number(rest)?.unwrap_or(1);
                self.posts.jump(page)?;
                self.posts_json()?
            }
            "next" => {
                self.posts.next()?;
                self.posts_json()?
            }
            "prev" => {
                self.posts.prev()?;
                self.posts_json()?
            }
            "last" => {
                self.posts.last()?;
                self.posts_json()?
            }
            "show" => to_json(&self.client.post(number(rest)?)?)?,
            "write" => {
                self.client.session().require()?;
                let Some((title, content)) = rest.split_once('|') else {
                    return Err(usage("write <title> | <content>"));
                };
                let created = self.posts.collection_mut().create(&NewPost {
                    title: title.trim().to_string(),
                    content: content.trim().to_string(),
                })?;
                json!({ "created": created.as_ref().map(to_json).transpose()? })
            }
            "open" => {
                let post_id = number(rest)?;
                let mut thread = self.client.comments(post_id);
                thread.load(1)?;
                self.thread = Some((post_id, thread));
                self.thread_json()?
            }
            "comments" => {
                let page = optional_number(rest)?;
                let thread = self.thread_mut()?;
                match page {
                    Some(page) => thread.load(page)?,
                    None => thread.reload()?,
                }
                self.thread_json()?
            }
            "comment" => {
                self.client.session().require()?;
                self.thread_mut()?.submit(rest)?;
                self.thread_json()?
            }
            "edit" => {
                let id = number(rest)?;
                let Session { client, thread, .. } = &mut *self;
                focused(thread)?.begin_edit_by_id(client.session(), id)?;
                self.thread_json()?
            }
            "draft" => {
                self.thread_mut()?.set_draft(rest)?;
                self.thread_json()?
            }
            "save" => {
                self.thread_mut()?.save_edit()?;
                self.thread_json()?
            }
            "cancel" => {
                self.thread_mut()?.cancel_edit();
                self.thread_json()?
            }
            "delete" => {
                let id = number(rest)?;
                let Session { client, thread, .. } = &mut *self;
                focused(thread)?.delete_by_id(client.session(), id)?;
                self.thread_json()?
            }
            "activity" => {
                let records: Vec<Value> = self
                    .client
                    .activity()
                    .iter()
                    .map(|record| record.to_json())
                    .collect();
                json!({ "activity": records })
            }
            other => return Err(usage(&format!("unknown command `{other}`; try `help`"))),
        };
        Ok(Step::Continue(value))
    }

    fn thread_mut(&mut self) -> Result<&mut EditFocus<Comment>, Error> {
        focused(&mut self.thread)
    }

    fn posts_json(&self) -> Result<Value, Error> {
        let collection = self.posts.collection();
        Ok(json!({
            "page": collection.current_page(),
            "hasNext": self.posts.can_next(),
            "hasPrev": self.posts.can_prev(),
            "items": to_json(&collection.items())?,
        }))
    }

    fn thread_json(&self) -> Result<Value, Error> {
        let Some((post_id, thread)) = &self.thread else {
            return Err(no_thread());
        };
        let mut value = comments_json(thread, &self.client)?;
        if let Some(object) = value.as_object_mut() {
            object.insert("postId".to_string(), json!(post_id));
            let editing = match thread.state() {
                EditState::Viewing => Value::Null,
                EditState::Editing(buffer) => {
                    json!({ "id": buffer.target_id, "draft": buffer.draft })
                }
            };
            object.insert("editing".to_string(), editing);
        }
        Ok(value)
    }
}

fn focused(thread: &mut Option<(i64, EditFocus<Comment>)>) -> Result<&mut EditFocus<Comment>, Error> {
    thread
        .as_mut()
        .map(|(_, thread)| thread)
        .ok_or_else(no_thread)
}

fn no_thread() -> Error {
    usage("no post is open; use `open <post-id>` first")
}

fn usage(message: &str) -> Error {
    Error::new(ErrorKind::Usage).with_message(message.to_string())
}

fn words<const N: usize>(rest: &str) -> Result<[&str; N], Error> {
    let parts: Vec<&str> = rest.split_whitespace().collect();
    parts
        .try_into()
        .map_err(|_| usage(&format!("expected {N} arguments")))
}

fn number<T: std::str::FromStr>(rest: &str) -> Result<T, Error> {
    rest.parse()
        .map_err(|_| usage(&format!("expected a number, got `{rest}`")))
}

fn optional_number(rest: &str) -> Result<Option<u32>, Error> {
    if rest.is_empty() {
        return Ok(None);
    }
    number(rest).map(Some)
}
