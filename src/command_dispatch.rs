//! Purpose: Hold top-level CLI command dispatch for `board`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Each command prints exactly one JSON document on success.
//! Invariants: Edits and deletes go through `EditFocus`, so the ownership gate runs client-side first.

use super::*;
use board_client::api::{Comment, EditFocus, Editable, NewPost, SignupForm};
use serde::de::DeserializeOwned;

pub(super) fn dispatch_command(
    command: Command,
    ctx: &CommandContext,
) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "board", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Config { command } => dispatch_config(command, ctx),
        Command::Shell => {
            let client = ctx.connect()?;
            shell::run(client, io::stdin().lock(), io::stdout().lock())?;
            Ok(RunOutcome::ok())
        }
        command => {
            let mut client = ctx.connect()?;
            let result = dispatch_remote(command, &mut client, ctx);
            if ctx.show_activity {
                emit_activity(&client.activity());
            }
            let value = result?;
            emit_json(value);
            Ok(RunOutcome::ok())
        }
    }
}

fn dispatch_config(command: ConfigCommand, ctx: &CommandContext) -> Result<RunOutcome, Error> {
    match command {
        ConfigCommand::Show => {
            let config = ctx.load_config()?;
            let mut value = to_json(&config)?;
            if let Some(object) = value.as_object_mut() {
                object.insert(
                    "path".to_string(),
                    json!(ctx.config_path.display().to_string()),
                );
            }
            emit_json(value);
        }
        ConfigCommand::SetUrl { url } => {
            let mut config = BoardConfig::load(&ctx.config_path)?;
            config.set_base_url(&url)?;
            config.save(&ctx.config_path)?;
            tracing::info!(base_url = %config.base_url, "stored preferred base url");
            emit_json(json!({
                "baseUrl": config.base_url,
                "path": ctx.config_path.display().to_string(),
            }));
        }
    }
    Ok(RunOutcome::ok())
}

fn dispatch_remote(
    command: Command,
    client: &mut BoardClient,
    ctx: &CommandContext,
) -> Result<Value, Error> {
    match command {
        Command::Me => {
            let identity = client.session_mut().refresh();
            Ok(json!({ "user": identity.as_deref().map(to_json).transpose()? }))
        }
        Command::Login => {
            let identity = client.session().require()?;
            to_json(&*identity)
        }
        Command::Signup { nickname, email } => {
            let (Some(username), Some(password)) =
                (ctx.login.username.clone(), ctx.login.password.clone())
            else {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("signup needs --username and --password"));
            };
            let form = SignupForm {
                username,
                password,
                nickname,
                email,
            };
            let identity = client.session_mut().signup_and_login(&form)?;
            to_json(&*identity)
        }
        Command::Logout => {
            client.session_mut().logout()?;
            Ok(json!({ "user": null }))
        }
        Command::Posts { command } => dispatch_posts(command, client),
        Command::Comments { command } => dispatch_comments(command, client),
        Command::Users { limit } => to_json(&client.users(limit)?),
        Command::Config { .. } | Command::Shell | Command::Completion { .. } => {
            Err(Error::new(ErrorKind::Internal).with_message("local command routed to remote"))
        }
    }
}

fn dispatch_posts(command: PostsCommand, client: &mut BoardClient) -> Result<Value, Error> {
    match command {
        PostsCommand::List { page, last } => {
            let mut pager = client.posts();
            let window = if last {
                pager.last()?
            } else {
                pager.jump(page.unwrap_or(1))?.clone()
            };
            Ok(json!({
                "page": window.page(),
                "pageSize": window.page_size(),
                "hasNext": window.has_next(),
                "hasPrev": window.has_prev(),
                "items": to_json(&window.items())?,
            }))
        }
        PostsCommand::Show { id } => to_json(&client.post(id)?),
        PostsCommand::Create { title, content } => {
            client.session().require()?;
            let created = client
                .posts()
                .collection_mut()
                .create(&NewPost { title, content })?;
            Ok(json!({ "created": created.as_ref().map(to_json).transpose()? }))
        }
        PostsCommand::Edit { id, content, page } => {
            let mut editor = client.post_editor();
            edit_item(&mut editor, client, id, page, &content)
        }
        PostsCommand::Delete { id, page } => {
            let mut editor = client.post_editor();
            editor.load(page)?;
            editor.delete_by_id(client.session(), id)?;
            Ok(json!({ "deleted": id }))
        }
    }
}

fn dispatch_comments(command: CommentsCommand, client: &mut BoardClient) -> Result<Value, Error> {
    match command {
        CommentsCommand::List { post_id, page } => {
            let mut thread = client.comments(post_id);
            thread.load(page)?;
            comments_json(&thread, client)
        }
        CommentsCommand::Add { post_id, content } => {
            client.session().require()?;
            let mut thread = client.comments(post_id);
            let created = thread.submit(&content)?;
            Ok(json!({ "created": created.as_ref().map(to_json).transpose()? }))
        }
        CommentsCommand::Edit {
            post_id,
            comment_id,
            content,
            page,
        } => {
            let mut thread = client.comments(post_id);
            edit_item(&mut thread, client, comment_id, page, &content)
        }
        CommentsCommand::Delete {
            post_id,
            comment_id,
            page,
        } => {
            let mut thread = client.comments(post_id);
            thread.load(page)?;
            thread.delete_by_id(client.session(), comment_id)?;
            Ok(json!({ "deleted": comment_id }))
        }
    }
}

fn edit_item<T>(
    focus: &mut EditFocus<T>,
    client: &BoardClient,
    id: i64,
    page: u32,
    content: &str,
) -> Result<Value, Error>
where
    T: Editable + DeserializeOwned + Serialize + Clone,
{
    focus.load(page)?;
    focus.begin_edit_by_id(client.session(), id)?;
    focus.set_draft(content)?;
    focus.save_edit()?;
    let updated = focus.items().iter().find(|item| item.item_id() == id);
    Ok(json!({ "updated": updated.map(to_json).transpose()? }))
}

pub(super) fn comments_json(
    thread: &EditFocus<Comment>,
    client: &BoardClient,
) -> Result<Value, Error> {
    let collection = thread.collection();
    let items = thread
        .items()
        .iter()
        .map(|comment| {
            let mut value = to_json(comment)?;
            if let Some(object) = value.as_object_mut() {
                object.insert(
                    "canEdit".to_string(),
                    json!(thread.can_edit(client.session(), comment)),
                );
            }
            Ok(value)
        })
        .collect::<Result<Vec<_>, Error>>()?;
    Ok(json!({
        "page": collection.current_page(),
        "hasNext": collection.has_next(),
        "hasPrev": collection.has_prev(),
        "items": items,
    }))
}
