//! Purpose: Wire the gateway, session, and list components to the board's REST paths.
//! Exports: `BoardClient`, `POSTS_PATH`, `COMMENTS_PATH`.
//! Role: Entry point hosts construct once and keep for the life of the session.
//! Invariants: One gateway (one cookie jar) is shared by every component it hands out.
//! Invariants: Posts reload page 1 after writes; comments reload their current page.
//! Invariants: Comment threads page by `before` cursor; the service has no page parameter.
#![allow(clippy::result_large_err)]

use url::form_urlencoded;

use super::collection::{Paging, ReloadPolicy, ResourceCollection};
use super::edit_focus::EditFocus;
use super::gateway::{ApiResult, RequestGateway};
use super::model::{Comment, Post, UserSummary};
use super::scanner::{DEFAULT_MAX_PROBES, Pager};
use super::session::SessionContext;
use crate::config::BoardConfig;
use crate::core::activity::ActivityRecord;
use crate::core::error::{Error, ErrorKind};

pub const POSTS_PATH: &str = "/api/posts";
pub const COMMENTS_PATH: &str = "/api/comments";
const USERS_PATH: &str = "/api/users";

pub struct BoardClient {
    gateway: RequestGateway,
    session: SessionContext,
    page_size: u32,
    max_probes: u32,
}

impl BoardClient {
    pub fn new(config: &BoardConfig) -> ApiResult<Self> {
        let gateway = RequestGateway::new(config.base_url.clone())?
            .with_activity_capacity(config.activity_capacity);
        Ok(Self::with_gateway(gateway)
            .with_page_size(config.page_size)
            .with_max_probes(config.max_probes))
    }

    pub fn with_gateway(gateway: RequestGateway) -> Self {
        Self {
            session: SessionContext::new(gateway.clone()),
            gateway,
            page_size: crate::config::DEFAULT_PAGE_SIZE,
            max_probes: DEFAULT_MAX_PROBES,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_max_probes(mut self, max_probes: u32) -> Self {
        self.max_probes = max_probes;
        self
    }

    pub fn gateway(&self) -> &RequestGateway {
        &self.gateway
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionContext {
        &mut self.session
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn posts(&self) -> Pager<Post> {
        Pager::new(self.post_collection()).with_max_probes(self.max_probes)
    }

    /// Posts list with ownership-gated editing of post content.
    pub fn post_editor(&self) -> EditFocus<Post> {
        EditFocus::new(self.post_collection())
    }

    pub fn comments(&self, post_id: i64) -> EditFocus<Comment> {
        let collection = ResourceCollection::new(
            self.gateway.clone(),
            format!("{POSTS_PATH}/{post_id}/comments"),
            self.page_size,
            ReloadPolicy::CurrentPage,
        )
        .with_item_path(COMMENTS_PATH)
        .with_paging(Paging::Before);
        EditFocus::new(collection)
    }

    pub fn post(&self, id: i64) -> ApiResult<Post> {
        self.post_collection().get(id)
    }

    pub fn users(&self, limit: u32) -> ApiResult<Vec<UserSummary>> {
        if limit == 0 {
            return Err(Error::new(ErrorKind::Usage).with_message("limit must be positive"));
        }
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("limit", &limit.to_string())
            .finish();
        Ok(self
            .gateway
            .get_data::<Vec<UserSummary>>(&format!("{USERS_PATH}?{query}"))?
            .unwrap_or_default())
    }

    pub fn activity(&self) -> Vec<ActivityRecord> {
        self.gateway.activity()
    }

    fn post_collection(&self) -> ResourceCollection<Post> {
        ResourceCollection::new(
            self.gateway.clone(),
            POSTS_PATH,
            self.page_size,
            ReloadPolicy::FirstPage,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::BoardClient;
    use crate::api::gateway::RequestGateway;
    use crate::api::model::{Credentials, NewPost};
    use crate::api::testing::MemoryBoard;
    use crate::core::error::ErrorKind;

    fn client(board: &MemoryBoard) -> BoardClient {
        let gateway =
            RequestGateway::with_transport("http://board.test", board.clone()).expect("gateway");
        BoardClient::with_gateway(gateway).with_page_size(10)
    }

    #[test]
    fn created_post_shows_on_first_page() {
        let board = MemoryBoard::new().with_user("kim", "pw");
        board.seed_posts(15, "kim");
        let mut client = client(&board);
        client
            .session_mut()
            .login(&Credentials::new("kim", "pw"))
            .expect("login");

        let mut posts = client.posts();
        posts.jump(2).expect("page 2");
        posts
            .collection_mut()
            .create(&NewPost {
                title: "T1".to_string(),
                content: "C1".to_string(),
            })
            .expect("create");
        let window = posts.collection().window().expect("window");
        assert_eq!(window.page(), 1);
        assert!(window.items().iter().any(|post| post.title == "T1"));
        assert_eq!(board.post_count(), 16);
    }

    #[test]
    fn session_is_shared_with_comment_threads() {
        let board = MemoryBoard::new().with_user("kim", "pw");
        let post_id = board.seed_posts(1, "kim")[0];
        let mut client = client(&board);
        client
            .session_mut()
            .login(&Credentials::new("kim", "pw"))
            .expect("login");

        let mut thread = client.comments(post_id);
        thread.submit("hi").expect("comment");
        let mine = thread.items()[0].clone();
        assert!(thread.can_edit(client.session(), &mine));
    }

    #[test]
    fn post_editor_gates_on_author() {
        let board = MemoryBoard::new()
            .with_user("kim", "pw")
            .with_user("lee", "pw");
        board.seed_posts(1, "kim");
        let mut client = client(&board);
        client
            .session_mut()
            .login(&Credentials::new("lee", "pw"))
            .expect("login");

        let mut editor = client.post_editor();
        editor.load(1).expect("load");
        let post = editor.items()[0].clone();
        let err = editor
            .begin_edit(client.session(), &post)
            .expect_err("gate");
        assert_eq!(err.kind(), ErrorKind::Permission);
    }

    #[test]
    fn users_lists_accounts() {
        let board = MemoryBoard::new()
            .with_user("kim", "pw")
            .with_user("lee", "pw");
        let client = client(&board);
        let users = client.users(1).expect("users");
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, "kim");
        assert_eq!(
            board.requests().last().map(|(_, path)| path.clone()),
            Some("/api/users?limit=1".to_string())
        );
    }

    #[test]
    fn post_detail_fetch() {
        let board = MemoryBoard::new().with_user("kim", "pw");
        let id = board.seed_posts(1, "kim")[0];
        let post = client(&board).post(id).expect("post");
        assert_eq!(post.id, id);
    }
}
