use tracing::warn;
use uuid::Uuid;

use super::api::{ApiClient, ClientError};
use super::storage::SessionStorage;
use crate::auth::normalize_email;
use crate::models::{Todo, UpdateTodo};

const TOKEN_KEY: &str = "token";
const EMAIL_KEY: &str = "email";
const DISPLAY_NAME_KEY: &str = "displayName";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Status {
    #[default]
    Idle,
    Loading,
    Error,
}

#[derive(Debug, Clone, Default)]
pub struct AuthState {
    pub token: Option<String>,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub status: Status,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TodosState {
    /// In the order the server returned them, adjusted by local edits.
    pub items: Vec<Todo>,
    pub status: Status,
    pub error: Option<String>,
}

/// Session and todo list state, kept in step with the server.
///
/// Every action runs one request (two for registration), then folds the
/// result into local state: on success the slice goes back to
/// [`Status::Idle`], on failure it moves to [`Status::Error`] with the
/// server's reason and the data is left as it was.
pub struct Store<S> {
    api: ApiClient,
    storage: S,
    auth: AuthState,
    todos: TodosState,
}

impl<S: SessionStorage> Store<S> {
    /// Restores a previous session from `storage`, if any.
    pub fn new(mut api: ApiClient, storage: S) -> Self {
        let auth = AuthState {
            token: storage.get(TOKEN_KEY),
            email: storage.get(EMAIL_KEY),
            display_name: storage.get(DISPLAY_NAME_KEY),
            ..AuthState::default()
        };
        api.set_token(auth.token.clone());
        Self {
            api,
            storage,
            auth,
            todos: TodosState::default(),
        }
    }

    pub fn auth(&self) -> &AuthState {
        &self.auth
    }

    pub fn todos(&self) -> &TodosState {
        &self.todos
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.token.is_some()
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<(), ClientError> {
        self.begin_auth();
        match self.api.login(email, password).await {
            Ok(resp) => {
                self.finish_auth(resp.access_token, email, resp.display_name);
                Ok(())
            }
            Err(e) => Err(self.fail_auth(e)),
        }
    }

    /// Registers and then logs in, so a successful call leaves the store
    /// authenticated.
    pub async fn register(
        &mut self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<(), ClientError> {
        self.begin_auth();
        match register_then_login(&self.api, email, password, display_name).await {
            Ok((token, display_name)) => {
                self.finish_auth(token, email, display_name);
                Ok(())
            }
            Err(e) => Err(self.fail_auth(e)),
        }
    }

    pub fn logout(&mut self) {
        self.auth = AuthState::default();
        self.todos = TodosState::default();
        self.api.set_token(None);
        for key in [TOKEN_KEY, EMAIL_KEY, DISPLAY_NAME_KEY] {
            if let Err(e) = self.storage.remove(key) {
                warn!(error = %e, key, "failed to clear session storage");
            }
        }
    }

    pub async fn fetch_todos(&mut self) -> Result<(), ClientError> {
        self.todos.status = Status::Loading;
        self.todos.error = None;
        match self.api.list_todos().await {
            Ok(items) => {
                self.todos.items = items;
                self.todos.status = Status::Idle;
                Ok(())
            }
            Err(e) => Err(self.fail_todos(e)),
        }
    }

    pub async fn add_todo(&mut self, body: &str) -> Result<(), ClientError> {
        match self.api.create_todo(body).await {
            Ok(todo) => {
                self.todos.items.insert(0, todo);
                self.todos_ok();
                Ok(())
            }
            Err(e) => Err(self.fail_todos(e)),
        }
    }

    pub async fn update_todo(&mut self, id: Uuid, patch: &UpdateTodo) -> Result<(), ClientError> {
        match self.api.update_todo(id, patch).await {
            Ok(updated) => {
                if let Some(item) = self.todos.items.iter_mut().find(|t| t.id == updated.id) {
                    item.body = updated.body;
                    item.is_done = updated.is_done;
                    item.updated_at = updated.updated_at;
                }
                self.todos_ok();
                Ok(())
            }
            Err(e) => Err(self.fail_todos(e)),
        }
    }

    pub async fn delete_todo(&mut self, id: Uuid) -> Result<(), ClientError> {
        match self.api.delete_todo(id).await {
            Ok(deleted) => {
                self.todos.items.retain(|t| t.id != deleted.id);
                self.todos_ok();
                Ok(())
            }
            Err(e) => Err(self.fail_todos(e)),
        }
    }

    /// Suggestions are not kept in the store.
    pub async fn suggest(&self, input: &str) -> Result<[String; 3], ClientError> {
        Ok(self.api.suggest(input).await?.suggestions)
    }

    fn begin_auth(&mut self) {
        self.auth.status = Status::Loading;
        self.auth.error = None;
    }

    fn finish_auth(&mut self, token: String, email: &str, display_name: Option<String>) {
        let email = normalize_email(email);
        self.persist(TOKEN_KEY, Some(&token));
        self.persist(EMAIL_KEY, Some(&email));
        self.persist(DISPLAY_NAME_KEY, display_name.as_deref());

        self.api.set_token(Some(token.clone()));
        self.auth = AuthState {
            token: Some(token),
            email: Some(email),
            display_name,
            status: Status::Idle,
            error: None,
        };
    }

    fn fail_auth(&mut self, e: ClientError) -> ClientError {
        self.auth.status = Status::Error;
        self.auth.error = Some(e.to_string());
        e
    }

    fn todos_ok(&mut self) {
        self.todos.status = Status::Idle;
        self.todos.error = None;
    }

    fn fail_todos(&mut self, e: ClientError) -> ClientError {
        self.todos.status = Status::Error;
        self.todos.error = Some(e.to_string());
        e
    }

    fn persist(&mut self, key: &str, value: Option<&str>) {
        let result = match value {
            Some(v) => self.storage.set(key, v),
            None => self.storage.remove(key),
        };
        if let Err(e) = result {
            warn!(error = %e, key, "failed to write session storage");
        }
    }
}

async fn register_then_login(
    api: &ApiClient,
    email: &str,
    password: &str,
    display_name: Option<&str>,
) -> Result<(String, Option<String>), ClientError> {
    let registered = api.register(email, password, display_name).await?;
    let resp = api.login(email, password).await?;
    Ok((resp.access_token, registered.display_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MemoryStorage;

    #[test]
    fn new_store_restores_session() {
        let mut storage = MemoryStorage::default();
        storage.set(TOKEN_KEY, "tok").unwrap();
        storage.set(EMAIL_KEY, "a@b.com").unwrap();

        let store = Store::new(ApiClient::new("http://localhost:1"), storage);
        assert!(store.is_authenticated());
        assert_eq!(store.auth().email.as_deref(), Some("a@b.com"));
        assert_eq!(store.auth().display_name, None);
        assert_eq!(store.auth().status, Status::Idle);
        assert_eq!(store.api.token(), Some("tok"));
    }

    #[test]
    fn logout_clears_memory_and_storage() {
        let mut storage = MemoryStorage::default();
        storage.set(TOKEN_KEY, "tok").unwrap();
        storage.set(DISPLAY_NAME_KEY, "Ann").unwrap();

        let mut store = Store::new(ApiClient::new("http://localhost:1"), storage);
        store.logout();
        assert!(!store.is_authenticated());
        assert_eq!(store.auth().display_name, None);
        assert_eq!(store.storage().get(TOKEN_KEY), None);
        assert_eq!(store.storage().get(DISPLAY_NAME_KEY), None);
        assert_eq!(store.api.token(), None);
    }

    #[tokio::test]
    async fn unreachable_server_sets_error_status() {
        // Port 1 is reserved; nothing listens there.
        let mut store = Store::new(ApiClient::new("http://127.0.0.1:1"), MemoryStorage::default());
        assert!(store.login("a@b.com", "pw").await.is_err());
        assert_eq!(store.auth().status, Status::Error);
        assert!(store.auth().error.is_some());
        assert!(!store.is_authenticated());

        assert!(store.fetch_todos().await.is_err());
        assert_eq!(store.todos().status, Status::Error);
        assert!(store.todos().items.is_empty());
    }
}
