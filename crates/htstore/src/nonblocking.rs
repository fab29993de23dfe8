//! Awaitable wrapper running store operations on tokio's blocking pool.

use crate::error::{Result, TaskJoinSnafu};
use crate::file::{FileStore, FsFileStore};
use crate::store::{CredentialStore, User, WriteOptions};
use std::sync::Arc;

/// Async front end for a [`CredentialStore`].
///
/// Each call moves the blocking operation onto [`tokio::task::spawn_blocking`]
/// and resolves to exactly what the blocking call returns. Operations cannot
/// be cancelled once started.
#[derive(Debug)]
pub struct AsyncCredentialStore<F = FsFileStore> {
    inner: Arc<CredentialStore<F>>,
}

impl<F> Clone for AsyncCredentialStore<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F: FileStore + 'static> AsyncCredentialStore<F> {
    /// Wraps a blocking store.
    pub fn new(store: CredentialStore<F>) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// The wrapped blocking store.
    pub fn blocking(&self) -> &CredentialStore<F> {
        &self.inner
    }

    async fn run<T, Op>(&self, op: Op) -> Result<T>
    where
        T: Send + 'static,
        Op: FnOnce(&CredentialStore<F>) -> Result<T> + Send + 'static,
    {
        let store = Arc::clone(&self.inner);
        match tokio::task::spawn_blocking(move || op(&store)).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => TaskJoinSnafu {
                message: e.to_string(),
            }
            .fail(),
        }
    }

    /// See [`CredentialStore::find`].
    pub async fn find(&self, username: impl Into<String>) -> Result<Option<User>> {
        let username = username.into();
        self.run(move |store| store.find(&username)).await
    }

    /// See [`CredentialStore::find_all`].
    pub async fn find_all(&self) -> Result<Vec<User>> {
        self.run(|store| store.find_all()).await
    }

    /// See [`CredentialStore::find_all_raw`].
    pub async fn find_all_raw(&self) -> Result<Vec<String>> {
        self.run(|store| store.find_all_raw()).await
    }

    /// See [`CredentialStore::add`].
    pub async fn add(
        &self,
        username: impl Into<String>,
        password: impl Into<String>,
        options: WriteOptions,
    ) -> Result<()> {
        let (username, password) = (username.into(), password.into());
        self.run(move |store| store.add(&username, &password, &options))
            .await
    }

    /// See [`CredentialStore::remove`].
    pub async fn remove(&self, username: impl Into<String>) -> Result<bool> {
        let username = username.into();
        self.run(move |store| store.remove(&username)).await
    }

    /// See [`CredentialStore::change_password`].
    pub async fn change_password(
        &self,
        username: impl Into<String>,
        password: impl Into<String>,
        current_password: Option<String>,
        options: WriteOptions,
    ) -> Result<()> {
        let (username, password) = (username.into(), password.into());
        self.run(move |store| {
            store.change_password(&username, &password, current_password.as_deref(), &options)
        })
        .await
    }

    /// See [`CredentialStore::verify_user`].
    pub async fn verify_user(
        &self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<bool> {
        let (username, password) = (username.into(), password.into());
        self.run(move |store| store.verify_user(&username, &password))
            .await
    }
}

impl<F: FileStore + 'static> From<CredentialStore<F>> for AsyncCredentialStore<F> {
    fn from(store: CredentialStore<F>) -> Self {
        Self::new(store)
    }
}
