use std::future::Future;

use remnapromo_api::{CreateUserRequest, PanelClient, PanelUser};

use crate::error::CoreError;

/// The panel operations the campaign routines depend on.
///
/// Implemented by [`PanelClient`]; tests substitute `mocks::MockPanel`.
pub trait Panel: Send + Sync {
    /// Every user on the panel, across all pages.
    fn list_users(&self) -> impl Future<Output = Result<Vec<PanelUser>, CoreError>> + Send;

    fn create_user(
        &self,
        request: &CreateUserRequest,
    ) -> impl Future<Output = Result<PanelUser, CoreError>> + Send;

    fn get_user_by_uuid(
        &self,
        uuid: &str,
    ) -> impl Future<Output = Result<PanelUser, CoreError>> + Send;

    fn get_user_by_short_uuid(
        &self,
        short_uuid: &str,
    ) -> impl Future<Output = Result<PanelUser, CoreError>> + Send;

    fn get_user_by_username(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<PanelUser, CoreError>> + Send;

    fn delete_user(&self, uuid: &str) -> impl Future<Output = Result<(), CoreError>> + Send;
}

impl Panel for PanelClient {
    async fn list_users(&self) -> Result<Vec<PanelUser>, CoreError> {
        Ok(self.list_all_users().await?)
    }

    async fn create_user(&self, request: &CreateUserRequest) -> Result<PanelUser, CoreError> {
        Ok(PanelClient::create_user(self, request).await?)
    }

    async fn get_user_by_uuid(&self, uuid: &str) -> Result<PanelUser, CoreError> {
        Ok(PanelClient::get_user_by_uuid(self, uuid).await?)
    }

    async fn get_user_by_short_uuid(&self, short_uuid: &str) -> Result<PanelUser, CoreError> {
        Ok(PanelClient::get_user_by_short_uuid(self, short_uuid).await?)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<PanelUser, CoreError> {
        Ok(PanelClient::get_user_by_username(self, username).await?)
    }

    async fn delete_user(&self, uuid: &str) -> Result<(), CoreError> {
        Ok(PanelClient::delete_user(self, uuid).await?)
    }
}
