use tonic::transport::Channel;

use rollcall_domain::id::UserId;
use rollcall_domain::user::UserRole;
use rollcall_proto::directory::{
    GetUserByEmailRequest, GetUserRequest, directory_service_client::DirectoryServiceClient,
};

use crate::domain::repository::IdentityDirectory;
use crate::domain::types::Subject;
use crate::error::CredentialServiceError;

#[derive(Clone)]
pub struct GrpcIdentityDirectory {
    client: DirectoryServiceClient<Channel>,
}

impl GrpcIdentityDirectory {
    pub fn new(channel: Channel) -> Self {
        Self {
            client: DirectoryServiceClient::new(channel),
        }
    }
}

impl IdentityDirectory for GrpcIdentityDirectory {
    async fn find_by_id(&self, id: UserId) -> Result<Option<Subject>, CredentialServiceError> {
        let response = self
            .client
            .clone()
            .get_user(GetUserRequest {
                user_id: id.to_string(),
            })
            .await;
        match response {
            Ok(resp) => Ok(Some(resp.into_inner().try_into()?)),
            Err(status) if status.code() == tonic::Code::NotFound => Ok(None),
            Err(e) => Err(anyhow::anyhow!("gRPC get_user failed: {e}").into()),
        }
    }

    async fn find_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Subject>, CredentialServiceError> {
        let response = self
            .client
            .clone()
            .get_user_by_email(GetUserByEmailRequest {
                email: email.to_owned(),
            })
            .await;
        match response {
            Ok(resp) => Ok(Some(resp.into_inner().try_into()?)),
            Err(status) if status.code() == tonic::Code::NotFound => Ok(None),
            Err(e) => Err(anyhow::anyhow!("gRPC get_user_by_email failed: {e}").into()),
        }
    }
}

impl TryFrom<rollcall_proto::directory::User> for Subject {
    type Error = CredentialServiceError;

    fn try_from(user: rollcall_proto::directory::User) -> Result<Self, Self::Error> {
        let id = user
            .id
            .parse::<UserId>()
            .map_err(|_| anyhow::anyhow!("invalid UUID from directory: {}", user.id))?;
        let role = u8::try_from(user.role)
            .ok()
            .and_then(UserRole::from_u8)
            .ok_or_else(|| anyhow::anyhow!("unknown role from directory: {}", user.role))?;
        Ok(Subject {
            id,
            email: user.email,
            role,
        })
    }
}
