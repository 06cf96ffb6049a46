use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, Condition, DbErr, EntityTrait, QueryFilter,
    Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use crate::entities::user;

#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Email is already registered")]
    EmailTaken,
    #[error("Display name is already taken")]
    NameTaken,
}

/// Public user shape. The password hash never leaves this module except
/// through [`UserCredentials`], which is not serializable.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

impl User {
    fn from_model(model: user::Model) -> Self {
        Self {
            id: model.uuid,
            name: model.name,
            email: model.email,
            image: model.image,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = user::Entity::find()
            .filter(user::Column::Uuid.eq(id))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    /// Login lookup: the identifier may be an email address or a display name.
    pub async fn find_credentials_by_identifier<C: ConnectionTrait>(
        db: &C,
        identifier: &str,
    ) -> Result<Option<UserCredentials>, DbErr> {
        let record = user::Entity::find()
            .filter(
                Condition::any()
                    .add(user::Column::Email.eq(identifier))
                    .add(user::Column::Name.eq(identifier)),
            )
            .one(db)
            .await?;

        Ok(record.map(|model| UserCredentials {
            password_hash: model.password_hash.clone(),
            user: Self::from_model(model),
        }))
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateUser,
        user_id: Uuid,
    ) -> Result<Self, UserError> {
        let email_exists = user::Entity::find()
            .filter(user::Column::Email.eq(data.email.clone()))
            .one(db)
            .await?
            .is_some();
        if email_exists {
            return Err(UserError::EmailTaken);
        }

        let name_exists = user::Entity::find()
            .filter(user::Column::Name.eq(data.name.clone()))
            .one(db)
            .await?
            .is_some();
        if name_exists {
            return Err(UserError::NameTaken);
        }

        let now = Utc::now();
        let active = user::ActiveModel {
            uuid: Set(user_id),
            name: Set(data.name.clone()),
            email: Set(data.email.clone()),
            password_hash: Set(data.password_hash.clone()),
            image: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        Ok(Self::from_model(model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DBService;

    #[tokio::test]
    async fn create_rejects_duplicate_email_and_name() {
        let db = DBService::new_in_memory().await.unwrap();

        let data = CreateUser {
            name: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "$argon2id$stub".to_string(),
        };
        User::create(&db.pool, &data, Uuid::new_v4()).await.unwrap();

        let same_email = CreateUser {
            name: "alice2".to_string(),
            ..data.clone()
        };
        assert!(matches!(
            User::create(&db.pool, &same_email, Uuid::new_v4()).await,
            Err(UserError::EmailTaken)
        ));

        let same_name = CreateUser {
            email: "alice2@example.com".to_string(),
            ..data
        };
        assert!(matches!(
            User::create(&db.pool, &same_name, Uuid::new_v4()).await,
            Err(UserError::NameTaken)
        ));
    }

    #[tokio::test]
    async fn credentials_lookup_matches_email_or_name() {
        let db = DBService::new_in_memory().await.unwrap();

        let id = Uuid::new_v4();
        User::create(
            &db.pool,
            &CreateUser {
                name: "bob".to_string(),
                email: "bob@example.com".to_string(),
                password_hash: "hash".to_string(),
            },
            id,
        )
        .await
        .unwrap();

        let by_email = User::find_credentials_by_identifier(&db.pool, "bob@example.com")
            .await
            .unwrap()
            .expect("found by email");
        assert_eq!(by_email.user.id, id);
        assert_eq!(by_email.password_hash, "hash");

        let by_name = User::find_credentials_by_identifier(&db.pool, "bob")
            .await
            .unwrap()
            .expect("found by name");
        assert_eq!(by_name.user.id, id);

        assert!(
            User::find_credentials_by_identifier(&db.pool, "nobody")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn public_user_never_serializes_password() {
        let db = DBService::new_in_memory().await.unwrap();

        let user = User::create(
            &db.pool,
            &CreateUser {
                name: "carol".to_string(),
                email: "carol@example.com".to_string(),
                password_hash: "super-secret-hash".to_string(),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("super-secret-hash"));
        assert!(!json.contains("password"));
    }
}
