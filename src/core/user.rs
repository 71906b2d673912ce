//! User business logic - just enough account handling for ownership checks.
//!
//! Credentials are handled outside this service. Deleting a user removes their
//! appointments and doses with them.

use crate::{
    entities::{Appointment, Dose, User, appointment, dose, user},
    errors::{Error, Result},
};
use sea_orm::{Set, TransactionTrait, prelude::*};
use serde::Deserialize;
use tracing::{info, instrument};

const MAX_USERNAME_LEN: usize = 150;

/// Input for [`create_user`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    /// Login name
    pub username: String,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Contact email
    pub email: String,
}

/// Lower-cases and trims an email, rejecting anything without a `local@domain.tld` shape.
pub fn normalize_email(raw: &str) -> Result<String> {
    let email = raw.trim().to_lowercase();
    let valid = email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty()
            && !domain.contains('@')
            && domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
    });
    if valid && !email.chars().any(char::is_whitespace) {
        Ok(email)
    } else {
        Err(Error::validation("email", "enter a valid email address"))
    }
}

/// Registers a user; usernames and emails must be unused.
#[instrument(skip(db, new), fields(username = %new.username))]
pub async fn create_user(db: &DatabaseConnection, new: NewUser) -> Result<user::Model> {
    let username = new.username.trim().to_string();
    if username.is_empty() || username.len() > MAX_USERNAME_LEN {
        return Err(Error::validation(
            "username",
            format!("must be 1 to {MAX_USERNAME_LEN} characters"),
        ));
    }
    if new.first_name.trim().is_empty() {
        return Err(Error::validation("first_name", "cannot be empty"));
    }
    if new.last_name.trim().is_empty() {
        return Err(Error::validation("last_name", "cannot be empty"));
    }
    let email = normalize_email(&new.email)?;

    let txn = db.begin().await?;
    let taken_username = User::find()
        .filter(user::Column::Username.eq(username.as_str()))
        .one(&txn)
        .await?;
    if taken_username.is_some() {
        return Err(Error::DuplicateUser {
            field: "username",
            value: username,
        });
    }
    let taken_email = User::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(&txn)
        .await?;
    if taken_email.is_some() {
        return Err(Error::DuplicateUser {
            field: "email",
            value: email,
        });
    }

    let created = user::ActiveModel {
        username: Set(username),
        first_name: Set(new.first_name.trim().to_string()),
        last_name: Set(new.last_name.trim().to_string()),
        email: Set(email),
        date_joined: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    info!(user_id = created.id, "User created");
    Ok(created)
}

/// Finds a user by id.
pub async fn get_user<C>(db: &C, user_id: i64) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}

/// Like [`get_user`], but a missing user is [`Error::NotFound`].
pub(crate) async fn require_user<C>(db: &C, user_id: i64) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    get_user(db, user_id)
        .await?
        .ok_or_else(|| Error::not_found("user", user_id))
}

/// Deletes a user together with all their doses and appointments.
#[instrument(skip(db))]
pub async fn delete_user(db: &DatabaseConnection, user_id: i64) -> Result<()> {
    let txn = db.begin().await?;
    let user = require_user(&txn, user_id).await?;

    let doses = Dose::delete_many()
        .filter(dose::Column::UserId.eq(user_id))
        .exec(&txn)
        .await?;
    let appointments = Appointment::delete_many()
        .filter(appointment::Column::UserId.eq(user_id))
        .exec(&txn)
        .await?;
    user.delete(&txn).await?;
    txn.commit().await?;

    info!(
        doses = doses.rows_affected,
        appointments = appointments.rows_affected,
        "User deleted"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::PaginatorTrait;

    #[test]
    fn test_normalize_email() {
        assert_eq!(
            normalize_email("  Alice.Smith+tag@Example.ORG ").unwrap(),
            "alice.smith+tag@example.org"
        );
        for bad in ["", "alice", "alice@", "@example.org", "a@b", "a@@b.org", "a b@c.org", "a@.org"] {
            assert!(
                matches!(normalize_email(bad), Err(Error::Validation { field: "email", .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_create_user_and_duplicates() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "alice").await?;
        assert_eq!(user.email, "alice@example.org");

        let same_name = create_user(
            &db,
            NewUser {
                username: "alice".to_string(),
                first_name: "Other".to_string(),
                last_name: "Person".to_string(),
                email: "other@example.org".to_string(),
            },
        )
        .await;
        assert!(matches!(
            same_name,
            Err(Error::DuplicateUser { field: "username", .. })
        ));

        let same_email = create_user(
            &db,
            NewUser {
                username: "alice2".to_string(),
                first_name: "Alice".to_string(),
                last_name: "Again".to_string(),
                email: "ALICE@example.org".to_string(),
            },
        )
        .await;
        assert!(matches!(
            same_email,
            Err(Error::DuplicateUser { field: "email", .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_user_requires_names() -> Result<()> {
        let db = setup_test_db().await?;
        let result = create_user(
            &db,
            NewUser {
                username: "bob".to_string(),
                first_name: " ".to_string(),
                last_name: "Builder".to_string(),
                email: "bob@example.org".to_string(),
            },
        )
        .await;
        assert!(matches!(
            result,
            Err(Error::Validation { field: "first_name", .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_user_cascades() -> Result<()> {
        let fixture = setup_with_appointment().await?;
        let db = &fixture.db;
        create_test_dose(db, fixture.user.id, fixture.vaccine.id).await?;

        let other = create_test_user(db, "bystander").await?;
        create_test_appointment(
            db,
            other.id,
            fixture.vaccine.id,
            fixture.branch.id,
            days_from_now(3),
        )
        .await?;

        delete_user(db, fixture.user.id).await?;

        assert!(get_user(db, fixture.user.id).await?.is_none());
        assert_eq!(
            Appointment::find()
                .filter(appointment::Column::UserId.eq(fixture.user.id))
                .count(db)
                .await?,
            0
        );
        assert_eq!(
            Dose::find()
                .filter(dose::Column::UserId.eq(fixture.user.id))
                .count(db)
                .await?,
            0
        );
        assert_eq!(Appointment::find().count(db).await?, 1);

        let missing = delete_user(db, fixture.user.id).await;
        assert!(matches!(missing, Err(Error::NotFound { entity: "user", .. })));
        Ok(())
    }
}
