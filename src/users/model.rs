use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::PrimitiveDateTime;

/// One persisted user row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub age: Option<i32>,
    // Holds the argon2 hash; never sent to clients.
    #[serde(skip_serializing)]
    pub password: String,
    pub created_at: PrimitiveDateTime,
}

/// Field set for a partial update. Only `Some` fields are written;
/// the statement applies them in declaration order.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub age: Option<i32>,
    pub password: Option<String>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.age.is_none()
            && self.password.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn serialized_user_omits_password() {
        let user = User {
            id: 1,
            name: "Zhang".into(),
            email: "zhang@x.com".into(),
            age: Some(25),
            password: "$argon2id$v=19$m=19456,t=2,p=1$abc$def".into(),
            created_at: datetime!(2024-01-01 12:00:00),
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["id"], 1);
        assert_eq!(json["email"], "zhang@x.com");
    }

    #[test]
    fn serialized_user_keeps_null_age() {
        let user = User {
            id: 2,
            name: "Li".into(),
            email: "li@x.com".into(),
            age: None,
            password: "hash".into(),
            created_at: datetime!(2024-01-01 12:00:00),
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json["age"].is_null());
    }

    #[test]
    fn update_is_empty_only_without_fields() {
        assert!(UserUpdate::default().is_empty());
        assert!(!UserUpdate {
            age: Some(26),
            ..Default::default()
        }
        .is_empty());
        assert!(!UserUpdate {
            name: Some("ZhangSan".into()),
            ..Default::default()
        }
        .is_empty());
    }
}
