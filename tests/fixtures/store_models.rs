use serde::{Deserialize, Serialize};

/// A registered user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: u64,
    #[serde(rename = "displayName")]
    pub name: String,
    pub email: Option<String>,
    pub role: Role,
    #[serde(skip)]
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Role {
    Admin,
    #[serde(rename = "member")]
    Member,
}

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: Option<String>,
}

pub mod paging {
    use serde::Serialize;

    #[derive(Debug, Serialize)]
    pub struct Page<T> {
        pub items: Vec<T>,
        pub total: u64,
    }
}
